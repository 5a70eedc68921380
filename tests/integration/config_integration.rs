//! End to end through the configuration: config file, model directory, CLI route.

use modelgen::cli::{Commands, OutputFormat, RunContext};
use modelgen::config::ConfigLoader;
use modelgen::context::GenerationContext;
use modelgen::error::ApiError;
use tempfile::TempDir;

fn write_project(dir: &TempDir, config: &str) {
    std::fs::write(dir.path().join("modelgen.toml"), config).unwrap();
    let model = dir.path().join("model/motor");
    std::fs::create_dir_all(&model).unwrap();
    std::fs::write(
        model.join("contract.json"),
        r#"{
            "kind": "product-type",
            "name": "motor.Contract",
            "attributes": [
                {"name": "premium", "datatype": "Money"},
                {"name": "rate", "datatype": "Decimal", "changing_over_time": true}
            ],
            "generations": [{"valid_from": "2024-01-01", "values": {"rate": "0.12"}}]
        }"#,
    )
    .unwrap();
    std::fs::write(
        model.join("gender.json"),
        r#"{"kind": "enum-type", "name": "motor.Gender", "values": [{"id": "m"}, {"id": "f"}]}"#,
    )
    .unwrap();
}

const CONFIG: &str = r#"
[project]
name = "motor"
base_package = "org.acme"
output_dir = "src-gen"

[features]
published_interfaces = false
"#;

#[test]
fn test_config_drives_context() {
    let dir = TempDir::new().unwrap();
    write_project(&dir, CONFIG);
    let config = ConfigLoader::load_from_file(&dir.path().join("modelgen.toml")).unwrap();
    assert!(config.validate().is_ok());

    let context = GenerationContext::from_config(&config);
    assert_eq!(context.project(), "motor");
    assert!(!context.features().published_interfaces);
    let names = context.type_names("motor", "Contract");
    assert_eq!(names.interface, "org.acme.motor.Contract");
    assert_eq!(names.implementation, names.interface);
}

#[test]
fn test_build_and_locate_through_run_context() {
    let dir = TempDir::new().unwrap();
    write_project(&dir, CONFIG);
    let run = RunContext::new(
        dir.path().to_path_buf(),
        Some(dir.path().join("modelgen.toml")),
    )
    .unwrap();

    let output = run
        .execute(&Commands::Build {
            changed: Vec::new(),
            format: OutputFormat::Json,
        })
        .unwrap();
    assert!(!output.failed);
    let report: serde_json::Value = serde_json::from_str(&output.text).unwrap();
    assert_eq!(report["state"], "done");

    let generated = dir.path().join("src-gen/org/acme/motor");
    assert!(generated.join("Contract.java").exists());
    assert!(generated.join("ContractGen_20240101.java").exists());
    assert!(generated.join("Gender.java").exists());
    assert!(dir.path().join("src-gen/modelgen-toc.xml").exists());

    let located = run
        .execute(&Commands::Locate {
            name: "motor.Gender".to_string(),
            format: OutputFormat::Text,
        })
        .unwrap();
    assert_eq!(located.text, "org/acme/motor/Gender.java");

    let incremental = run
        .execute(&Commands::Build {
            changed: vec!["motor.Unknown".to_string()],
            format: OutputFormat::Text,
        });
    assert!(matches!(incremental, Err(ApiError::UnknownObject(_))));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_project(&dir, "[project]\nname = \"motor\"\noutput_dir = \"model\"\n");
    match RunContext::new(dir.path().to_path_buf(), Some(dir.path().join("modelgen.toml"))) {
        Err(ApiError::ConfigError(message)) => assert!(message.contains("output_dir")),
        Err(other) => panic!("expected a configuration error, got {}", other),
        Ok(_) => panic!("expected a configuration error"),
    }
}
