//! Integration tests for the generation engine

mod clean_and_locate;
mod config_integration;
mod dependent_builders;
mod full_build;
mod incremental;
mod test_utils;
