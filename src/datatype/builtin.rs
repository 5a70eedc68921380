//! Builtin value datatypes shipped with the generator.

use crate::datatype::{DatatypeDescriptor, DatatypeProvider, LanguageVariant};

pub struct BuiltinDatatypes;

fn descriptor(datatype: &str, class_name: &str, value_of: &str, to_string: &str) -> DatatypeDescriptor {
    DatatypeDescriptor {
        datatype: datatype.to_string(),
        class_name: class_name.to_string(),
        value_of: value_of.to_string(),
        to_string: to_string.to_string(),
        null_expression: "null".to_string(),
        generic: false,
    }
}

impl DatatypeProvider for BuiltinDatatypes {
    fn name(&self) -> &str {
        "builtin"
    }

    fn descriptors(&self, variant: LanguageVariant) -> Vec<DatatypeDescriptor> {
        let mut descriptors = vec![
            descriptor("String", "java.lang.String", "{value}", "{value}"),
            descriptor(
                "Integer",
                "java.lang.Integer",
                "Integer.valueOf({value})",
                "{value}.toString()",
            ),
            descriptor(
                "Long",
                "java.lang.Long",
                "Long.valueOf({value})",
                "{value}.toString()",
            ),
            descriptor(
                "Boolean",
                "java.lang.Boolean",
                "Boolean.valueOf({value})",
                "{value}.toString()",
            ),
            descriptor(
                "Decimal",
                "java.math.BigDecimal",
                "new BigDecimal({value})",
                "{value}.toPlainString()",
            ),
            descriptor(
                "Money",
                "org.javamoney.moneta.Money",
                "Money.parse({value})",
                "{value}.toString()",
            ),
        ];

        descriptors.push(match variant {
            LanguageVariant::Java8 => descriptor(
                "Date",
                "java.time.LocalDate",
                "LocalDate.parse({value})",
                "{value}.toString()",
            ),
            LanguageVariant::Java5 => descriptor(
                "Date",
                "java.util.GregorianCalendar",
                "DateUtil.parseIsoDate({value})",
                "DateUtil.toIsoDate({value})",
            ),
        });

        descriptors
    }
}
