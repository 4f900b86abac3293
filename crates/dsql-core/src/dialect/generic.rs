use super::Dialect;

/// Portable baseline dialect. Standard double-quoted identifiers, base
/// statement templates, no platform workarounds.
#[derive(Debug)]
pub struct Generic;

/// Shared [`Generic`] instance.
pub static GENERIC: Generic = Generic;

impl Dialect for Generic {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn escape_string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_string_literal() {
        assert_eq!(GENERIC.escape_string_literal("it's"), "'it''s'");
        assert_eq!(GENERIC.escape_string_literal(""), "''");
    }
}
