//! Shared utilities for Google API modules

/// Quote a value as a string literal for a Drive `files.list` query.
///
/// Drive query literals are single-quoted; `\` and `'` must be escaped.
pub fn drive_query_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_value() {
        assert_eq!(drive_query_literal("a.pdf"), "'a.pdf'");
    }

    #[test]
    fn test_escapes_quote_and_backslash() {
        assert_eq!(drive_query_literal("it's"), r"'it\'s'");
        assert_eq!(drive_query_literal(r"a\b"), r"'a\\b'");
    }
}
