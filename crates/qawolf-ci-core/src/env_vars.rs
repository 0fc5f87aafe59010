//! KEY=VALUE environment variable block parsing

use std::collections::HashMap;

/// Parse a newline-separated `KEY=VALUE` block into a variable map.
///
/// Lines split at the first `=`; later `=` characters stay in the
/// value. Keys and values are trimmed. A line whose trimmed key is
/// empty (blank lines, lone `=`, `=value`) is skipped silently. A line
/// without `=` keeps the key with an empty value. Later duplicates
/// overwrite earlier ones.
pub fn parse_variables(input: &str) -> HashMap<String, String> {
    let mut variables = HashMap::new();
    for line in input.lines() {
        let (key, value) = match line.split_once('=') {
            Some((key, rest)) => (key.trim(), rest.trim()),
            None => (line.trim(), ""),
        };
        if key.is_empty() {
            continue;
        }
        variables.insert(key.to_string(), value.to_string());
    }
    variables
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(input: &str) -> HashMap<String, String> {
        parse_variables(input)
    }

    #[test]
    fn test_parse_simple_pairs() {
        let vars = parsed("A=1\nB=2");
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["A"], "1");
        assert_eq!(vars["B"], "2");
    }

    #[test]
    fn test_parse_keeps_equals_in_value() {
        let vars = parsed("A=1\nB=two=words\n\nC=  3  ");
        assert_eq!(vars.len(), 3);
        assert_eq!(vars["A"], "1");
        assert_eq!(vars["B"], "two=words");
        assert_eq!(vars["C"], "3");
    }

    #[test]
    fn test_parse_trims_keys_and_values() {
        let vars = parsed("  SPACED  =  padded value  ");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["SPACED"], "padded value");
    }

    #[test]
    fn test_parse_crlf_lines() {
        let vars = parsed("A=1\r\nB=2\r\n");
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["A"], "1");
        assert_eq!(vars["B"], "2");
    }

    #[test]
    fn test_parse_skips_empty_keys() {
        let vars = parsed("=orphan\n=\n   \n\nREAL=yes");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["REAL"], "yes");
    }

    #[test]
    fn test_parse_line_without_equals_keeps_empty_value() {
        let vars = parsed("FLAG");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["FLAG"], "");
    }

    #[test]
    fn test_parse_empty_value_after_equals() {
        let vars = parsed("EMPTY=");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["EMPTY"], "");
    }

    #[test]
    fn test_parse_later_duplicate_wins() {
        let vars = parsed("KEY=first\nKEY=second");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["KEY"], "second");
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parsed("").is_empty());
    }
}
