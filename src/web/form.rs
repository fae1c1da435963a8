//! `application/x-www-form-urlencoded` bodies.

use std::collections::HashMap;

/// Parses `a=1&b=2` into a map. Entries without `=` are dropped; anything
/// after a second `=` is ignored. Later duplicates win.
pub fn parse(params: &str) -> HashMap<String, String> {
    params
        .split('&')
        .filter_map(|parameter| {
            let mut parts = parameter.split('=');
            let key = parts.next()?;
            let value = parts.next()?;
            Some((decode(key), decode(value)))
        })
        .collect()
}

/// Percent-decodes a form component, with `+` as space. Malformed escapes
/// are kept as written.
pub fn decode(component: &str) -> String {
    let spaced = component.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decodes_pairs() {
        let parsed = parse("firstName=Jane+Ann&email=jane%40example.com&issuedDate=2020-01-01");

        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed["firstName"], "Jane Ann");
        assert_eq!(parsed["email"], "jane@example.com");
        assert_eq!(parsed["issuedDate"], "2020-01-01");
    }

    #[test]
    fn test_parse_drops_entries_without_value_separator() {
        let parsed = parse("flag&name=x&=empty-key&blank=");

        assert_eq!(parsed.get("flag"), None);
        assert_eq!(parsed["name"], "x");
        assert_eq!(parsed[""], "empty-key");
        assert_eq!(parsed["blank"], "");
    }

    #[test]
    fn test_parse_keeps_second_segment_only() {
        let parsed = parse("token=abc=def");
        assert_eq!(parsed["token"], "abc");
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(parse("").is_empty());
    }
}
