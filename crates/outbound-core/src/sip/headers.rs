//! Ordered header multimap and header-list helpers
//!
//! Header names compare case-insensitively and the compact form of Supported (`k`) is
//! understood. Values are kept as raw strings; list-valued headers (Route, Path,
//! Require, Supported) are split on top-level commas on demand.

pub use crate::sip::parser::{parse_name_addr, split_list};

pub const ROUTE: &str = "Route";
pub const PATH: &str = "Path";
pub const REQUIRE: &str = "Require";
pub const SUPPORTED: &str = "Supported";

fn canonical(name: &str) -> &str {
    if name.eq_ignore_ascii_case("k") {
        SUPPORTED
    } else {
        name
    }
}

fn names_match(a: &str, b: &str) -> bool {
    canonical(a).eq_ignore_ascii_case(canonical(b))
}

/// Request headers in wire order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }

    /// Append a header line
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All raw values of a header, in order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| names_match(n, name))
            .map(|(_, v)| v.as_str())
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| names_match(n, name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.first(name).is_some()
    }

    /// Every list element of a header across all of its lines, in order
    pub fn list_values(&self, name: &str) -> Vec<String> {
        self.get_all(name).flat_map(split_list).collect()
    }

    /// Token-list membership for headers like Supported and Require
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.list_values(name).iter().any(|value| {
            let option_tag = value.split(';').next().unwrap_or_default().trim();
            option_tag.eq_ignore_ascii_case(token)
        })
    }

    /// Put `value` in front of the existing list, or add the header if absent
    pub fn prepend_value(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| names_match(n, name)) {
            Some((_, existing)) => *existing = format!("{}, {}", value, existing),
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Put `value` at the end of the existing list, or add the header if absent
    pub fn append_value(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().rev().find(|(n, _)| names_match(n, name)) {
            Some((_, existing)) => *existing = format!("{}, {}", existing, value),
            None => self.entries.push((name.to_string(), value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_respects_brackets_and_quotes() {
        let items = split_list(r#"<sip:a.example.com;lr>, "Proxy, Inc" <sip:b.example.com;lr>,<sip:c;lr>"#);
        assert_eq!(
            items,
            vec![
                "<sip:a.example.com;lr>",
                r#""Proxy, Inc" <sip:b.example.com;lr>"#,
                "<sip:c;lr>",
            ]
        );
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn test_case_insensitive_lookup_and_compact_form() {
        let headers = Headers::from_pairs([("route", "<sip:p1;lr>"), ("k", "path, gruu")]);
        assert!(headers.contains("Route"));
        assert!(headers.has_token("Supported", "PATH"));
        assert!(!headers.has_token("Supported", "outbound"));
    }

    #[test]
    fn test_list_values_span_multiple_lines() {
        let headers = Headers::from_pairs([
            ("Route", "<sip:p1;lr>, <sip:p2;lr>"),
            ("Via", "SIP/2.0/UDP host"),
            ("Route", "<sip:p3;lr>"),
        ]);
        assert_eq!(
            headers.list_values("Route"),
            vec!["<sip:p1;lr>", "<sip:p2;lr>", "<sip:p3;lr>"]
        );
        assert_eq!(headers.first("route"), Some("<sip:p1;lr>, <sip:p2;lr>"));
        assert_eq!(headers.first("Contact"), None);
    }

    #[test]
    fn test_prepend_and_append_keep_order() {
        let mut headers = Headers::from_pairs([("Path", "<sip:old;lr>"), ("Require", "gruu")]);
        headers.prepend_value(PATH, "<sip:new;lr>");
        headers.append_value(REQUIRE, "path");
        headers.append_value("Supported", "outbound");

        let lines: Vec<_> = headers.iter().collect();
        assert_eq!(
            lines,
            vec![
                ("Path", "<sip:new;lr>, <sip:old;lr>"),
                ("Require", "gruu, path"),
                ("Supported", "outbound"),
            ]
        );
    }

    #[test]
    fn test_parse_name_addr() {
        let uri = parse_name_addr(r#""Edge" <sip:edge.example.com;lr>;foo=bar"#).unwrap();
        assert_eq!(uri.host, "edge.example.com");
        assert!(uri.has_param("lr"));
        assert!(!uri.has_param("foo"));

        let bare = parse_name_addr("sip:edge.example.com:5062").unwrap();
        assert_eq!(bare.port, Some(5062));

        assert!(parse_name_addr("<sip:edge.example.com").is_err());
    }
}
