//! Address extraction from arbitrary text

use crate::error::HarvestError;
use crate::proxy::models::ProxyAddress;
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Dotted quad followed by a port. Octet ranges are checked separately.
static IP_PORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(\d+)").expect("Invalid IP:PORT regex")
});

/// Scans text for `a.b.c.d:port` candidates
///
/// Lenient by default: `999.999.999.999:1` is a candidate. Ports that do not
/// fit in a `u16` (or are 0) surface as `MalformedAddress` and never stop the
/// scan of the remaining text.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressExtractor {
    strict_octets: bool,
}

impl AddressExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor that also rejects octets above 255
    pub fn strict() -> Self {
        Self {
            strict_octets: true,
        }
    }

    pub fn with_strict_octets(mut self, strict: bool) -> Self {
        self.strict_octets = strict;
        self
    }

    /// Host acceptance rule
    pub fn accepts_host(&self, host: &str) -> bool {
        !self.strict_octets || host.split('.').all(|octet| octet.parse::<u8>().is_ok())
    }

    /// Every pattern match, in text order, with per-match parse outcome
    pub fn scan<'a>(&'a self, text: &'a str) -> impl Iterator<Item = Result<ProxyAddress>> + 'a {
        IP_PORT_REGEX.captures_iter(text).map(move |cap| {
            let host = &cap[1];
            let port = &cap[2];
            if !self.accepts_host(host) {
                return Err(HarvestError::malformed(
                    format!("{}:{}", host, port),
                    "octet out of range",
                ));
            }
            ProxyAddress::from_parts(host, port)
        })
    }

    /// Lazily yield well-formed candidates, skipping malformed matches
    pub fn extract<'a>(&'a self, text: &'a str) -> impl Iterator<Item = ProxyAddress> + 'a {
        self.scan(text).filter_map(|item| match item {
            Ok(address) => Some(address),
            Err(e) => {
                debug!(error = %e, "skipping candidate");
                None
            }
        })
    }

    /// Deduplicated candidates found in `text`
    pub fn extract_unique(&self, text: &str) -> HashSet<ProxyAddress> {
        self.extract(text).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> ProxyAddress {
        s.parse().unwrap()
    }

    #[test]
    fn test_duplicates_collapse() {
        let found = AddressExtractor::new()
            .extract_unique("foo 1.2.3.4:8080 bar 1.2.3.4:8080 baz 5.6.7.8:3128");
        let expected: HashSet<_> = [addr("1.2.3.4:8080"), addr("5.6.7.8:3128")].into();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_extract_from_lines() {
        let content = r#"
192.168.1.1:8080
192.168.1.2:3128
10.0.0.1:1080
"#;
        assert_eq!(AddressExtractor::new().extract_unique(content).len(), 3);
    }

    #[test]
    fn test_extract_from_html_like_content() {
        let content = r#"
<html>
<body>
<table>
<tr><td>192.168.1.1</td><td>8080</td></tr>
</table>
Some text with 10.0.0.1:3128 embedded
</body>
</html>
"#;
        let found = AddressExtractor::new().extract_unique(content);
        assert_eq!(found.len(), 1);
        assert!(found.contains(&addr("10.0.0.1:3128")));
    }

    #[test]
    fn test_extract_from_json_like_content() {
        let content = r#"[{"proxy":"45.12.30.1:80"},{"proxy":"45.12.30.2:8888"}]"#;
        assert_eq!(AddressExtractor::new().extract_unique(content).len(), 2);
    }

    #[test]
    fn test_lenient_octets_by_default() {
        let found = AddressExtractor::new().extract_unique("Odd IP: 999.999.999.999:1");
        assert!(found.contains(&addr("999.999.999.999:1")));
    }

    #[test]
    fn test_strict_octets() {
        let extractor = AddressExtractor::strict();
        let found = extractor.extract_unique("999.999.999.999:1 and 10.0.0.1:80");
        assert_eq!(found.len(), 1);
        assert!(found.contains(&addr("10.0.0.1:80")));

        let outcomes: Vec<_> = extractor.scan("256.1.1.1:80").collect();
        assert!(matches!(
            outcomes[0],
            Err(HarvestError::MalformedAddress { .. })
        ));
    }

    #[test]
    fn test_bad_ports_do_not_stop_extraction() {
        let extractor = AddressExtractor::new();
        let text = "1.1.1.1:70000 2.2.2.2:0 3.3.3.3:3128";

        let outcomes: Vec<_> = extractor.scan(text).collect();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_err());
        assert!(outcomes[1].is_err());
        assert!(outcomes[2].is_ok());

        let found = extractor.extract_unique(text);
        assert_eq!(found.len(), 1);
        assert!(found.contains(&addr("3.3.3.3:3128")));
    }

    #[test]
    fn test_no_matches() {
        let extractor = AddressExtractor::new();
        assert!(extractor.extract_unique("").is_empty());
        assert!(extractor.extract_unique("192.168.1.1 no port here").is_empty());
        assert!(extractor.extract_unique("1.2.3:80").is_empty());
    }

    #[test]
    fn test_every_result_matches_pattern() {
        let text = "x1.2.3.4:5y 10.20.30.40:8080, 7.7.7.7:99999 0.0.0.0:1";
        for address in AddressExtractor::new().extract(text) {
            assert!(IP_PORT_REGEX.is_match(&address.to_string()));
        }
    }

    #[test]
    fn test_extraction_is_lazy() {
        let extractor = AddressExtractor::new();
        let mut iter = extractor.extract("1.1.1.1:1 2.2.2.2:2 3.3.3.3:3");
        assert_eq!(iter.next(), Some(addr("1.1.1.1:1")));
    }
}
