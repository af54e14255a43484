//! Formatting options

use serde::Deserialize;

/// Initialisms recognised when no list is configured
pub const DEFAULT_INITIALISMS: &[&str] = &[
    "ACL", "API", "ASCII", "CPU", "CSS", "DNS", "EOF", "GUID", "HTML", "HTTP", "HTTPS", "ID",
    "IP", "JSON", "LHS", "QPS", "RAM", "RHS", "RPC", "SLA", "SMTP", "SQL", "SSH", "TCP", "TLS",
    "TTL", "UDP", "UI", "UID", "UUID", "URI", "URL", "UTF8", "VM", "XML", "XMPP", "XSRF", "XSS",
];

/// Project-level formatting configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormatConfig {
    /// Canonical spellings of initialisms, e.g. `ID` or `URL`
    pub initialisms: Vec<String>,
    /// Rewrite struct field names so initialisms use their canonical case
    pub fix_initialisms: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            initialisms: DEFAULT_INITIALISMS.iter().map(|s| s.to_string()).collect(),
            fix_initialisms: false,
        }
    }
}

impl FormatConfig {
    /// Apply the initialism rule to a field name. Names are returned
    /// unchanged when the rule is disabled.
    pub fn fix_name(&self, name: &str) -> String {
        if !self.fix_initialisms {
            return name.to_string();
        }
        let lower_start = name.starts_with(|c: char| c.is_lowercase());
        split_words(name)
            .into_iter()
            .enumerate()
            .map(|(i, word)| {
                match self.initialisms.iter().find(|init| init.eq_ignore_ascii_case(word)) {
                    // unexported names keep their leading lower case
                    Some(init) if i == 0 && lower_start => init.to_lowercase(),
                    Some(init) => init.clone(),
                    None => word.to_string(),
                }
            })
            .collect()
    }
}

/// Split a mixed-caps identifier into words: `HTTPServerId` becomes
/// `HTTP`, `Server`, `Id`.
fn split_words(name: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = name.char_indices().collect();
    let mut words = Vec::new();
    let mut start = 0;
    for i in 1..chars.len() {
        let (at, c) = chars[i];
        let prev = chars[i - 1].1;
        let next_lower = chars.get(i + 1).is_some_and(|(_, n)| n.is_lowercase());
        let boundary = c.is_uppercase()
            && (prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower));
        if boundary {
            words.push(&name[start..at]);
            start = at;
        }
    }
    if start < name.len() {
        words.push(&name[start..]);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("UserId", "UserID")]
    #[case("HttpUrl", "HTTPURL")]
    #[case("HTTPServerId", "HTTPServerID")]
    #[case("Identity", "Identity")]
    #[case("id", "id")]
    #[case("userId", "userID")]
    fn test_fix_initialisms(#[case] name: &str, #[case] expected: &str) {
        let config = FormatConfig {
            fix_initialisms: true,
            ..FormatConfig::default()
        };
        assert_eq!(config.fix_name(name), expected);
    }

    #[test]
    fn test_disabled_rule_keeps_names() {
        assert_eq!(FormatConfig::default().fix_name("UserId"), "UserId");
    }

    #[test]
    fn test_config_deserializes_camel_case() {
        let config: FormatConfig =
            serde_json::from_str(r#"{"fixInitialisms": true, "initialisms": ["ID"]}"#).unwrap();
        assert!(config.fix_initialisms);
        assert_eq!(config.initialisms, vec!["ID".to_string()]);
    }
}
