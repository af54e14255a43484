//! Go-style struct field tags: `pb:"1" json:"name"`.

use thiserror::Error;

use crate::parser::unquote;

/// Syntax problems in a struct tag, worded like `go vet`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructTagError {
    #[error("bad syntax for struct tag pair")]
    BadPair,
    #[error("bad syntax for struct tag key")]
    BadKey,
    #[error("bad syntax for struct tag value")]
    BadValue,
    #[error("key:\"value\" pairs not separated by spaces")]
    NotSeparated,
}

/// A parsed `key:"value"` list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructTag {
    pairs: Vec<(String, String)>,
}

impl StructTag {
    /// Parse a tag, rejecting anything that is not a well-formed pair list
    pub fn parse(tag: &str) -> Result<Self, StructTagError> {
        let mut pairs = Vec::new();
        let mut rest = tag;
        while !rest.is_empty() {
            let trimmed = rest.trim_start_matches(' ');
            if !pairs.is_empty() && trimmed.len() == rest.len() {
                return Err(StructTagError::NotSeparated);
            }
            rest = trimmed;
            if rest.is_empty() {
                break;
            }

            let key_len = rest
                .find(|c: char| c <= ' ' || c == ':' || c == '"' || c == '\u{7f}')
                .unwrap_or(rest.len());
            if key_len == 0 {
                return Err(StructTagError::BadKey);
            }
            let key = &rest[..key_len];
            rest = &rest[key_len..];
            rest = rest.strip_prefix(':').ok_or(StructTagError::BadPair)?;
            if !rest.starts_with('"') {
                return Err(StructTagError::BadValue);
            }

            let end = quoted_len(rest).ok_or(StructTagError::BadValue)?;
            let value = unquote(&rest[..end]).ok_or(StructTagError::BadValue)?;
            pairs.push((key.to_string(), value));
            rest = &rest[end..];
        }
        Ok(Self { pairs })
    }

    /// Look up a key the way `reflect.StructTag.Lookup` does, tolerating
    /// malformed tags by returning what parsed before the problem.
    pub fn lookup_lenient(tag: &str, key: &str) -> Option<String> {
        let mut rest = tag;
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                return None;
            }
            let key_len = rest
                .find(|c: char| c <= ' ' || c == ':' || c == '"' || c == '\u{7f}')
                .unwrap_or(rest.len());
            if key_len == 0 || !rest[key_len..].starts_with(":\"") {
                return None;
            }
            let name = &rest[..key_len];
            rest = &rest[key_len + 1..];
            let end = quoted_len(rest)?;
            if name == key {
                return unquote(&rest[..end]);
            }
            rest = &rest[end..];
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Length of the double-quoted string at the start of `s`, quotes included
fn quoted_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'"') {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_pairs() {
        let tag = StructTag::parse(r#"pb:"1" json:"user_id""#).unwrap();
        assert_eq!(tag.get("pb"), Some("1"));
        assert_eq!(tag.get("json"), Some("user_id"));
        assert_eq!(tag.get("xml"), None);
    }

    #[rstest]
    #[case(r#"pb"1""#, StructTagError::BadPair)]
    #[case(r#":"1""#, StructTagError::BadKey)]
    #[case(r#"pb:1"#, StructTagError::BadValue)]
    #[case(r#"pb:"1"json:"x""#, StructTagError::NotSeparated)]
    #[case(r#"pb:"1"#, StructTagError::BadValue)]
    fn test_parse_rejects_bad_syntax(#[case] tag: &str, #[case] expected: StructTagError) {
        assert_eq!(StructTag::parse(tag), Err(expected));
    }

    #[test]
    fn test_lookup_lenient_stops_at_garbage() {
        assert_eq!(
            StructTag::lookup_lenient(r#"pb:"2" bogus"#, "pb").as_deref(),
            Some("2")
        );
        assert_eq!(StructTag::lookup_lenient(r#"bogus pb:"2""#, "pb"), None);
        assert_eq!(StructTag::lookup_lenient(r#"pb:"""#, "pb").as_deref(), Some(""));
    }
}
