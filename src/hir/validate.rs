//! Gunk-specific rules that hold on top of type checking.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::base::TextRange;
use crate::parser::{AstNode, SourceFile, StructType};
use crate::syntax::StructTag;

/// A rule violation in one file of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub file: usize,
    pub range: TextRange,
    pub message: String,
}

/// Every file must declare the same package name. On a mismatch each
/// file's package name is reported.
pub fn check_package_names(files: &[SourceFile]) -> Vec<Violation> {
    let names: Vec<_> = files
        .iter()
        .enumerate()
        .filter_map(|(file, source)| Some((file, source.package_name()?)))
        .collect();
    let distinct: FxHashSet<String> = names.iter().map(|(_, name)| name.text()).collect();
    if distinct.len() <= 1 {
        return Vec::new();
    }
    names
        .into_iter()
        .map(|(file, name)| Violation {
            file,
            range: name.range(),
            message: "found more than one package name".to_string(),
        })
        .collect()
}

/// Check the fields of every struct type in the package.
pub fn validate(files: &[SourceFile]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (file, source) in files.iter().enumerate() {
        for st in source.syntax().descendants().filter_map(StructType::cast) {
            validate_struct(file, &st, &mut violations);
        }
    }
    violations
}

fn validate_struct(file: usize, st: &StructType, out: &mut Vec<Violation>) {
    // keyed by value, so "2" and "02" collide
    let mut sequences: IndexMap<i64, Vec<(TextRange, String)>> = IndexMap::new();
    let mut json_names = FxHashSet::default();
    let mut report = |range: TextRange, message: String| {
        out.push(Violation {
            file,
            range,
            message,
        })
    };

    for field in st.fields() {
        if field.is_embedded() {
            report(field.range(), "anonymous struct fields are not supported".to_string());
            continue;
        }
        let Some(field_tag) = field.tag() else {
            continue;
        };
        let Some(raw) = field_tag.value() else {
            continue;
        };
        let range = field_tag.range();
        let tag = match StructTag::parse(&raw) {
            Ok(tag) => tag,
            Err(e) => {
                report(
                    range,
                    format!("struct field tag `{raw}` not compatible with reflect.StructTag.Get: {e}"),
                );
                continue;
            }
        };

        if let Some(pb) = tag.get("pb").filter(|v| !v.is_empty()) {
            match pb.parse::<i64>() {
                Ok(n) => sequences.entry(n).or_default().push((range, pb.to_string())),
                Err(_) => report(range, format!("invalid sequence number {pb:?}")),
            }
        }
        if let Some(json) = tag.get("json").filter(|v| !v.is_empty()) {
            if !json_names.insert(json.to_string()) {
                report(range, format!("json tag {json:?} seen twice"));
            }
        }
    }

    for fields in sequences.into_values() {
        if fields.len() < 2 {
            continue;
        }
        for (range, raw) in fields {
            report(range, format!("sequence number {raw:?} seen twice"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn files(texts: &[&str]) -> Vec<SourceFile> {
        texts
            .iter()
            .map(|t| SourceFile::cast(parse(t).syntax()).unwrap())
            .collect()
    }

    fn messages(text: &str) -> Vec<String> {
        validate(&files(&[text]))
            .into_iter()
            .map(|v| v.message)
            .collect()
    }

    #[test]
    fn test_duplicate_sequence_reports_every_field() {
        let text = "package a\n\ntype T struct {\n\tA int `pb:\"2\"`\n\tB int `pb:\"1\"`\n\tC int `pb:\"2\"`\n}\n";
        let violations = validate(&files(&[text]));
        assert_eq!(violations.len(), 2);
        for violation in &violations {
            assert_eq!(violation.message, "sequence number \"2\" seen twice");
        }
        let lines: Vec<_> = violations
            .iter()
            .map(|v| text[..usize::from(v.range.start())].matches('\n').count())
            .collect();
        assert_eq!(lines, vec![3, 5]);
    }

    #[test]
    fn test_sequence_numbers_compare_as_integers() {
        let text = "package a\n\ntype T struct {\n\tA int `pb:\"2\"`\n\tB int `pb:\"02\"`\n\tC int `pb:\"-1\"`\n\tD int `pb:\"+2\"`\n}\n";
        assert_eq!(
            messages(text),
            vec![
                "sequence number \"2\" seen twice".to_string(),
                "sequence number \"02\" seen twice".to_string(),
                "sequence number \"+2\" seen twice".to_string(),
            ]
        );
    }

    #[test]
    fn test_field_rules() {
        let text = "package a\n\ntype T struct {\n\tOther\n\tA int `pb:\"x\"`\n\tB int `json:\"b\"`\n\tC int `json:\"b\"`\n\tD int `pb:1`\n}\n";
        assert_eq!(
            messages(text),
            vec![
                "anonymous struct fields are not supported".to_string(),
                "invalid sequence number \"x\"".to_string(),
                "json tag \"b\" seen twice".to_string(),
                "struct field tag `pb:1` not compatible with reflect.StructTag.Get: bad syntax for struct tag value".to_string(),
            ]
        );
    }

    #[test]
    fn test_nested_structs_are_independent() {
        let text = "package a\n\ntype T struct {\n\tA int `pb:\"1\"`\n\tB struct {\n\t\tC int `pb:\"1\"`\n\t} `pb:\"2\"`\n}\n";
        assert!(messages(text).is_empty());
    }

    #[test]
    fn test_empty_tags_are_left_to_the_formatter() {
        assert!(messages("package a\n\ntype T struct {\n\tA int `pb:\"\" json:\"\"`\n}\n").is_empty());
    }

    #[test]
    fn test_package_name_mismatch_marks_every_file() {
        let violations = check_package_names(&files(&["package a\n", "package b\n", "package a\n"]));
        assert_eq!(violations.len(), 3);
        assert_eq!(violations[2].file, 2);
        assert_eq!(violations[0].message, "found more than one package name");
        assert!(check_package_names(&files(&["package a\n", "package a\n"])).is_empty());
    }
}
