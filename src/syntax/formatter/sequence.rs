//! Assignment of `pb` sequence numbers to struct fields.

use rustc_hash::{FxHashMap, FxHashSet};
use text_size::TextRange;

use super::RewriteError;
use crate::parser::{AstNode, Field, StructType};
use crate::syntax::StructTag;

/// Sequence numbers to add, keyed by the range of the field that needs one
pub type Assignments = FxHashMap<TextRange, u32>;

/// Pick numbers for every field of `st` that has no `pb` tag. Existing
/// numbers are kept; missing ones take the smallest unused values in
/// declaration order.
pub fn assign(st: &StructType, out: &mut Assignments) -> Result<(), RewriteError> {
    let fields = st.fields();
    let mut used = FxHashSet::default();
    let mut missing: Vec<&Field> = Vec::new();

    for field in &fields {
        let Some(tag) = field.tag() else {
            missing.push(field);
            continue;
        };
        let value = tag.value().unwrap_or_default();
        match StructTag::lookup_lenient(&value, "pb") {
            None => missing.push(field),
            Some(seq) if seq.is_empty() => {
                return Err(RewriteError::EmptySequence { at: tag.range() });
            }
            Some(seq) => match seq.parse::<i64>() {
                Ok(n) => {
                    used.insert(n);
                }
                Err(_) => {
                    return Err(RewriteError::InvalidSequence {
                        at: tag.range(),
                        value: seq,
                    });
                }
            },
        }
    }

    // tagged fields use at most fields.len() - missing.len() of these, so
    // every missing field gets one
    let free = (1..=fields.len() as u32).filter(|n| !used.contains(&i64::from(*n)));
    for (field, n) in missing.into_iter().zip(free) {
        out.insert(field.range(), n);
    }
    Ok(())
}

/// The tag literal for a field after numbering: the number goes in front of
/// whatever the field already declared.
pub fn numbered_tag(n: u32, existing: Option<&str>) -> String {
    match existing.map(str::trim).filter(|s| !s.is_empty()) {
        Some(rest) => format!("`pb:\"{n}\" {rest}`"),
        None => format!("`pb:\"{n}\"`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{SourceFile, Type, parse};

    fn struct_of(text: &str) -> StructType {
        let file = SourceFile::cast(parse(text).syntax()).unwrap();
        match file.type_specs().next().unwrap().ty() {
            Some(Type::Struct(st)) => st,
            other => panic!("expected struct, got {other:?}"),
        }
    }

    fn numbers(text: &str) -> Vec<Option<u32>> {
        let st = struct_of(text);
        let mut out = Assignments::default();
        assign(&st, &mut out).unwrap();
        st.fields().iter().map(|f| out.get(&f.range()).copied()).collect()
    }

    #[test]
    fn test_fills_gaps_in_declaration_order() {
        let text = "package a\ntype T struct {\n\tA int\n\tB int `pb:\"3\"`\n\tC int\n\tD int\n}\n";
        assert_eq!(numbers(text), vec![Some(1), None, Some(2), Some(4)]);
    }

    #[test]
    fn test_existing_numbers_compare_as_integers() {
        let text = "package a\ntype T struct {\n\tA int `pb:\"01\"`\n\tB int\n\tC int `pb:\"-1\"`\n\tD int\n}\n";
        assert_eq!(numbers(text), vec![None, Some(2), None, Some(3)]);
    }

    #[test]
    fn test_out_of_range_numbers_leave_room() {
        let text = "package a\ntype T struct {\n\tA int `pb:\"7\"`\n\tB int `pb:\"9\"`\n\tC int\n}\n";
        assert_eq!(numbers(text), vec![None, None, Some(1)]);
    }

    #[test]
    fn test_prepends_to_existing_tag() {
        let text = "package a\ntype T struct {\n\tA int `json:\"a\"`\n}\n";
        assert_eq!(numbers(text), vec![Some(1)]);
        assert_eq!(numbered_tag(1, Some("json:\"a\"")), "`pb:\"1\" json:\"a\"`");
    }

    #[test]
    fn test_empty_and_non_numeric_are_errors() {
        let mut out = Assignments::default();
        let empty = struct_of("package a\ntype T struct {\n\tA int `pb:\"\"`\n}\n");
        assert!(matches!(
            assign(&empty, &mut out),
            Err(RewriteError::EmptySequence { .. })
        ));
        let word = struct_of("package a\ntype T struct {\n\tA int `pb:\"one\"`\n}\n");
        assert!(matches!(
            assign(&word, &mut out),
            Err(RewriteError::InvalidSequence { value, .. }) if value == "one"
        ));
    }
}
