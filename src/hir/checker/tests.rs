use rstest::rstest;

use super::*;
use crate::hir::importer::MapImporter;
use crate::hir::types::{BasicKind, ConstValue, FieldTy, StructTy};
use crate::parser::parse;

fn http_surface() -> PackageSurface {
    let mut http = PackageSurface::new("example.com/http", "http");
    let field = |name: &str| FieldTy {
        name: name.into(),
        ty: Ty::Basic(BasicKind::String),
        embedded: false,
        tag: None,
    };
    http.types.insert(
        "Match".into(),
        Ty::Struct(StructTy {
            fields: vec![field("Method"), field("Path")],
        }),
    );
    http.types.insert("secret".into(), Ty::Basic(BasicKind::Int));
    http
}

fn check_texts(texts: &[&str]) -> CheckResult {
    let files: Vec<SourceFile> = texts
        .iter()
        .map(|text| {
            let parse = parse(text);
            assert!(parse.ok(), "{:?}", parse.errors);
            SourceFile::cast(parse.syntax()).unwrap()
        })
        .collect();
    let mut importer = MapImporter::new();
    importer.insert(http_surface());
    check("example.com/api", "api", &files, &mut importer)
}

fn messages(result: &CheckResult) -> Vec<String> {
    result.errors.iter().map(|e| e.message.clone()).collect()
}

#[test]
fn test_clean_package_builds_surface() {
    let result = check_texts(&[concat!(
        "package api\n\n",
        "import \"time\"\n\n",
        "type Status int\n\n",
        "const (\n\tUnknown Status = iota\n\tActive\n\tDisabled\n)\n\n",
        "type User struct {\n\tName    string\n\tStatus  Status\n\tCreated time.Time\n\tTags    map[string][]string\n}\n",
    )]);
    assert!(result.errors.is_empty(), "{:?}", messages(&result));
    let surface = &result.surface;
    assert_eq!(surface.types["Status"], Ty::Basic(BasicKind::Int));
    assert_eq!(surface.consts["Disabled"].value, ConstValue::Int(2));
    assert_eq!(surface.consts["Active"].ty, Ty::Named(surface.named("Status")));
    assert_eq!(result.imports, vec![SmolStr::new("time")]);
}

#[rstest]
#[case::undefined("type T struct {\n\tA Missing\n}\n", "undefined: Missing")]
#[case::not_a_type("const C = 1\n\ntype T struct {\n\tA C\n}\n", "C is not a type")]
#[case::redeclared("type T int\n\ntype T string\n", "T redeclared in this block")]
#[case::field_redeclared("type T struct {\n\tA int\n\tA string\n}\n", "A redeclared")]
#[case::duplicate_method("type S interface {\n\tGet()\n\tGet()\n}\n", "duplicate method Get")]
#[case::value_recursion("type T struct {\n\tNext T\n}\n", "invalid recursive type T")]
#[case::alias_recursion("type A B\n\ntype B A\n", "invalid recursive type A")]
#[case::map_key("type T struct {\n\tM map[[]int]string\n}\n", "invalid map key type []int")]
#[case::unexported("import \"example.com/http\"\n\ntype T struct {\n\tA http.secret\n}\n", "name secret not exported by package http")]
#[case::unknown_qualified("import \"example.com/http\"\n\ntype T struct {\n\tA http.Route\n}\n", "undefined: http.Route")]
#[case::package_without_selector("import \"example.com/http\"\n\ntype T struct {\n\tA http\n}\n", "use of package http without selector")]
#[case::const_overflow("const C int8 = 300\n", "cannot use 300 (untyped int constant) as int8 value in constant declaration (overflows)")]
#[case::const_truncated("const C int = 1.5\n", "cannot use 1.5 (untyped float constant) as int value in constant declaration (truncated)")]
#[case::const_mismatch("const C string = 1\n", "cannot use 1 (untyped int constant) as string value in constant declaration")]
#[case::const_cycle("const A = B\n\nconst B = A\n", "initialization cycle: A refers to itself")]
#[case::const_invalid_type("type T struct{}\n\nconst C T = 1\n", "invalid constant type T")]
fn test_type_errors(#[case] body: &str, #[case] expected: &str) {
    let text = format!("package api\n\n{body}");
    let result = check_texts(&[&text]);
    let messages = messages(&result);
    assert!(
        messages.iter().any(|m| m == expected),
        "expected {expected:?} in {messages:?}"
    );
}

#[test]
fn test_pointer_recursion_is_allowed() {
    let result = check_texts(&["package api\n\ntype Node struct {\n\tNext *Node\n\tKids []Node\n}\n"]);
    assert!(result.errors.is_empty(), "{:?}", messages(&result));
}

#[test]
fn test_failed_import_does_not_cascade() {
    let result = check_texts(&[
        "package api\n\nimport \"example.com/missing\"\n\ntype T struct {\n\tA missing.Thing\n}\n",
    ]);
    let messages = messages(&result);
    assert_eq!(messages.len(), 1, "{messages:?}");
    assert!(messages[0].starts_with("could not import example.com/missing ("));
    assert_eq!(result.imports, vec![SmolStr::new("example.com/missing")]);
}

#[test]
fn test_declarations_span_files() {
    let result = check_texts(&[
        "package api\n\ntype A struct {\n\tB B\n}\n",
        "package api\n\ntype B int\n",
    ]);
    assert!(result.errors.is_empty(), "{:?}", messages(&result));
    assert_eq!(result.types.len(), 2);
}

#[test]
fn test_type_table_records_named_references() {
    let text = "package api\n\ntype A int\n\ntype B struct {\n\tX A\n\tY string\n}\n";
    let result = check_texts(&[text]);
    let at = |needle: &str, len: u32| {
        let start = text.rfind(needle).unwrap() as u32;
        TextRange::at(TextSize::new(start), TextSize::new(len))
    };
    let a = &result.types[0][&at("A\n\tY", 1)].ty;
    assert_eq!(a, &Ty::Named(result.surface.named("A")));
    let string = &result.types[0][&at("string", 6)];
    assert!(string.is_type());
    assert_eq!(string.ty, Ty::Basic(BasicKind::String));
}

// ============================================================================
// TAGS
// ============================================================================

fn tag_messages(doc: &str) -> Vec<String> {
    let text = format!(
        "package api\n\nimport \"example.com/http\"\n\ntype Status int\n\nconst Active Status = 1\n\ntype S interface {{\n{doc}\tGet()\n}}\n"
    );
    messages(&check_texts(&[&text]))
}

#[test]
fn test_valid_tag_records_its_type() {
    let text = "package api\n\nimport \"example.com/http\"\n\ntype S interface {\n\t// +gunk http.Match{\n\t//     Method: \"GET\",\n\t//     Path:   \"/v1\",\n\t// }\n\tGet()\n}\n";
    let result = check_texts(&[text]);
    assert!(result.errors.is_empty(), "{:?}", messages(&result));
    let (_, tags) = result.tags.iter().next().unwrap();
    let tv = tags[0].tv.as_ref().unwrap();
    assert_eq!(
        tv.ty.display("example.com/api").to_string(),
        "http.Match"
    );
}

#[rstest]
#[case::unknown_field("\t// +gunk http.Match{Verb: \"GET\"}\n", "unknown field Verb in struct literal of type http.Match")]
#[case::duplicate_field("\t// +gunk http.Match{Method: \"GET\", Method: \"PUT\"}\n", "duplicate field name Method in struct literal")]
#[case::mixture("\t// +gunk http.Match{Method: \"GET\", \"/v1\"}\n", "mixture of field:value and value elements in struct literal")]
#[case::not_assignable("\t// +gunk http.Match{Method: 1}\n", "cannot use 1 (untyped int constant) as string value in struct literal")]
#[case::too_few("\t// +gunk http.Match{\"GET\"}\n", "too few values in struct literal of type http.Match")]
#[case::invalid_literal_type("\t// +gunk Status{1}\n", "invalid composite literal type Status")]
#[case::map_missing_key("\t// +gunk map[string]int{1}\n", "missing key in map literal")]
#[case::map_duplicate_key("\t// +gunk map[string]int{\"a\": 1, \"a\": 2}\n", "duplicate key \"a\" in map literal")]
#[case::typed_constant("\t// +gunk []string{Active}\n", "cannot use Active (constant 1 of type Status) as string value in slice literal")]
#[case::type_as_value("\t// +gunk Status\n", "Status (type) is not an expression")]
fn test_tag_errors(#[case] doc: &str, #[case] expected: &str) {
    let messages = tag_messages(doc);
    assert!(
        messages.iter().any(|m| m == expected),
        "expected {expected:?} in {messages:?}"
    );
}

#[test]
fn test_tags_are_skipped_after_type_errors() {
    let messages = tag_messages("\t// +gunk http.Match{Verb: Undefined}\n\tBad(Missing)\n");
    assert_eq!(messages, vec!["undefined: Missing".to_string()]);
}

#[test]
fn test_tag_errors_use_tag_coordinates() {
    let result = check_texts(&["package api\n\n// +gunk Nope\ntype T int\n"]);
    let error = &result.errors[0];
    let CoordSpace::Tag(tag) = &error.space else {
        panic!("expected a tag-relative error, got {:?}", error.space);
    };
    assert_eq!(&tag.source.text[usize::from(error.at)..], "Nope");
}
