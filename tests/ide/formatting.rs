use gunkls::ide::format_document;
use gunkls::syntax::FormatConfig;
use gunkls::{Loader, TextEdit};
use rstest::rstest;

use crate::helpers::Workspace;

fn format(ws: &Workspace, loader: &mut Loader, text: &str) -> Vec<TextEdit> {
    let file = ws.path("api/api.gunk");
    loader.add_file(&file, text.to_string()).unwrap();
    format_document(loader, &file, &FormatConfig::default()).unwrap()
}

fn formatted(text: &str) -> String {
    let ws = Workspace::new(&[("api/api.gunk", text)]);
    let mut loader = ws.loader();
    let edits = format(&ws, &mut loader, text);
    match edits.as_slice() {
        [] => text.to_string(),
        [edit] => edit.new_text.clone(),
        _ => panic!("expected a single whole-file edit, got {edits:?}"),
    }
}

fn field_line(out: &str, name: &str) -> String {
    out.lines()
        .find(|l| l.trim_start().starts_with(&format!("{name} ")))
        .unwrap_or_else(|| panic!("no field {name} in\n{out}"))
        .to_string()
}

#[rstest]
#[case::fills_gaps_in_order(&["a", "b `pb:\"3\"`", "c", "d"], &[1, 3, 2, 4])]
#[case::keeps_existing(&["a `pb:\"2\"`", "b `pb:\"1\"`"], &[2, 1])]
#[case::all_untagged(&["a", "b", "c"], &[1, 2, 3])]
#[case::skips_high_numbers(&["a `pb:\"1\"`", "b", "c `pb:\"2\"`", "d"], &[1, 3, 2, 4])]
fn test_sequence_numbers(#[case] fields: &[&str], #[case] expected: &[u32]) {
    let body: String = fields
        .iter()
        .map(|f| {
            let (name, tag) = f.split_once(' ').unwrap_or((*f, ""));
            format!("\t{} int {tag}\n", name.to_uppercase())
        })
        .collect();
    let out = formatted(&format!("package api\n\ntype T struct {{\n{body}}}\n"));

    for (f, n) in fields.iter().zip(expected) {
        let name = f.split(' ').next().unwrap().to_uppercase();
        let line = field_line(&out, &name);
        assert!(line.contains(&format!("`pb:\"{n}\"`")), "{name} in {line:?}");
    }
}

#[rstest]
#[case::service("package api\n\n// S is a service.\ntype S interface {\n\t// Get gets.\n\tGet(Req) Resp\n}\n\ntype Req struct {\n\tID string\n}\n\ntype Resp struct {\n\tOK bool `pb:\"4\"`\n\tN int\n}\n")]
#[case::enum_consts("package api\n\ntype Status int\n\nconst (\n\tActive Status = iota\n\tClosed\n)\n")]
fn test_formatting_is_idempotent(#[case] text: &str) {
    let once = formatted(text);

    let ws = Workspace::new(&[("api/api.gunk", once.as_str())]);
    let mut loader = ws.loader();
    assert!(format(&ws, &mut loader, &once).is_empty());
}

#[test]
fn test_edit_covers_whole_file() {
    let text = "package api\n\ntype T struct {\n\tA int\n}\n";
    let ws = Workspace::new(&[("api/api.gunk", text)]);
    let mut loader = ws.loader();
    let edits = format(&ws, &mut loader, text);
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].range.start, gunkls::Position::new(0, 0));
    assert_eq!(edits[0].range.end, gunkls::Position::new(7, 0));
}
