use gunkls::server::{PublishDiagnostics, Server};
use gunkls::{Config, Diagnostic, Position, Severity};
use serde_json::json;

use crate::helpers::Workspace;

fn server(ws: &Workspace, config: Config) -> Server {
    let server = Server::new(config);
    server.initialize(&ws.root()).unwrap();
    server
}

fn for_file<'a>(published: &'a [PublishDiagnostics], ws: &Workspace, rel: &str) -> Vec<&'a Diagnostic> {
    let file = ws.path(rel);
    published
        .iter()
        .filter(|p| p.file == file)
        .flat_map(|p| &p.diagnostics)
        .collect()
}

#[test]
fn test_duplicate_sequence_numbers_mark_both_fields() {
    let text = "package api\n\ntype T struct {\n\tA int `pb:\"2\"`\n\tB int `pb:\"2\"`\n}\n";
    let ws = Workspace::new(&[("api/api.gunk", text)]);
    let server = server(&ws, Config::default());

    let published = server.did_open(&ws.path("api/api.gunk"), text.to_string());
    let found = for_file(&published, &ws, "api/api.gunk");
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|d| d.message == "sequence number \"2\" seen twice"));
    assert!(found.iter().all(|d| d.code == "validate error"));
    let lines: Vec<_> = found.iter().map(|d| d.range.start.line).collect();
    assert_eq!(lines, vec![3, 4]);

    // validation errors do not block formatting
    assert!(server.formatting(&ws.path("api/api.gunk")).unwrap().is_empty());
}

#[test]
fn test_initialization_options_enable_lint() {
    let text = "package api\n\n// Thing is a thing.\ntype Thing struct {\n\tName string `pb:\"1\"`\n}\n\n// a widget.\ntype Widget int\n";
    let ws = Workspace::new(&[("api/api.gunk", text)]);
    let config = Config::from_options(Some(json!({ "lint": true })));
    let server = server(&ws, config);

    let published = server.did_open(&ws.path("api/api.gunk"), text.to_string());
    let found = for_file(&published, &ws, "api/api.gunk");
    let messages: Vec<_> = found.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages, vec!["missing comment", "comment should start with 'Widget '"]);
    assert!(found.iter().all(|d| d.severity == Severity::Warning));
}

#[test]
fn test_requests_follow_open_documents() {
    let ws = Workspace::new(&[
        ("api/api.gunk", "package api\n\ntype T struct {\n\tA int `pb:\"1\"`\n}\n"),
        ("api/other.gunk", "package api\n\ntype U int\n"),
    ]);
    let server = server(&ws, Config::default());
    let file = ws.path("api/api.gunk");
    server.did_open(&file, ws.read("api/api.gunk"));

    // the edit is only in memory
    let edited = "package api\n\ntype T struct {\n\tA U\n}\n";
    server.did_change(&file, edited.to_string());
    let locations = server.definition(&file, Position::new(3, 3)).unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].file, ws.path("api/other.gunk"));

    let edits = server.formatting(&file).unwrap();
    assert_eq!(edits.len(), 1);
    assert!(edits[0].new_text.contains("A U `pb:\"1\"`"), "{}", edits[0].new_text);
}

#[test]
fn test_type_errors_block_requests() {
    let ws = Workspace::new(&[("api/api.gunk", "package api\n\ntype T Missing\n")]);
    let server = server(&ws, Config::default());
    let file = ws.path("api/api.gunk");
    let published = server.did_open(&file, ws.read("api/api.gunk"));
    assert_eq!(for_file(&published, &ws, "api/api.gunk")[0].message, "undefined: Missing");

    assert!(server.formatting(&file).is_err());
    assert!(server.definition(&file, Position::new(2, 8)).is_err());
}
