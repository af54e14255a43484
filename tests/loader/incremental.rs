//! Incremental analysis must agree with a from-scratch reload of the same
//! final contents.

use std::collections::HashMap;
use std::path::PathBuf;

use gunkls::server::PublishDiagnostics;
use gunkls::{Config, Diagnostic, Server};
use indexmap::IndexMap;
use rstest::rstest;

use crate::helpers::Workspace;

const A: &str = "package a\n\n// T is a thing.\ntype T struct {\n\tName string `pb:\"1\"`\n}\n";
const A_RENAMED: &str = "package a\n\n// T is a thing.\ntype T struct {\n\tTitle string `pb:\"1\"`\n}\n";
const A_BROKEN: &str = "package a\n\n// T is a thing.\ntype T struct {\n";
const A_CYCLE: &str = "package a\n\nimport \"example.com/m/b\"\n\n// T is a thing.\ntype T struct {\n\tName string `pb:\"1\"`\n}\n\ntype W b.U\n";
const B: &str = "package b\n\nimport \"example.com/m/a\"\n\n// +gunk a.T{Name: \"x\"}\ntype U int\n";
const B_BROKEN: &str = "package b\n\nimport \"example.com/m/a\"\n\ntype U struct {\n";
const C: &str = "package c\n\nimport \"example.com/m/a\"\n\ntype V a.T\n";
const C_BAD: &str = "package c\n\nimport \"example.com/m/a\"\n\ntype V a.Missing\n";

#[derive(Clone, Copy, Debug)]
enum Op {
    Open(&'static str, &'static str),
    Change(&'static str, &'static str),
    Close(&'static str),
}

fn workspace() -> Workspace {
    let ws = Workspace::new(&[("a/a.gunk", A), ("b/b.gunk", B)]);
    ws.mkdir("c");
    ws
}

/// Latest diagnostics published for every file
fn collect(latest: &mut HashMap<PathBuf, Vec<Diagnostic>>, published: Vec<PublishDiagnostics>) {
    for p in published {
        latest.insert(p.file, p.diagnostics);
    }
}

fn run(ws: &Workspace, ops: &[Op]) -> (HashMap<PathBuf, Vec<Diagnostic>>, IndexMap<&'static str, &'static str>) {
    let server = Server::new(Config::default());
    server.initialize(&ws.root()).unwrap();
    let mut latest = HashMap::new();
    let mut open = IndexMap::new();
    for op in ops {
        let published = match *op {
            Op::Open(rel, text) => {
                open.insert(rel, text);
                server.did_open(&ws.path(rel), text.to_string())
            }
            Op::Change(rel, text) => {
                open.insert(rel, text);
                server.did_change(&ws.path(rel), text.to_string())
            }
            Op::Close(rel) => {
                open.shift_remove(rel);
                server.did_close(&ws.path(rel))
            }
        };
        collect(&mut latest, published);
    }
    (latest, open)
}

#[rstest]
#[case::rename_field_in_dependency(&[
    Op::Open("a/a.gunk", A),
    Op::Open("b/b.gunk", B),
    Op::Change("a/a.gunk", A_RENAMED),
])]
#[case::break_and_repair(&[
    Op::Open("b/b.gunk", B),
    Op::Change("b/b.gunk", B_BROKEN),
    Op::Change("b/b.gunk", B),
])]
#[case::close_reverts_to_disk(&[
    Op::Open("a/a.gunk", A),
    Op::Change("a/a.gunk", A_RENAMED),
    Op::Close("a/a.gunk"),
    Op::Open("b/b.gunk", B),
])]
#[case::in_memory_package(&[
    Op::Open("c/c.gunk", C_BAD),
    Op::Open("a/a.gunk", A),
    Op::Change("c/c.gunk", C),
    Op::Change("a/a.gunk", A_RENAMED),
])]
#[case::reopen_after_close(&[
    Op::Open("c/c.gunk", C_BAD),
    Op::Close("c/c.gunk"),
    Op::Open("c/c.gunk", C),
    Op::Open("b/b.gunk", B),
])]
#[case::dependency_parse_error_fixed(&[
    Op::Open("a/a.gunk", A_BROKEN),
    Op::Open("b/b.gunk", B),
    Op::Change("a/a.gunk", A),
])]
#[case::import_cycle_broken(&[
    Op::Open("a/a.gunk", A_CYCLE),
    Op::Open("b/b.gunk", B),
    Op::Change("a/a.gunk", A),
])]
fn test_incremental_matches_fresh_reload(#[case] ops: &[Op]) {
    let ws = workspace();
    let (incremental, open) = run(&ws, ops);

    let fresh_ops: Vec<_> = open.iter().map(|(rel, text)| Op::Open(*rel, *text)).collect();
    let (fresh, _) = run(&ws, &fresh_ops);

    for rel in open.keys() {
        let file = ws.path(rel);
        assert_eq!(
            incremental.get(&file),
            fresh.get(&file),
            "diagnostics for {rel} after {ops:?}"
        );
    }
}
