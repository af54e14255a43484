use gunkls::PackageState;

use crate::helpers::Workspace;

const A: &str = "package a\n\n// T is a thing.\ntype T struct {\n\tName string `pb:\"1\"`\n}\n";
const B: &str = "package b\n\nimport \"example.com/m/a\"\n\n// +gunk a.T{Name: \"x\"}\ntype U int\n\ntype V a.T\n";

#[test]
fn test_renamed_field_surfaces_in_importer() {
    let ws = Workspace::new(&[("a/a.gunk", A), ("b/b.gunk", B)]);
    let mut loader = ws.loader();
    let a = Workspace::import_path("a");
    let b = Workspace::import_path("b");

    loader.add_file(&ws.path("a/a.gunk"), A.to_string()).unwrap();
    loader.add_file(&ws.path("b/b.gunk"), B.to_string()).unwrap();
    assert!(loader.errors(&a).values().all(Vec::is_empty));
    assert!(loader.errors(&b).values().all(Vec::is_empty));
    assert_eq!(loader.package(&b).unwrap().state, PackageState::Open);

    loader
        .update_file(&ws.path("a/a.gunk"), A.replace("Name", "Title"))
        .unwrap();
    assert_eq!(loader.package(&b).unwrap().state, PackageState::Dirty);
    let dirty: Vec<String> = loader.dirty().iter().map(|p| p.to_string()).collect();
    assert_eq!(dirty, vec![a.clone(), b.clone()]);

    loader.errors(&a);
    let diagnostics = loader.errors(&b);
    let found = &diagnostics[&ws.path("b/b.gunk")];
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].message, "unknown field Name in struct literal of type a.T");
    assert_eq!(found[0].code, "type error");
    // the tag sits on line 5 of b.gunk
    assert_eq!(found[0].range.start.line, 4);
}

#[test]
fn test_untracked_importer_is_not_dirtied() {
    let ws = Workspace::new(&[("a/a.gunk", A), ("b/b.gunk", B)]);
    let mut loader = ws.loader();
    let b = Workspace::import_path("b");

    loader.load(&b).unwrap();
    loader.ensure_checked(&b).unwrap();
    loader
        .update_file(&ws.path("a/a.gunk"), A.replace("Name", "Title"))
        .unwrap();

    assert_eq!(loader.package(&b).unwrap().state, PackageState::Untracked);
    assert!(!loader.dirty().iter().any(|p| p.as_str() == b));
}
