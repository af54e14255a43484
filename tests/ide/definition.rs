use gunkls::ide::{DefinitionError, goto_definition};
use gunkls::{Location, Position, Span};
use rstest::rstest;

use crate::helpers::Workspace;

const API: &str = "package api\n\nimport (\n\t\"time\"\n\n\t\"example.com/m/common\"\n)\n\n// Event happened.\ntype Event struct {\n\tAt   time.Time `pb:\"1\"`\n\tKind common.Kind `pb:\"2\"`\n\tSeq  int `pb:\"3\"`\n\tIDs  []string `pb:\"4\"`\n}\n";

fn workspace() -> Workspace {
    Workspace::new(&[
        ("api/api.gunk", API),
        ("common/kind.gunk", "package common\n\n// Kind of event.\ntype Kind int\n"),
        ("common/values.gunk", "package common\n\nconst (\n\tA Kind = 1\n)\n"),
        ("common/doc.gunk", "// Package common holds shared types.\npackage common\n"),
    ])
}

#[test]
fn test_import_path_returns_one_location_per_file() {
    let ws = workspace();
    let mut loader = ws.loader();
    let file = ws.path("api/api.gunk");
    loader.add_file(&file, API.to_string()).unwrap();

    let locations = goto_definition(&mut loader, &file, Position::new(5, 5)).unwrap();
    assert_eq!(
        locations,
        vec![
            Location::new(ws.path("common/doc.gunk"), Span::from_coords(0, 0, 0, 0)),
            Location::new(ws.path("common/kind.gunk"), Span::from_coords(0, 0, 0, 0)),
            Location::new(ws.path("common/values.gunk"), Span::from_coords(0, 0, 0, 0)),
        ]
    );
}

#[test]
fn test_named_type_in_dependency() {
    let ws = workspace();
    let mut loader = ws.loader();
    let file = ws.path("api/api.gunk");
    loader.add_file(&file, API.to_string()).unwrap();

    let locations = goto_definition(&mut loader, &file, Position::new(11, 14)).unwrap();
    assert_eq!(
        locations,
        vec![Location::new(ws.path("common/kind.gunk"), Span::from_coords(3, 5, 3, 5))]
    );
}

#[rstest]
#[case::basic_type(12, 6)]
#[case::std_type(10, 12)]
#[case::slice(13, 6)]
fn test_invalid_targets(#[case] line: u32, #[case] character: u32) {
    let ws = workspace();
    let mut loader = ws.loader();
    let file = ws.path("api/api.gunk");
    loader.add_file(&file, API.to_string()).unwrap();

    let err = goto_definition(&mut loader, &file, Position::new(line, character)).unwrap_err();
    assert!(matches!(err, DefinitionError::InvalidTarget), "{err}");
}

#[test]
fn test_std_import_has_no_gunk_files() {
    let ws = workspace();
    let mut loader = ws.loader();
    let file = ws.path("api/api.gunk");
    loader.add_file(&file, API.to_string()).unwrap();

    let err = goto_definition(&mut loader, &file, Position::new(3, 3)).unwrap_err();
    assert!(matches!(err, DefinitionError::EmptyPackage(ref path) if path == "time"), "{err}");
}
