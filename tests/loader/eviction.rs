use gunkls::loader::Closed;
use rstest::rstest;

use crate::helpers::Workspace;

#[rstest]
#[case::by_directory(true)]
#[case::by_import_path(false)]
fn test_closing_only_file_behaves_as_never_opened(#[case] by_directory: bool) {
    let ws = Workspace::new(&[("a/a.gunk", "package a\n\ntype T int\n")]);
    ws.mkdir("fresh");
    let pattern = if by_directory {
        ws.path("fresh").to_string_lossy().into_owned()
    } else {
        Workspace::import_path("fresh")
    };

    let mut never_opened = ws.loader();
    let expected = never_opened.load(&pattern).unwrap();
    assert!(expected.is_empty());

    let mut loader = ws.loader();
    let file = ws.path("fresh/x.gunk");
    let pkg = loader
        .add_file(&file, "package fresh\n\ntype T Missing\n".to_string())
        .unwrap();
    assert!(loader.is_tracked(&pkg));
    assert!(!loader.errors(&pkg).is_empty());

    assert_eq!(loader.close_file(&file).unwrap(), Closed::Evicted(pkg.clone()));
    assert!(!loader.is_tracked(&pkg));
    assert!(loader.package(&pkg).is_none());
    assert_eq!(loader.load(&pattern).unwrap(), expected);
    assert!(loader.package(&pkg).is_none());
}

#[test]
fn test_closing_one_of_two_files_keeps_package() {
    let ws = Workspace::new(&[]);
    ws.mkdir("fresh");
    let mut loader = ws.loader();
    let first = ws.path("fresh/a.gunk");
    let second = ws.path("fresh/b.gunk");

    let pkg = loader.add_file(&first, "package fresh\n\ntype A int\n".to_string()).unwrap();
    assert_eq!(loader.add_file(&second, "package fresh\n\ntype B A\n".to_string()).unwrap(), pkg);
    loader.errors(&pkg);

    assert_eq!(loader.close_file(&first).unwrap(), Closed::Dirty(pkg.clone()));
    assert_eq!(loader.package(&pkg).unwrap().files, vec![second.clone()]);

    let diagnostics = loader.errors(&pkg);
    assert_eq!(diagnostics[&second][0].message, "undefined: A");
}
