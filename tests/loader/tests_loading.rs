//! Fragment discovery, classification and load failures.

use melody::filehandler::MemoryFileHandler;
use melody::loader::{
    FragmentPath, FragmentTree, FragmentType, LoaderError, LoaderState, MelodyLoader, ModelLoader,
};
use melody::xml::QName;

use crate::helpers::fixtures::{AIRD, CAPELLA, lines};
use crate::helpers::handlers::{load_model, load_with_library, memory_model};

#[test]
fn test_loads_all_referenced_fragments() {
    let (loader, _) = load_model();
    let paths: Vec<String> = loader.trees().map(|(path, _)| path.to_string()).collect();
    assert_eq!(
        paths,
        vec!["model.aird", "model.afm", "model.capella", "frag/Part.capellafragment"]
    );
    assert_eq!(loader.state(), LoaderState::Ready);
    assert!(!loader.is_corrupt());
}

#[test]
fn test_fragment_classification() {
    let (loader, _) = load_model();
    let types: Vec<FragmentType> = loader.trees().map(|(_, tree)| tree.fragment_type()).collect();
    assert_eq!(
        types,
        vec![
            FragmentType::Visual,
            FragmentType::Other,
            FragmentType::Semantic,
            FragmentType::Semantic,
        ]
    );
}

#[test]
fn test_qtype_index_per_fragment() {
    let (loader, _) = load_model();
    let tree = loader.tree(&FragmentPath::main("model.capella")).unwrap();
    let functions: Vec<_> = tree
        .iter_qtype(&QName::new("urn:la", "Function"))
        .filter_map(|n| tree.identifier(n))
        .collect();
    assert_eq!(functions, vec!["f1", "f2"]);
    assert!(tree.iter_qtypes().any(|q| q == &QName::new("urn:core", "Model")));
}

#[test]
fn test_entrypoint_must_be_a_diagram_file() {
    let err = MelodyLoader::new(memory_model(), "model.capella").unwrap_err();
    assert!(matches!(err, LoaderError::InvalidEntrypoint(_)));
}

#[test]
fn test_missing_fragment_is_an_io_error() {
    let files = MemoryFileHandler::new().with_file("model.aird", lines(AIRD));
    let err = MelodyLoader::new(files, "model.aird").unwrap_err();
    match err {
        LoaderError::Io { path, .. } => assert_eq!(path, "model.afm"),
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[test]
fn test_malformed_fragment_is_a_parse_error() {
    let files = memory_model();
    files.insert("model.capella", CAPELLA.replace("</core:Model>", ""));
    let err = MelodyLoader::new(files, "model.aird").unwrap_err();
    match err {
        LoaderError::ParseError { path, .. } => assert_eq!(path, "model.capella"),
        other => panic!("expected ParseError, got {other:?}"),
    }
}

#[test]
fn test_unknown_resource_is_skipped() {
    let files = memory_model();
    files.insert(
        "model.capella",
        CAPELLA.replace(
            r#"<ownedFragments href="frag/Part.capellafragment#fragroot"/>"#,
            r#"<ownedFragments href="frag/Part.capellafragment#fragroot"/>
  <ownedLibraries href="platform:/resource/missing/lib.capella#lib"/>"#,
        ),
    );
    let loader = MelodyLoader::new(files, "model.aird").unwrap();
    assert_eq!(loader.trees().count(), 4);
}

#[test]
fn test_additional_resource_is_loaded() {
    let loader = load_with_library(
        r#"<core:Library xmlns:core="urn:core" id="lib"><item id="li"/></core:Library>"#,
    );
    let lib = FragmentPath::new("lib", "lib.capella");
    assert!(loader.tree(&lib).is_some());
    assert_eq!(lib.to_string(), "platform:/resource/lib/lib.capella");

    let item = loader.follow_link(None, "li").unwrap();
    assert_eq!(loader.find_fragment(item).unwrap(), &lib);
}

#[test]
fn test_duplicate_identifiers_mark_model_corrupt() {
    let files = memory_model();
    files.insert("model.capella", CAPELLA.replace(r#"id="f2""#, r#"id="c1""#));
    let loader = MelodyLoader::new(files, "model.aird").unwrap();
    assert!(loader.is_corrupt());
}
