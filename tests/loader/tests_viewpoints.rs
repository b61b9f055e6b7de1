//! Viewpoint activation and model info.

use melody::filehandler::MemoryFileHandler;
use melody::loader::{CAPELLA_VIEWPOINT, LoaderBuilder, LoaderError, MAIN_RESOURCE, MelodyLoader, ModelLoader, SaveOptions};

use crate::helpers::fixtures::{AIRD, CAPELLA, FRAGMENT, lines};
use crate::helpers::handlers::{load_model, memory_model};

#[test]
fn test_model_info() {
    let (loader, _) = load_model();
    let info = loader.get_model_info();
    assert_eq!(info.entrypoint, "model.aird");
    assert_eq!(info.title.as_deref(), Some("model"));
    assert_eq!(info.url.as_deref(), Some("memory:"));
    assert_eq!(info.capella_version, "7.0.0");
    assert_eq!(info.viewpoints.get(CAPELLA_VIEWPOINT).map(String::as_str), Some("7.0.0"));
    assert_eq!(info.resources[MAIN_RESOURCE].kind, "memory");

    let json = info.to_json().unwrap();
    assert!(json.contains("\"capella_version\": \"7.0.0\""));
}

#[test]
fn test_activate_same_version_is_noop() {
    let (mut loader, _) = load_model();
    loader.activate_viewpoint(CAPELLA_VIEWPOINT, "7.0.0").unwrap();
    assert_eq!(loader.viewpoints().len(), 1);
}

#[test]
fn test_activate_conflicting_version() {
    let (mut loader, _) = load_model();
    let err = loader.activate_viewpoint(CAPELLA_VIEWPOINT, "6.1.0").unwrap_err();
    match err {
        LoaderError::ViewpointConflict { active, requested, .. } => {
            assert_eq!(active, "7.0.0");
            assert_eq!(requested, "6.1.0");
        }
        other => panic!("expected ViewpointConflict, got {other:?}"),
    }
}

#[test]
fn test_required_viewpoint_conflict_fails_load() {
    let err = LoaderBuilder::new(memory_model())
        .require_viewpoint(CAPELLA_VIEWPOINT, "5.0.0")
        .load("model.aird")
        .unwrap_err();
    assert!(matches!(err, LoaderError::ViewpointConflict { .. }));
}

#[test]
fn test_new_viewpoint_is_persisted() {
    let (mut loader, files) = load_model();
    loader.activate_viewpoint("org.example.extension", "1.2.0").unwrap();
    assert_eq!(loader.viewpoints().get("org.example.extension").map(String::as_str), Some("1.2.0"));

    loader.save(&SaveOptions::default()).unwrap();
    let afm = String::from_utf8(files.get("model.afm").unwrap()).unwrap();
    assert!(afm.contains("vpId=\"org.example.extension\""));

    let reloaded = MelodyLoader::new(files, "model.aird").unwrap();
    assert_eq!(reloaded.viewpoints().len(), 2);
    assert!(!reloaded.is_corrupt());
}

#[test]
fn test_viewpoints_without_metadata_fragment() {
    let aird = AIRD.replace("  <semanticResources>model.afm</semanticResources>\n", "");
    let files = MemoryFileHandler::new()
        .with_file("model.aird", lines(&aird))
        .with_file("model.capella", lines(CAPELLA))
        .with_file("frag/Part.capellafragment", lines(FRAGMENT));

    let mut loader = LoaderBuilder::new(files)
        .require_viewpoint("org.example.extension", "1.0.0")
        .load("model.aird")
        .unwrap();
    assert_eq!(loader.get_model_info().capella_version, "UNKNOWN");
    assert_eq!(loader.viewpoints().len(), 1);

    let err = loader.activate_viewpoint("org.example.extension", "2.0.0").unwrap_err();
    assert!(matches!(err, LoaderError::ViewpointConflict { .. }));
}
