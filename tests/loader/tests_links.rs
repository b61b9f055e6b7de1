//! Link creation and resolution.

use melody::loader::{LoaderError, ModelLoader};
use rstest::rstest;

use crate::helpers::handlers::{by_id, load_model, load_with_library};

// ============================================================================
// Round trips
// ============================================================================

#[rstest]
#[case::same_fragment("e1", "f2", "#f2")]
#[case::into_fragment("p1", "c1", "la:Component frag/Part.capellafragment#c1")]
#[case::out_of_fragment("l1", "f1", "la:Function ../model.capella#f1")]
#[case::to_fragment_root("root", "fragroot", "core:Fragment frag/Part.capellafragment#fragroot")]
fn test_link_roundtrip(#[case] source: &str, #[case] target: &str, #[case] expected: &str) {
    let (loader, _) = load_model();
    let source = by_id(&loader, source);
    let target = by_id(&loader, target);

    let link = loader.create_link(source, target, None).unwrap();
    assert_eq!(link, expected);
    assert_eq!(loader.follow_link(Some(source), &link).unwrap(), target);
}

#[test]
fn test_type_hint_on_request() {
    let (loader, _) = load_model();
    let e1 = by_id(&loader, "e1");
    let f2 = by_id(&loader, "f2");
    let p1 = by_id(&loader, "p1");
    let c1 = by_id(&loader, "c1");

    let link = loader.create_link(e1, f2, Some(true)).unwrap();
    assert_eq!(link, "la:Function #f2");
    assert_eq!(loader.follow_link(Some(e1), &link).unwrap(), f2);

    let link = loader.create_link(p1, c1, Some(false)).unwrap();
    assert_eq!(link, "frag/Part.capellafragment#c1");
    assert_eq!(loader.follow_link(Some(p1), &link).unwrap(), c1);
}

#[test]
fn test_link_to_element_without_identifier() {
    let (loader, _) = load_model();
    let diagram = by_id(&loader, "d1");
    let target = loader.iterchildren(diagram, Some("target")).unwrap().next().unwrap();
    let err = loader.create_link(diagram, target, None).unwrap_err();
    assert!(matches!(err, LoaderError::MissingIdentifier(_)));
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_contradicting_type_hint_is_broken() {
    let (loader, _) = load_model();
    let p1 = by_id(&loader, "p1");
    let err = loader
        .follow_link(Some(p1), "la:Exchange frag/Part.capellafragment#c1")
        .unwrap_err();
    assert!(matches!(err, LoaderError::BrokenLink(_)));
}

#[test]
fn test_link_relative_to_entrypoint() {
    let (loader, _) = load_model();
    let c1 = by_id(&loader, "c1");
    assert_eq!(loader.follow_link(None, "frag/Part.capellafragment#c1").unwrap(), c1);
    assert!(loader.follow_link(None, "../frag/Part.capellafragment#c1").is_err());
}

#[rstest]
#[case("f1 missing f2")]
#[case("#f1 frag/Part.capellafragment#missing #f2")]
#[case("la:Function #f1 la:Exchange #f2 #f2")]
fn test_follow_links_ignoring_broken(#[case] links: &str) {
    let (loader, _) = load_model();
    let root = by_id(&loader, "root");
    let expected = vec![by_id(&loader, "f1"), by_id(&loader, "f2")];

    assert_eq!(loader.follow_links(Some(root), links, true).unwrap(), expected);
    let err = loader.follow_links(Some(root), links, false).unwrap_err();
    assert!(matches!(err, LoaderError::BrokenLink(_)));
}

#[test]
fn test_follow_links_keeps_order() {
    let (loader, _) = load_model();
    let resolved = loader.follow_links(None, "f2 c1 f1", false).unwrap();
    let expected = vec![by_id(&loader, "f2"), by_id(&loader, "c1"), by_id(&loader, "f1")];
    assert_eq!(resolved, expected);
}

// ============================================================================
// Across resources
// ============================================================================

const LIBRARY: &str =
    r#"<core:Library xmlns:core="urn:core" id="lib"><item id="li" ref="model.capella#f1"/></core:Library>"#;

#[test]
fn test_link_from_library_into_main_resource() {
    let loader = load_with_library(LIBRARY);
    let li = by_id(&loader, "li");
    let root = by_id(&loader, "root");

    let link = loader.create_link(li, root, None).unwrap();
    assert!(link.ends_with("model.capella#root"));
    assert!(!link.contains("platform:"));
    assert_eq!(loader.follow_link(Some(li), &link).unwrap(), root);
}

#[test]
fn test_link_from_main_resource_into_library() {
    let loader = load_with_library(LIBRARY);
    let root = by_id(&loader, "root");
    let li = by_id(&loader, "li");

    let link = loader.create_link(root, li, None).unwrap();
    assert!(link.ends_with("platform:/resource/lib/lib.capella#li"));
    assert_eq!(loader.follow_link(Some(root), &link).unwrap(), li);
}

#[test]
fn test_library_reference_into_main_resource_resolves() {
    let loader = load_with_library(LIBRARY);
    let li = by_id(&loader, "li");
    assert_eq!(loader.trees().count(), 5);
    assert_eq!(
        loader.follow_link(Some(li), "model.capella#f1").unwrap(),
        by_id(&loader, "f1")
    );
}
