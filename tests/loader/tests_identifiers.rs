//! Identifier reservation and explicit index maintenance.

use std::collections::HashSet;

use melody::loader::{FragmentPath, LoaderError, ModelLoader};
use melody::xml::QName;

use crate::helpers::handlers::{by_id, load_model};

#[test]
fn test_generated_identifiers_are_unique() {
    let (loader, _) = load_model();
    let root = by_id(&loader, "root");
    let reservations: Vec<_> = (0..200).map(|_| loader.new_uuid(root, None).unwrap()).collect();
    let distinct: HashSet<&str> = reservations.iter().map(|r| r.as_str()).collect();
    assert_eq!(distinct.len(), reservations.len());
    assert!(reservations.iter().all(|r| r.len() == 36));
}

#[test]
fn test_wanted_identifier_is_reserved_until_dropped() {
    let (loader, _) = load_model();
    let root = by_id(&loader, "root");

    let guard = loader.new_uuid(root, Some("wanted")).unwrap();
    assert_eq!(&*guard, "wanted");
    let err = loader.new_uuid(root, Some("wanted")).unwrap_err();
    assert!(matches!(err, LoaderError::DuplicateIdentifier(id) if id == "wanted"));

    drop(guard);
    assert!(loader.new_uuid(root, Some("wanted")).is_ok());
}

#[test]
fn test_wanted_identifier_must_be_unused_and_valid() {
    let (loader, _) = load_model();
    let root = by_id(&loader, "root");

    // In use in another fragment.
    let err = loader.new_uuid(root, Some("c1")).unwrap_err();
    assert!(matches!(err, LoaderError::DuplicateIdentifier(_)));

    for bad in ["", "has space", "has#hash"] {
        let err = loader.new_uuid(root, Some(bad)).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidIdentifier(_)), "{bad:?} accepted");
    }
}

#[test]
fn test_reservation_released_on_early_exit() {
    fn insert_or_bail(loader: &melody::MelodyLoader, bail: bool) -> Result<(), LoaderError> {
        let root = by_id(loader, "root");
        let _id = loader.new_uuid(root, Some("scoped"))?;
        if bail {
            return Err(LoaderError::broken_link("aborted"));
        }
        Ok(())
    }

    let (loader, _) = load_model();
    assert!(insert_or_bail(&loader, true).is_err());
    assert!(insert_or_bail(&loader, false).is_ok());
}

#[test]
fn test_insert_with_reserved_identifier() {
    let (mut loader, _) = load_model();
    let f1 = by_id(&loader, "f1");
    let reservation = loader.new_uuid(f1, None).unwrap();
    let id = reservation.to_string();

    let path = FragmentPath::main("model.capella");
    let tree = loader.tree_mut(&path).unwrap();
    let doc = tree.document_mut();
    let node = doc.create_element(QName::local("ownedFunctions"));
    doc.set_attribute(node, "id", id.as_str()).unwrap();
    doc.append_child(f1.node, node).unwrap();
    let new = tree.element_ref(node);

    // Not resolvable until indexed.
    assert!(loader.follow_link(None, &id).is_err());
    loader.idcache_index(new).unwrap();
    drop(reservation);
    assert_eq!(loader.follow_link(None, &id).unwrap(), new);

    let tree = loader.tree_mut(&path).unwrap();
    tree.document_mut().detach(node).unwrap();
    loader.idcache_remove(new).unwrap();
    assert!(loader.follow_link(None, &id).is_err());
}

#[test]
fn test_index_rejects_identifier_from_other_fragment() {
    let (mut loader, _) = load_model();
    let root = by_id(&loader, "root");

    let path = FragmentPath::main("model.capella");
    let tree = loader.tree_mut(&path).unwrap();
    let doc = tree.document_mut();
    let node = doc.create_element(QName::local("ownedThings"));
    doc.set_attribute(node, "id", "c1").unwrap();
    doc.append_child(root.node, node).unwrap();
    let clash = tree.element_ref(node);

    let err = loader.idcache_index(clash).unwrap_err();
    assert!(matches!(err, LoaderError::DuplicateIdentifier(id) if id == "c1"));
    let c1 = loader.follow_link(None, "c1").unwrap();
    assert_ne!(c1, clash);
}

#[test]
fn test_rebuild_after_bulk_edit() {
    let (mut loader, _) = load_model();
    let f2 = by_id(&loader, "f2");

    let path = FragmentPath::main("model.capella");
    let doc = loader.tree_mut(&path).unwrap().document_mut();
    doc.set_attribute(f2.node, "id", "renamed").unwrap();
    assert!(loader.follow_link(None, "f2").is_ok());

    loader.idcache_rebuild();
    assert!(loader.follow_link(None, "f2").is_err());
    assert_eq!(loader.follow_link(None, "renamed").unwrap(), f2);
    assert!(!loader.is_corrupt());
}
