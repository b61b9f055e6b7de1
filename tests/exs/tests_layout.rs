//! Line wrapping, indentation and expanded tags.

use melody::exs::{LINESEP, SerializeError, SerializeOptions, serialize, write};
use melody::xml::{Document, QName, parse};
use rstest::rstest;

fn render(doc: &Document, line_length: usize) -> String {
    let options = SerializeOptions {
        line_length,
        ..Default::default()
    };
    String::from_utf8(serialize(doc, doc.root(), &options).unwrap()).unwrap()
}

fn lines(text: &str) -> String {
    text.replace('\n', LINESEP)
}

// ============================================================================
// Wrapping
// ============================================================================

#[rstest]
#[case::fits(80, "<element first=\"1\" second=\"2\" third=\"3\"/>\n")]
#[case::wraps_third(36, "<element first=\"1\" second=\"2\"\n    third=\"3\"/>\n")]
#[case::wraps_second(20, "<element first=\"1\"\n    second=\"2\"\n    third=\"3\"/>\n")]
#[case::first_stays(1, "<element first=\"1\"\n    second=\"2\"\n    third=\"3\"/>\n")]
fn test_line_wrap_threshold(#[case] line_length: usize, #[case] expected: &str) {
    let doc = parse(br#"<element first="1" second="2" third="3"/>"#).unwrap();
    assert_eq!(render(&doc, line_length), lines(expected));
}

#[test]
fn test_wrapped_attributes_indent_by_depth() {
    let doc = parse(br#"<a><b><c name="first" other="second"/></b></a>"#).unwrap();
    let expected = "<a>\n  <b>\n    <c name=\"first\"\n        other=\"second\"/>\n  </b>\n</a>\n";
    assert_eq!(render(&doc, 20), lines(expected));
}

#[test]
fn test_wrapped_output_parses_back() {
    let doc = parse(br#"<element first="1" second="2" third="3"/>"#).unwrap();
    let wrapped = render(&doc, 20);
    let again = parse(wrapped.as_bytes()).unwrap();
    assert_eq!(render(&again, 20), wrapped);
    assert_eq!(render(&again, 80), render(&doc, 80));
}

// ============================================================================
// Always-expanded tags
// ============================================================================

#[rstest]
#[case("bodies")]
#[case("semanticResources")]
fn test_always_expanded_tag_never_self_closes(#[case] tag: &str) {
    let mut doc = Document::new(QName::local("root"));
    let root = doc.root();
    let child = doc.create_element(QName::local(tag));
    doc.append_child(root, child).unwrap();

    let output = render(&doc, 80);
    assert_eq!(output, lines(&format!("<root>\n  <{tag}>\n  </{tag}>\n</root>\n")));
    assert!(!output.contains("/>"));
}

// ============================================================================
// Sinks and failures
// ============================================================================

#[test]
fn test_streaming_matches_buffer() {
    let doc = parse(br#"<r xmlns:x="urn:x"><x:a id="1">text</x:a><!--c--><bodies/></r>"#).unwrap();
    let options = SerializeOptions::document(80);

    let buffered = serialize(&doc, doc.root(), &options).unwrap();
    let mut streamed = Vec::new();
    write(&doc, doc.root(), &mut streamed, &options).unwrap();
    assert_eq!(streamed, buffered);
}

#[test]
fn test_invalid_tree_writes_nothing() {
    let mut doc = Document::new(QName::local("root"));
    let root = doc.root();
    let child = doc.create_element(QName::new("urn:undeclared", "child"));
    doc.append_child(root, child).unwrap();

    let mut sink = Vec::new();
    let err = write(&doc, root, &mut sink, &SerializeOptions::default()).unwrap_err();
    assert!(matches!(err, SerializeError::UnknownNamespace { .. }));
    assert!(sink.is_empty());
}
