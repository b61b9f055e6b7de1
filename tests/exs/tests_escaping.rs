//! Escaping differs between attribute values, text and comments.

use melody::exs::{LINESEP, SerializeOptions, serialize};
use melody::xml::parse;
use rstest::rstest;

fn reserialize(input: &str) -> String {
    let doc = parse(input.as_bytes()).unwrap();
    let options = SerializeOptions {
        line_length: usize::MAX,
        siblings: Some(true),
        declare_encoding: false,
    };
    String::from_utf8(serialize(&doc, doc.root(), &options).unwrap()).unwrap()
}

// ============================================================================
// Same content, three positions
// ============================================================================

#[rstest]
#[case::attribute(r#"<p title="&#x9;&amp;Hello, &lt;&quot;World&quot;>!"/>{LF}"#)]
#[case::text("<p>\t&amp;Hello, &lt;&quot;World&quot;>!</p>{LF}")]
#[case::comment("{LF}<!--\t&Hello, <\"World\"&gt;!-->{LF}<p/>{LF}")]
fn test_escaping(#[case] template: &str) {
    let input = template.replace("{LF}", LINESEP);
    assert_eq!(reserialize(&input), input);
}

// ============================================================================
// Control characters
// ============================================================================

#[test]
fn test_control_characters_use_hex_references() {
    let input = format!("<p a=\"line&#xA;break\">del&#x7F;</p>{LINESEP}");
    let output = reserialize(&input);
    assert_eq!(output, input);

    // The re-parsed tree carries the raw characters.
    let doc = parse(output.as_bytes()).unwrap();
    let root = doc.element(doc.root()).unwrap();
    assert_eq!(root.get("a"), Some("line\nbreak"));
    assert_eq!(doc.text(doc.root()), Some("del\u{7F}"));
}

#[test]
fn test_escaping_is_idempotent() {
    let input = "<p a='tab\there' b=\"x > y\">a \"quoted\" &amp; 'single'</p><!--a > b-->";
    let once = reserialize(input);
    assert_eq!(reserialize(&once), once);
    assert!(once.contains("a=\"tab&#x9;here\" b=\"x > y\""));
    assert!(once.contains("<!--a &gt; b-->"));
}

// ============================================================================
// Whitespace and mixed content
// ============================================================================

#[rstest]
#[case::text_around_element("<p>a<b/>c</p>", "<p>a<b/>c</p>")]
#[case::nested_markup("<p>a<b><x/></b></p>", "<p>a<b>{LF}    <x/>{LF}  </b></p>")]
#[case::comment_after_text("<p>a<!--n--></p>", "<p>a<!--n--></p>")]
fn test_mixed_content_stays_inline(#[case] input: &str, #[case] expected: &str) {
    let once = reserialize(input);
    assert_eq!(once, format!("{}{LINESEP}", expected.replace("{LF}", LINESEP)));
    assert_eq!(reserialize(&once), once);
}

#[test]
fn test_escaped_line_break_survives() {
    let input = format!("<r>{LINESEP}  <bodies>&#xA;</bodies>{LINESEP}</r>{LINESEP}");
    let once = reserialize(&input);
    assert_eq!(once, input);
    assert_eq!(reserialize(&once), once);
}
