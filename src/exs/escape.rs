//! Character escaping as done by the Eclipse XMI serializer.
//!
//! All three positions share a base class of control characters. On top of
//! that, attribute values escape `"` `&` `<` and TAB, element text escapes
//! `"` `&` `<`, and comments escape only `>`.

use std::borrow::Cow;

/// Where a piece of text ends up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Attribute,
    Text,
    Comment,
}

fn is_base(c: char) -> bool {
    matches!(c, '\x00'..='\x08' | '\x0A'..='\x1F' | '\x7F')
}

fn needs_escape(c: char, position: Position) -> bool {
    is_base(c)
        || match position {
            Position::Attribute => matches!(c, '"' | '&' | '<' | '\t'),
            Position::Text => matches!(c, '"' | '&' | '<'),
            Position::Comment => c == '>',
        }
}

fn push_replacement(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("&quot;"),
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        other => {
            use std::fmt::Write;
            // Writing to a String cannot fail.
            let _ = write!(out, "&#x{:X};", other as u32);
        }
    }
}

/// Escape `text` for the given output position.
///
/// Borrows when nothing needs escaping.
pub fn escape(text: &str, position: Position) -> Cow<'_, str> {
    let Some(first) = text.find(|c| needs_escape(c, position)) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len() + 16);
    out.push_str(&text[..first]);
    for c in text[first..].chars() {
        if needs_escape(c, position) {
            push_replacement(&mut out, c);
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}
