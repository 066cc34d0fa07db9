//! XML entity decoding
//!
//! Handles the built-in entities (&lt; &gt; &amp; &quot; &apos;) and
//! numeric character references (&#123; &#x7B;). Uses Cow for
//! zero-copy when no references are present.

use memchr::memchr;
use std::borrow::Cow;

/// Decode a single entity reference body (the part between `&` and
/// `;`). Returns `None` for an unknown named entity; the caller
/// decides what to do with those (the document builder turns them
/// into entity reference nodes).
pub fn decode_entity(body: &str) -> Option<char> {
    match body {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => body.strip_prefix('#').and_then(decode_numeric),
    }
}

/// Decode a numeric character reference body, without the leading `#`.
fn decode_numeric(body: &str) -> Option<char> {
    let code = if let Some(hex) = body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        body.parse::<u32>().ok()?
    };
    char::from_u32(code)
}

/// Decode the entity references in an attribute value.
///
/// Returns `Borrowed` when no `&` is present (the common case).
/// Unknown named entities and malformed references are kept verbatim;
/// attribute values carry no entity reference nodes.
pub fn decode_text(input: &str) -> Cow<'_, str> {
    // Fast path: no references at all
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = memchr(b'&', rest.as_bytes()) {
        result.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match memchr(b';', rest.as_bytes()) {
            Some(semi) => {
                let body = &rest[1..semi];
                if let Some(c) = decode_entity(body) {
                    result.push(c);
                } else {
                    result.push_str(&rest[..semi + 1]);
                }
                rest = &rest[semi + 1..];
            }
            None => {
                // unterminated reference, keep the ampersand
                result.push('&');
                rest = &rest[1..];
            }
        }
    }
    result.push_str(rest);
    Cow::Owned(result)
}

/// True if `c` can start an XML name.
pub fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// True if `c` can continue an XML name.
pub fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_entities() {
        assert_eq!(decode_entity("lt"), Some('<'));
        assert_eq!(decode_entity("gt"), Some('>'));
        assert_eq!(decode_entity("amp"), Some('&'));
        assert_eq!(decode_entity("quot"), Some('"'));
        assert_eq!(decode_entity("apos"), Some('\''));
        assert_eq!(decode_entity("nbsp"), None);
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode_entity("#65"), Some('A'));
        assert_eq!(decode_entity("#x41"), Some('A'));
        assert_eq!(decode_entity("#x1F600"), Some('\u{1F600}'));
        assert_eq!(decode_entity("#"), None);
        assert_eq!(decode_entity("#xZZ"), None);
    }

    #[test]
    fn test_decode_text_zero_copy() {
        assert!(matches!(decode_text("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text("a &amp; b"), "a & b");
        assert_eq!(decode_text("&lt;tag&gt;"), "<tag>");
        assert_eq!(decode_text("x &unknown; y"), "x &unknown; y");
        assert_eq!(decode_text("dangling &"), "dangling &");
    }
}
