//! JSON encoding of predictor responses.
//!
//! Responses use a fixed text layout that clients match on: `", "` between
//! items, `": "` between a key and its value, and every non-ASCII
//! character escaped as `\uXXXX`.

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use std::io;

#[derive(Clone, Copy, Debug, Default)]
pub struct SpacedAsciiFormatter;

impl SpacedAsciiFormatter {
    fn write_separator<W: ?Sized + io::Write>(writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }
}

impl Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        Self::write_separator(writer, first)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        Self::write_separator(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if ch.is_ascii() && ch != '\x7f' {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..idx])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

/// Serialize `value` in the response layout.
pub fn to_wire_string<T: ?Sized + Serialize>(value: &T) -> serde_json::Result<String> {
    let mut out = Vec::with_capacity(128);
    let mut serializer = Serializer::with_formatter(&mut out, SpacedAsciiFormatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(out).map_err(serde::ser::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::to_wire_string;
    use serde_json::json;

    #[test]
    fn separators_are_spaced() {
        let value = json!({"message": "hi", "items": [1, 2, null]});
        let encoded = to_wire_string(&value).unwrap();
        assert_eq!(encoded, r#"{"items": [1, 2, null], "message": "hi"}"#);
    }

    #[test]
    fn empty_containers() {
        assert_eq!(to_wire_string(&json!({})).unwrap(), "{}");
        assert_eq!(to_wire_string(&json!([])).unwrap(), "[]");
    }

    #[test]
    fn non_ascii_is_escaped() {
        let encoded = to_wire_string(&json!("café 👟")).unwrap();
        assert_eq!(encoded, r#""caf\u00e9 \ud83d\udc5f""#);
    }

    #[test]
    fn control_characters_are_escaped() {
        let encoded = to_wire_string(&json!("a\"b\\c\nd\u{7f}")).unwrap();
        assert_eq!(encoded, r#""a\"b\\c\nd\u007f""#);
    }

    #[test]
    fn output_parses_back() {
        let value = json!({"message": "Größe 42, passt?", "query": null});
        let encoded = to_wire_string(&value).unwrap();
        assert!(encoded.is_ascii());
        let decoded: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, value);
    }
}
