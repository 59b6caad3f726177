//! Record payload encoding
//!
//! Records go onto the broker in the conventional "spaced" JSON layout
//! (`{"a": 1, "b": [1, 2]}`) with non-ASCII characters and DEL escaped.
//! Numbers are written exactly as the feed sent them.

use std::io;

use bytes::Bytes;
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;

/// Initial capacity for the payload buffer (typical trade record is ~80 bytes)
const BUFFER_INITIAL_CAPACITY: usize = 128;

/// `", "` / `": "` separators, ASCII-only output
#[derive(Debug, Default, Clone, Copy)]
pub struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    #[inline]
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    #[inline]
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    #[inline]
    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let bytes = fragment.as_bytes();
        let mut start = 0;

        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() && ch != '\x7f' {
                continue;
            }
            writer.write_all(&bytes[start..i])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }

        writer.write_all(&bytes[start..])
    }
}

/// Serialize one record into its broker payload
pub fn to_payload(record: &Value) -> Result<Bytes, serde_json::Error> {
    let mut buffer = Vec::with_capacity(BUFFER_INITIAL_CAPACITY);
    let mut serializer = Serializer::with_formatter(&mut buffer, SpacedAsciiFormatter);
    record.serialize(&mut serializer)?;
    Ok(Bytes::from(buffer))
}
