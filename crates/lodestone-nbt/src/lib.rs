//! Named Binary Tag decoding and encoding.
//!
//! All multi-byte values are big-endian. A compound payload is a sequence of
//! (kind, name, payload) entries terminated by the end marker; a list payload
//! is an element kind, a count, and that many unnamed payloads.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::{self, Read, Write};

mod json;

pub use json::to_json;

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<Tag>),
    Compound(HashMap<String, Tag>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn kind(&self) -> u8 {
        match self {
            Tag::End => TAG_END,
            Tag::Byte(_) => TAG_BYTE,
            Tag::Short(_) => TAG_SHORT,
            Tag::Int(_) => TAG_INT,
            Tag::Long(_) => TAG_LONG,
            Tag::Float(_) => TAG_FLOAT,
            Tag::Double(_) => TAG_DOUBLE,
            Tag::ByteArray(_) => TAG_BYTE_ARRAY,
            Tag::String(_) => TAG_STRING,
            Tag::List(_) => TAG_LIST,
            Tag::Compound(_) => TAG_COMPOUND,
            Tag::IntArray(_) => TAG_INT_ARRAY,
            Tag::LongArray(_) => TAG_LONG_ARRAY,
        }
    }

    /// Reads one named tag: kind byte, name, payload. The end marker carries
    /// neither name nor payload.
    pub fn read_named<R: Read>(reader: &mut R) -> io::Result<(String, Tag)> {
        let kind = reader.read_u8()?;
        if kind == TAG_END {
            return Ok((String::new(), Tag::End));
        }
        let name = read_string(reader)?;
        let tag = Tag::read_payload(reader, kind)?;
        Ok((name, tag))
    }

    pub fn read_payload<R: Read>(reader: &mut R, kind: u8) -> io::Result<Tag> {
        match kind {
            TAG_END => Ok(Tag::End),
            TAG_BYTE => Ok(Tag::Byte(reader.read_i8()?)),
            TAG_SHORT => Ok(Tag::Short(reader.read_i16::<BigEndian>()?)),
            TAG_INT => Ok(Tag::Int(reader.read_i32::<BigEndian>()?)),
            TAG_LONG => Ok(Tag::Long(reader.read_i64::<BigEndian>()?)),
            TAG_FLOAT => Ok(Tag::Float(reader.read_f32::<BigEndian>()?)),
            TAG_DOUBLE => Ok(Tag::Double(reader.read_f64::<BigEndian>()?)),
            TAG_BYTE_ARRAY => {
                let length = read_length(reader)?;
                let mut raw = vec![0u8; length];
                reader.read_exact(&mut raw)?;
                Ok(Tag::ByteArray(raw.into_iter().map(|b| b as i8).collect()))
            }
            TAG_STRING => Ok(Tag::String(read_string(reader)?)),
            TAG_LIST => {
                let element_kind = reader.read_u8()?;
                let length = read_length(reader)?;
                if element_kind == TAG_END && length > 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "non-empty list with end-marker element kind",
                    ));
                }
                let mut items = Vec::with_capacity(length.min(4096));
                for _ in 0..length {
                    items.push(Tag::read_payload(reader, element_kind)?);
                }
                Ok(Tag::List(items))
            }
            TAG_COMPOUND => {
                let mut children = HashMap::new();
                loop {
                    let (name, tag) = Tag::read_named(reader)?;
                    if let Tag::End = tag {
                        break;
                    }
                    children.insert(name, tag);
                }
                Ok(Tag::Compound(children))
            }
            TAG_INT_ARRAY => {
                let length = read_length(reader)?;
                let mut values = Vec::with_capacity(length.min(4096));
                for _ in 0..length {
                    values.push(reader.read_i32::<BigEndian>()?);
                }
                Ok(Tag::IntArray(values))
            }
            TAG_LONG_ARRAY => {
                let length = read_length(reader)?;
                let mut values = Vec::with_capacity(length.min(4096));
                for _ in 0..length {
                    values.push(reader.read_i64::<BigEndian>()?);
                }
                Ok(Tag::LongArray(values))
            }
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown NBT tag kind: {}", other),
            )),
        }
    }

    pub fn write_named<W: Write>(&self, writer: &mut W, name: &str) -> io::Result<()> {
        writer.write_u8(self.kind())?;
        if !matches!(self, Tag::End) {
            write_string(writer, name)?;
        }
        self.write_payload(writer)
    }

    pub fn write_payload<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Tag::End => Ok(()),
            Tag::Byte(v) => writer.write_i8(*v),
            Tag::Short(v) => writer.write_i16::<BigEndian>(*v),
            Tag::Int(v) => writer.write_i32::<BigEndian>(*v),
            Tag::Long(v) => writer.write_i64::<BigEndian>(*v),
            Tag::Float(v) => writer.write_f32::<BigEndian>(*v),
            Tag::Double(v) => writer.write_f64::<BigEndian>(*v),
            Tag::ByteArray(values) => {
                writer.write_i32::<BigEndian>(values.len() as i32)?;
                let raw: Vec<u8> = values.iter().map(|&b| b as u8).collect();
                writer.write_all(&raw)
            }
            Tag::String(v) => write_string(writer, v),
            Tag::List(items) => {
                let element_kind = items.first().map_or(TAG_END, Tag::kind);
                writer.write_u8(element_kind)?;
                writer.write_i32::<BigEndian>(items.len() as i32)?;
                for item in items {
                    item.write_payload(writer)?;
                }
                Ok(())
            }
            Tag::Compound(children) => {
                for (name, tag) in children {
                    tag.write_named(writer, name)?;
                }
                writer.write_u8(TAG_END)
            }
            Tag::IntArray(values) => {
                writer.write_i32::<BigEndian>(values.len() as i32)?;
                for &v in values {
                    writer.write_i32::<BigEndian>(v)?;
                }
                Ok(())
            }
            Tag::LongArray(values) => {
                writer.write_i32::<BigEndian>(values.len() as i32)?;
                for &v in values {
                    writer.write_i64::<BigEndian>(v)?;
                }
                Ok(())
            }
        }
    }

    /// Child of a compound tag by name.
    pub fn get(&self, name: &str) -> Option<&Tag> {
        match self {
            Tag::Compound(children) => children.get(name),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&HashMap<String, Tag>> {
        match self {
            Tag::Compound(children) => Some(children),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tag]> {
        match self {
            Tag::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<&[i8]> {
        match self {
            Tag::ByteArray(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_long_array(&self) -> Option<&[i64]> {
        match self {
            Tag::LongArray(values) => Some(values),
            _ => None,
        }
    }

    /// Any integral tag widened to i64. Decoders use this where the format
    /// stores the same field as Byte in one version and Int in another
    /// (section Y, block-entity coordinates).
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Tag::Byte(v) => Some(*v as i64),
            Tag::Short(v) => Some(*v as i64),
            Tag::Int(v) => Some(*v as i64),
            Tag::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Tag::Float(v) => Some(*v as f64),
            Tag::Double(v) => Some(*v),
            _ => None,
        }
    }
}

fn read_length<R: Read>(reader: &mut R) -> io::Result<usize> {
    let length = reader.read_i32::<BigEndian>()?;
    if length < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("negative NBT length: {}", length),
        ));
    }
    Ok(length as usize)
}

fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let length = reader.read_u16::<BigEndian>()? as usize;
    let mut raw = vec![0u8; length];
    reader.read_exact(&mut raw)?;
    String::from_utf8(raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    let length = u16::try_from(value.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("string of {} bytes exceeds the NBT limit", value.len()),
        )
    })?;
    writer.write_u16::<BigEndian>(length)?;
    writer.write_all(value.as_bytes())
}

/// A complete NBT document: one named root tag, usually a compound.
#[derive(Debug, Clone, PartialEq)]
pub struct NbtFile {
    pub name: String,
    pub root: Tag,
}

impl NbtFile {
    pub fn new(name: String, root: Tag) -> Self {
        NbtFile { name, root }
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let (name, root) = Tag::read_named(reader)?;
        Ok(NbtFile { name, root })
    }

    pub fn read_gzip<R: Read>(reader: &mut R) -> io::Result<Self> {
        Self::read(&mut GzDecoder::new(reader))
    }

    /// Decodes a buffer that may or may not be gzip-compressed, sniffing the
    /// gzip magic. Level and player data on disk are gzipped; chunk payloads
    /// arrive already decompressed from the region reader.
    pub fn read_sniffed(data: &[u8]) -> io::Result<Self> {
        if data.starts_with(&[0x1f, 0x8b]) {
            Self::read_gzip(&mut io::Cursor::new(data))
        } else {
            Self::read(&mut io::Cursor::new(data))
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.root.write_named(writer, &self.name)
    }

    pub fn write_gzip<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        self.write(&mut encoder)?;
        encoder.finish()?;
        Ok(())
    }

    /// Encodes to a plain (uncompressed) byte buffer.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Cursor;

    fn roundtrip(tag: Tag, name: &str) -> (String, Tag) {
        let mut buf = Vec::new();
        tag.write_named(&mut buf, name).unwrap();
        Tag::read_named(&mut Cursor::new(buf)).unwrap()
    }

    #[test]
    fn test_primitive_roundtrips() {
        for (tag, name) in [
            (Tag::Byte(-5), "byte"),
            (Tag::Short(-12345), "short"),
            (Tag::Int(0x1234_5678), "int"),
            (Tag::Long(-9_876_543_210), "long"),
            (Tag::Float(1.5), "float"),
            (Tag::Double(-2.25), "double"),
            (Tag::ByteArray(vec![-1, 0, 1, 127]), "bytes"),
            (Tag::String("Hellö, Welt".to_owned()), "string"),
            (Tag::IntArray(vec![i32::MIN, 0, i32::MAX]), "ints"),
            (Tag::LongArray(vec![i64::MIN, 0, i64::MAX]), "longs"),
        ] {
            let (read_name, read_tag) = roundtrip(tag.clone(), name);
            assert_eq!(read_name, name);
            assert_eq!(read_tag, tag);
        }
    }

    #[test]
    fn test_nested_compound_roundtrip() {
        let mut section = HashMap::new();
        section.insert("Y".to_owned(), Tag::Byte(4));
        section.insert(
            "BlockStates".to_owned(),
            Tag::LongArray(vec![0x0123_4567_89ab_cdef, -1]),
        );
        let mut root = HashMap::new();
        root.insert("DataVersion".to_owned(), Tag::Int(2566));
        root.insert(
            "Sections".to_owned(),
            Tag::List(vec![Tag::Compound(section)]),
        );
        let tag = Tag::Compound(root);
        let (_, read_tag) = roundtrip(tag.clone(), "");
        assert_eq!(read_tag, tag);
    }

    #[test]
    fn test_empty_list_roundtrip() {
        let (_, read_tag) = roundtrip(Tag::List(vec![]), "empty");
        assert_eq!(read_tag, Tag::List(vec![]));
    }

    #[test]
    fn test_oversized_string_fails_to_encode() {
        let tag = Tag::String("x".repeat(65536));
        let err = tag.write_payload(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        // At the limit it still encodes.
        assert!(Tag::String("x".repeat(65535))
            .write_payload(&mut Vec::new())
            .is_ok());
    }

    #[test]
    fn test_unknown_kind_is_error() {
        let err = Tag::read_payload(&mut Cursor::new(vec![0u8; 8]), 42).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_stream_is_error() {
        // Int payload with only two bytes available.
        let err = Tag::read_payload(&mut Cursor::new(vec![0u8, 1]), 3).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_negative_length_is_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(-3i32).to_be_bytes());
        let err = Tag::read_payload(&mut Cursor::new(buf), TAG_BYTE_ARRAY).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_int_coercion() {
        assert_eq!(Tag::Byte(4).as_int(), Some(4));
        assert_eq!(Tag::Int(-3).as_int(), Some(-3));
        assert_eq!(Tag::Long(1 << 40).as_int(), Some(1 << 40));
        assert_eq!(Tag::String("4".to_owned()).as_int(), None);
    }

    #[test]
    fn test_file_roundtrip_plain_and_gzip() {
        let mut children = HashMap::new();
        children.insert("name".to_owned(), Tag::String("fixture".to_owned()));
        children.insert("value".to_owned(), Tag::Int(42));
        let original = NbtFile::new("Data".to_owned(), Tag::Compound(children));

        let plain = original.to_bytes().unwrap();
        assert_eq!(NbtFile::read_sniffed(&plain).unwrap(), original);

        let mut gzipped = Vec::new();
        original.write_gzip(&mut gzipped).unwrap();
        assert!(gzipped.starts_with(&[0x1f, 0x8b]));
        assert_eq!(NbtFile::read_sniffed(&gzipped).unwrap(), original);
    }

    #[test]
    fn test_read_named_end_marker() {
        let (name, tag) = Tag::read_named(&mut Cursor::new(vec![0u8])).unwrap();
        assert_eq!(name, "");
        assert_matches!(tag, Tag::End);
    }
}
