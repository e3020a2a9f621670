//! Projection of a tag tree into a JSON-serializable value.

use crate::Tag;
use serde_json::{Map, Number, Value};

/// Converts a tag tree to a generic JSON value.
///
/// Children with an empty name are "unnamed" (list elements, or compound
/// entries the format left nameless). A node with only unnamed children
/// projects as an array, a node with only named children as an object, and a
/// node mixing both as an object with the unnamed children gathered under the
/// reserved `"collection"` key. A node with no children at all projects as an
/// empty array. Byte arrays project as unsigned 0-255 values.
pub fn to_json(tag: &Tag) -> Value {
    match tag {
        Tag::End => Value::Null,
        Tag::Byte(v) => Value::Number((*v).into()),
        Tag::Short(v) => Value::Number((*v).into()),
        Tag::Int(v) => Value::Number((*v).into()),
        Tag::Long(v) => Value::Number((*v).into()),
        Tag::Float(v) => float_json(*v as f64),
        Tag::Double(v) => float_json(*v),
        Tag::String(s) => Value::String(s.clone()),
        Tag::ByteArray(values) => Value::Array(
            values.iter().map(|&b| Value::Number((b as u8).into())).collect(),
        ),
        Tag::IntArray(values) => {
            Value::Array(values.iter().map(|&v| Value::Number(v.into())).collect())
        }
        Tag::LongArray(values) => {
            Value::Array(values.iter().map(|&v| Value::Number(v.into())).collect())
        }
        Tag::List(items) => project_children(items.iter().map(|item| ("", item))),
        Tag::Compound(children) => {
            project_children(children.iter().map(|(name, tag)| (name.as_str(), tag)))
        }
    }
}

fn project_children<'a>(children: impl Iterator<Item = (&'a str, &'a Tag)>) -> Value {
    let mut named = Map::new();
    let mut unnamed = Vec::new();
    for (name, child) in children {
        let value = to_json(child);
        if name.is_empty() {
            unnamed.push(value);
        } else {
            named.insert(name.to_owned(), value);
        }
    }
    if named.is_empty() {
        Value::Array(unnamed)
    } else {
        if !unnamed.is_empty() {
            named.insert("collection".to_owned(), Value::Array(unnamed));
        }
        Value::Object(named)
    }
}

fn float_json(v: f64) -> Value {
    Number::from_f64(v).map_or(Value::Null, Value::Number)
}
