/*!
A table's schema is carried in the metaData action as a nested JSON
document. The top-level type is always a [StructType]; field types are
either [primitives](PrimitiveType) or the [Array](ArrayType),
[Map](MapType) and [Struct](StructType) composites.
*/

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// Primitive types within a schema.
pub enum PrimitiveType {
    /// The null type
    Null,
    /// True or false
    Bool,
    /// 8-bit signed integer
    Byte,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    /// 32-bit IEEE 754 floating point
    Float,
    /// 64-bit IEEE 754 floating point
    Double,
    /// Arbitrary-length character sequence
    String,
    /// Arbitrary-length byte array
    Binary,
    /// Calendar date without time or timezone
    Date,
    /// Microsecond-precision wall clock time
    Timestamp,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrimitiveType::Null => write!(f, "null"),
            PrimitiveType::Bool => write!(f, "bool"),
            PrimitiveType::Byte => write!(f, "byte"),
            PrimitiveType::Short => write!(f, "short"),
            PrimitiveType::Integer => write!(f, "integer"),
            PrimitiveType::Long => write!(f, "long"),
            PrimitiveType::Float => write!(f, "float"),
            PrimitiveType::Double => write!(f, "double"),
            PrimitiveType::String => write!(f, "string"),
            PrimitiveType::Binary => write!(f, "binary"),
            PrimitiveType::Date => write!(f, "date"),
            PrimitiveType::Timestamp => write!(f, "timestamp"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
/// A union type of all allowed schema types.
pub enum SchemaType {
    /// All the primitive types
    Primitive(PrimitiveType),
    /// An array type
    Array(ArrayType),
    /// A map type
    Map(MapType),
    /// A struct type
    Struct(StructType),
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchemaType::Primitive(primitive) => write!(f, "{}", primitive),
            SchemaType::Array(array) => write!(f, "array<{}>", array.element_type),
            SchemaType::Map(map) => write!(f, "map<{}, {}>", map.key_type, map.value_type),
            SchemaType::Struct(_) => write!(f, "struct"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename = "array", rename_all = "camelCase")]
/// An array of elements that all share one type.
pub struct ArrayType {
    /// The type of the array elements.
    pub element_type: Box<SchemaType>,
    /// Whether elements may be null.
    pub contains_null: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename = "map", rename_all = "camelCase")]
/// A map from keys of one type to values of another.
pub struct MapType {
    /// The type of the map keys.
    pub key_type: Box<SchemaType>,
    /// The type of the map values.
    pub value_type: Box<SchemaType>,
    /// Whether values may be null.
    pub value_contains_null: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename = "struct")]
/// A struct is a list of named, typed fields. A table schema is a struct.
pub struct StructType {
    /// The fields of the struct.
    pub fields: Vec<StructField>,
}

impl StructType {
    /// Looks a field up by name.
    pub fn get_field_by_name(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A single named field inside a [StructType].
pub struct StructField {
    /// The field name.
    pub name: String,
    /// The field type.
    #[serde(rename = "type")]
    pub data_type: SchemaType,
    /// Whether the field may be null.
    pub nullable: bool,
    /// Additional free-form information about the field.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}
