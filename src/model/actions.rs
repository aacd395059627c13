/*!
The typed actions that make up the transaction log.

A commit is a newline-delimited JSON file with one action per line; each
line is an object with exactly one top-level key naming the variant. A
checkpoint carries the same actions as parquet rows with one nullable group
per variant, of which exactly one is set. [Action::from_json] and
[Action::from_checkpoint_row] decode the two encodings.
*/

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use parquet::record::{Field, Row};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DeltaError, Result};

/// An action that mutates the table state when applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Action {
    /// A data file became live.
    #[serde(rename = "add")]
    Add(Add),
    /// A data file stopped being live.
    #[serde(rename = "remove")]
    Remove(Remove),
    /// The table metadata was declared or replaced.
    #[serde(rename = "metaData")]
    Metadata(Metadata),
    /// The reader/writer protocol requirements changed.
    #[serde(rename = "protocol")]
    Protocol(Protocol),
    /// An application writer recorded its last version.
    #[serde(rename = "txn")]
    Txn(Txn),
    /// A change-data-capture file was written.
    #[serde(rename = "cdc")]
    Cdc(Cdc),
    /// Free-form provenance for the commit.
    #[serde(rename = "commitInfo")]
    CommitInfo(CommitInfo),
}

impl Action {
    /// The wire name of the action variant.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Add(_) => "add",
            Action::Remove(_) => "remove",
            Action::Metadata(_) => "metaData",
            Action::Protocol(_) => "protocol",
            Action::Txn(_) => "txn",
            Action::Cdc(_) => "cdc",
            Action::CommitInfo(_) => "commitInfo",
        }
    }

    /// Parses one line of a commit file.
    ///
    /// The line must be a JSON object whose single top-level key names the
    /// action variant. An object with no keys is [DeltaError::NoAction];
    /// an unrecognized key is [DeltaError::UnknownAction].
    pub fn from_json(line: &str) -> Result<Action> {
        let envelope: serde_json::Map<String, Value> = serde_json::from_str(line)?;
        let (tag, body) = envelope.into_iter().next().ok_or(DeltaError::NoAction)?;
        match tag.as_str() {
            "add" => Ok(Action::Add(serde_json::from_value(body)?)),
            "remove" => Ok(Action::Remove(serde_json::from_value(body)?)),
            "metaData" => Ok(Action::Metadata(serde_json::from_value(body)?)),
            "protocol" => Ok(Action::Protocol(serde_json::from_value(body)?)),
            "txn" => Ok(Action::Txn(serde_json::from_value(body)?)),
            "cdc" => Ok(Action::Cdc(serde_json::from_value(body)?)),
            "commitInfo" => Ok(Action::CommitInfo(serde_json::from_value(body)?)),
            _ => Err(DeltaError::UnknownAction(tag)),
        }
    }

    /// Decodes one checkpoint row.
    ///
    /// The first non-null top-level group names the variant; its leaves are
    /// then looked up by name. A row with no non-null group is
    /// [DeltaError::NoAction].
    pub fn from_checkpoint_row(row: &Row) -> Result<Action> {
        let (tag, field) = row
            .get_column_iter()
            .find(|(_, field)| !matches!(field, Field::Null))
            .ok_or(DeltaError::NoAction)?;
        let group = match field {
            Field::Group(group) => group,
            other => {
                return Err(DeltaError::Decode(format!(
                    "checkpoint column {tag} holds {other:?}, expected a group"
                )))
            }
        };
        match tag.as_str() {
            "add" => Ok(Action::Add(Add::from_checkpoint_group(group)?)),
            "remove" => Ok(Action::Remove(Remove::from_checkpoint_group(group)?)),
            "metaData" => Ok(Action::Metadata(Metadata::from_checkpoint_group(group)?)),
            "protocol" => Ok(Action::Protocol(Protocol::from_checkpoint_group(group)?)),
            "txn" => Ok(Action::Txn(Txn::from_checkpoint_group(group)?)),
            "cdc" => Ok(Action::Cdc(Cdc::from_checkpoint_group(group)?)),
            // Provenance is only meaningful from commits; checkpoint rows
            // fold to an empty map.
            "commitInfo" => Ok(Action::CommitInfo(CommitInfo::default())),
            _ => Err(DeltaError::UnknownAction(tag.clone())),
        }
    }
}

/// An add action marks a data file as live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Add {
    /// Relative path of the file from the root of the table,
    /// percent-encoded.
    pub path: String,
    /// Size of the file in bytes.
    pub size: i64,
    /// Map of partition column name to value for this file.
    #[serde(default)]
    pub partition_values: HashMap<String, String>,
    /// Whether the file contains data changes. If false, the file is the
    /// result of a compaction or similar reorganisation.
    pub data_change: bool,
    /// When the file was last modified, in milliseconds since the epoch.
    pub modification_time: i64,
    /// Statistics about the data in the file, carried verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<String>,
    /// Additional information about the file.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl Add {
    /// The percent-decoded path of the file.
    pub fn path_decoded(&self) -> Result<String> {
        decode_path(&self.path)
    }

    fn from_checkpoint_group(row: &Row) -> Result<Add> {
        Ok(Add {
            path: required_str(row, "add", "path")?,
            size: required_long(row, "add", "size")?,
            partition_values: string_map(row, "add", "partitionValues")?,
            data_change: required_bool(row, "add", "dataChange")?,
            modification_time: required_long(row, "add", "modificationTime")?,
            stats: optional_str(row, "add", "stats")?,
            tags: string_map(row, "add", "tags")?,
        })
    }
}

/// A remove action is a tombstone: the named file is no longer live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Remove {
    /// Relative path of the file from the root of the table,
    /// percent-encoded.
    pub path: String,
    /// When the deletion occurred, in milliseconds since the epoch.
    /// Historical writers omit it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<i64>,
    /// Whether the removal represents a data change, as for [Add].
    pub data_change: bool,
    /// When true, the partition values, size and tags are expected to be
    /// present. Decoding tolerates their absence regardless.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_file_metadata: Option<bool>,
    /// Map of partition column name to value for this file.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub partition_values: HashMap<String, String>,
    /// Size of the file in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Additional information about the file.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl Remove {
    /// The percent-decoded path of the file.
    pub fn path_decoded(&self) -> Result<String> {
        decode_path(&self.path)
    }

    /// The deletion timestamp as a wall-clock instant.
    pub fn deletion_datetime(&self) -> Option<DateTime<Utc>> {
        self.deletion_timestamp
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
    }

    fn from_checkpoint_group(row: &Row) -> Result<Remove> {
        Ok(Remove {
            path: required_str(row, "remove", "path")?,
            deletion_timestamp: optional_long(row, "remove", "deletionTimestamp")?,
            data_change: required_bool(row, "remove", "dataChange")?,
            extended_file_metadata: optional_bool(row, "remove", "extendedFileMetadata")?,
            partition_values: string_map(row, "remove", "partitionValues")?,
            size: optional_long(row, "remove", "size")?,
            tags: string_map(row, "remove", "tags")?,
        })
    }
}

/// A metaData action declares or replaces the table metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Unique identifier of the table.
    pub id: String,
    /// User-provided name of the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// User-provided description of the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Format of the data files. Defaults to parquet.
    #[serde(default)]
    pub format: Format,
    /// The table schema as a nested JSON document, carried verbatim.
    pub schema_string: String,
    /// Ordered list of partition columns.
    #[serde(default)]
    pub partition_columns: Vec<String>,
    /// When the table was created, in milliseconds since the epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<i64>,
    /// Map of configuration key to value.
    #[serde(default)]
    pub configuration: HashMap<String, String>,
}

impl Metadata {
    fn from_checkpoint_group(row: &Row) -> Result<Metadata> {
        let format = match group_field(row, "format") {
            Some(Field::Group(format)) => Format {
                provider: required_str(format, "format", "provider")?,
                options: string_map(format, "format", "options")?,
            },
            _ => Format::default(),
        };
        Ok(Metadata {
            id: required_str(row, "metaData", "id")?,
            name: optional_str(row, "metaData", "name")?,
            description: optional_str(row, "metaData", "description")?,
            format,
            schema_string: required_str(row, "metaData", "schemaString")?,
            partition_columns: string_list(row, "metaData", "partitionColumns")?,
            created_time: optional_long(row, "metaData", "createdTime")?,
            configuration: string_map(row, "metaData", "configuration")?,
        })
    }
}

/// The file format of a table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Format {
    /// Name of the format provider.
    pub provider: String,
    /// Map of format option key to value.
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl Default for Format {
    fn default() -> Self {
        Format {
            provider: "parquet".to_string(),
            options: HashMap::new(),
        }
    }
}

/// A protocol action advertises the minimum reader and writer versions
/// required to correctly access the table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    /// Minimum version of the delta reader that can read this table.
    pub min_reader_version: i32,
    /// Minimum version of the delta writer that can write to this table.
    pub min_writer_version: i32,
    /// Features a client must implement to read this table. Present only
    /// for readers at version 3 or above.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reader_features: Option<Vec<String>>,
    /// Features a client must implement to write this table. Present only
    /// for writers at version 7 or above.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer_features: Option<Vec<String>>,
}

impl Protocol {
    fn from_checkpoint_group(row: &Row) -> Result<Protocol> {
        Ok(Protocol {
            min_reader_version: required_int(row, "protocol", "minReaderVersion")?,
            min_writer_version: required_int(row, "protocol", "minWriterVersion")?,
            reader_features: optional_string_list(row, "protocol", "readerFeatures")?,
            writer_features: optional_string_list(row, "protocol", "writerFeatures")?,
        })
    }
}

/// A txn action records the last version written by an application, used
/// by writers for idempotency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Txn {
    /// Unique identifier of the application that wrote the table.
    pub app_id: String,
    /// Application-specific version number.
    pub version: i64,
    /// When the transaction was recorded, in milliseconds since the epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
}

impl Txn {
    fn from_checkpoint_group(row: &Row) -> Result<Txn> {
        Ok(Txn {
            app_id: required_str(row, "txn", "appId")?,
            version: required_long(row, "txn", "version")?,
            last_updated: optional_long(row, "txn", "lastUpdated")?,
        })
    }
}

/// A cdc action references a change-data-capture file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cdc {
    /// Relative path of the file from the root of the table,
    /// percent-encoded.
    pub path: String,
    /// Map of partition column name to value for this file.
    #[serde(default)]
    pub partition_values: HashMap<String, String>,
    /// Size of the file in bytes.
    pub size: i64,
    /// Whether the file contains data changes.
    pub data_change: bool,
    /// Additional information about the file.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl Cdc {
    /// The percent-decoded path of the file.
    pub fn path_decoded(&self) -> Result<String> {
        decode_path(&self.path)
    }

    fn from_checkpoint_group(row: &Row) -> Result<Cdc> {
        Ok(Cdc {
            path: required_str(row, "cdc", "path")?,
            partition_values: string_map(row, "cdc", "partitionValues")?,
            size: required_long(row, "cdc", "size")?,
            data_change: required_bool(row, "cdc", "dataChange")?,
            tags: string_map(row, "cdc", "tags")?,
        })
    }
}

/// A commitInfo action carries free-form provenance for a commit. The map
/// is kept as decoded so that re-encoding does not change value types.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CommitInfo(
    /// The raw provenance map.
    pub serde_json::Map<String, Value>,
);

impl CommitInfo {
    /// When the commit was made, in milliseconds since the epoch.
    pub fn timestamp(&self) -> Option<i64> {
        self.0.get("timestamp").and_then(Value::as_i64)
    }

    /// The operation that produced the commit.
    pub fn operation(&self) -> Option<&str> {
        self.0.get("operation").and_then(Value::as_str)
    }
}

fn decode_path(path: &str) -> Result<String> {
    Ok(percent_decode_str(path)
        .decode_utf8()
        .map_err(|err| DeltaError::Decode(err.to_string()))?
        .into_owned())
}

fn group_field<'a>(row: &'a Row, name: &str) -> Option<&'a Field> {
    row.get_column_iter()
        .find(|(column, _)| column.as_str() == name)
        .map(|(_, field)| field)
}

fn long_value(field: &Field) -> Option<i64> {
    match field {
        Field::Long(value) => Some(*value),
        Field::TimestampMillis(value) => Some(*value),
        _ => None,
    }
}

fn required_str(row: &Row, group: &str, name: &str) -> Result<String> {
    match group_field(row, name) {
        Some(Field::Str(value)) => Ok(value.clone()),
        Some(other) => Err(decode_mismatch(group, name, "string", other)),
        None => Err(DeltaError::SchemaMismatch(format!("{group}.{name}"))),
    }
}

fn required_long(row: &Row, group: &str, name: &str) -> Result<i64> {
    match group_field(row, name) {
        Some(field) => {
            long_value(field).ok_or_else(|| decode_mismatch(group, name, "int64", field))
        }
        None => Err(DeltaError::SchemaMismatch(format!("{group}.{name}"))),
    }
}

fn required_int(row: &Row, group: &str, name: &str) -> Result<i32> {
    match group_field(row, name) {
        Some(Field::Int(value)) => Ok(*value),
        Some(other) => Err(decode_mismatch(group, name, "int32", other)),
        None => Err(DeltaError::SchemaMismatch(format!("{group}.{name}"))),
    }
}

fn required_bool(row: &Row, group: &str, name: &str) -> Result<bool> {
    match group_field(row, name) {
        Some(Field::Bool(value)) => Ok(*value),
        Some(other) => Err(decode_mismatch(group, name, "boolean", other)),
        None => Err(DeltaError::SchemaMismatch(format!("{group}.{name}"))),
    }
}

fn optional_str(row: &Row, group: &str, name: &str) -> Result<Option<String>> {
    match group_field(row, name) {
        Some(Field::Str(value)) => Ok(Some(value.clone())),
        Some(Field::Null) | None => Ok(None),
        Some(other) => Err(decode_mismatch(group, name, "string", other)),
    }
}

fn optional_long(row: &Row, group: &str, name: &str) -> Result<Option<i64>> {
    match group_field(row, name) {
        Some(Field::Null) | None => Ok(None),
        Some(field) => long_value(field)
            .map(Some)
            .ok_or_else(|| decode_mismatch(group, name, "int64", field)),
    }
}

fn optional_bool(row: &Row, group: &str, name: &str) -> Result<Option<bool>> {
    match group_field(row, name) {
        Some(Field::Bool(value)) => Ok(Some(*value)),
        Some(Field::Null) | None => Ok(None),
        Some(other) => Err(decode_mismatch(group, name, "boolean", other)),
    }
}

fn string_map(row: &Row, group: &str, name: &str) -> Result<HashMap<String, String>> {
    match group_field(row, name) {
        Some(Field::MapInternal(map)) => map
            .entries()
            .iter()
            .map(|(key, value)| match (key, value) {
                (Field::Str(key), Field::Str(value)) => Ok((key.clone(), value.clone())),
                (Field::Str(key), Field::Null) => Ok((key.clone(), String::new())),
                (key, value) => Err(DeltaError::Decode(format!(
                    "{group}.{name}: expected string entries, found ({key:?}, {value:?})"
                ))),
            })
            .collect(),
        Some(Field::Null) | None => Ok(HashMap::new()),
        Some(other) => Err(decode_mismatch(group, name, "map", other)),
    }
}

fn string_list(row: &Row, group: &str, name: &str) -> Result<Vec<String>> {
    Ok(optional_string_list(row, group, name)?.unwrap_or_default())
}

fn optional_string_list(row: &Row, group: &str, name: &str) -> Result<Option<Vec<String>>> {
    match group_field(row, name) {
        Some(Field::ListInternal(list)) => list
            .elements()
            .iter()
            .map(|element| match element {
                Field::Str(value) => Ok(value.clone()),
                other => Err(DeltaError::Decode(format!(
                    "{group}.{name}: expected string elements, found {other:?}"
                ))),
            })
            .collect::<Result<Vec<String>>>()
            .map(Some),
        Some(Field::Null) | None => Ok(None),
        Some(other) => Err(decode_mismatch(group, name, "list", other)),
    }
}

fn decode_mismatch(group: &str, name: &str, expected: &str, found: &Field) -> DeltaError {
    DeltaError::Decode(format!(
        "{group}.{name}: expected {expected}, found {found:?}"
    ))
}
