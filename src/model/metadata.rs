/*!
The resolved metadata of a table: the most recent metaData action with its
schema string parsed into a [StructType] tree.
*/

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{DeltaError, Result};
use crate::model::actions::{Format, Metadata};
use crate::model::schema::StructType;

/// Resolved table metadata, derived from the most recent metaData action
/// observed during replay.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    /// Unique identifier of the table.
    pub id: String,
    /// User-provided name of the table.
    pub name: Option<String>,
    /// User-provided description of the table.
    pub description: Option<String>,
    /// Format of the data files.
    pub format: Format,
    /// The table schema.
    pub schema: StructType,
    /// Ordered list of partition columns.
    pub partition_columns: Vec<String>,
    /// When the table was created, in milliseconds since the epoch.
    pub created_time: Option<i64>,
    /// Map of configuration key to value.
    pub configuration: HashMap<String, String>,
}

impl TableMetadata {
    /// Creates metadata for a new table with a fresh id and creation time.
    pub fn new(
        name: Option<String>,
        description: Option<String>,
        format: Format,
        schema: StructType,
        partition_columns: Vec<String>,
        configuration: HashMap<String, String>,
    ) -> Self {
        TableMetadata {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            format,
            schema,
            partition_columns,
            created_time: Some(Utc::now().timestamp_millis()),
            configuration,
        }
    }

    /// How long tombstones are kept before they may be vacuumed, from the
    /// `tombstoneRetentionDurationMillis` configuration key. Absent or
    /// unparseable values read as 0.
    pub fn tombstone_retention_millis(&self) -> i64 {
        self.config_i64("tombstoneRetentionDurationMillis")
    }

    /// How long expired log entries are kept, from the
    /// `logRetentionDurationMillis` configuration key. Absent or
    /// unparseable values read as 0.
    pub fn log_retention_millis(&self) -> i64 {
        self.config_i64("logRetentionDurationMillis")
    }

    /// Whether expired log entries may be cleaned up, from the
    /// `enableLogExpiredCleanup` configuration key. Absent or unparseable
    /// values read as false.
    pub fn enable_log_expired_cleanup(&self) -> bool {
        self.configuration
            .get("enableLogExpiredCleanup")
            .and_then(|value| value.parse().ok())
            .unwrap_or(false)
    }

    fn config_i64(&self, key: &str) -> i64 {
        self.configuration
            .get(key)
            .and_then(|value| value.parse().ok())
            .unwrap_or(0)
    }
}

impl TryFrom<&Metadata> for TableMetadata {
    type Error = DeltaError;

    fn try_from(action: &Metadata) -> Result<Self> {
        let schema: StructType = serde_json::from_str(&action.schema_string)?;
        Ok(TableMetadata {
            id: action.id.clone(),
            name: action.name.clone(),
            description: action.description.clone(),
            format: action.format.clone(),
            schema,
            partition_columns: action.partition_columns.clone(),
            created_time: action.created_time,
            configuration: action.configuration.clone(),
        })
    }
}
