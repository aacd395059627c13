/*!
The last-checkpoint pointer.

`_delta_log/_last_checkpoint` is a small JSON document naming the most
recent checkpoint, so that a reader can seed its state from compacted
parquet instead of replaying the log from version 0.
*/

use serde::{Deserialize, Serialize};

use crate::paths::checkpoint_uris_from_version;

/// Describes the most recent checkpoint of a table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint {
    /// The table version the checkpoint captures.
    pub version: i64,
    /// Size in bytes of the checkpoint data.
    pub size: i64,
    /// Number of parts the checkpoint is split into. Zero or one means a
    /// single file; the field is commonly omitted for those.
    #[serde(default)]
    pub parts: i32,
}

impl Checkpoint {
    /// The URIs of the checkpoint's data files, in part order. Existence
    /// is not verified here; that is the store's concern.
    pub fn part_paths(&self) -> Vec<String> {
        checkpoint_uris_from_version(self.version, self.parts)
    }
}
