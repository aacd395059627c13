/*!
The folded view of a table at one version: live files, tombstones,
metadata, protocol and per-application transaction versions.

A [TableState] starts empty at version -1, is mutated by applying actions
one at a time, and absorbs per-commit states through [TableState::merge].
Merging is only meaningful in ascending version order because an add
observed after a tombstone resurrects the path.
*/

use std::collections::HashMap;

use bytes::Bytes;
use object_store::path::Path;
use object_store::ObjectStore;
use parquet::file::reader::FileReader;
use parquet::file::serialized_reader::SerializedFileReader;
use tracing::{debug, trace};

use crate::error::{DeltaError, Result};
use crate::model::actions::{Action, Add, CommitInfo, Remove};
use crate::model::checkpoint::Checkpoint;
use crate::model::metadata::TableMetadata;

/// The state of a delta table at a specific version.
#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    /// The commit version this state reflects. -1 for an empty table.
    pub version: i64,
    /// Live data files, in the order their add actions were observed.
    pub files: Vec<Add>,
    /// Tombstones keyed by file path, at most one per path.
    pub tombstones: HashMap<String, Remove>,
    /// Commit provenance, in observation order.
    pub commit_infos: Vec<CommitInfo>,
    /// Minimum version of the delta reader that can read this table.
    pub min_reader_version: i32,
    /// Minimum version of the delta writer that can write to this table.
    pub min_writer_version: i32,
    /// The most recently declared table metadata, if any.
    pub current_metadata: Option<TableMetadata>,
    /// Tombstone retention derived from the current metadata, in
    /// milliseconds. 0 when unconfigured.
    pub tombstone_retention_millis: i64,
    /// Log retention derived from the current metadata, in milliseconds.
    /// 0 when unconfigured.
    pub log_retention_millis: i64,
    /// Highest observed txn version per application id.
    pub app_transaction_version: HashMap<String, i64>,
}

impl TableState {
    /// Creates an empty state at the given version.
    pub fn new(version: i64) -> Self {
        TableState {
            version,
            files: Vec::new(),
            tombstones: HashMap::new(),
            commit_infos: Vec::new(),
            min_reader_version: 1,
            min_writer_version: 1,
            current_metadata: None,
            tombstone_retention_millis: 0,
            log_retention_millis: 0,
            app_transaction_version: HashMap::new(),
        }
    }

    /// Builds the state of a single commit by applying its actions in
    /// order.
    pub fn from_actions(actions: Vec<Action>, version: i64) -> Result<Self> {
        let mut state = TableState::new(version);
        for action in actions {
            state.apply(action, true, true)?;
        }
        Ok(state)
    }

    /// Seeds a state from a checkpoint by folding every part.
    pub(crate) async fn from_checkpoint(
        storage: &dyn ObjectStore,
        checkpoint: &Checkpoint,
    ) -> Result<Self> {
        let paths = checkpoint.part_paths();
        debug!(
            version = checkpoint.version,
            num_parts = paths.len(),
            "loading checkpoint"
        );
        let mut state = TableState::new(checkpoint.version);
        for uri in paths {
            let data = match storage.get(&Path::from(uri.as_str())).await {
                Ok(result) => result.bytes().await?,
                Err(object_store::Error::NotFound { .. }) => {
                    return Err(DeltaError::CheckpointIncomplete(uri))
                }
                Err(err) => return Err(err.into()),
            };
            state.apply_checkpoint_part(data)?;
        }
        Ok(state)
    }

    /// Applies one checkpoint part: every parquet row decodes to an action
    /// which is folded into this state with both require flags set.
    pub fn apply_checkpoint_part(&mut self, data: Bytes) -> Result<()> {
        let reader = SerializedFileReader::new(data)?;
        for row in reader.get_row_iter(None)? {
            let action = Action::from_checkpoint_row(&row?)?;
            self.apply(action, true, true)?;
        }
        Ok(())
    }

    /// Applies a single action to the state.
    ///
    /// `require_files` and `require_tombstones` let callers that only need
    /// metadata skip retaining adds and removes respectively.
    pub fn apply(
        &mut self,
        action: Action,
        require_files: bool,
        require_tombstones: bool,
    ) -> Result<()> {
        trace!(action = action.name(), version = self.version, "applying action");
        match action {
            Action::Add(add) => {
                if require_files {
                    self.files.push(add);
                }
            }
            Action::Remove(remove) => {
                if require_tombstones {
                    self.tombstones.insert(remove.path.clone(), remove);
                }
            }
            Action::Metadata(declared) => {
                let metadata = TableMetadata::try_from(&declared)?;
                self.tombstone_retention_millis = metadata.tombstone_retention_millis();
                self.log_retention_millis = metadata.log_retention_millis();
                self.current_metadata = Some(metadata);
            }
            Action::Protocol(protocol) => {
                self.min_reader_version = protocol.min_reader_version;
                self.min_writer_version = protocol.min_writer_version;
            }
            Action::Txn(txn) => {
                let version = self
                    .app_transaction_version
                    .entry(txn.app_id)
                    .or_insert(txn.version);
                if txn.version > *version {
                    *version = txn.version;
                }
            }
            Action::CommitInfo(info) => self.commit_infos.push(info),
            // change files are not tracked
            Action::Cdc(_) => {}
        }
        Ok(())
    }

    /// Merges the state of a later commit into this one.
    ///
    /// The caller must feed states in ascending version order: a tombstone
    /// drops any earlier add for the same path, and a later add resurrects
    /// a tombstoned path. The tracked version only moves forward.
    pub fn merge(&mut self, other: TableState, require_files: bool, require_tombstones: bool) {
        if !other.tombstones.is_empty() {
            self.files
                .retain(|add| !other.tombstones.contains_key(&add.path));
        }

        if require_tombstones && require_files {
            self.tombstones.extend(other.tombstones);
            for add in &other.files {
                self.tombstones.remove(&add.path);
            }
        }

        if require_files {
            self.files.extend(other.files);
        }

        if other.min_reader_version > 0 {
            self.min_reader_version = other.min_reader_version;
            self.min_writer_version = other.min_writer_version;
        }

        if other.current_metadata.is_some() {
            self.tombstone_retention_millis = other.tombstone_retention_millis;
            self.log_retention_millis = other.log_retention_millis;
            self.current_metadata = other.current_metadata;
        }

        for (app_id, version) in other.app_transaction_version {
            let current = self
                .app_transaction_version
                .entry(app_id)
                .or_insert(version);
            if version > *current {
                *current = version;
            }
        }

        self.commit_infos.extend(other.commit_infos);

        if self.version < other.version {
            self.version = other.version;
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use proptest::prelude::*;

    use crate::model::actions::Txn;

    use super::*;

    fn add(path: &str) -> Action {
        Action::Add(Add {
            path: path.to_string(),
            size: 262,
            partition_values: HashMap::new(),
            data_change: true,
            modification_time: 1587968586000,
            stats: None,
            tags: HashMap::new(),
        })
    }

    fn remove(path: &str) -> Action {
        Action::Remove(Remove {
            path: path.to_string(),
            deletion_timestamp: Some(1587968596000),
            data_change: true,
            extended_file_metadata: None,
            partition_values: HashMap::new(),
            size: None,
            tags: HashMap::new(),
        })
    }

    fn txn(app_id: &str, version: i64) -> Action {
        Action::Txn(Txn {
            app_id: app_id.to_string(),
            version,
            last_updated: None,
        })
    }

    fn metadata() -> Action {
        Action::from_json(
            r#"{"metaData":{"id":"5fba94ed-9794-4965-ba6e-6ee3c0d22af9","format":{"provider":"parquet","options":{}},"schemaString":"{\"type\":\"struct\",\"fields\":[]}","partitionColumns":[],"configuration":{"tombstoneRetentionDurationMillis":"86400000"}}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = TableState::new(-1);
        assert_eq!(state.version, -1);
        assert_eq!(state.min_reader_version, 1);
        assert_eq!(state.min_writer_version, 1);
        assert!(state.files.is_empty());
        assert!(state.tombstones.is_empty());
        assert!(state.commit_infos.is_empty());
        assert!(state.current_metadata.is_none());
    }

    #[test]
    fn test_apply_respects_require_flags() -> Result<()> {
        let mut state = TableState::new(0);
        state.apply(add("a.parquet"), false, false)?;
        state.apply(remove("b.parquet"), false, false)?;
        assert!(state.files.is_empty());
        assert!(state.tombstones.is_empty());

        state.apply(add("a.parquet"), true, true)?;
        state.apply(remove("b.parquet"), true, true)?;
        assert_eq!(state.files.len(), 1);
        assert!(state.tombstones.contains_key("b.parquet"));
        Ok(())
    }

    #[test]
    fn test_apply_metadata_derives_retention() -> Result<()> {
        let mut state = TableState::new(0);
        state.apply(metadata(), true, true)?;
        assert!(state.current_metadata.is_some());
        assert_eq!(state.tombstone_retention_millis, 86400000);
        assert_eq!(state.log_retention_millis, 0);
        Ok(())
    }

    #[test]
    fn test_apply_txn_keeps_max_version() -> Result<()> {
        let mut state = TableState::new(0);
        for action in [txn("A", 3), txn("A", 1), txn("A", 5), txn("B", 2)] {
            state.apply(action, true, true)?;
        }
        assert_eq!(state.app_transaction_version["A"], 5);
        assert_eq!(state.app_transaction_version["B"], 2);
        Ok(())
    }

    #[test]
    fn test_apply_cdc_is_discarded() -> Result<()> {
        let mut state = TableState::new(0);
        state.apply(
            Action::from_json(
                r#"{"cdc":{"path":"_change_data/cdc-00000.parquet","partitionValues":{},"size":1213,"dataChange":false}}"#,
            )?,
            true,
            true,
        )?;
        assert_eq!(state, TableState::new(0));
        Ok(())
    }

    #[test]
    fn test_merge_tombstone_drops_earlier_add() -> Result<()> {
        let mut state = TableState::from_actions(vec![add("a.parquet"), add("b.parquet")], 0)?;
        let incremental = TableState::from_actions(vec![remove("a.parquet")], 1)?;
        state.merge(incremental, true, true);
        assert_eq!(state.version, 1);
        assert_eq!(state.files.len(), 1);
        assert_eq!(state.files[0].path, "b.parquet");
        assert!(state.tombstones.contains_key("a.parquet"));
        Ok(())
    }

    #[test]
    fn test_merge_add_resurrects_tombstone() -> Result<()> {
        let mut state = TableState::from_actions(vec![add("a.parquet")], 0)?;
        state.merge(TableState::from_actions(vec![remove("a.parquet")], 1)?, true, true);
        state.merge(TableState::from_actions(vec![add("a.parquet")], 2)?, true, true);
        assert_eq!(state.version, 2);
        assert_eq!(state.files.len(), 1);
        assert_eq!(state.files[0].path, "a.parquet");
        assert!(state.tombstones.is_empty());
        Ok(())
    }

    #[test]
    fn test_merge_without_tombstone_tracking() -> Result<()> {
        // with tombstones not required, removes still drop files but no
        // tombstone is retained
        let mut state = TableState::from_actions(vec![add("a.parquet")], 0)?;
        let incremental = TableState::from_actions(vec![remove("a.parquet")], 1)?;
        state.merge(incremental, true, false);
        assert!(state.files.is_empty());
        assert!(state.tombstones.is_empty());
        Ok(())
    }

    #[test]
    fn test_merge_adopts_protocol_in_pairs() -> Result<()> {
        let mut state = TableState::new(0);
        state.min_reader_version = 3;
        state.min_writer_version = 7;

        let incremental = TableState::from_actions(
            vec![Action::from_json(r#"{"protocol":{"minReaderVersion":2,"minWriterVersion":5}}"#)?],
            1,
        )?;
        state.merge(incremental, true, true);
        assert_eq!(state.min_reader_version, 2);
        assert_eq!(state.min_writer_version, 5);
        Ok(())
    }

    #[test]
    fn test_merge_keeps_metadata_and_retention() -> Result<()> {
        let mut state = TableState::new(0);
        let incremental = TableState::from_actions(vec![metadata()], 1)?;
        state.merge(incremental, true, true);
        assert!(state.current_metadata.is_some());
        assert_eq!(state.tombstone_retention_millis, 86400000);

        // a later commit without metadata leaves it untouched
        state.merge(TableState::new(2), true, true);
        assert!(state.current_metadata.is_some());
        assert_eq!(state.tombstone_retention_millis, 86400000);
        Ok(())
    }

    #[test]
    fn test_merge_version_only_moves_forward() {
        let mut state = TableState::new(5);
        state.merge(TableState::new(3), true, true);
        assert_eq!(state.version, 5);
        state.merge(TableState::new(7), true, true);
        assert_eq!(state.version, 7);
    }

    proptest! {
        #[test]
        fn txn_versions_fold_to_max(versions in proptest::collection::vec(0i64..1000, 1..20)) {
            let mut state = TableState::new(0);
            for version in &versions {
                state.apply(txn("app", *version), true, true).unwrap();
            }
            prop_assert_eq!(
                state.app_transaction_version.get("app"),
                versions.iter().max()
            );
        }

        #[test]
        fn replay_is_deterministic(paths in proptest::collection::vec("[a-z]{1,8}", 1..16)) {
            let build = || {
                let mut state = TableState::new(-1);
                for (version, path) in paths.iter().enumerate() {
                    let actions = vec![add(path), remove(path), add(path)];
                    let commit = TableState::from_actions(actions, version as i64).unwrap();
                    state.merge(commit, true, true);
                }
                state
            };
            prop_assert_eq!(build(), build());
        }
    }
}
