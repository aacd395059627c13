/*!
Defines the [Table] struct that represents a delta table, and the load
loop that materializes its state from the transaction log.

Loading is deliberately serial: the checkpoint pointer is read first, the
checkpoint parts (if any) seed the state, and then commits are fetched one
version at a time until the next commit object is absent. Commits must be
folded in ascending version order because the merge rules are
order-sensitive.
*/

use std::sync::Arc;

use object_store::path::Path;
use object_store::ObjectStore;
use tracing::debug;

use crate::error::{DeltaError, Result};
use crate::model::actions::Action;
use crate::model::checkpoint::Checkpoint;
use crate::paths::{commit_uri_from_version, last_checkpoint_uri};

pub mod state;

use state::TableState;

/// Controls what the loaded state retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    /// Keep tombstones in the state. Callers that only need metadata and
    /// protocol can turn this off.
    pub require_tombstones: bool,
    /// Keep live files in the state.
    pub require_files: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            require_tombstones: true,
            require_files: true,
        }
    }
}

/// A delta table: a state, the store it was loaded from, and the
/// checkpoint the state was seeded with, if any.
#[derive(Debug)]
pub struct Table {
    /// The materialized state of the table.
    pub state: TableState,
    /// What the state retains.
    pub config: TableConfig,
    /// The checkpoint the current state was seeded from, if any.
    pub last_checkpoint: Option<Checkpoint>,
    storage: Arc<dyn ObjectStore>,
}

impl Table {
    /// Creates an unloaded table for the given store. The state starts at
    /// version -1; call [Table::update] to load it.
    pub fn new(storage: Arc<dyn ObjectStore>, config: TableConfig) -> Self {
        Table {
            state: TableState::new(-1),
            config,
            last_checkpoint: None,
            storage,
        }
    }

    /// Creates a table that continues from a previously materialized
    /// state. [Table::update] then only replays commits past the state's
    /// version.
    pub fn with_state(storage: Arc<dyn ObjectStore>, config: TableConfig, state: TableState) -> Self {
        Table {
            state,
            config,
            last_checkpoint: None,
            storage,
        }
    }

    /// Loads the newest version of the table from the store.
    pub async fn load(storage: Arc<dyn ObjectStore>, config: TableConfig) -> Result<Table> {
        let mut table = Table::new(storage, config);
        table.update().await?;
        Ok(table)
    }

    /// Brings the state up to the newest version in the store.
    ///
    /// If the most recent checkpoint is ahead of the current state, the
    /// state is re-seeded from the checkpoint; either way every commit
    /// after the state's version is replayed and merged.
    pub async fn update(&mut self) -> Result<()> {
        match self.most_recent_checkpoint().await {
            Err(err) if err.is_not_found() => {
                debug!("no checkpoint found, loading from beginning");
            }
            Err(err) => return Err(err),
            Ok(checkpoint) if checkpoint.version == self.state.version => {
                debug!(
                    checkpoint_version = checkpoint.version,
                    "already on the most recent checkpoint, checking for new commits"
                );
            }
            Ok(checkpoint) => {
                debug!(checkpoint_version = checkpoint.version, "updating from checkpoint");
                self.state = TableState::from_checkpoint(self.storage.as_ref(), &checkpoint).await?;
                self.last_checkpoint = Some(checkpoint);
            }
        }
        self.update_incremental().await
    }

    /// Replays commits one version at a time until the next commit object
    /// is absent, merging each into the state. A present commit always
    /// advances the version, even when it decodes to zero actions.
    async fn update_incremental(&mut self) -> Result<()> {
        debug!(current_version = self.state.version, "incremental update");

        while let Some(actions) = self.peek_next_commit(self.state.version).await? {
            let commit_state = TableState::from_actions(actions, self.state.version + 1)?;
            self.state
                .merge(commit_state, self.config.require_files, self.config.require_tombstones);
        }

        if self.state.version == -1 {
            debug!(table_uri = %self.table_uri(), "no commits found");
            return Err(DeltaError::EmptyTable);
        }
        Ok(())
    }

    /// Reads the actions of the commit after `current_version`. Returns
    /// `None` when that commit does not exist, meaning the table is up to
    /// date. A commit line that fails to decode aborts the load.
    pub async fn peek_next_commit(&self, current_version: i64) -> Result<Option<Vec<Action>>> {
        let uri = commit_uri_from_version(current_version + 1);
        let commit = match self.storage.get(&Path::from(uri.as_str())).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                debug!(
                    uri = uri.as_str(),
                    latest_version = current_version,
                    "no more commits, table is up to date"
                );
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        debug!(uri = uri.as_str(), version = current_version + 1, "loading commit");
        let data = commit.bytes().await?;
        let content =
            std::str::from_utf8(&data).map_err(|err| DeltaError::Decode(err.to_string()))?;

        let mut actions = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            actions.push(Action::from_json(line)?);
        }
        Ok(Some(actions))
    }

    /// Reads and parses the last-checkpoint pointer.
    async fn most_recent_checkpoint(&self) -> Result<Checkpoint> {
        let uri = last_checkpoint_uri();
        debug!(uri = uri.as_str(), "reading last checkpoint pointer");
        let data = self
            .storage
            .get(&Path::from(uri.as_str()))
            .await?
            .bytes()
            .await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// The URI of the store the table was loaded from.
    pub fn table_uri(&self) -> String {
        self.storage.to_string()
    }

    /// The object store backing the table.
    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.storage)
    }
}
