#![deny(missing_docs)]
/*!
# Deltalake-rs

Deltalake-rs is a library for reading tables stored in the
[Delta Lake](https://delta.io) open table format.

A delta table is a directory of data files plus a transactional log of
versioned commits under `_delta_log/`. The [model] package consists of
data structures that know how to serialise and deserialise the log:
[actions](model::actions) carried by commits and checkpoints, the
[checkpoint pointer](model::checkpoint), and the
[table schema](model::schema). [table::Table::load] materializes the table
state at the newest version: it finds the most recent checkpoint through
the `_last_checkpoint` pointer, folds the checkpoint's parquet parts, then
replays every later commit and merges the per-commit state.

Currently supported:
* Loading table state from commits and checkpoints.
* Incremental refresh of an already loaded table.

Coming soon:
* Commit writing.
* Checkpoint writing.
* Time travel to a version or timestamp.

*/
pub mod error;
pub mod model;
pub mod paths;
pub mod storage;
pub mod table;

pub use object_store;
