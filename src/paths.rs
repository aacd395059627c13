/*!
Object naming inside the transaction log.

Every object the loader touches lives under [LOG_DIR_NAME] and is named
after the version it belongs to, left padded so that lexicographic order of
names matches numeric order of versions.
*/

use lazy_static::lazy_static;
use regex::Regex;

/// Directory under the table root that holds the transaction log.
pub const LOG_DIR_NAME: &str = "_delta_log";

/// Object inside the log directory that points at the newest checkpoint.
pub const LAST_CHECKPOINT_FILE_NAME: &str = "_last_checkpoint";

lazy_static! {
    static ref COMMIT_URI: Regex = Regex::new(r"^_delta_log/(\d{20})\.json$").unwrap();
}

/// Formats the version as a string, left padded with 0s to 20 digits.
pub fn format_version(version: i64) -> String {
    format!("{version:020}")
}

/// Formats a checkpoint part number as a string, left padded with 0s to
/// 10 digits.
pub fn format_part(part: i32) -> String {
    format!("{part:010}")
}

/// Returns the commit URI for the given version, relative to the root of
/// the table.
///
/// ```
/// use deltalake_rs::paths::commit_uri_from_version;
/// assert_eq!(
///     commit_uri_from_version(0),
///     "_delta_log/00000000000000000000.json"
/// );
/// ```
pub fn commit_uri_from_version(version: i64) -> String {
    format!("{LOG_DIR_NAME}/{}.json", format_version(version))
}

/// Returns the URI of the last-checkpoint pointer, relative to the root of
/// the table.
pub fn last_checkpoint_uri() -> String {
    format!("{LOG_DIR_NAME}/{LAST_CHECKPOINT_FILE_NAME}")
}

/// Returns the URIs of the data files for a checkpoint at `version` split
/// into `parts` parts. A checkpoint with zero or one parts is a single
/// file; multi-part checkpoints number their parts from 1.
pub fn checkpoint_uris_from_version(version: i64, parts: i32) -> Vec<String> {
    if parts <= 1 {
        return vec![format!(
            "{LOG_DIR_NAME}/{}.checkpoint.parquet",
            format_version(version)
        )];
    }
    (1..=parts)
        .map(|part| {
            format!(
                "{LOG_DIR_NAME}/{}.checkpoint.{}.{}.parquet",
                format_version(version),
                format_part(part),
                format_part(parts)
            )
        })
        .collect()
}

/// Reads the version back out of a commit URI produced by
/// [commit_uri_from_version]. Returns `None` for anything else.
pub fn version_from_commit_uri(uri: &str) -> Option<i64> {
    COMMIT_URI
        .captures(uri)
        .and_then(|caps| caps.get(1))
        .and_then(|version| version.as_str().parse().ok())
}
