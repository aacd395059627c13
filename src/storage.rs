/*!
Helpers for pointing the loader at an object store.

The crate consumes any [object_store::ObjectStore]; these helpers only
cover the common cases of sniffing the backend out of a table URI and
opening a local directory. Cloud stores are built with the re-exported
`object_store` builders.
*/

use std::sync::Arc;

use lazy_static::lazy_static;
use object_store::local::LocalFileSystem;
use object_store::ObjectStore;
use regex::Regex;

use crate::error::{DeltaError, Result};

lazy_static! {
    static ref S3A: Regex = Regex::new("^s3a://[^/]*/?").unwrap();
    static ref S3: Regex = Regex::new("^s3://[^/]*/?").unwrap();
    static ref GS: Regex = Regex::new("^gs://[^/]*/?").unwrap();
    static ref FILE: Regex = Regex::new("^file://").unwrap();
}

/// The storage backends a table URI can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageProvider {
    /// A directory on the local filesystem.
    Local,
    /// An S3 bucket.
    S3,
    /// A Google Cloud Storage bucket.
    GoogleCloud,
}

/// Determines which storage backend a table URI names. URIs without a
/// scheme are treated as local paths.
pub fn provider_for_uri(uri: &str) -> Result<StorageProvider> {
    if uri.is_empty() {
        return Err(DeltaError::InvalidTableUri(uri.to_string()));
    }
    match uri.split_once("://") {
        None => Ok(StorageProvider::Local),
        Some(("file", _)) => Ok(StorageProvider::Local),
        Some(("s3", _)) | Some(("s3a", _)) => Ok(StorageProvider::S3),
        Some(("gs", _)) => Ok(StorageProvider::GoogleCloud),
        Some(_) => Err(DeltaError::InvalidTableUri(uri.to_string())),
    }
}

/// Strips the scheme and bucket from a bucket-qualified path, leaving the
/// path relative to the bucket root. Local paths pass through unchanged.
pub fn strip_prefix(path: &str) -> String {
    if path.starts_with("s3a://") {
        S3A.replace(path, "").to_string()
    } else if path.starts_with("s3://") {
        S3.replace(path, "").to_string()
    } else if path.starts_with("gs://") {
        GS.replace(path, "").to_string()
    } else if path.starts_with("file://") {
        FILE.replace(path, "").to_string()
    } else {
        path.to_owned()
    }
}

/// Opens a directory on the local filesystem as an object store rooted at
/// that directory.
pub fn local_store(root: impl AsRef<std::path::Path>) -> Result<Arc<dyn ObjectStore>> {
    Ok(Arc::new(LocalFileSystem::new_with_prefix(root)?))
}
