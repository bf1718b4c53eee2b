//! JSON file persistence: chat registry and access-gate state.

pub mod access_json;
pub mod registry_json;

pub use access_json::AccessJson;
pub use registry_json::RegistryJson;

use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Atomic save using write-replace pattern.
/// 1. Write to temp file
/// 2. sync_all() to ensure flush to disk
/// 3. Atomic rename to target path
///
/// A crash mid-write leaves the previous file intact.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let temp_path = path.with_extension("json.tmp");
    let mut f = fs::File::create(&temp_path).await?;
    f.write_all(contents).await?;
    f.sync_all().await?;
    drop(f);

    // On POSIX this is atomic; on Windows it's as close as we can get
    fs::rename(&temp_path, path).await
}
