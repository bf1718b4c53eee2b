//! Session management. Load/save grammers session and connect a client.
//!
//! Uses grammers-session's SqliteSession for persistent file-based storage so
//! authorization is preserved across application restarts.

use grammers_client::{Client, SenderPool};
use grammers_session::storages::SqliteSession;
use std::path::Path;
use std::sync::Arc;

/// Opens a persistent session storage at the given path.
///
/// The file is created if it does not exist. Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created, or if the
/// SQLite database cannot be opened (e.g. permissions, disk full).
pub async fn open_file_session(path: impl AsRef<Path>) -> anyhow::Result<SqliteSession> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| anyhow::anyhow!("create session directory: {}", e))?;
    }
    SqliteSession::open(path)
        .await
        .map_err(|e| anyhow::anyhow!("open session file: {}", e))
}

/// Open the session file and start a client on it. The sender pool runs on its own task.
pub async fn connect(api_id: i32, session_path: impl AsRef<Path>) -> anyhow::Result<Client> {
    let session = Arc::new(open_file_session(session_path).await?);
    let pool = SenderPool::new(session, api_id);
    let handle = pool.handle.clone();
    tokio::spawn(async move {
        pool.runner.run().await;
    });
    Ok(Client::new(handle))
}
