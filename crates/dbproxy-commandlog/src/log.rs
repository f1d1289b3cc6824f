use crate::command::Command;
use dbproxy_backend::BackendExecutor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("log io error: {0}")]
    Io(String),
    #[error("unknown command type while loading log: {0}")]
    UnknownCommandType(String),
    #[error("invalid command: {0}")]
    Invalid(String),
    #[error("replay failed: {0}")]
    ReplayFailed(String),
}

/// Durable, per-node append-only journal of pending [`Command`]s.
///
/// Persistence is atomic: every mutation writes the full sequence to a
/// temporary file beside the target and renames it into place, so a reader
/// never observes a partially written log.
pub struct CommandLog {
    path: PathBuf,
    commands: Mutex<Vec<Command>>,
}

impl CommandLog {
    /// Loads the log at `path`, or starts empty if the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let commands = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| LogError::UnknownCommandType(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(LogError::Io(e.to_string())),
        };
        Ok(Self {
            path,
            commands: Mutex::new(commands),
        })
    }

    pub async fn len(&self) -> usize {
        self.commands.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn snapshot(&self) -> Vec<Command> {
        self.commands.lock().await.clone()
    }

    /// Appends `command`, persisting the whole sequence before returning.
    pub async fn append(&self, command: Command) -> Result<(), LogError> {
        let mut commands = self.commands.lock().await;
        commands.push(command);
        persist(&self.path, &commands).await
    }

    /// Replays every queued command against `executor`, in order, each
    /// inside its own transaction. Stops at the first failure, leaving the
    /// failing command and everything after it on disk; the successful
    /// prefix is dropped as it completes.
    pub async fn replay(&self, executor: &dyn BackendExecutor) -> Result<(), LogError> {
        let mut commands = self.commands.lock().await;
        while let Some(command) = commands.first().cloned() {
            let stmt = command
                .to_statement()
                .map_err(|e| LogError::Invalid(e.to_string()))?;
            executor
                .execute_in_transaction(&[stmt])
                .await
                .map_err(|e| LogError::ReplayFailed(e.to_string()))?;
            commands.remove(0);
            persist(&self.path, &commands).await?;
        }
        Ok(())
    }
}

async fn persist(path: &Path, commands: &[Command]) -> Result<(), LogError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LogError::Io(e.to_string()))?;
    }
    let json = serde_json::to_vec_pretty(commands).map_err(|e| LogError::Io(e.to_string()))?;
    let tmp_path = tmp_path_for(path);
    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(|e| LogError::Io(e.to_string()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| LogError::Io(e.to_string()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
