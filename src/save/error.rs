//! Save error types

use std::fmt;

use thiserror::Error;

/// Step of the commit sequence that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    CreateDir,
    TempWrite,
    BackupCopy,
    RemovePrimary,
    Promote,
    KeyValue,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteStage::CreateDir => "creating save directory",
            WriteStage::TempWrite => "writing temp file",
            WriteStage::BackupCopy => "copying backup",
            WriteStage::RemovePrimary => "removing old save",
            WriteStage::Promote => "promoting temp file",
            WriteStage::KeyValue => "writing key-value entry",
        };
        f.write_str(name)
    }
}

/// A save attempt did not land. Existing data is left intact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    #[error("failed to serialize save record: {0}")]
    Serialize(String),
    #[error("{stage} failed for {target}: {message}")]
    Io {
        stage: WriteStage,
        target: String,
        message: String,
    },
}

impl WriteError {
    pub fn io(stage: WriteStage, target: impl fmt::Display, err: impl fmt::Display) -> Self {
        WriteError::Io {
            stage,
            target: target.to_string(),
            message: err.to_string(),
        }
    }

    /// Commit step that failed, if the failure came from storage
    pub fn stage(&self) -> Option<WriteStage> {
        match self {
            WriteError::Serialize(_) => None,
            WriteError::Io { stage, .. } => Some(*stage),
        }
    }
}

/// Storage could not be read. Distinct from "no save present".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("failed to read {target}: {message}")]
    Io { target: String, message: String },
}

impl ReadError {
    pub fn io(target: impl fmt::Display, err: impl fmt::Display) -> Self {
        ReadError::Io {
            target: target.to_string(),
            message: err.to_string(),
        }
    }
}

/// Stored bytes are not a valid save record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid save data in {target}: {message}")]
pub struct ParseError {
    pub target: String,
    pub message: String,
}

impl ParseError {
    pub fn new(target: impl fmt::Display, err: impl fmt::Display) -> Self {
        Self {
            target: target.to_string(),
            message: err.to_string(),
        }
    }
}

/// Key-value preference store failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyValueError {
    #[error("preference store I/O error: {0}")]
    Io(String),
    #[error("preference store is corrupt: {0}")]
    Corrupt(String),
}
