use thiserror::Error;

use crate::io::FileId;

/// Load failures are cached per key and handed to every waiter, hence the errors are cloneable and only carry the
/// rendered reason of their cause.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Failed to fetch file {file_id}: {reason}")]
    Fetch { file_id: FileId, reason: String },

    #[error("Failed to decode file {file_id}: {reason}")]
    Decode { file_id: FileId, reason: String },

    #[error("{kind} {file_id} is invalid: {reason}")]
    Invalid {
        kind: &'static str,
        file_id: FileId,
        reason: String,
    },

    #[error("{kind} {file_id} failed to load a dependency")]
    Dependency {
        kind: &'static str,
        file_id: FileId,
        #[source]
        source: Box<AssetError>,
    },
}

impl AssetError {
    pub fn dependency(kind: &'static str, file_id: FileId, source: AssetError) -> Self {
        AssetError::Dependency {
            kind,
            file_id,
            source: Box::new(source),
        }
    }

    /// The file whose load failed first, following the dependency chain.
    pub fn root_file_id(&self) -> FileId {
        match self {
            AssetError::Fetch { file_id, .. }
            | AssetError::Decode { file_id, .. }
            | AssetError::Invalid { file_id, .. } => *file_id,
            AssetError::Dependency { source, .. } => source.root_file_id(),
        }
    }
}
