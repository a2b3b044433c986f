use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("No backup file found")]
    NoBackup,

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("copy {} -> {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed table: {0}")]
    Malformed(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> StoreError {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }

    pub(crate) fn copy(
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> StoreError {
        let (from, to) = (from.into(), to.into());
        move |source| StoreError::Copy { from, to, source }
    }

    /// NotFound-class failures map to 404; everything else is a storage fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound | StoreError::NoBackup)
    }
}
