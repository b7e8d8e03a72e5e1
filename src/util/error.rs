use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FsError {
    #[error("path not found")]
    PathNotFound,
    #[error("invalid path")]
    InvalidPath,
    #[error("not a directory")]
    NotADirectory,
    #[error("not a file")]
    NotAFile,
    #[error("an entry with that name already exists")]
    NameCollision,
    #[error("capacity exceeded")]
    CapacityExceeded,
    #[error("no free data block left")]
    OutOfSpace,
    #[error("image is corrupt")]
    CorruptImage,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;
