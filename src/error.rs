use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("device I/O failure")]
    Io,
    #[error("not enough free sectors")]
    NoSpace,
    #[error("file size exceeds the maximum addressable size")]
    TooLarge,
    #[error("name already exists in the directory")]
    DuplicateName,
    #[error("directory has no free entry slot")]
    DirectoryFull,
    #[error("path component missing or not a directory")]
    PathNotFound,
    #[error("no such file or directory")]
    NotFound,
    #[error("unknown open-file id")]
    BadId,
    #[error("malformed path or argument")]
    Invalid,
}

pub type Result<T> = core::result::Result<T, FsError>;
