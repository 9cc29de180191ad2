use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory backend unreachable: {0}")]
    Unreachable(String),

    #[error("directory file could not be parsed: {0}")]
    Malformed(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}
