use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read declarations: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse declarations: {0}")]
    Parse(String),

    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),
}

pub type Result<T> = std::result::Result<T, Error>;
