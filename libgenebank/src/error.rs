use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error
{
    #[error(transparent)]
    Tree(#[from] libdiskbtree::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unable to open {}: {source}", .path.display())]
    Open
    {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid profile: {0}")]
    Config(#[from] serde_yml::Error),
}

impl Error
{
    pub fn invalid_input(msg: impl Into<String>) -> Self
    {
        Error::InvalidInput(msg.into())
    }

    pub(crate) fn open(path: impl Into<PathBuf>, source: io::Error) -> Self
    {
        Error::Open {
            path: path.into(),
            source,
        }
    }
}
