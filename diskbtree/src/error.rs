use std::io;

use thiserror::Error;

use crate::Offset;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error
{
    /// Rejected before any disk access, tree state is untouched
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Opening, seeking, reading or writing the record store or metadata
    #[error("Record store I/O error: {0}")]
    Io(#[from] io::Error),

    /// A broken tree invariant. Never recovered from.
    #[error("Corrupt tree: {0}")]
    Corruption(String),
}

impl Error
{
    pub fn invalid_input(msg: impl Into<String>) -> Self
    {
        Error::InvalidInput(msg.into())
    }

    pub fn corruption(msg: impl Into<String>) -> Self
    {
        Error::Corruption(msg.into())
    }

    pub(crate) fn missing_child(parent: Offset, slot: usize) -> Self
    {
        Error::Corruption(format!(
            "node at offset {parent} has no child in slot {slot}"
        ))
    }

    pub fn is_corruption(&self) -> bool
    {
        matches!(self, Error::Corruption(_))
    }
}

impl From<bincode::error::EncodeError> for Error
{
    fn from(e: bincode::error::EncodeError) -> Self
    {
        match e {
            bincode::error::EncodeError::Io { inner, .. } => Error::Io(inner),
            e => Error::Io(io::Error::new(io::ErrorKind::Other, e.to_string())),
        }
    }
}

impl From<bincode::error::DecodeError> for Error
{
    fn from(e: bincode::error::DecodeError) -> Self
    {
        match e {
            bincode::error::DecodeError::Io { inner, .. } => Error::Io(inner),
            e => Error::Corruption(format!("undecodable record: {e}")),
        }
    }
}
