use crate::error::{Error, Result};
use crate::node::record_size;

/// Degree 0 asks for nodes sized to fit this many bytes
pub const BLOCK_SIZE: u64 = 4096;

pub const MIN_DEGREE: u32 = 2;
/// Caps a record at a few megabytes
pub const MAX_DEGREE: u32 = 1 << 16;
pub const MIN_SEQUENCE_LENGTH: u32 = 1;
pub const MAX_SEQUENCE_LENGTH: u32 = 31;

/// Largest degree whose node record still fits in `block_size` bytes.
/// Clamped to [`MIN_DEGREE`]..=[`MAX_DEGREE`].
pub fn degree_for_block_size(block_size: u64) -> u32
{
    let mut degree = MIN_DEGREE;
    while degree < MAX_DEGREE && record_size(degree + 1) <= block_size {
        degree += 1;
    }
    degree
}

/// Everything needed to create or open a tree. Owned by the caller and
/// passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig
{
    /// Minimum degree `t`, 0 selects [`degree_for_block_size`]
    pub degree: u32,

    /// Subsequence length `k` the keys were encoded from
    pub sequence_length: u32,

    /// Node cache capacity, `None` disables the cache
    pub cache_capacity: Option<usize>,
}

impl Default for TreeConfig
{
    fn default() -> Self
    {
        TreeConfig {
            degree: 0,
            sequence_length: MAX_SEQUENCE_LENGTH,
            cache_capacity: None,
        }
    }
}

impl TreeConfig
{
    pub fn new(degree: u32, sequence_length: u32) -> Self
    {
        TreeConfig {
            degree,
            sequence_length,
            cache_capacity: None,
        }
    }

    pub fn with_cache(mut self, capacity: usize) -> Self
    {
        self.cache_capacity = Some(capacity);
        self
    }

    /// The degree actually used on disk
    pub fn effective_degree(&self) -> u32
    {
        if self.degree == 0 {
            degree_for_block_size(BLOCK_SIZE)
        } else {
            self.degree
        }
    }

    pub fn validate(&self) -> Result<()>
    {
        let degree = self.effective_degree();
        if !(MIN_DEGREE..=MAX_DEGREE).contains(&degree) {
            return Err(Error::invalid_input(format!(
                "degree must be 0 or between {MIN_DEGREE} and {MAX_DEGREE}, got {degree}"
            )));
        }

        if !(MIN_SEQUENCE_LENGTH..=MAX_SEQUENCE_LENGTH)
            .contains(&self.sequence_length)
        {
            return Err(Error::invalid_input(format!(
                "sequence length must be between {MIN_SEQUENCE_LENGTH} and \
                 {MAX_SEQUENCE_LENGTH}, got {}",
                self.sequence_length
            )));
        }

        if self.cache_capacity == Some(0) {
            return Err(Error::invalid_input(
                "cache capacity must be at least 1 when the cache is enabled",
            ));
        }

        Ok(())
    }
}
