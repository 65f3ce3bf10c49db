use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::node::BINCODE_CONFIG;
use crate::{MAX_DEGREE, MAX_SEQUENCE_LENGTH, MIN_DEGREE, MIN_SEQUENCE_LENGTH};

/// Sidecar record describing a tree file: degree `t` then subsequence
/// length `k`, both `i32`
#[derive(Debug, Clone, Copy, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct TreeMetadata
{
    pub degree: i32,
    pub sequence_length: i32,
}

impl TreeMetadata
{
    pub const SIZE: usize = 8;

    pub fn new(degree: u32, sequence_length: u32) -> Result<Self>
    {
        let metadata = TreeMetadata {
            degree: i32::try_from(degree).unwrap_or(i32::MAX),
            sequence_length: i32::try_from(sequence_length).unwrap_or(i32::MAX),
        };
        metadata.validate()?;
        Ok(metadata)
    }

    /// Degree in [`MIN_DEGREE`]..=[`MAX_DEGREE`], sequence length in
    /// [`MIN_SEQUENCE_LENGTH`]..=[`MAX_SEQUENCE_LENGTH`]
    fn in_range(&self) -> bool
    {
        (MIN_DEGREE as i32..=MAX_DEGREE as i32).contains(&self.degree)
            && (MIN_SEQUENCE_LENGTH as i32..=MAX_SEQUENCE_LENGTH as i32)
                .contains(&self.sequence_length)
    }

    pub fn validate(&self) -> Result<()>
    {
        if self.in_range() {
            Ok(())
        } else {
            Err(Error::invalid_input(self.describe_bounds()))
        }
    }

    fn describe_bounds(&self) -> String
    {
        format!(
            "degree {} and sequence length {} outside {MIN_DEGREE}..={MAX_DEGREE} and \
             {MIN_SEQUENCE_LENGTH}..={MAX_SEQUENCE_LENGTH}",
            self.degree, self.sequence_length
        )
    }

    pub fn degree(&self) -> u32
    {
        self.degree as u32
    }

    pub fn sequence_length(&self) -> u32
    {
        self.sequence_length as u32
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()>
    {
        bincode::encode_into_std_write(self, out, BINCODE_CONFIG)?;
        Ok(())
    }

    pub fn read_from<R: Read>(input: &mut R) -> Result<Self>
    {
        let metadata: TreeMetadata = bincode::decode_from_std_read(input, BINCODE_CONFIG)?;
        if !metadata.in_range() {
            return Err(Error::corruption(format!(
                "metadata holds {}",
                metadata.describe_bounds()
            )));
        }
        Ok(metadata)
    }

    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()>
    {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self>
    {
        let mut input = BufReader::new(File::open(path)?);
        TreeMetadata::read_from(&mut input)
    }
}
