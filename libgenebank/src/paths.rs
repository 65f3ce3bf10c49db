use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const DATA_MARKER: &str = ".btree.data.";
const METADATA_MARKER: &str = ".btree.metadata.";

/// The record store and metadata files of one tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreePaths
{
    pub data: PathBuf,
    pub metadata: PathBuf,
}

impl TreePaths
{
    /// `<source>.btree.data.<k>.<t>` and `<source>.btree.metadata.<k>.<t>`
    pub fn for_source<P: AsRef<Path>>(source: P, sequence_length: u32, degree: u32) -> Self
    {
        let with_suffix = |marker: &str| {
            let mut name = OsString::from(source.as_ref().as_os_str());
            name.push(format!("{marker}{sequence_length}.{degree}"));
            PathBuf::from(name)
        };
        TreePaths {
            data: with_suffix(DATA_MARKER),
            metadata: with_suffix(METADATA_MARKER),
        }
    }

    /// Finds the metadata file that sits next to a data file
    pub fn from_data_path<P: AsRef<Path>>(data: P) -> Result<Self>
    {
        let data = data.as_ref();
        let name = data
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::invalid_input(format!("{} is not a tree file", data.display())))?;

        let at = name.rfind(DATA_MARKER).ok_or_else(|| {
            Error::invalid_input(format!(
                "{} does not look like a tree data file (no {DATA_MARKER} in the name)",
                data.display()
            ))
        })?;

        let metadata_name = format!(
            "{}{METADATA_MARKER}{}",
            &name[..at],
            &name[at + DATA_MARKER.len()..]
        );

        Ok(TreePaths {
            data: data.to_path_buf(),
            metadata: data.with_file_name(metadata_name),
        })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn names_follow_source()
    {
        let paths = TreePaths::for_source("data/test3.gbk", 7, 102);
        assert_eq!(paths.data, PathBuf::from("data/test3.gbk.btree.data.7.102"));
        assert_eq!(
            paths.metadata,
            PathBuf::from("data/test3.gbk.btree.metadata.7.102")
        );

        let derived = TreePaths::from_data_path(&paths.data).unwrap();
        assert_eq!(derived, paths);
    }

    #[test]
    fn only_the_marker_is_replaced()
    {
        let paths = TreePaths::from_data_path("/tmp/data/my.data.gbk.btree.data.4.2").unwrap();
        assert_eq!(
            paths.metadata,
            PathBuf::from("/tmp/data/my.data.gbk.btree.metadata.4.2")
        );
    }

    #[test]
    fn rejects_other_files()
    {
        assert!(matches!(
            TreePaths::from_data_path("test3.gbk"),
            Err(Error::InvalidInput(_))
        ));
        assert!(TreePaths::from_data_path("/").is_err());
    }
}
