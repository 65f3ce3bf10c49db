use std::path::Path;

use serde::{Deserialize, Serialize};

use libdiskbtree::{TreeConfig, MAX_SEQUENCE_LENGTH};

use crate::error::{Error, Result};

/// What a query run does with a subsequence that is not in the tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissPolicy
{
    /// Report nothing for it and carry on
    #[default]
    Skip,
    /// End the run at the first miss
    Stop,
}

/// Settings for building a tree. Missing fields in a profile fall back to
/// [`BuildOptions::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions
{
    /// 0 picks the largest degree whose nodes fit a 4096 byte block
    pub degree: u32,
    pub sequence_length: u32,
    pub cache: bool,
    pub cache_size: usize,
    /// 1 also writes an in-order dump of the finished tree
    pub debug_level: u8,
}

impl Default for BuildOptions
{
    fn default() -> Self
    {
        BuildOptions {
            degree: 0,
            sequence_length: MAX_SEQUENCE_LENGTH,
            cache: false,
            cache_size: 500,
            debug_level: 0,
        }
    }
}

impl BuildOptions
{
    pub fn from_yaml_str(yaml: &str) -> Result<Self>
    {
        Ok(serde_yml::from_str(yaml)?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self>
    {
        BuildOptions::from_yaml_str(&read_profile(path.as_ref())?)
    }

    /// Profile shipped with the crate, `profiles/build.yaml`
    pub fn bundled() -> Result<Self>
    {
        BuildOptions::from_yaml_str(include_str!("../../profiles/build.yaml"))
    }

    pub fn cache_capacity(&self) -> Option<usize>
    {
        self.cache.then_some(self.cache_size)
    }

    pub fn tree_config(&self) -> TreeConfig
    {
        TreeConfig {
            degree: self.degree,
            sequence_length: self.sequence_length,
            cache_capacity: self.cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions
{
    pub cache: bool,
    pub cache_size: usize,
    pub on_miss: MissPolicy,
    pub debug_level: u8,
}

impl Default for QueryOptions
{
    fn default() -> Self
    {
        QueryOptions {
            cache: false,
            cache_size: 500,
            on_miss: MissPolicy::Skip,
            debug_level: 0,
        }
    }
}

impl QueryOptions
{
    pub fn from_yaml_str(yaml: &str) -> Result<Self>
    {
        Ok(serde_yml::from_str(yaml)?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self>
    {
        QueryOptions::from_yaml_str(&read_profile(path.as_ref())?)
    }

    /// Profile shipped with the crate, `profiles/query.yaml`
    pub fn bundled() -> Result<Self>
    {
        QueryOptions::from_yaml_str(include_str!("../../profiles/query.yaml"))
    }

    pub fn cache_capacity(&self) -> Option<usize>
    {
        self.cache.then_some(self.cache_size)
    }
}

fn read_profile(path: &Path) -> Result<String>
{
    std::fs::read_to_string(path).map_err(|e| Error::open(path, e))
}
