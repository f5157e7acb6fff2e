use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables for the recognition stages. Every field has a default, so a
/// config file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionParams {
    /// DBSCAN radius for non-text center coordinates.
    pub nontext_eps: f64,
    /// DBSCAN radius for text left/top edges.
    pub text_eps: f64,
    pub min_samples: usize,
    /// Only cluster components that are not owned by a block.
    pub only_unparented: bool,
    /// Two-member groups whose area ratio exceeds this are dropped.
    pub max_area_ratio: f64,
    /// Max pixel difference between matching child offsets in two blocks.
    pub connection_offset_tolerance: f64,
    /// Max relative difference between matching child size ratios.
    pub connection_ratio_tolerance: f64,
    /// Max pixel misalignment between counterpart members of paired groups.
    pub pair_alignment_tolerance: f64,
    /// Drop unresolved child ids with a warning instead of failing.
    pub lenient_children: bool,
}

impl Default for RecognitionParams {
    fn default() -> Self {
        Self {
            nontext_eps: 10.0,
            text_eps: 5.0,
            min_samples: 1,
            only_unparented: true,
            max_area_ratio: 2.0,
            connection_offset_tolerance: 10.0,
            connection_ratio_tolerance: 0.25,
            pair_alignment_tolerance: 10.0,
            lenient_children: false,
        }
    }
}

impl RecognitionParams {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
