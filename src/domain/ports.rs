use crate::utils::error::Result;
use std::path::PathBuf;

/// Byte-level persistence for exported mappings.
pub trait Storage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Writes `data` and returns the full path it landed at.
    fn write_file(&self, path: &str, data: &[u8]) -> Result<PathBuf>;
}

/// Source of per-slice matches used by bulk and adjust operations on the map.
pub trait SliceMatcher {
    fn match_slice(&self, source_index: usize) -> Result<usize>;
}

impl<F> SliceMatcher for F
where
    F: Fn(usize) -> Result<usize>,
{
    fn match_slice(&self, source_index: usize) -> Result<usize> {
        self(source_index)
    }
}
