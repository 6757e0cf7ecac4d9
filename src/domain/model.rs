use crate::utils::error::{RbsyncError, Result};
use std::fmt;
use std::str::FromStr;

/// Principal direction along which both volumes are cut into slices.
///
/// The discriminant is the index into a volume's voxel coordinate tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Axis {
    AnteriorPosterior = 0,
    LeftRight = 1,
    #[default]
    SuperiorInferior = 2,
}

impl Axis {
    pub const ALL: [Axis; 3] = [
        Axis::AnteriorPosterior,
        Axis::LeftRight,
        Axis::SuperiorInferior,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::AnteriorPosterior => "AP",
            Axis::LeftRight => "LR",
            Axis::SuperiorInferior => "SI",
        }
    }

    pub fn from_index(index: i64) -> Result<Self> {
        match index {
            0 => Ok(Axis::AnteriorPosterior),
            1 => Ok(Axis::LeftRight),
            2 => Ok(Axis::SuperiorInferior),
            other => Err(RbsyncError::invalid_input(format!(
                "axis must be 0, 1 or 2, got {}",
                other
            ))),
        }
    }
}

impl TryFrom<i64> for Axis {
    type Error = RbsyncError;

    fn try_from(value: i64) -> Result<Self> {
        Axis::from_index(value)
    }
}

impl TryFrom<usize> for Axis {
    type Error = RbsyncError;

    fn try_from(value: usize) -> Result<Self> {
        i64::try_from(value)
            .map_err(|_| RbsyncError::invalid_input(format!("axis out of range: {}", value)))
            .and_then(Axis::from_index)
    }
}

/// Accepts the short names ("SI", case-insensitive) or the numeric index.
impl FromStr for Axis {
    type Err = RbsyncError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(index) = trimmed.parse::<i64>() {
            return Axis::from_index(index);
        }
        Axis::ALL
            .into_iter()
            .find(|axis| axis.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                RbsyncError::invalid_input(format!("unknown axis '{}', expected AP, LR or SI", s))
            })
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.index())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrespondenceEntry {
    pub target_index: usize,
    pub provenance: Provenance,
}

impl CorrespondenceEntry {
    pub fn auto(target_index: usize) -> Self {
        Self {
            target_index,
            provenance: Provenance::Auto,
        }
    }

    pub fn manual(target_index: usize) -> Self {
        Self {
            target_index,
            provenance: Provenance::Manual,
        }
    }

    pub fn is_manual(&self) -> bool {
        self.provenance == Provenance::Manual
    }
}

/// Result of a nearest-slice search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceMatch {
    pub source_index: usize,
    pub source_position: f64,
    pub target_index: usize,
    pub distance: f64,
}

impl SliceMatch {
    pub fn diagnostic(&self) -> String {
        format!(
            "source slice {} at {:.2} mm → target slice {} (distance {:.2} mm)",
            self.source_index, self.source_position, self.target_index, self.distance
        )
    }
}

/// What a presentation layer should show for a source slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preview {
    pub source_index: usize,
    pub target_index: usize,
    /// `true` when the target index comes from the stored mapping rather
    /// than a transient match.
    pub confirmed: bool,
}
