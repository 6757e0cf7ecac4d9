//! Slice correspondence between a sparse MRI acquisition and a reference
//! atlas that share a physical coordinate space.
//!
//! Each volume's voxel-to-world affine places its slices along the chosen
//! axis; source slices are matched to the nearest target slice, and the
//! resulting map can be adjusted by hand and exported as JSON or CSV.

pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::storage::LocalStorage;
pub use crate::app::runner::{RunSummary, SessionRunner};
#[cfg(feature = "cli")]
pub use crate::config::CliArgs;
pub use crate::config::SessionConfig;
pub use crate::core::codec::{MappingCodec, MappingDocument, MappingFormat, MappingMetadata};
pub use crate::core::finder::{find_nearest, CorrespondenceFinder, NearestSlice, TargetSlices};
pub use crate::core::mapping::{Adjustment, CorrespondenceMap};
pub use crate::core::session::CorrespondenceSession;
pub use crate::domain::geometry::{AffineGeometry, VolumeGeometry};
pub use crate::domain::model::{Axis, CorrespondenceEntry, Preview, Provenance, SliceMatch};
pub use crate::utils::error::{RbsyncError, Result};
