pub mod codec;
pub mod finder;
pub mod mapping;
pub mod session;

pub use crate::domain::geometry::{AffineGeometry, VolumeGeometry};
pub use crate::domain::model::{Axis, CorrespondenceEntry, Preview, Provenance, SliceMatch};
pub use crate::domain::ports::{SliceMatcher, Storage};
pub use crate::utils::error::Result;
