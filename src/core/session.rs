use crate::core::codec::{MappingCodec, MappingDocument, MappingFormat, MappingMetadata};
use crate::core::finder::CorrespondenceFinder;
use crate::core::mapping::{Adjustment, CorrespondenceMap};
use crate::domain::geometry::VolumeGeometry;
use crate::domain::model::{Axis, Preview, Provenance, SliceMatch};
use crate::domain::ports::Storage;
use crate::utils::error::{RbsyncError, Result};
use std::path::{Path, PathBuf};

/// State of one source/atlas pairing: both volume geometries, the active
/// slicing axis, the slice under review, and the correspondence map.
///
/// The map is discarded whenever either volume is replaced or the axis
/// changes, since indices along one axis mean nothing along another.
#[derive(Debug, Clone, Default)]
pub struct CorrespondenceSession {
    source: Option<VolumeGeometry>,
    target: Option<VolumeGeometry>,
    axis: Axis,
    current_slice: usize,
    map: CorrespondenceMap,
}

impl CorrespondenceSession {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            ..Self::default()
        }
    }

    pub fn with_volumes(source: VolumeGeometry, target: VolumeGeometry, axis: Axis) -> Self {
        Self {
            source: Some(source),
            target: Some(target),
            axis,
            current_slice: 0,
            map: CorrespondenceMap::new(),
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn map(&self) -> &CorrespondenceMap {
        &self.map
    }

    pub fn source(&self) -> Option<&VolumeGeometry> {
        self.source.as_ref()
    }

    pub fn target(&self) -> Option<&VolumeGeometry> {
        self.target.as_ref()
    }

    pub fn current_slice(&self) -> usize {
        self.current_slice
    }

    pub fn load_source(&mut self, volume: VolumeGeometry) {
        tracing::info!(
            "Loaded source volume: shape {:?}, {} slices along {}",
            volume.shape,
            volume.slice_count(self.axis),
            self.axis
        );
        self.source = Some(volume);
        self.current_slice = 0;
        self.map.clear();
    }

    pub fn load_target(&mut self, volume: VolumeGeometry) {
        tracing::info!("Loaded target volume: shape {:?}", volume.shape);
        self.target = Some(volume);
        self.map.clear();
    }

    /// Switches the slicing axis. Returns `true` if the axis actually changed,
    /// in which case the map is cleared and the current slice reset.
    pub fn set_axis(&mut self, axis: Axis) -> bool {
        if axis == self.axis {
            return false;
        }
        self.axis = axis;
        self.current_slice = 0;
        self.map.clear();
        tracing::info!("Changed axis to: {}", axis);
        true
    }

    pub fn source_slice_count(&self) -> Result<usize> {
        Ok(require(&self.source, "source")?.slice_count(self.axis))
    }

    pub fn target_slice_count(&self) -> Result<usize> {
        Ok(require(&self.target, "target")?.slice_count(self.axis))
    }

    pub fn set_current_slice(&mut self, index: usize) -> Result<()> {
        self.check_source_index(index)?;
        self.current_slice = index;
        Ok(())
    }

    /// Nearest target slice for `source_index`. Nothing is stored.
    pub fn match_slice(&self, source_index: usize) -> Result<SliceMatch> {
        self.check_source_index(source_index)?;
        finder(&self.source, &self.target, self.axis)?.find(source_index)
    }

    /// Target slice to display for `source_index`: the stored entry if there
    /// is one, otherwise a transient match that is not saved.
    pub fn preview(&self, source_index: usize) -> Result<Preview> {
        self.check_source_index(source_index)?;
        if let Some(entry) = self.map.get(source_index) {
            return Ok(Preview {
                source_index,
                target_index: entry.target_index,
                confirmed: true,
            });
        }
        let slice_match = self.match_slice(source_index)?;
        Ok(Preview {
            source_index,
            target_index: slice_match.target_index,
            confirmed: false,
        })
    }

    pub fn auto_match(&mut self, source_index: usize) -> Result<SliceMatch> {
        let slice_match = self.match_slice(source_index)?;
        self.map
            .set(source_index, slice_match.target_index, Provenance::Auto);
        tracing::info!(
            "Auto-matched: source {} → target {}",
            source_index,
            slice_match.target_index
        );
        Ok(slice_match)
    }

    pub fn auto_match_current(&mut self) -> Result<SliceMatch> {
        self.auto_match(self.current_slice)
    }

    /// Auto-matches every source slice, replacing manual adjustments.
    pub fn auto_match_all(&mut self) -> Result<usize> {
        let finder = finder(&self.source, &self.target, self.axis)?;
        let count = finder.source_slice_count();
        tracing::info!("Auto-matching all {} slices...", count);
        self.map.auto_fill(count, &finder)?;
        tracing::info!("Auto-matched all slices. Review and adjust as needed.");
        Ok(count)
    }

    pub fn adjust(&mut self, source_index: usize, delta: i64) -> Result<Adjustment> {
        self.check_source_index(source_index)?;
        let finder = finder(&self.source, &self.target, self.axis)?;
        let outcome = self.map.adjust(
            source_index,
            delta,
            finder.target_slice_count(),
            &finder,
        )?;
        match outcome {
            Adjustment::Bootstrapped(entry) => tracing::info!(
                "Source {} had no correspondence, auto-matched to target {}",
                source_index,
                entry.target_index
            ),
            Adjustment::Shifted { entry, .. } => tracing::info!(
                "Adjusted: source {} → target {}",
                source_index,
                entry.target_index
            ),
        }
        Ok(outcome)
    }

    pub fn adjust_current(&mut self, delta: i64) -> Result<Adjustment> {
        self.adjust(self.current_slice, delta)
    }

    pub fn metadata(&self) -> MappingMetadata {
        MappingMetadata {
            axis: self.axis,
            source_shape: self.source.as_ref().map(|v| v.shape),
            target_shape: self.target.as_ref().map(|v| v.shape),
        }
    }

    pub fn document(&self) -> MappingDocument {
        MappingDocument::new(&self.map, &self.metadata())
    }

    pub fn export_to_path(&self, format: MappingFormat, path: impl AsRef<Path>) -> Result<()> {
        MappingCodec::write(format, path, &self.map, &self.metadata())
    }

    pub fn export<S: Storage + ?Sized>(
        &self,
        format: MappingFormat,
        storage: &S,
        file_name: &str,
    ) -> Result<PathBuf> {
        let content = MappingCodec::encode(format, &self.map, &self.metadata())?;
        let written = storage.write_file(file_name, content.as_bytes())?;
        tracing::info!("Exported mapping to: {}", written.display());
        tracing::info!("  Total correspondences: {}", self.map.len());
        Ok(written)
    }

    /// Replaces the map with one read from disk. A structured file must
    /// agree with the session on axis and on the shapes of attached volumes.
    pub fn import(&mut self, format: MappingFormat, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let (metadata, map) = MappingCodec::read(format, path)?;

        if let Some(metadata) = metadata {
            if metadata.axis != self.axis {
                return Err(RbsyncError::invalid_input(format!(
                    "mapping in {} was made along {}, session is on {}",
                    path.display(),
                    metadata.axis,
                    self.axis
                )));
            }
            check_shape("source", &self.source, metadata.source_shape)?;
            check_shape("target", &self.target, metadata.target_shape)?;
        }

        if let Some(source) = &self.source {
            let count = source.slice_count(self.axis);
            if let Some((index, _)) = map.iter().find(|(index, _)| *index >= count) {
                return Err(RbsyncError::invalid_input(format!(
                    "imported source slice {} is outside the {} source slices",
                    index, count
                )));
            }
        }
        if let Some(target) = &self.target {
            let count = target.slice_count(self.axis);
            if let Some((_, entry)) = map.iter().find(|(_, e)| e.target_index >= count) {
                return Err(RbsyncError::invalid_input(format!(
                    "imported target slice {} is outside the {} target slices",
                    entry.target_index, count
                )));
            }
        }

        let imported = map.len();
        self.map = map;
        tracing::info!("Imported {} correspondences from {}", imported, path.display());
        Ok(imported)
    }

    fn check_source_index(&self, index: usize) -> Result<()> {
        let count = self.source_slice_count()?;
        if index >= count {
            return Err(RbsyncError::invalid_input(format!(
                "source slice {} out of range, volume has {} slices along {}",
                index, count, self.axis
            )));
        }
        Ok(())
    }
}

fn require<'a>(volume: &'a Option<VolumeGeometry>, role: &str) -> Result<&'a VolumeGeometry> {
    volume.as_ref().ok_or_else(|| RbsyncError::VolumeNotLoaded {
        role: role.to_string(),
    })
}

// Takes the fields rather than `&self` so the map can be borrowed mutably
// alongside the finder.
fn finder<'a>(
    source: &'a Option<VolumeGeometry>,
    target: &Option<VolumeGeometry>,
    axis: Axis,
) -> Result<CorrespondenceFinder<'a>> {
    CorrespondenceFinder::new(require(source, "source")?, require(target, "target")?, axis)
}

fn check_shape(role: &str, volume: &Option<VolumeGeometry>, recorded: Option<[usize; 3]>) -> Result<()> {
    match (volume, recorded) {
        (Some(volume), Some(shape)) if volume.shape != shape => Err(RbsyncError::invalid_input(format!(
            "mapping was made for a {} volume of shape {:?}, loaded volume is {:?}",
            role, shape, volume.shape
        ))),
        _ => Ok(()),
    }
}
