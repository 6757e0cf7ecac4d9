use crate::domain::geometry::{AffineGeometry, VolumeGeometry};
use crate::domain::model::{Axis, SliceMatch};
use crate::domain::ports::SliceMatcher;
use crate::utils::error::{RbsyncError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestSlice {
    pub index: usize,
    pub distance: f64,
}

/// Closest target slice to `source_world_position` along `axis`.
///
/// Scans every target slice. On equal distances the lowest index wins.
pub fn find_nearest(
    source_world_position: f64,
    target_geometry: &AffineGeometry,
    axis: Axis,
    target_slice_count: usize,
) -> Result<NearestSlice> {
    check_inputs(source_world_position, target_slice_count)?;
    let positions = (0..target_slice_count)
        .map(|index| target_geometry.world_position(axis, index as i64));
    Ok(scan(source_world_position, positions))
}

fn check_inputs(source_world_position: f64, target_slice_count: usize) -> Result<()> {
    if target_slice_count == 0 {
        return Err(RbsyncError::invalid_input(
            "target slice count must be positive",
        ));
    }
    if !source_world_position.is_finite() {
        return Err(RbsyncError::invalid_input(format!(
            "source world position is not finite: {}",
            source_world_position
        )));
    }
    Ok(())
}

// Caller guarantees at least one position.
fn scan(source_world_position: f64, positions: impl Iterator<Item = f64>) -> NearestSlice {
    let mut best = NearestSlice {
        index: 0,
        distance: f64::INFINITY,
    };
    for (index, position) in positions.enumerate() {
        let distance = (position - source_world_position).abs();
        if distance < best.distance {
            best = NearestSlice { index, distance };
        }
    }
    best
}

/// World positions of every target slice along one axis, computed once so a
/// bulk match does not redo the matrix product per source slice.
#[derive(Debug, Clone)]
pub struct TargetSlices {
    axis: Axis,
    positions: Vec<f64>,
}

impl TargetSlices {
    pub fn new(target_geometry: &AffineGeometry, axis: Axis, target_slice_count: usize) -> Result<Self> {
        if target_slice_count == 0 {
            return Err(RbsyncError::invalid_input(
                "target slice count must be positive",
            ));
        }
        let positions = (0..target_slice_count)
            .map(|index| target_geometry.world_position(axis, index as i64))
            .collect();
        Ok(Self { axis, positions })
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn nearest(&self, source_world_position: f64) -> Result<NearestSlice> {
        check_inputs(source_world_position, self.positions.len())?;
        Ok(scan(source_world_position, self.positions.iter().copied()))
    }
}

/// Matches slices of a source volume against a fixed target volume.
#[derive(Debug, Clone)]
pub struct CorrespondenceFinder<'a> {
    source: &'a VolumeGeometry,
    targets: TargetSlices,
}

impl<'a> CorrespondenceFinder<'a> {
    pub fn new(source: &'a VolumeGeometry, target: &VolumeGeometry, axis: Axis) -> Result<Self> {
        let targets = TargetSlices::new(&target.affine, axis, target.slice_count(axis))?;
        Ok(Self { source, targets })
    }

    pub fn axis(&self) -> Axis {
        self.targets.axis()
    }

    pub fn source_slice_count(&self) -> usize {
        self.source.slice_count(self.axis())
    }

    pub fn target_slice_count(&self) -> usize {
        self.targets.len()
    }

    pub fn find(&self, source_index: usize) -> Result<SliceMatch> {
        let source_position = self.source.world_position(self.axis(), source_index);
        let nearest = self.targets.nearest(source_position)?;
        let slice_match = SliceMatch {
            source_index,
            source_position,
            target_index: nearest.index,
            distance: nearest.distance,
        };
        tracing::debug!("{}", slice_match.diagnostic());
        Ok(slice_match)
    }
}

impl SliceMatcher for CorrespondenceFinder<'_> {
    fn match_slice(&self, source_index: usize) -> Result<usize> {
        self.find(source_index).map(|m| m.target_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn si_volume(spacing: f64, origin: f64, slices: usize) -> VolumeGeometry {
        let affine =
            AffineGeometry::from_spacing_and_origin([1.0, 1.0, spacing], [0.0, 0.0, origin]).unwrap();
        VolumeGeometry::new(affine, [10, 10, slices]).unwrap()
    }

    #[test]
    fn test_find_nearest_exact_hit() {
        let target = si_volume(0.25, -5.0, 40);
        let source_position = si_volume(2.0, -5.0, 6).world_position(Axis::SuperiorInferior, 3);
        assert_eq!(source_position, 1.0);

        let nearest = find_nearest(source_position, &target.affine, Axis::SuperiorInferior, 40).unwrap();
        assert_eq!(nearest.index, 24);
        assert_eq!(nearest.distance, 0.0);
    }

    #[test]
    fn test_find_nearest_tie_keeps_lowest_index() {
        // Target slices at 0.0, 1.0, 2.0; 0.5 is equidistant from slices 0 and 1.
        let target = AffineGeometry::identity();
        let nearest = find_nearest(0.5, &target, Axis::AnteriorPosterior, 3).unwrap();
        assert_eq!(nearest.index, 0);
        assert_eq!(nearest.distance, 0.5);

        let nearest = find_nearest(1.5, &target, Axis::AnteriorPosterior, 3).unwrap();
        assert_eq!(nearest.index, 1);
    }

    #[test]
    fn test_find_nearest_tie_with_flipped_axis() {
        // Descending positions: slice 0 at 1.0, slice 1 at 0.0.
        let target = AffineGeometry::from_spacing_and_origin([1.0, 1.0, -1.0], [0.0, 0.0, 1.0]).unwrap();
        let nearest = find_nearest(0.5, &target, Axis::SuperiorInferior, 2).unwrap();
        assert_eq!(nearest.index, 0);
    }

    #[test]
    fn test_find_nearest_beyond_extent_picks_edge() {
        let target = AffineGeometry::identity();
        let nearest = find_nearest(100.0, &target, Axis::LeftRight, 5).unwrap();
        assert_eq!(nearest.index, 4);
        assert_eq!(nearest.distance, 96.0);
    }

    #[test]
    fn test_find_nearest_rejects_zero_slices() {
        let result = find_nearest(0.0, &AffineGeometry::identity(), Axis::SuperiorInferior, 0);
        assert!(matches!(result, Err(RbsyncError::InvalidInput { .. })));
    }

    #[test]
    fn test_find_nearest_rejects_nan_position() {
        let result = find_nearest(f64::NAN, &AffineGeometry::identity(), Axis::SuperiorInferior, 4);
        assert!(matches!(result, Err(RbsyncError::InvalidInput { .. })));
    }

    #[test]
    fn test_target_slices_agree_with_linear_scan() {
        let target = si_volume(0.3, -7.1, 57);
        let slices = TargetSlices::new(&target.affine, Axis::SuperiorInferior, 57).unwrap();
        for step in -40..80 {
            let position = step as f64 * 0.17;
            let cached = slices.nearest(position).unwrap();
            let direct = find_nearest(position, &target.affine, Axis::SuperiorInferior, 57).unwrap();
            assert_eq!(cached, direct);
        }
    }

    #[test]
    fn test_find_is_deterministic() {
        let source = si_volume(2.0, -5.0, 6);
        let target = si_volume(0.25, -5.0, 40);
        let finder = CorrespondenceFinder::new(&source, &target, Axis::SuperiorInferior).unwrap();
        let first: Vec<_> = (0..6).map(|i| finder.find(i).unwrap()).collect();
        let second: Vec<_> = (0..6).map(|i| finder.find(i).unwrap()).collect();
        assert_eq!(first, second);
        assert_eq!(
            first.iter().map(|m| m.target_index).collect::<Vec<_>>(),
            vec![0, 8, 16, 24, 32, 39]
        );
    }
}
