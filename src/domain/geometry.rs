use crate::domain::model::Axis;
use crate::utils::error::{RbsyncError, Result};
use ndarray::{Array1, Array2};

const BOTTOM_ROW: [f64; 4] = [0.0, 0.0, 0.0, 1.0];
const BOTTOM_ROW_TOLERANCE: f64 = 1e-9;

/// Voxel-to-world transform of one volume, stored as a row-major 4×4
/// homogeneous matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineGeometry {
    matrix: Array2<f64>,
}

impl AffineGeometry {
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Result<Self> {
        Self::from_array(Array2::from_shape_fn((4, 4), |(r, c)| rows[r][c]))
    }

    pub fn from_array(matrix: Array2<f64>) -> Result<Self> {
        if matrix.dim() != (4, 4) {
            return Err(RbsyncError::invalid_input(format!(
                "affine must be 4x4, got {:?}",
                matrix.dim()
            )));
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(RbsyncError::invalid_input(
                "affine contains non-finite values",
            ));
        }
        let bottom_ok = matrix
            .row(3)
            .iter()
            .zip(BOTTOM_ROW)
            .all(|(v, expected)| (v - expected).abs() <= BOTTOM_ROW_TOLERANCE);
        if !bottom_ok {
            return Err(RbsyncError::invalid_input(format!(
                "affine bottom row must be [0, 0, 0, 1], got {}",
                matrix.row(3)
            )));
        }
        Ok(Self { matrix })
    }

    pub fn identity() -> Self {
        Self {
            matrix: Array2::eye(4),
        }
    }

    /// Diagonal scaling plus translation, the shape of most scanner affines
    /// without oblique acquisition.
    pub fn from_spacing_and_origin(spacing: [f64; 3], origin: [f64; 3]) -> Result<Self> {
        Self::from_rows([
            [spacing[0], 0.0, 0.0, origin[0]],
            [0.0, spacing[1], 0.0, origin[1]],
            [0.0, 0.0, spacing[2], origin[2]],
            BOTTOM_ROW,
        ])
    }

    /// World coordinate along `axis` of the plane holding slice `slice_index`.
    ///
    /// Only the `axis` component of the transformed voxel is kept, and the
    /// other two voxel coordinates are pinned at zero. Rotation or shear
    /// between the volumes is therefore not accounted for.
    pub fn world_position(&self, axis: Axis, slice_index: i64) -> f64 {
        let mut voxel = Array1::<f64>::zeros(4);
        voxel[axis.index()] = slice_index as f64;
        voxel[3] = 1.0;

        let world = self.matrix.dot(&voxel);
        world[axis.index()]
    }

    pub fn rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for ((r, c), value) in self.matrix.indexed_iter() {
            rows[r][c] = *value;
        }
        rows
    }
}

/// Everything the matching engine needs to know about a loaded volume.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGeometry {
    pub affine: AffineGeometry,
    pub shape: [usize; 3],
}

impl VolumeGeometry {
    pub fn new(affine: AffineGeometry, shape: [usize; 3]) -> Result<Self> {
        if let Some(axis) = shape.iter().position(|&extent| extent == 0) {
            return Err(RbsyncError::invalid_input(format!(
                "volume shape {:?} has zero extent along axis {}",
                shape, axis
            )));
        }
        Ok(Self { affine, shape })
    }

    pub fn slice_count(&self, axis: Axis) -> usize {
        self.shape[axis.index()]
    }

    pub fn world_position(&self, axis: Axis, slice_index: usize) -> f64 {
        self.affine.world_position(axis, slice_index as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn si_affine(spacing: f64, origin: f64) -> AffineGeometry {
        AffineGeometry::from_spacing_and_origin([1.0, 1.0, spacing], [0.0, 0.0, origin]).unwrap()
    }

    #[test]
    fn test_world_position_along_slicing_axis() {
        let affine = si_affine(2.0, -5.0);
        assert_eq!(affine.world_position(Axis::SuperiorInferior, 0), -5.0);
        assert_eq!(affine.world_position(Axis::SuperiorInferior, 3), 1.0);
        assert_eq!(affine.world_position(Axis::SuperiorInferior, -1), -7.0);
    }

    #[test]
    fn test_world_position_ignores_other_axes_columns() {
        // Shear terms in the SI row only see the zeroed in-plane voxel coordinates.
        let affine = AffineGeometry::from_rows([
            [1.0, 0.0, 0.5, 10.0],
            [0.0, 1.0, 0.0, 20.0],
            [0.3, 0.7, 2.0, 30.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
        .unwrap();
        assert_eq!(affine.world_position(Axis::SuperiorInferior, 4), 38.0);
        assert_eq!(affine.world_position(Axis::AnteriorPosterior, 4), 14.0);
        assert_eq!(affine.world_position(Axis::LeftRight, 4), 24.0);
    }

    #[test]
    fn test_rejects_non_affine_bottom_row() {
        let result = AffineGeometry::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0, 1.0],
        ]);
        assert!(matches!(result, Err(RbsyncError::InvalidInput { .. })));
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let result = AffineGeometry::from_array(Array2::eye(3));
        assert!(result.is_err());
    }

    #[test]
    fn test_rows_round_trip() {
        let affine = si_affine(0.25, -5.0);
        let rebuilt = AffineGeometry::from_rows(affine.rows()).unwrap();
        assert_eq!(rebuilt, affine);
    }

    #[test]
    fn test_volume_geometry_slice_count() {
        let volume = VolumeGeometry::new(AffineGeometry::identity(), [10, 12, 6]).unwrap();
        assert_eq!(volume.slice_count(Axis::AnteriorPosterior), 10);
        assert_eq!(volume.slice_count(Axis::LeftRight), 12);
        assert_eq!(volume.slice_count(Axis::SuperiorInferior), 6);
        assert!(VolumeGeometry::new(AffineGeometry::identity(), [10, 0, 6]).is_err());
    }
}
