use crate::domain::geometry::{AffineGeometry, VolumeGeometry};
use crate::utils::error::{RbsyncError, Result};
use nifti::NiftiHeader;
use std::path::Path;

/// Reads only the header of a `.nii`/`.nii.gz` file; voxel data is never
/// decoded.
pub fn load_volume_geometry(path: impl AsRef<Path>) -> Result<VolumeGeometry> {
    let path = path.as_ref();
    let header = NiftiHeader::from_file(path).map_err(|e| RbsyncError::Nifti {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let geometry = geometry_from_header(&header).map_err(|e| RbsyncError::Nifti {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::debug!(
        "Read {}: shape {:?}, affine {:?}",
        path.display(),
        geometry.shape,
        geometry.affine.rows()
    );
    Ok(geometry)
}

pub fn geometry_from_header(header: &NiftiHeader) -> Result<VolumeGeometry> {
    let ndim = header.dim[0] as usize;
    if !(3..=7).contains(&ndim) {
        return Err(RbsyncError::invalid_input(format!(
            "expected a 3D volume, header declares {} dimensions",
            ndim
        )));
    }
    let shape = [
        header.dim[1] as usize,
        header.dim[2] as usize,
        header.dim[3] as usize,
    ];
    VolumeGeometry::new(best_affine(header, shape)?, shape)
}

/// sform if set, then qform, then a centred scaling affine. Same precedence
/// as nibabel's `get_best_affine`.
fn best_affine(header: &NiftiHeader, shape: [usize; 3]) -> Result<AffineGeometry> {
    if header.sform_code > 0 {
        return AffineGeometry::from_rows([
            widen(header.srow_x),
            widen(header.srow_y),
            widen(header.srow_z),
            [0.0, 0.0, 0.0, 1.0],
        ]);
    }
    if header.qform_code > 0 {
        return qform_affine(header);
    }
    tracing::warn!("Header has neither sform nor qform, falling back to voxel scaling");
    base_affine(header, shape)
}

fn qform_affine(header: &NiftiHeader) -> Result<AffineGeometry> {
    let b = header.quatern_b as f64;
    let c = header.quatern_c as f64;
    let d = header.quatern_d as f64;
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();

    let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let dx = header.pixdim[1] as f64;
    let dy = header.pixdim[2] as f64;
    let dz = header.pixdim[3] as f64 * qfac;

    let r = [
        [
            a * a + b * b - c * c - d * d,
            2.0 * (b * c - a * d),
            2.0 * (b * d + a * c),
        ],
        [
            2.0 * (b * c + a * d),
            a * a + c * c - b * b - d * d,
            2.0 * (c * d - a * b),
        ],
        [
            2.0 * (b * d - a * c),
            2.0 * (c * d + a * b),
            a * a + d * d - b * b - c * c,
        ],
    ];
    let offset = [
        header.quatern_x as f64,
        header.quatern_y as f64,
        header.quatern_z as f64,
    ];

    let mut rows = [[0.0; 4]; 4];
    for i in 0..3 {
        rows[i] = [r[i][0] * dx, r[i][1] * dy, r[i][2] * dz, offset[i]];
    }
    rows[3] = [0.0, 0.0, 0.0, 1.0];
    AffineGeometry::from_rows(rows)
}

// x is flipped to radiological convention and the volume centre sits at the origin.
fn base_affine(header: &NiftiHeader, shape: [usize; 3]) -> Result<AffineGeometry> {
    let zooms = [
        -(header.pixdim[1] as f64),
        header.pixdim[2] as f64,
        header.pixdim[3] as f64,
    ];
    let mut origin = [0.0; 3];
    for i in 0..3 {
        origin[i] = -((shape[i] as f64 - 1.0) / 2.0) * zooms[i];
    }
    AffineGeometry::from_spacing_and_origin(zooms, origin)
}

fn widen(row: [f32; 4]) -> [f64; 4] {
    row.map(f64::from)
}
