//! HMD matrix layouts to `glam::Mat4`.
//!
//! VR runtimes hand out row-major matrices: 3×4 affine transforms for poses
//! and eye offsets (translation in the last column), 4×4 for projections.
//! `Mat4` is column-major.

use glam::{Mat4, Vec4};

/// Row-major 3×4 affine transform; the implicit fourth row is `0 0 0 1`.
pub fn mat4_from_hmd34(m: &[[f32; 4]; 3]) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(m[0][0], m[1][0], m[2][0], 0.0),
        Vec4::new(m[0][1], m[1][1], m[2][1], 0.0),
        Vec4::new(m[0][2], m[1][2], m[2][2], 0.0),
        Vec4::new(m[0][3], m[1][3], m[2][3], 1.0),
    )
}

/// Row-major 4×4 matrix.
pub fn mat4_from_hmd44(m: &[[f32; 4]; 4]) -> Mat4 {
    Mat4::from_cols_array_2d(m).transpose()
}

/// Inverse of [`mat4_from_hmd34`]; drops the bottom row.
pub fn hmd34_from_mat4(m: Mat4) -> [[f32; 4]; 3] {
    let r = m.transpose().to_cols_array_2d();
    [r[0], r[1], r[2]]
}
