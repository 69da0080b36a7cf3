//! Static geometry used by the textured-quad demo.

use bytemuck::Pod;
use bytemuck::Zeroable;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PositionTexture {
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl PositionTexture {
    pub const fn new(position: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            tex_coord,
        }
    }
}

/// Unit quad in the XY plane, texture origin in the top-left corner.
pub const QUAD_VERTICES: [PositionTexture; 4] = [
    PositionTexture::new([-1.0, 1.0, 0.0], [0.0, 0.0]),
    PositionTexture::new([1.0, 1.0, 0.0], [1.0, 0.0]),
    PositionTexture::new([1.0, -1.0, 0.0], [1.0, 1.0]),
    PositionTexture::new([-1.0, -1.0, 0.0], [0.0, 1.0]),
];

pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_stride_is_twenty_bytes() {
        assert_eq!(std::mem::size_of::<PositionTexture>(), 20);
        assert_eq!(bytemuck::cast_slice::<_, u8>(&QUAD_VERTICES).len(), 80);
    }

    #[test]
    fn indices_cover_both_triangles_with_same_winding() {
        assert!(QUAD_INDICES.iter().all(|&i| (i as usize) < QUAD_VERTICES.len()));
        let signed_area = |tri: &[u32]| {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| QUAD_VERTICES[i as usize].position);
            (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])
        };
        let areas: Vec<f32> = QUAD_INDICES.chunks(3).map(signed_area).collect();
        assert_eq!(areas.len(), 2);
        assert!(areas.iter().all(|&area| area < 0.0));
        assert!((areas.iter().sum::<f32>().abs() - 8.0).abs() < 1e-6);
    }
}
