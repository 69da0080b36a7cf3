use bevy_math::Mat4;
use bevy_math::Vec3;

/// Per-frame shader constants. Constant buffer views must be 256-byte
/// aligned, so the struct is padded to exactly that.
///
/// `bevy_math` matrices are column-major, which is also HLSL's default
/// packing, so shaders multiply `mul(matrix, vector)`.
#[repr(C, align(256))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub world: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
}

pub const EYE_POSITION: Vec3 = Vec3::new(0.0, 0.0, 5.0);
pub const FOV_Y_DEGREES: f32 = 37.5;
pub const NEAR_PLANE: f32 = 1.0;
pub const FAR_PLANE: f32 = 1000.0;

impl Transform {
    /// Identity world, camera on +Z looking at the origin.
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            world: Mat4::IDENTITY,
            view: Mat4::look_at_rh(EYE_POSITION, Vec3::ZERO, Vec3::Y),
            proj: Mat4::perspective_rh(
                FOV_Y_DEGREES.to_radians(),
                aspect_ratio,
                NEAR_PLANE,
                FAR_PLANE,
            ),
        }
    }
}

/// Spins the model around Y by a fixed step per rendered frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotation {
    angle: f32,
}

impl Rotation {
    pub const STEP: f32 = 0.025;

    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Advances one frame and returns the new world matrix.
    pub fn advance(&mut self) -> Mat4 {
        self.angle += Self::STEP;
        Mat4::from_rotation_y(self.angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::Vec4;

    #[test]
    fn transform_fills_one_constant_buffer_slot() {
        assert_eq!(std::mem::size_of::<Transform>(), 256);
        assert_eq!(std::mem::align_of::<Transform>(), 256);
    }

    #[test]
    fn origin_projects_to_center_in_front_of_camera() {
        let transform = Transform::new(16.0 / 9.0);
        let clip = transform.proj * transform.view * transform.world * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0, "depth {} outside [0, 1]", ndc.z);
    }

    #[test]
    fn near_and_far_planes_map_to_depth_range() {
        let transform = Transform::new(1.0);
        let near = transform.proj * Vec4::new(0.0, 0.0, -NEAR_PLANE, 1.0);
        let far = transform.proj * Vec4::new(0.0, 0.0, -FAR_PLANE, 1.0);
        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn rotation_advances_by_fixed_step() {
        let mut rotation = Rotation::default();
        let first = rotation.advance();
        assert!((rotation.angle() - Rotation::STEP).abs() < 1e-7);
        assert_eq!(first, Mat4::from_rotation_y(Rotation::STEP));

        for _ in 0..39 {
            rotation.advance();
        }
        assert!((rotation.angle() - 1.0).abs() < 1e-4);
    }
}
