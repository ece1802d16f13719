//! Placement of a scene node relative to its parent.

use cgmath::{ElementWise, One, Quaternion, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    pub fn at(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Place `child` (expressed in this transform's space) in the parent space.
    ///
    /// Non-uniform scale is applied per axis and does not shear rotated
    /// children.
    pub fn then(&self, child: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * self.scale.mul_element_wise(child.position),
            rotation: self.rotation * child.rotation,
            scale: self.scale.mul_element_wise(child.scale),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// glTF decomposes node transforms into `(translation, rotation xyzw, scale)`.
impl From<([f32; 3], [f32; 4], [f32; 3])> for Transform {
    fn from((position, [x, y, z, w], scale): ([f32; 3], [f32; 4], [f32; 3])) -> Self {
        Self {
            position: position.into(),
            // cgmath stores the scalar part first
            rotation: Quaternion::new(w, x, y, z),
            scale: scale.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Rotation3};

    use super::*;

    #[test]
    fn should_offset_children_by_the_parent_placement() {
        let parent = Transform {
            position: Vector3::new(1.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(2.0, 2.0, 2.0),
        };

        let world = parent.then(&Transform::at(Vector3::new(0.0, 3.0, 0.0)));

        assert_eq!(world.position, Vector3::new(1.0, 6.0, 0.0));
        assert_eq!(world.scale, Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn should_read_gltf_quaternions_as_xyzw() {
        let transform = Transform::from(([0.0; 3], [0.0, 0.0, 0.0, 1.0], [1.0; 3]));
        assert_eq!(transform, Transform::default());

        let quarter_turn = Quaternion::from_angle_y(Deg(90.0));
        let transform = Transform::from((
            [0.0; 3],
            [quarter_turn.v.x, quarter_turn.v.y, quarter_turn.v.z, quarter_turn.s],
            [1.0; 3],
        ));
        assert_eq!(transform.rotation, quarter_turn);
    }
}
