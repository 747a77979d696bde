//! Sphere geometry and the fixed camera the globe pass is drawn with.
//!
//! Texture coordinates are equirectangular: `u` runs west to east starting at
//! longitude -180°, `v` runs from the north pole (`0`) to the south pole (`1`),
//! so the top row of every flow texture lands on the north pole.

use std::f32::consts::{PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

/// One vertex of the sphere mesh, laid out as the globe program's attributes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlobeVertex {
    pub model_coord: [f32; 3],
    pub tex_coord: [f32; 2],
}

/// Latitude/longitude sphere of radius 1 centred at the origin.
#[derive(Debug, Clone)]
pub struct SphereMesh {
    pub vertices: Vec<GlobeVertex>,
    pub indices: Vec<u32>,
}

impl SphereMesh {
    pub const DEFAULT_STACKS: u32 = 64;
    pub const DEFAULT_SLICES: u32 = 128;

    pub fn new(stacks: u32, slices: u32) -> Self {
        let stacks = stacks.max(2);
        let slices = slices.max(3);

        let mut vertices = Vec::with_capacity(((stacks + 1) * (slices + 1)) as usize);
        for stack in 0..=stacks {
            let v = stack as f32 / stacks as f32;
            for slice in 0..=slices {
                let u = slice as f32 / slices as f32;
                vertices.push(GlobeVertex {
                    model_coord: sphere_point(Vec2::new(u, v)).to_array(),
                    tex_coord: [u, v],
                });
            }
        }

        // Seam column is duplicated so `u` can reach 1.0 without wrapping.
        let row = slices + 1;
        let mut indices = Vec::with_capacity((stacks * slices * 6) as usize);
        for stack in 0..stacks {
            for slice in 0..slices {
                let top_left = stack * row + slice;
                let bottom_left = top_left + row;
                indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_left + 1,
                    top_left + 1,
                    bottom_left,
                    bottom_left + 1,
                ]);
            }
        }

        Self { vertices, indices }
    }
}

impl Default for SphereMesh {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STACKS, Self::DEFAULT_SLICES)
    }
}

/// Point on the unit sphere for an equirectangular texture coordinate.
pub fn sphere_point(tex: Vec2) -> Vec3 {
    let longitude = tex.x * TAU - PI;
    let polar = tex.y * PI;
    Vec3::new(
        polar.sin() * longitude.sin(),
        polar.cos(),
        polar.sin() * longitude.cos(),
    )
}

/// Inverse of [`sphere_point`] for a point on the unit sphere.
pub fn sphere_tex_coord(point: Vec3) -> Vec2 {
    let longitude = point.x.atan2(point.z);
    let polar = point.y.clamp(-1.0, 1.0).acos();
    Vec2::new((longitude + PI) / TAU, polar / PI)
}

/// Fixed model-view and projection matrices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub model_view: Mat4,
    pub projection: Mat4,
}

impl Camera {
    pub const DISTANCE: f32 = 3.0;
    pub const FOV_Y_DEGREES: f32 = 45.0;

    /// Looks at the globe from the equator, `longitude` radians east of 0°.
    pub fn looking_at(longitude: f32, aspect: f32) -> Self {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, Self::DISTANCE), Vec3::ZERO, Vec3::Y);
        let model = Mat4::from_rotation_y(-longitude);
        Self {
            model_view: view * model,
            projection: Mat4::perspective_rh(
                Self::FOV_Y_DEGREES.to_radians(),
                aspect.max(f32::EPSILON),
                0.1,
                100.0,
            ),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.model_view
    }

    /// Clip-space position of a model coordinate, as the globe vertex stage computes it.
    pub fn clip_position(&self, model_coord: Vec3) -> glam::Vec4 {
        self.view_projection() * model_coord.extend(1.0)
    }

    /// Texture coordinate of the sphere surface visible at an NDC position.
    ///
    /// `None` where the ray misses the globe.
    pub fn tex_coord_at(&self, ndc: Vec2) -> Option<Vec2> {
        let inverse = self.view_projection().inverse();
        let near = inverse * ndc.extend(0.0).extend(1.0);
        let far = inverse * ndc.extend(1.0).extend(1.0);
        let origin = near.xyz() / near.w;
        let direction = (far.xyz() / far.w - origin).normalize_or_zero();

        // |origin + t * direction| = 1, nearest positive root.
        let b = origin.dot(direction);
        let c = origin.length_squared() - 1.0;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let t = -b - discriminant.sqrt();
        if t < 0.0 {
            return None;
        }
        Some(sphere_tex_coord(origin + direction * t))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::looking_at(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_has_expected_topology() {
        let mesh = SphereMesh::new(4, 8);
        assert_eq!(mesh.vertices.len(), 5 * 9);
        assert_eq!(mesh.indices.len(), 4 * 8 * 6);
        assert!(mesh
            .indices
            .iter()
            .all(|&index| (index as usize) < mesh.vertices.len()));
        for vertex in &mesh.vertices {
            let length = Vec3::from_array(vertex.model_coord).length();
            assert!((length - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn tex_coords_round_trip_away_from_the_seam() {
        for &(u, v) in &[(0.25, 0.5), (0.5, 0.25), (0.75, 0.8), (0.1, 0.1)] {
            let tex = Vec2::new(u, v);
            let back = sphere_tex_coord(sphere_point(tex));
            assert!((back - tex).abs().max_element() < 1e-5, "{tex} -> {back}");
        }
    }

    #[test]
    fn north_pole_is_the_top_row() {
        let pole = sphere_point(Vec2::new(0.3, 0.0));
        assert!((pole - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn default_camera_sees_longitude_zero_at_the_centre() {
        let camera = Camera::default();
        let tex = camera.tex_coord_at(Vec2::ZERO).unwrap();
        assert!((tex - Vec2::new(0.5, 0.5)).abs().max_element() < 1e-4);
        assert!(camera.tex_coord_at(Vec2::new(0.99, 0.99)).is_none());

        let clip = camera.clip_position(Vec3::Z);
        let ndc = clip.xyz() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..1.0).contains(&ndc.z));
    }
}
