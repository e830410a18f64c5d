//! Bounding volumes and view frustum

use crate::foundation::math::{Mat4, Mat4Ext, Vec3, Vec4};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl BoundingBox {
    /// Create a box from its corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted box that any expansion replaces
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Smallest box containing every point
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut bounds = Self::empty();
        for p in points {
            bounds.expand_by_point(p);
        }
        bounds
    }

    /// True once at least one point has been added
    pub fn valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Grow to contain `p`
    pub fn expand_by_point(&mut self, p: &Vec3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grow to contain `other`
    pub fn expand_by_box(&mut self, other: &BoundingBox) {
        if other.valid() {
            self.min = self.min.inf(&other.min);
            self.max = self.max.sup(&other.max);
        }
    }

    /// Get the center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Index (0, 1, 2) of the longest axis
    pub fn longest_axis(&self) -> usize {
        self.size().imax()
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Slab test; returns the entry distance (0 when starting inside)
    pub fn intersect_ray(&self, origin: &Vec3, direction: &Vec3) -> Option<f32> {
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        for axis in 0..3 {
            if direction[axis] == 0.0 {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction[axis];
            let t1 = (self.min[axis] - origin[axis]) * inv;
            let t2 = (self.max[axis] - origin[axis]) * inv;
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }
        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }

    /// Bounding sphere enclosing the box
    pub fn sphere(&self) -> BoundingSphere {
        if !self.valid() {
            return BoundingSphere::empty();
        }
        BoundingSphere::new(self.center(), self.size().norm() * 0.5)
    }
}

/// Bounding sphere used for culling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Center
    pub center: Vec3,
    /// Radius, negative when empty
    pub radius: f32,
}

impl BoundingSphere {
    /// Create a sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// An empty sphere
    pub fn empty() -> Self {
        Self::new(Vec3::zeros(), -1.0)
    }

    /// True when the sphere encloses something
    pub fn valid(&self) -> bool {
        self.radius >= 0.0
    }

    /// Sphere transformed by `m`, radius scaled by the largest axis scale
    pub fn transformed(&self, m: &Mat4) -> Self {
        if !self.valid() {
            return *self;
        }
        let scale = (0..3)
            .map(|i| m.fixed_view::<3, 1>(0, i).norm())
            .fold(0.0_f32, f32::max);
        Self::new(m.transform_vec3(&self.center), self.radius * scale)
    }
}

/// Plane `normal . p + distance = 0`, normal pointing inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal
    pub normal: Vec3,
    /// Offset along the normal
    pub distance: f32,
}

impl Plane {
    /// Plane from unnormalized `(a, b, c, d)` coefficients
    pub fn from_coefficients(v: Vec4) -> Self {
        let normal = Vec3::new(v.x, v.y, v.z);
        let len = normal.norm();
        if len == 0.0 {
            return Self { normal: Vec3::zeros(), distance: 0.0 };
        }
        Self { normal: normal / len, distance: v.w / len }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Six clip planes (left, right, bottom, top, near, far)
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Planes pointing inwards
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract planes from a projection (or view-projection) matrix using the
    /// Gribb-Hartmann method. Planes live in the space the matrix maps from.
    pub fn from_matrix(m: &Mat4) -> Self {
        let row = |i: usize| Vec4::new(m[(i, 0)], m[(i, 1)], m[(i, 2)], m[(i, 3)]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r3 + r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// True if any part of the sphere may be visible
    pub fn contains_sphere(&self, sphere: &BoundingSphere) -> bool {
        if !sphere.valid() {
            return false;
        }
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(&sphere.center) >= -sphere.radius)
    }
}
