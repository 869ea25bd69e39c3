use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_half_extents(center: DVec3, half: DVec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> DVec3 {
        (self.max - self.min) * 0.5
    }

    pub fn translated(&self, offset: DVec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Sphere/box overlap via the closest point on the box.
    pub fn intersects_sphere(&self, center: DVec3, radius: f64) -> bool {
        let closest = center.clamp(self.min, self.max);
        (closest - center).length_squared() <= radius * radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_intersects() {
        let a = Aabb::new(DVec3::ZERO, DVec3::splat(10.0));
        let b = Aabb::new(DVec3::splat(5.0), DVec3::splat(15.0));
        let c = Aabb::new(DVec3::splat(11.0), DVec3::splat(12.0));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_aabb_union_and_center() {
        let a = Aabb::new(DVec3::ZERO, DVec3::splat(2.0));
        let b = Aabb::new(DVec3::splat(4.0), DVec3::splat(6.0));
        let u = a.union(&b);
        assert_eq!(u.min, DVec3::ZERO);
        assert_eq!(u.max, DVec3::splat(6.0));
        assert_eq!(u.center(), DVec3::splat(3.0));
    }

    #[test]
    fn test_sphere_overlap() {
        let a = Aabb::new(DVec3::ZERO, DVec3::splat(2.0));
        assert!(a.intersects_sphere(DVec3::new(3.0, 1.0, 1.0), 1.5));
        assert!(!a.intersects_sphere(DVec3::new(5.0, 1.0, 1.0), 1.5));
    }
}
