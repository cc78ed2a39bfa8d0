use glam::{DVec2, DVec3, Quat, Vec2, Vec3};

/// Axis aligned bounding rectangle. Both corners are inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds2 {
    pub const UNIT: Bounds2 = Bounds2 {
        min: Vec2::ZERO,
        max: Vec2::ONE,
    };

    pub fn new(min: Vec2, max: Vec2) -> Self {
        Bounds2 { min, max }
    }

    /// Bounds of the given points, or `None` if there are no points.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Bounds2::new(first, first), |b, p| Bounds2 {
            min: b.min.min(p),
            max: b.max.max(p),
        }))
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn area(&self) -> f32 {
        let size = self.size();
        size.x * size.y
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.y >= self.min.y && p.x <= self.max.x && p.y <= self.max.y
    }
}

/// Bounding box of 3D points, as a `(min, max)` pair.
pub fn bounds3<I>(points: I) -> Option<(Vec3, Vec3)>
where
    I: IntoIterator<Item = Vec3>,
{
    let mut iter = points.into_iter();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
}

/// Element-wise 2D affine transform: independent scale and translation per
/// axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineEw2 {
    pub scale: Vec2,
    pub translation: Vec2,
}

impl Default for AffineEw2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineEw2 {
    pub const IDENTITY: AffineEw2 = AffineEw2 {
        scale: Vec2::ONE,
        translation: Vec2::ZERO,
    };

    pub fn new(scale: Vec2, translation: Vec2) -> Self {
        AffineEw2 { scale, translation }
    }

    /// The transform mapping `domain` onto `range`, corner to corner. A
    /// corner may be flipped by giving a range with `min > max`.
    pub fn from_bounds(domain: Bounds2, range: Bounds2) -> Self {
        let scale = (range.max - range.min) / (domain.max - domain.min);
        AffineEw2 {
            scale,
            translation: range.min - domain.min * scale,
        }
    }

    pub fn apply(&self, p: Vec2) -> Vec2 {
        p * self.scale + self.translation
    }

    pub fn inverse(&self) -> Self {
        let scale = self.scale.recip();
        AffineEw2 {
            scale,
            translation: -self.translation * scale,
        }
    }
}

/// Rotation, uniform scale and translation, applied in that order to
/// points: `rotation * (scale * p) + translation`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Similarity {
    pub scale: f32,
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Default for Similarity {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Similarity {
    pub const IDENTITY: Similarity = Similarity {
        scale: 1.0,
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    pub fn new(scale: f32, rotation: Quat, translation: Vec3) -> Self {
        Similarity {
            scale,
            rotation,
            translation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Similarity {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * (p * self.scale) + self.translation
    }

    /// Transform a direction or displacement, ignoring the translation.
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation * (v * self.scale)
    }

    /// Apply `other` first, then `self`.
    pub fn compose(&self, other: &Similarity) -> Similarity {
        Similarity {
            scale: self.scale * other.scale,
            rotation: self.rotation * other.rotation,
            translation: self.transform_point(other.translation),
        }
    }

    pub fn inverse(&self) -> Similarity {
        let rotation = self.rotation.inverse();
        let scale = 1.0 / self.scale;
        Similarity {
            scale,
            rotation,
            translation: rotation * (-self.translation * scale),
        }
    }
}

/// Barycentric coordinates of `point` relative to the triangle `(v0, v1, v2)`.
///
/// Computed in double precision. Returns `None` when the triangle is
/// degenerate, i.e. all segments from the point to the vertices are
/// colinear. The coordinates are all non-negative iff the point lies inside
/// the triangle or on its boundary, regardless of the winding.
pub fn barycentric(point: Vec2, v0: Vec2, v1: Vec2, v2: Vec2) -> Option<Vec3> {
    let p = point.as_dvec2();
    let u0: DVec2 = v0.as_dvec2() - p;
    let u1: DVec2 = v1.as_dvec2() - p;
    let u2: DVec2 = v2.as_dvec2() - p;
    let c0 = u1.perp_dot(u2);
    let c1 = u2.perp_dot(u0);
    let c2 = u0.perp_dot(u1);
    let d = c0 + c1 + c2;
    if d == 0.0 || !d.is_finite() {
        return None;
    }
    let bc = DVec3::new(c0 / d, c1 / d, c2 / d);
    if !bc.is_finite() {
        return None;
    }
    Some(bc.as_vec3())
}

#[cfg(test)]
mod test {
    use glam::{Quat, Vec2, vec2, vec3};

    use super::{AffineEw2, Bounds2, Similarity, barycentric, bounds3};
    use crate::macros::{assert_f32_eq, assert_vec_eq};

    #[test]
    fn t_barycentric_inside() {
        let (v0, v1, v2) = (vec2(0.0, 0.0), vec2(2.0, 0.0), vec2(0.0, 2.0));
        let bc = barycentric(vec2(0.5, 0.5), v0, v1, v2).expect("Triangle is not degenerate");
        assert_f32_eq!(bc.x + bc.y + bc.z, 1.0, 1e-6);
        assert!(bc.min_element() >= 0.0);
        let rpos = v0 * bc.x + v1 * bc.y + v2 * bc.z;
        assert_vec_eq!(rpos, vec2(0.5, 0.5));
        // Winding does not affect the sign.
        let bc2 = barycentric(vec2(0.5, 0.5), v0, v2, v1).expect("Triangle is not degenerate");
        assert_vec_eq!(bc2, vec3(bc.x, bc.z, bc.y));
    }

    #[test]
    fn t_barycentric_outside() {
        let bc = barycentric(
            vec2(3.0, 3.0),
            vec2(0.0, 0.0),
            vec2(2.0, 0.0),
            vec2(0.0, 2.0),
        )
        .expect("Triangle is not degenerate");
        assert!(bc.min_element() < 0.0);
    }

    #[test]
    fn t_barycentric_degenerate() {
        assert!(
            barycentric(
                vec2(0.5, 0.5),
                vec2(0.0, 0.0),
                vec2(1.0, 1.0),
                vec2(2.0, 2.0)
            )
            .is_none()
        );
    }

    #[test]
    fn t_affine_from_bounds() {
        let xf = AffineEw2::from_bounds(
            Bounds2::new(vec2(-1.0, -1.0), vec2(1.0, 1.0)),
            Bounds2::UNIT,
        );
        assert_vec_eq!(xf.apply(vec2(-1.0, -1.0)), Vec2::ZERO);
        assert_vec_eq!(xf.apply(vec2(1.0, 1.0)), Vec2::ONE);
        assert_vec_eq!(xf.apply(vec2(0.0, 0.0)), vec2(0.5, 0.5));
        let inv = xf.inverse();
        assert_vec_eq!(inv.apply(vec2(0.25, 0.75)), vec2(-0.5, 0.5));
    }

    #[test]
    fn t_similarity_inverse() {
        let sim = Similarity::new(
            2.0,
            Quat::from_rotation_y(0.7),
            vec3(1.0, -2.0, 3.0),
        );
        let p = vec3(0.3, 0.5, -0.9);
        let q = sim.inverse().transform_point(sim.transform_point(p));
        assert_vec_eq!(q, p);
        let composed = sim.compose(&sim.inverse());
        assert_vec_eq!(composed.transform_point(p), p);
    }

    #[test]
    fn t_bounds() {
        let b = Bounds2::from_points([vec2(1.0, 2.0), vec2(-1.0, 5.0), vec2(0.0, 0.0)])
            .expect("Points are not empty");
        assert_eq!(b.min, vec2(-1.0, 0.0));
        assert_eq!(b.max, vec2(1.0, 5.0));
        assert_f32_eq!(b.area(), 10.0);
        assert!(b.contains(vec2(1.0, 5.0)));
        assert!(!b.contains(vec2(1.1, 5.0)));
        assert!(Bounds2::from_points(std::iter::empty()).is_none());
        let (lo, hi) = bounds3([vec3(1.0, 2.0, 3.0), vec3(-1.0, 0.0, 4.0)])
            .expect("Points are not empty");
        assert_eq!(lo, vec3(-1.0, 0.0, 3.0));
        assert_eq!(hi, vec3(1.0, 2.0, 4.0));
    }
}
