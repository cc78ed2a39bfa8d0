use glam::Vec3;

/// A directional light at infinity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    /// RGB in `[0, 1]`.
    pub colour: Vec3,
    /// Unit vector towards the light, in eye space.
    pub direction: Vec3,
}

impl Default for Light {
    /// Grey light shining from behind the camera.
    fn default() -> Self {
        Light {
            colour: Vec3::splat(0.6),
            direction: Vec3::Z,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lighting {
    /// RGB in `[0, 1]`.
    pub ambient: Vec3,
    pub lights: Vec<Light>,
}

impl Default for Lighting {
    fn default() -> Self {
        Lighting {
            ambient: Vec3::splat(0.4),
            lights: vec![Light::default()],
        }
    }
}

impl Lighting {
    /// Lit colour of a surface with unit normal `normal` and alpha-weighted
    /// colour `surf_colour` in `[0, 255]`.
    ///
    /// `specular` scales a Gaussian highlight around the mirror direction of
    /// each light. Zero disables it.
    pub fn shade(&self, normal: Vec3, surf_colour: Vec3, specular: f32) -> Vec3 {
        let mut acc = surf_colour * self.ambient;
        for light in &self.lights {
            let fac = normal.dot(light.direction);
            if fac <= 0.0 {
                continue;
            }
            acc += surf_colour * light.colour * fac;
            if specular > 0.0 {
                let refl = normal * (fac * 2.0) - light.direction;
                if refl.z > 0.0 {
                    let delta_sqr = refl.x * refl.x + refl.y * refl.y;
                    acc += Vec3::splat(255.0 * specular * (-delta_sqr * 32.0).exp());
                }
            }
        }
        acc
    }
}

#[cfg(test)]
mod test {
    use glam::{Vec3, vec3};

    use super::{Light, Lighting};
    use crate::macros::assert_vec_eq;

    #[test]
    fn t_default_lighting() {
        let lighting = Lighting::default();
        let c = Vec3::splat(230.0);
        // Facing the light: ambient plus full diffuse.
        assert_vec_eq!(lighting.shade(Vec3::Z, c, 0.0), Vec3::splat(230.0), 1e-3);
        // Facing away: ambient only.
        assert_vec_eq!(lighting.shade(-Vec3::Z, c, 0.0), Vec3::splat(92.0), 1e-3);
        // The highlight peaks along the mirror direction.
        assert_vec_eq!(lighting.shade(Vec3::Z, c, 1.0), Vec3::splat(485.0), 1e-3);
    }

    #[test]
    fn t_coloured_light() {
        let lighting = Lighting {
            ambient: Vec3::ZERO,
            lights: vec![Light {
                colour: vec3(1.0, 0.0, 0.5),
                direction: Vec3::X,
            }],
        };
        let n = vec3(1.0, 0.0, 1.0).normalize();
        let out = lighting.shade(n, Vec3::splat(100.0), 0.0);
        let fac = std::f32::consts::FRAC_1_SQRT_2;
        assert_vec_eq!(out, vec3(100.0 * fac, 0.0, 50.0 * fac), 1e-3);
    }
}
