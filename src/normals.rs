use glam::Vec3;

use crate::{mesh::Mesh, surface::Surface};

/// Normals of the facets of one surface.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FacetNormals {
    pub tri: Vec<Vec3>,
    pub quad: Vec<Vec3>,
}

impl FacetNormals {
    /// Normal of the tri-equivalent at `idx`. Both halves of a quad share the
    /// quad normal.
    pub fn tri_equiv(&self, idx: usize) -> Vec3 {
        if idx < self.tri.len() {
            self.tri[idx]
        } else {
            self.quad[(idx - self.tri.len()) / 2]
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normals {
    /// One entry per surface.
    pub facet: Vec<FacetNormals>,
    /// One entry per vertex.
    pub vert: Vec<Vec3>,
}

/// Unit normal of a triangle, following the right hand rule. Zero for a
/// degenerate triangle.
pub fn tri_normal(verts: &[Vec3], [a, b, c]: [u32; 3]) -> Vec3 {
    let v0 = verts[a as usize];
    (verts[b as usize] - v0)
        .cross(verts[c as usize] - v0)
        .normalize_or_zero()
}

/// Unit normal of a polygon using Newell's method, which stays well defined
/// for non-planar quads. Zero for a degenerate polygon.
pub fn polygon_normal(verts: &[Vec3], poly: &[u32]) -> Vec3 {
    if poly.len() < 3 {
        return Vec3::ZERO;
    }
    let n = poly
        .iter()
        .zip(poly.iter().cycle().skip(1))
        .fold(Vec3::ZERO, |n, (&i, &j)| {
            let pc = verts[i as usize];
            let pn = verts[j as usize];
            let (a, b) = (pc - pn, pc + pn);
            n + Vec3::new(a.y * b.z, a.z * b.x, a.x * b.y)
        });
    n.normalize_or_zero()
}

/// Facet normals of every surface and vertex normals for the given positions.
///
/// A vertex normal is the normalized, unweighted sum of the normals of the
/// facets using it. Vertices with no facets, or only degenerate ones, get a
/// zero normal.
pub fn calc_normals(surfaces: &[Surface], verts: &[Vec3]) -> Normals {
    let mut vert = vec![Vec3::ZERO; verts.len()];
    let facet = surfaces
        .iter()
        .map(|surf| {
            let tri: Vec<Vec3> = surf
                .tris
                .vert_inds
                .iter()
                .map(|&t| tri_normal(verts, t))
                .collect();
            let quad: Vec<Vec3> = surf
                .quads
                .vert_inds
                .iter()
                .map(|q| polygon_normal(verts, q))
                .collect();
            for (t, n) in surf.tris.vert_inds.iter().zip(&tri) {
                for &i in t {
                    vert[i as usize] += *n;
                }
            }
            for (q, n) in surf.quads.vert_inds.iter().zip(&quad) {
                for &i in q {
                    vert[i as usize] += *n;
                }
            }
            FacetNormals { tri, quad }
        })
        .collect();
    for n in &mut vert {
        *n = n.normalize_or_zero();
    }
    Normals { facet, vert }
}

impl Mesh {
    /// Normals for the current vertex positions.
    pub fn normals(&self) -> Normals {
        calc_normals(&self.surfaces, &self.verts)
    }
}

#[cfg(test)]
mod test {
    use glam::{Vec3, vec3};

    use super::{polygon_normal, tri_normal};
    use crate::{
        macros::{assert_f32_eq, assert_vec_eq},
        mesh::Mesh,
    };

    #[test]
    fn t_tri_and_quad_normals() {
        let verts = [
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(1.0, 1.0, 0.0),
            vec3(0.0, 1.0, 0.0),
        ];
        assert_vec_eq!(tri_normal(&verts, [0, 1, 2]), Vec3::Z);
        assert_vec_eq!(tri_normal(&verts, [0, 2, 1]), -Vec3::Z);
        assert_vec_eq!(polygon_normal(&verts, &[0, 1, 2, 3]), Vec3::Z);
        assert_vec_eq!(polygon_normal(&verts, &[0, 3, 2, 1]), -Vec3::Z);
    }

    #[test]
    fn t_degenerate_normals() {
        let verts = [Vec3::ZERO, Vec3::X, Vec3::X * 2.0, Vec3::Y * 5.0];
        assert_eq!(tri_normal(&verts, [0, 1, 2]), Vec3::ZERO);
        assert_eq!(polygon_normal(&verts, &[0, 1]), Vec3::ZERO);
        // Vertex 3 is not used by any facet, the others only by a degenerate one.
        let mesh = Mesh::from_tris(verts.to_vec(), vec![[0, 1, 2]]).expect("Cannot create mesh");
        let normals = mesh.normals();
        assert!(normals.vert.iter().all(|n| *n == Vec3::ZERO));
    }

    #[test]
    fn t_cube_normals_point_outward() {
        let cube = Mesh::cube(false);
        let normals = cube.normals();
        let centre = Vec3::ZERO;
        let surf = &cube.surfaces[0];
        for (q, n) in surf.quads.vert_inds.iter().zip(&normals.facet[0].quad) {
            let c = q.iter().map(|&i| cube.verts[i as usize]).sum::<Vec3>() / 4.0;
            assert!(n.dot(c - centre) > 0.0);
            assert_f32_eq!(n.length(), 1.0, 1e-6);
        }
        for (v, n) in cube.verts.iter().zip(&normals.vert) {
            // Corner normals point along the diagonal.
            assert_vec_eq!(*n, v.normalize());
        }
        assert_vec_eq!(normals.facet[0].tri_equiv(3), normals.facet[0].quad[1]);
    }
}
