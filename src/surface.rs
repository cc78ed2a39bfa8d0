use std::sync::Arc;

use glam::Vec3;
use image::RgbaImage;

use crate::{
    error::Error,
    facet::{Quads, Tris, quad_half},
};

/// Surface appearance shared by all facets of a surface.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Material {
    pub albedo_map: Option<Arc<RgbaImage>>,
    /// The red channel scales the specular highlight.
    pub specular_map: Option<Arc<RgbaImage>>,
    pub shiny: bool,
}

/// A labelled point on a surface, anchored to one of its tri-equivalents.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfPoint {
    pub tri_equiv_idx: u32,
    pub weights: Vec3,
    pub label: String,
}

/// A named group of triangles and quads over the vertex and UV lists of a
/// mesh.
///
/// Facets are addressed as tri-equivalents: all triangles first, then two
/// triangles per quad. Quad `q` maps to tri-equivalents `2q` and `2q + 1`
/// after the triangles, see [`quad_half`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Surface {
    pub name: String,
    pub tris: Tris,
    pub quads: Quads,
    pub surf_points: Vec<SurfPoint>,
    pub material: Material,
}

impl Surface {
    pub fn new(name: impl Into<String>, tris: Tris, quads: Quads) -> Self {
        Surface {
            name: name.into(),
            tris,
            quads,
            ..Default::default()
        }
    }

    pub fn from_tris(tris: Tris) -> Self {
        Self::new("", tris, Quads::default())
    }

    pub fn from_quads(quads: Quads) -> Self {
        Self::new("", Tris::default(), quads)
    }

    pub fn num_tris(&self) -> usize {
        self.tris.len()
    }

    pub fn num_quads(&self) -> usize {
        self.quads.len()
    }

    pub fn num_facets(&self) -> usize {
        self.tris.len() + self.quads.len()
    }

    pub fn num_tri_equivs(&self) -> usize {
        self.tris.len() + 2 * self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tris.is_empty() && self.quads.is_empty()
    }

    /// Whether every facet of this surface has UV indices.
    pub fn has_uvs(&self) -> bool {
        !self.is_empty()
            && (self.tris.is_empty() || self.tris.has_uvs())
            && (self.quads.is_empty() || self.quads.has_uvs())
    }

    /// Vertex indices of the tri-equivalent at `idx`.
    pub fn tri_equiv(&self, idx: usize) -> [u32; 3] {
        let ntris = self.tris.len();
        if idx < ntris {
            self.tris.vert_inds[idx]
        } else {
            let q = idx - ntris;
            quad_half(self.quads.vert_inds[q / 2], (q % 2) as u32)
        }
    }

    /// UV indices of the tri-equivalent at `idx`, if that facet has UVs.
    pub fn tri_equiv_uvs(&self, idx: usize) -> Option<[u32; 3]> {
        let ntris = self.tris.len();
        if idx < ntris {
            self.tris.uvs_of(idx)
        } else {
            let q = idx - ntris;
            self.quads
                .uvs_of(q / 2)
                .map(|uvs| quad_half(uvs, (q % 2) as u32))
        }
    }

    /// All tri-equivalents in order. UVs are kept only if every facet has
    /// them.
    pub fn tri_equivs(&self) -> Tris {
        let n = self.num_tri_equivs();
        let vert_inds = (0..n).map(|i| self.tri_equiv(i)).collect();
        let uv_inds = if self.has_uvs() {
            (0..n).filter_map(|i| self.tri_equiv_uvs(i)).collect()
        } else {
            Vec::new()
        };
        Tris { vert_inds, uv_inds }
    }

    /// This surface with every quad split into its two tri-equivalents. The
    /// tri-equivalent order is unchanged, so surface points stay valid.
    pub fn as_tris(&self) -> Surface {
        Surface {
            name: self.name.clone(),
            tris: self.tri_equivs(),
            quads: Quads::default(),
            surf_points: self.surf_points.clone(),
            material: self.material.clone(),
        }
    }

    /// Copy of this surface with every vertex and UV index remapped.
    pub fn map_inds<V, U>(&self, vert_map: V, uv_map: U) -> Surface
    where
        V: Fn(u32) -> u32,
        U: Fn(u32) -> u32,
    {
        Surface {
            tris: self.tris.map_inds(&vert_map, &uv_map),
            quads: self.quads.map_inds(&vert_map, &uv_map),
            ..self.clone()
        }
    }

    /// Copy of this surface with all vertex and UV indices shifted.
    pub fn offset(&self, vert_offset: u32, uv_offset: u32) -> Surface {
        self.map_inds(|i| i + vert_offset, |i| i + uv_offset)
    }

    /// Append the facets and surface points of `other`. Name and material of
    /// this surface are kept.
    pub fn merge(&mut self, other: &Surface) {
        let (t0, q0) = (self.tris.len() as u32, self.quads.len() as u32);
        let t1 = other.tris.len() as u32;
        // Tri-equivalents are laid out as [t0 | t1 | q0 | q1] after merging.
        for sp in &mut self.surf_points {
            if sp.tri_equiv_idx >= t0 {
                sp.tri_equiv_idx += t1;
            }
        }
        self.surf_points
            .extend(other.surf_points.iter().map(|sp| SurfPoint {
                tri_equiv_idx: if sp.tri_equiv_idx < t1 {
                    sp.tri_equiv_idx + t0
                } else {
                    sp.tri_equiv_idx + t0 + 2 * q0
                },
                ..sp.clone()
            }));
        self.tris.append(&other.tris);
        self.quads.append(&other.quads);
    }

    /// Every vertex index referenced by a facet of this surface.
    pub fn vert_inds(&self) -> impl Iterator<Item = u32> + '_ {
        self.tris
            .vert_inds
            .iter()
            .flatten()
            .chain(self.quads.vert_inds.iter().flatten())
            .copied()
    }

    /// Every UV index referenced by a facet of this surface.
    pub fn uv_inds(&self) -> impl Iterator<Item = u32> + '_ {
        self.tris
            .uv_inds
            .iter()
            .flatten()
            .chain(self.quads.uv_inds.iter().flatten())
            .copied()
    }

    pub fn check(&self, num_verts: usize, num_uvs: usize) -> Result<(), Error> {
        self.tris.check(num_verts, num_uvs)?;
        self.quads.check(num_verts, num_uvs)?;
        let ntri_equivs = self.num_tri_equivs();
        if let Some(sp) = self
            .surf_points
            .iter()
            .find(|sp| sp.tri_equiv_idx as usize >= ntri_equivs)
        {
            return Err(Error::IndexOutOfBounds {
                what: "Surface point facet",
                index: sp.tri_equiv_idx,
                len: ntri_equivs,
            });
        }
        Ok(())
    }

    /// Position of the surface point at `idx` for the given vertex positions.
    pub fn surf_point_pos(&self, idx: usize, verts: &[Vec3]) -> Vec3 {
        let sp = &self.surf_points[idx];
        let [a, b, c] = self.tri_equiv(sp.tri_equiv_idx as usize);
        verts[a as usize] * sp.weights.x
            + verts[b as usize] * sp.weights.y
            + verts[c as usize] * sp.weights.z
    }

    pub fn find_surf_point(&self, label: &str) -> Option<usize> {
        self.surf_points.iter().position(|sp| sp.label == label)
    }
}

#[cfg(test)]
mod test {
    use glam::{Vec3, vec3};

    use super::{SurfPoint, Surface};
    use crate::{
        facet::{Quads, Tris},
        macros::assert_vec_eq,
    };

    fn mixed_surface() -> Surface {
        Surface::new(
            "mixed",
            Tris::new(vec![[0, 1, 2]], vec![[0, 1, 2]]).expect("Cannot create tris"),
            Quads::new(vec![[3, 4, 5, 6]], vec![[3, 4, 5, 6]]).expect("Cannot create quads"),
        )
    }

    #[test]
    fn t_tri_equivs() {
        let surf = mixed_surface();
        assert_eq!(surf.num_tri_equivs(), 3);
        assert_eq!(surf.tri_equiv(0), [0, 1, 2]);
        assert_eq!(surf.tri_equiv(1), [3, 4, 5]);
        assert_eq!(surf.tri_equiv(2), [5, 6, 3]);
        assert_eq!(surf.tri_equiv_uvs(2), Some([5, 6, 3]));
        let tris = surf.as_tris();
        assert_eq!(tris.num_quads(), 0);
        assert_eq!(tris.tris.vert_inds, vec![[0, 1, 2], [3, 4, 5], [5, 6, 3]]);
        assert!(tris.has_uvs());
    }

    #[test]
    fn t_merge_keeps_surf_points() {
        let verts: Vec<Vec3> = (0..14).map(|i| vec3(i as f32, (i * i) as f32, 1.0)).collect();
        let mut a = mixed_surface();
        a.surf_points.push(SurfPoint {
            tri_equiv_idx: 2,
            weights: vec3(0.2, 0.3, 0.5),
            label: "a".into(),
        });
        let mut b = mixed_surface().offset(7, 7);
        b.surf_points.push(SurfPoint {
            tri_equiv_idx: 1,
            weights: vec3(0.6, 0.3, 0.1),
            label: "b".into(),
        });
        let pa = a.surf_point_pos(0, &verts);
        let pb = b.surf_point_pos(0, &verts);
        a.merge(&b);
        assert_eq!(a.num_tri_equivs(), 6);
        assert!(a.check(14, 14).is_ok());
        let ia = a.find_surf_point("a").expect("Cannot find surface point");
        let ib = a.find_surf_point("b").expect("Cannot find surface point");
        assert_vec_eq!(a.surf_point_pos(ia, &verts), pa);
        assert_vec_eq!(a.surf_point_pos(ib, &verts), pb);
    }

    #[test]
    fn t_has_uvs() {
        let mut surf = mixed_surface();
        assert!(surf.has_uvs());
        surf.quads.uv_inds.clear();
        assert!(!surf.has_uvs());
        assert!(surf.tri_equivs().uv_inds.is_empty());
        assert!(!Surface::default().has_uvs());
    }
}
