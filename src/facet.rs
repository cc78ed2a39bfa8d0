use crate::error::Error;

/// Index lists for facets with `N` vertices each.
///
/// `vert_inds` index into the mesh vertex list, `uv_inds` into the mesh UV
/// list. The UV list is either empty, meaning the facets carry no texture
/// coordinates, or has exactly one entry per facet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FacetInds<const N: usize> {
    pub vert_inds: Vec<[u32; N]>,
    pub uv_inds: Vec<[u32; N]>,
}

/// Triangle index lists.
pub type Tris = FacetInds<3>;
/// Quad index lists.
pub type Quads = FacetInds<4>;

/// Reverse the winding of a facet, keeping its first index in place.
///
/// Triangles `[a, b, c]` become `[a, c, b]` and quads `[a, b, c, d]` become
/// `[a, d, c, b]`. Applying this twice gives back the original facet.
pub fn rewind<const N: usize>(facet: [u32; N]) -> [u32; N] {
    std::array::from_fn(|i| if i == 0 { facet[0] } else { facet[N - i] })
}

/// The tri-equivalent of a quad. `half == 0` gives `[q0, q1, q2]` and
/// `half == 1` gives `[q2, q3, q0]`.
pub fn quad_half(quad: [u32; 4], half: u32) -> [u32; 3] {
    if half == 0 {
        [quad[0], quad[1], quad[2]]
    } else {
        [quad[2], quad[3], quad[0]]
    }
}

impl<const N: usize> FacetInds<N> {
    /// Facets with vertex and UV indices. The UV list must be empty or have
    /// the same length as the vertex list.
    pub fn new(vert_inds: Vec<[u32; N]>, uv_inds: Vec<[u32; N]>) -> Result<Self, Error> {
        if !uv_inds.is_empty() && uv_inds.len() != vert_inds.len() {
            return Err(Error::InvalidFacetUvs {
                verts: vert_inds.len(),
                uvs: uv_inds.len(),
            });
        }
        Ok(FacetInds { vert_inds, uv_inds })
    }

    /// Facets without texture coordinates.
    pub fn from_verts(vert_inds: Vec<[u32; N]>) -> Self {
        FacetInds {
            vert_inds,
            uv_inds: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.vert_inds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vert_inds.is_empty()
    }

    /// Whether every facet has UV indices. False for an empty list.
    pub fn has_uvs(&self) -> bool {
        !self.uv_inds.is_empty() && self.uv_inds.len() == self.vert_inds.len()
    }

    pub fn uvs_of(&self, i: usize) -> Option<[u32; N]> {
        self.uv_inds.get(i).copied()
    }

    /// Copy of these facets with every vertex index passed through
    /// `vert_map` and every UV index through `uv_map`.
    pub fn map_inds<V, U>(&self, vert_map: V, uv_map: U) -> Self
    where
        V: Fn(u32) -> u32,
        U: Fn(u32) -> u32,
    {
        FacetInds {
            vert_inds: self.vert_inds.iter().map(|f| f.map(&vert_map)).collect(),
            uv_inds: self.uv_inds.iter().map(|f| f.map(&uv_map)).collect(),
        }
    }

    /// Copy of these facets with all vertex indices shifted by `vert_offset`
    /// and all UV indices shifted by `uv_offset`.
    pub fn offset(&self, vert_offset: u32, uv_offset: u32) -> Self {
        self.map_inds(|i| i + vert_offset, |i| i + uv_offset)
    }

    /// Append `other` to this list.
    ///
    /// If exactly one of the two non-empty lists carries UVs the result can't
    /// keep them consistent, so all UV indices are discarded.
    pub fn append(&mut self, other: &Self) {
        let self_ok = self.is_empty() || self.has_uvs();
        let other_ok = other.is_empty() || other.has_uvs();
        self.vert_inds.extend_from_slice(&other.vert_inds);
        if self_ok && other_ok {
            self.uv_inds.extend_from_slice(&other.uv_inds);
        } else if !self.uv_inds.is_empty() || !other.uv_inds.is_empty() {
            log::warn!("Merging facets with and without UVs, UVs discarded");
            self.uv_inds.clear();
        }
    }

    /// Copy of these facets with every winding reversed.
    pub fn rewound(&self) -> Self {
        FacetInds {
            vert_inds: self.vert_inds.iter().copied().map(rewind).collect(),
            uv_inds: self.uv_inds.iter().copied().map(rewind).collect(),
        }
    }

    /// Keep only the facets at the given positions, in the given order.
    pub fn select(&self, order: &[usize]) -> Self {
        FacetInds {
            vert_inds: order.iter().map(|&i| self.vert_inds[i]).collect(),
            uv_inds: if self.has_uvs() {
                order.iter().map(|&i| self.uv_inds[i]).collect()
            } else {
                Vec::new()
            },
        }
    }

    /// Check that every index is in range and the UV list is well formed.
    pub fn check(&self, num_verts: usize, num_uvs: usize) -> Result<(), Error> {
        if !self.uv_inds.is_empty() && self.uv_inds.len() != self.vert_inds.len() {
            return Err(Error::InvalidFacetUvs {
                verts: self.vert_inds.len(),
                uvs: self.uv_inds.len(),
            });
        }
        if let Some(&index) = self.vert_inds.iter().flatten().find(|&&i| i as usize >= num_verts) {
            return Err(Error::IndexOutOfBounds {
                what: "Vertex",
                index,
                len: num_verts,
            });
        }
        if let Some(&index) = self.uv_inds.iter().flatten().find(|&&i| i as usize >= num_uvs) {
            return Err(Error::IndexOutOfBounds {
                what: "UV",
                index,
                len: num_uvs,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{FacetInds, Quads, Tris, quad_half, rewind};
    use crate::error::Error;

    #[test]
    fn t_rewind_involution() {
        assert_eq!(rewind([0, 1, 2]), [0, 2, 1]);
        assert_eq!(rewind([0, 1, 2, 3]), [0, 3, 2, 1]);
        assert_eq!(rewind(rewind([4, 7, 9, 1])), [4, 7, 9, 1]);
        assert_eq!(quad_half([0, 1, 2, 3], 0), [0, 1, 2]);
        assert_eq!(quad_half([0, 1, 2, 3], 1), [2, 3, 0]);
    }

    #[test]
    fn t_new_rejects_bad_uvs() {
        assert!(matches!(
            Tris::new(vec![[0, 1, 2], [1, 2, 3]], vec![[0, 1, 2]]),
            Err(Error::InvalidFacetUvs { verts: 2, uvs: 1 })
        ));
        let tris = Tris::new(vec![[0, 1, 2]], vec![[3, 4, 5]]).expect("Cannot create tris");
        assert!(tris.has_uvs());
        assert!(!Tris::default().has_uvs());
    }

    #[test]
    fn t_append_discards_inconsistent_uvs() {
        let mut a = Quads::new(vec![[0, 1, 2, 3]], vec![[0, 1, 2, 3]]).expect("Cannot create quads");
        let b = Quads::from_verts(vec![[4, 5, 6, 7]]);
        a.append(&b);
        assert_eq!(a.len(), 2);
        assert!(a.uv_inds.is_empty());
        // Appending to an empty list keeps the UVs.
        let mut c = Quads::default();
        c.append(&Quads::new(vec![[0, 1, 2, 3]], vec![[3, 2, 1, 0]]).expect("Cannot create quads"));
        assert!(c.has_uvs());
    }

    #[test]
    fn t_offset_and_check() {
        let tris = Tris::new(vec![[0, 1, 2]], vec![[0, 0, 1]]).expect("Cannot create tris");
        let off = tris.offset(3, 2);
        assert_eq!(off.vert_inds, vec![[3, 4, 5]]);
        assert_eq!(off.uv_inds, vec![[2, 2, 3]]);
        assert!(off.check(6, 4).is_ok());
        assert!(matches!(
            off.check(5, 4),
            Err(Error::IndexOutOfBounds {
                what: "Vertex",
                index: 5,
                len: 5
            })
        ));
        assert!(matches!(
            off.check(6, 3),
            Err(Error::IndexOutOfBounds { what: "UV", .. })
        ));
    }

    #[test]
    fn t_select() {
        let tris: FacetInds<3> = Tris::new(vec![[0, 1, 2], [3, 4, 5]], vec![[6, 7, 8], [9, 10, 11]])
            .expect("Cannot create tris");
        let sel = tris.select(&[1, 0]);
        assert_eq!(sel.vert_inds, vec![[3, 4, 5], [0, 1, 2]]);
        assert_eq!(sel.uv_inds, vec![[9, 10, 11], [6, 7, 8]]);
    }
}
