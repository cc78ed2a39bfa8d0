use glam::{Vec2, Vec3};

use crate::{
    error::Error,
    facet::{Quads, Tris},
    geometry::{Similarity, bounds3},
    surface::Surface,
};

/// Dense per-vertex displacement. Applying it with coefficient `c` adds
/// `c * verts[i]` to vertex `i`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Morph {
    pub name: String,
    pub verts: Vec<Vec3>,
}

/// Sparse displacement over a subset of the mesh vertices. `verts[i]` is the
/// displacement of vertex `base_inds[i]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexedMorph {
    pub name: String,
    pub base_inds: Vec<u32>,
    pub verts: Vec<Vec3>,
}

/// A labelled vertex.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkedVert {
    pub idx: u32,
    pub label: String,
}

/// Vertex and UV lists shared by an ordered list of surfaces, together with
/// morphs and landmarks defined over the vertices.
///
/// Every facet index, marked vertex index and morph index refers into
/// `verts` (or `uvs`). The constructors verify this, and every operation in
/// [`ops`](crate::ops) and [`merge`](crate::merge) preserves it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub verts: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub surfaces: Vec<Surface>,
    pub delta_morphs: Vec<Morph>,
    pub target_morphs: Vec<IndexedMorph>,
    pub marked_verts: Vec<MarkedVert>,
}

impl Mesh {
    pub fn new(verts: Vec<Vec3>, uvs: Vec<Vec2>, surfaces: Vec<Surface>) -> Result<Self, Error> {
        let mesh = Mesh {
            verts,
            uvs,
            surfaces,
            ..Default::default()
        };
        mesh.check_consistency()?;
        Ok(mesh)
    }

    /// Single surface triangle mesh without UVs.
    pub fn from_tris(verts: Vec<Vec3>, tris: Vec<[u32; 3]>) -> Result<Self, Error> {
        Self::new(verts, Vec::new(), vec![Surface::from_tris(Tris::from_verts(tris))])
    }

    /// Single surface quad mesh without UVs.
    pub fn from_quads(verts: Vec<Vec3>, quads: Vec<[u32; 4]>) -> Result<Self, Error> {
        Self::new(
            verts,
            Vec::new(),
            vec![Surface::from_quads(Quads::from_verts(quads))],
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn check_consistency(&self) -> Result<(), Error> {
        let nverts = self.verts.len();
        for surf in &self.surfaces {
            surf.check(nverts, self.uvs.len())?;
        }
        if let Some(mv) = self.marked_verts.iter().find(|mv| mv.idx as usize >= nverts) {
            return Err(Error::IndexOutOfBounds {
                what: "Marked vertex",
                index: mv.idx,
                len: nverts,
            });
        }
        for morph in &self.delta_morphs {
            if morph.verts.len() != nverts {
                return Err(Error::MismatchedArrayLengths(morph.verts.len(), nverts));
            }
        }
        for morph in &self.target_morphs {
            check_target_morph(morph, nverts)?;
        }
        Ok(())
    }

    pub fn num_tris(&self) -> usize {
        self.surfaces.iter().map(|s| s.num_tris()).sum()
    }

    pub fn num_quads(&self) -> usize {
        self.surfaces.iter().map(|s| s.num_quads()).sum()
    }

    pub fn num_facets(&self) -> usize {
        self.surfaces.iter().map(|s| s.num_facets()).sum()
    }

    pub fn num_tri_equivs(&self) -> usize {
        self.surfaces.iter().map(|s| s.num_tri_equivs()).sum()
    }

    /// Tri-equivalents of all surfaces, surface by surface.
    pub fn all_tri_equivs(&self) -> Vec<[u32; 3]> {
        let mut out = Vec::with_capacity(self.num_tri_equivs());
        for surf in &self.surfaces {
            out.extend((0..surf.num_tri_equivs()).map(|i| surf.tri_equiv(i)));
        }
        out
    }

    /// All surfaces merged into one, named after the first surface.
    pub fn merged_surface(&self) -> Surface {
        let mut iter = self.surfaces.iter();
        let mut out = iter.next().cloned().unwrap_or_default();
        for surf in iter {
            out.merge(surf);
        }
        out
    }

    pub fn find_marked_vert(&self, label: &str) -> Option<&MarkedVert> {
        self.marked_verts.iter().find(|mv| mv.label == label)
    }

    /// Position of the first surface point with the given label, searching
    /// surfaces in order.
    pub fn surf_point_pos(&self, label: &str) -> Option<Vec3> {
        self.surfaces.iter().find_map(|surf| {
            surf.find_surf_point(label)
                .map(|i| surf.surf_point_pos(i, &self.verts))
        })
    }

    /// Bounding box of the vertices, as a `(min, max)` pair.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        bounds3(self.verts.iter().copied())
    }

    /// Copy of this mesh with the vertices transformed as points and morph
    /// displacements as vectors.
    pub fn transform(&self, xf: &Similarity) -> Mesh {
        let mut out = self.clone();
        for v in &mut out.verts {
            *v = xf.transform_point(*v);
        }
        for dv in out
            .delta_morphs
            .iter_mut()
            .flat_map(|m| m.verts.iter_mut())
            .chain(out.target_morphs.iter_mut().flat_map(|m| m.verts.iter_mut()))
        {
            *dv = xf.transform_vector(*dv);
        }
        out
    }

    pub fn num_morphs(&self) -> usize {
        self.delta_morphs.len() + self.target_morphs.len()
    }

    /// Names of all morphs, delta morphs first.
    pub fn morph_names(&self) -> Vec<&str> {
        self.delta_morphs
            .iter()
            .map(|m| m.name.as_str())
            .chain(self.target_morphs.iter().map(|m| m.name.as_str()))
            .collect()
    }

    pub fn find_delta_morph(&self, name: &str) -> Option<usize> {
        self.delta_morphs.iter().position(|m| m.name == name)
    }

    pub fn find_target_morph(&self, name: &str) -> Option<usize> {
        self.target_morphs.iter().position(|m| m.name == name)
    }

    /// Add a delta morph, replacing an existing one with the same name.
    pub fn add_delta_morph(&mut self, morph: Morph) -> Result<(), Error> {
        if morph.verts.len() != self.verts.len() {
            return Err(Error::MismatchedArrayLengths(
                morph.verts.len(),
                self.verts.len(),
            ));
        }
        match self.find_delta_morph(&morph.name) {
            Some(i) => {
                log::warn!("Overwriting existing morph '{}'", morph.name);
                self.delta_morphs[i] = morph;
            }
            None => self.delta_morphs.push(morph),
        }
        Ok(())
    }

    /// Add a delta morph that moves the base shape onto `target`.
    pub fn add_delta_morph_from_shape(
        &mut self,
        name: impl Into<String>,
        target: &[Vec3],
    ) -> Result<(), Error> {
        if target.len() != self.verts.len() {
            return Err(Error::MismatchedArrayLengths(target.len(), self.verts.len()));
        }
        let verts = target.iter().zip(&self.verts).map(|(t, v)| *t - *v).collect();
        self.add_delta_morph(Morph {
            name: name.into(),
            verts,
        })
    }

    /// Add a target morph, replacing an existing one with the same name.
    pub fn add_target_morph(&mut self, morph: IndexedMorph) -> Result<(), Error> {
        check_target_morph(&morph, self.verts.len())?;
        match self.find_target_morph(&morph.name) {
            Some(i) => {
                log::warn!("Overwriting existing morph '{}'", morph.name);
                self.target_morphs[i] = morph;
            }
            None => self.target_morphs.push(morph),
        }
        Ok(())
    }

    /// Add a target morph that moves the base shape onto `target`.
    ///
    /// Only vertices displaced by more than 0.1% of the largest displacement
    /// are kept. A target identical to the base shape is an error.
    pub fn add_target_morph_from_shape(
        &mut self,
        name: impl Into<String>,
        target: &[Vec3],
    ) -> Result<(), Error> {
        let name = name.into();
        if target.len() != self.verts.len() {
            return Err(Error::MismatchedArrayLengths(target.len(), self.verts.len()));
        }
        let deltas: Vec<Vec3> = target.iter().zip(&self.verts).map(|(t, v)| *t - *v).collect();
        let max_sqr = deltas
            .iter()
            .map(|d| d.length_squared())
            .fold(0.0f32, f32::max);
        if max_sqr == 0.0 {
            return Err(Error::EmptyTargetMorph(name));
        }
        let tol = max_sqr * 0.001 * 0.001;
        let (base_inds, verts): (Vec<u32>, Vec<Vec3>) = deltas
            .iter()
            .enumerate()
            .filter(|(_, d)| d.length_squared() > tol)
            .map(|(i, d)| (i as u32, *d))
            .unzip();
        self.add_target_morph(IndexedMorph {
            name,
            base_inds,
            verts,
        })
    }

    /// Vertex positions with all morphs applied. `delta_coords` has one
    /// coefficient per delta morph and `target_coords` one per target morph.
    pub fn apply_morphs(
        &self,
        delta_coords: &[f32],
        target_coords: &[f32],
    ) -> Result<Vec<Vec3>, Error> {
        if delta_coords.len() != self.delta_morphs.len() {
            return Err(Error::MismatchedArrayLengths(
                delta_coords.len(),
                self.delta_morphs.len(),
            ));
        }
        if target_coords.len() != self.target_morphs.len() {
            return Err(Error::MismatchedArrayLengths(
                target_coords.len(),
                self.target_morphs.len(),
            ));
        }
        let mut out = self.verts.clone();
        for (morph, &c) in self.delta_morphs.iter().zip(delta_coords) {
            apply_delta(morph, c, &mut out);
        }
        for (morph, &c) in self.target_morphs.iter().zip(target_coords) {
            apply_target(morph, c, &mut out);
        }
        Ok(out)
    }

    /// Vertex positions with one morph applied. Morphs are indexed as in
    /// [`Mesh::morph_names`].
    pub fn apply_morph(&self, idx: usize, coord: f32) -> Result<Vec<Vec3>, Error> {
        let mut out = self.verts.clone();
        let ndelta = self.delta_morphs.len();
        if let Some(morph) = self.delta_morphs.get(idx) {
            apply_delta(morph, coord, &mut out);
        } else if let Some(morph) = self.target_morphs.get(idx - ndelta) {
            apply_target(morph, coord, &mut out);
        } else {
            return Err(Error::IndexOutOfBounds {
                what: "Morph",
                index: idx as u32,
                len: self.num_morphs(),
            });
        }
        Ok(out)
    }
}

fn check_target_morph(morph: &IndexedMorph, nverts: usize) -> Result<(), Error> {
    if morph.base_inds.len() != morph.verts.len() {
        return Err(Error::MismatchedArrayLengths(
            morph.base_inds.len(),
            morph.verts.len(),
        ));
    }
    if let Some(&index) = morph.base_inds.iter().find(|&&i| i as usize >= nverts) {
        return Err(Error::IndexOutOfBounds {
            what: "Target morph vertex",
            index,
            len: nverts,
        });
    }
    Ok(())
}

fn apply_delta(morph: &Morph, coord: f32, verts: &mut [Vec3]) {
    for (v, d) in verts.iter_mut().zip(&morph.verts) {
        *v += *d * coord;
    }
}

fn apply_target(morph: &IndexedMorph, coord: f32, verts: &mut [Vec3]) {
    for (&i, d) in morph.base_inds.iter().zip(&morph.verts) {
        verts[i as usize] += *d * coord;
    }
}
