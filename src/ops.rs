/*!
Topology operations on [`Mesh`].

Every operation takes the mesh by reference and builds a new one, so a failed
precondition leaves the input untouched. All facet, morph and marked vertex
indices of the result are valid for its vertex and UV lists.
*/

use std::collections::{HashMap, HashSet};

use glam::{Vec2, Vec3};
use image::GrayImage;

use crate::{
    error::Error,
    facet::{FacetInds, Quads, Tris},
    mesh::{IndexedMorph, MarkedVert, Mesh, Morph},
    surface::{SurfPoint, Surface},
};

pub use crate::subdiv::{subdivide_flat, subdivide_loop};

/// Marks an index that has no counterpart after a remap.
const INVALID: u32 = u32::MAX;

/// Coordinate axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Compaction map for a usage mask: used indices are numbered in order,
/// unused ones map to [`INVALID`]. Also returns the number of used indices.
fn compaction_map(used: &[bool]) -> (Vec<u32>, usize) {
    let mut count = 0u32;
    let map = used
        .iter()
        .map(|&u| {
            if u {
                count += 1;
                count - 1
            } else {
                INVALID
            }
        })
        .collect();
    (map, count as usize)
}

fn remapped(map: &[u32], i: u32) -> u32 {
    let out = map[i as usize];
    debug_assert_ne!(out, INVALID, "Index {} was not expected to be removed", i);
    out
}

/// Remove the vertices and UVs not referenced by any facet. Marked vertices
/// count as references.
///
/// Survivors keep their relative order. Delta morphs lose the entries of the
/// removed vertices and are dropped altogether if nothing but zeros remains.
/// Target morphs lose the entries of removed vertices and are dropped if they
/// become empty.
pub fn remove_unused_verts(mesh: &Mesh) -> Mesh {
    let mut vert_used = vec![false; mesh.verts.len()];
    let mut uv_used = vec![false; mesh.uvs.len()];
    for surf in &mesh.surfaces {
        for i in surf.vert_inds() {
            vert_used[i as usize] = true;
        }
        for i in surf.uv_inds() {
            uv_used[i as usize] = true;
        }
    }
    for mv in &mesh.marked_verts {
        vert_used[mv.idx as usize] = true;
    }
    let (vert_map, _) = compaction_map(&vert_used);
    let (uv_map, _) = compaction_map(&uv_used);
    let keep = |items: &[Vec3]| -> Vec<Vec3> {
        items
            .iter()
            .zip(&vert_used)
            .filter_map(|(v, &u)| u.then_some(*v))
            .collect()
    };
    let delta_morphs = mesh
        .delta_morphs
        .iter()
        .filter_map(|m| {
            let verts = keep(&m.verts);
            verts.iter().any(|d| *d != Vec3::ZERO).then(|| Morph {
                name: m.name.clone(),
                verts,
            })
        })
        .collect();
    let target_morphs = mesh
        .target_morphs
        .iter()
        .filter_map(|m| {
            let (base_inds, verts): (Vec<u32>, Vec<Vec3>) = m
                .base_inds
                .iter()
                .zip(&m.verts)
                .filter(|(i, _)| vert_used[**i as usize])
                .map(|(i, d)| (vert_map[*i as usize], *d))
                .unzip();
            (!base_inds.is_empty()).then(|| IndexedMorph {
                name: m.name.clone(),
                base_inds,
                verts,
            })
        })
        .collect();
    Mesh {
        name: mesh.name.clone(),
        verts: keep(&mesh.verts),
        uvs: mesh
            .uvs
            .iter()
            .zip(&uv_used)
            .filter_map(|(uv, &u)| u.then_some(*uv))
            .collect(),
        surfaces: mesh
            .surfaces
            .iter()
            .map(|s| s.map_inds(|i| remapped(&vert_map, i), |i| remapped(&uv_map, i)))
            .collect(),
        delta_morphs,
        target_morphs,
        marked_verts: mesh
            .marked_verts
            .iter()
            .map(|mv| MarkedVert {
                idx: remapped(&vert_map, mv.idx),
                label: mv.label.clone(),
            })
            .collect(),
    }
}

/// Hashable bit pattern of a float vector. Negative zero is folded into zero
/// so it matches positive zero, as with `==`. `None` for NaN, which never
/// equals anything.
fn exact_key<const N: usize>(coords: [f32; N]) -> Option<[u32; N]> {
    if coords.iter().any(|c| c.is_nan()) {
        return None;
    }
    Some(coords.map(|c| if c == 0.0 { 0 } else { c.to_bits() }))
}

/// Deduplicate exactly equal points. Returns the map from old to new index
/// and, for each new index, the old index of its first occurrence.
fn unify<const N: usize>(points: &[[f32; N]]) -> (Vec<u32>, Vec<u32>) {
    let mut seen: HashMap<[u32; N], u32> = HashMap::with_capacity(points.len());
    let mut first = Vec::with_capacity(points.len());
    let map = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let next = first.len() as u32;
            let idx = match exact_key(*p) {
                Some(key) => *seen.entry(key).or_insert(next),
                None => next,
            };
            if idx == next {
                first.push(i as u32);
            }
            idx
        })
        .collect();
    (map, first)
}

/// Merge vertices with exactly equal positions. The first occurrence of each
/// position survives and survivors keep their relative order.
///
/// Facets, morphs and marked vertices are remapped. Delta morph entries are
/// taken from the first occurrence.
pub fn unify_identical_verts(mesh: &Mesh) -> Mesh {
    let points: Vec<[f32; 3]> = mesh.verts.iter().map(|v| v.to_array()).collect();
    let (map, first) = unify(&points);
    log::debug!(
        "Unified {} vertices into {}",
        mesh.verts.len(),
        first.len()
    );
    let pick = |items: &[Vec3]| -> Vec<Vec3> { first.iter().map(|&i| items[i as usize]).collect() };
    Mesh {
        name: mesh.name.clone(),
        verts: pick(&mesh.verts),
        uvs: mesh.uvs.clone(),
        surfaces: mesh
            .surfaces
            .iter()
            .map(|s| s.map_inds(|i| map[i as usize], |i| i))
            .collect(),
        delta_morphs: mesh
            .delta_morphs
            .iter()
            .map(|m| Morph {
                name: m.name.clone(),
                verts: pick(&m.verts),
            })
            .collect(),
        target_morphs: mesh
            .target_morphs
            .iter()
            .map(|m| IndexedMorph {
                base_inds: m.base_inds.iter().map(|&i| map[i as usize]).collect(),
                ..m.clone()
            })
            .collect(),
        marked_verts: mesh
            .marked_verts
            .iter()
            .map(|mv| MarkedVert {
                idx: map[mv.idx as usize],
                label: mv.label.clone(),
            })
            .collect(),
    }
}

/// Merge UVs with exactly equal coordinates. Vertex positions are untouched.
pub fn unify_identical_uvs(mesh: &Mesh) -> Mesh {
    let points: Vec<[f32; 2]> = mesh.uvs.iter().map(|uv| uv.to_array()).collect();
    let (map, first) = unify(&points);
    log::debug!("Unified {} UVs into {}", mesh.uvs.len(), first.len());
    Mesh {
        uvs: first.iter().map(|&i| mesh.uvs[i as usize]).collect::<Vec<Vec2>>(),
        surfaces: mesh
            .surfaces
            .iter()
            .map(|s| s.map_inds(|i| i, |i| map[i as usize]))
            .collect(),
        ..mesh.clone()
    }
}

/// Split a quad mesh into one surface per set of quads connected through
/// shared UV indices.
///
/// All surfaces are merged first. Surfaces are created in the order of their
/// lowest quad, and each keeps its quads in input order. The vertex
/// and UV lists are carried over unchanged, so some entries may end up
/// unused.
pub fn split_surfs_by_uvs(mesh: &Mesh) -> Result<Mesh, Error> {
    let merged = mesh.merged_surface();
    if !merged.tris.is_empty() {
        return Err(Error::TrisNotSupported("split_surfs_by_uvs"));
    }
    let quads = &merged.quads;
    if !quads.is_empty() && !quads.has_uvs() {
        return Err(Error::MissingUvIndices);
    }
    let mut uv_to_quads: Vec<Vec<u32>> = vec![Vec::new(); mesh.uvs.len()];
    for (qi, uvs) in quads.uv_inds.iter().enumerate() {
        for &uv in uvs {
            uv_to_quads[uv as usize].push(qi as u32);
        }
    }
    // Flood fill with an explicit stack.
    let mut labels = vec![INVALID; quads.len()];
    let mut num_labels = 0u32;
    let mut stack = Vec::new();
    for seed in 0..quads.len() {
        if labels[seed] != INVALID {
            continue;
        }
        labels[seed] = num_labels;
        stack.push(seed as u32);
        while let Some(qi) = stack.pop() {
            for &uv in &quads.uv_inds[qi as usize] {
                for &nq in &uv_to_quads[uv as usize] {
                    if labels[nq as usize] == INVALID {
                        labels[nq as usize] = num_labels;
                        stack.push(nq);
                    }
                }
            }
        }
        num_labels += 1;
    }
    let mut surfaces: Vec<Surface> = (0..num_labels)
        .map(|_| Surface {
            material: merged.material.clone(),
            ..Default::default()
        })
        .collect();
    for (qi, &label) in labels.iter().enumerate() {
        let surf = &mut surfaces[label as usize];
        surf.quads.vert_inds.push(quads.vert_inds[qi]);
        surf.quads.uv_inds.push(quads.uv_inds[qi]);
    }
    log::debug!("{} separate UV-contiguous surfaces created", num_labels);
    Ok(Mesh {
        surfaces,
        ..mesh.clone()
    })
}

/// Merge all surfaces sharing a name into the first surface with that name.
pub fn merge_same_name_surfaces(mesh: &Mesh) -> Mesh {
    let mut surfaces: Vec<Surface> = Vec::with_capacity(mesh.surfaces.len());
    for surf in &mesh.surfaces {
        match surfaces.iter_mut().find(|s| s.name == surf.name) {
            Some(target) => target.merge(surf),
            None => surfaces.push(surf.clone()),
        }
    }
    log::debug!(
        "Merged {} surfaces into {}",
        mesh.surfaces.len(),
        surfaces.len()
    );
    Mesh {
        surfaces,
        ..mesh.clone()
    }
}

fn centroid(verts: &[Vec3], tri: [u32; 3]) -> Vec3 {
    tri.iter().map(|&i| verts[i as usize]).sum::<Vec3>() / 3.0
}

/// Partition the triangles of `to` into surfaces matching those of `from`.
///
/// Each triangle of `to` goes to the surface of `from` owning the triangle
/// with the nearest centroid, so this only gives sensible results when the
/// two meshes are geometrically close. The result has one surface per
/// surface of `from`, with the same names and materials. Surface points of
/// `to` are dropped.
pub fn copy_surface_structure(from: &Mesh, to: &Mesh) -> Result<Mesh, Error> {
    let to_surf = to.merged_surface();
    if !to_surf.quads.is_empty() {
        return Err(Error::QuadsNotSupported("copy_surface_structure"));
    }
    let targets: Vec<(Vec3, usize)> = from
        .surfaces
        .iter()
        .enumerate()
        .flat_map(|(si, surf)| {
            (0..surf.num_tri_equivs()).map(move |ti| (centroid(&from.verts, surf.tri_equiv(ti)), si))
        })
        .collect();
    if targets.is_empty() {
        return Err(Error::EmptyMesh);
    }
    let mut surfaces: Vec<Surface> = from
        .surfaces
        .iter()
        .map(|s| Surface {
            name: s.name.clone(),
            material: s.material.clone(),
            ..Default::default()
        })
        .collect();
    let with_uvs = to_surf.tris.has_uvs();
    for (ti, &tri) in to_surf.tris.vert_inds.iter().enumerate() {
        let c = centroid(&to.verts, tri);
        let mut best = (f32::MAX, 0usize);
        for &(tc, si) in &targets {
            let d = tc.distance_squared(c);
            if d < best.0 {
                best = (d, si);
            }
        }
        let out = &mut surfaces[best.1].tris;
        out.vert_inds.push(tri);
        if with_uvs {
            out.uv_inds.push(to_surf.tris.uv_inds[ti]);
        }
    }
    Ok(Mesh {
        surfaces,
        ..to.clone()
    })
}

/// Tri-equivalent index and weights of a surface point after every facet of
/// the surface is rewound.
fn mirror_surf_point(sp: &SurfPoint, num_tris: u32) -> SurfPoint {
    let w = sp.weights;
    let (tri_equiv_idx, weights) = if sp.tri_equiv_idx < num_tris {
        // [a, b, c] -> [a, c, b]
        (sp.tri_equiv_idx, Vec3::new(w.x, w.z, w.y))
    } else {
        // [a, b, c, d] -> [a, d, c, b] swaps the two halves and reverses each.
        let q = sp.tri_equiv_idx - num_tris;
        (num_tris + (q ^ 1), Vec3::new(w.z, w.y, w.x))
    };
    SurfPoint {
        tri_equiv_idx,
        weights,
        label: sp.label.clone(),
    }
}

/// Reflect the mesh across the plane normal to `axis`.
///
/// Every facet is rewound so normals keep pointing outward. Morph
/// displacements are reflected too, and surface points follow their facets.
/// Mirroring twice is the identity.
pub fn mirror(mesh: &Mesh, axis: Axis) -> Mesh {
    let a = axis.index();
    let flip = |v: &Vec3| {
        let mut v = *v;
        v[a] = -v[a];
        v
    };
    Mesh {
        name: mesh.name.clone(),
        verts: mesh.verts.iter().map(flip).collect(),
        uvs: mesh.uvs.clone(),
        surfaces: mesh
            .surfaces
            .iter()
            .map(|s| Surface {
                tris: s.tris.rewound(),
                quads: s.quads.rewound(),
                surf_points: s
                    .surf_points
                    .iter()
                    .map(|sp| mirror_surf_point(sp, s.num_tris() as u32))
                    .collect(),
                ..s.clone()
            })
            .collect(),
        delta_morphs: mesh
            .delta_morphs
            .iter()
            .map(|m| Morph {
                name: m.name.clone(),
                verts: m.verts.iter().map(flip).collect(),
            })
            .collect(),
        target_morphs: mesh
            .target_morphs
            .iter()
            .map(|m| IndexedMorph {
                verts: m.verts.iter().map(flip).collect(),
                ..m.clone()
            })
            .collect(),
        marked_verts: mesh.marked_verts.clone(),
    }
}

fn dedup_facets<const N: usize>(facets: &FacetInds<N>) -> FacetInds<N> {
    let mut seen = HashSet::with_capacity(facets.len());
    let keep: Vec<usize> = facets
        .vert_inds
        .iter()
        .enumerate()
        .filter_map(|(i, f)| {
            let mut key = *f;
            key.sort_unstable();
            seen.insert(key).then_some(i)
        })
        .collect();
    facets.select(&keep)
}

/// Remove facets using the same set of vertices as an earlier facet of the
/// same surface, regardless of winding.
///
/// Removing facets would invalidate surface points, so surfaces carrying
/// them are rejected.
pub fn remove_duplicate_facets(mesh: &Mesh) -> Result<Mesh, Error> {
    if mesh.surfaces.iter().any(|s| !s.surf_points.is_empty()) {
        return Err(Error::SurfPointsNotSupported("remove_duplicate_facets"));
    }
    let surfaces: Vec<Surface> = mesh
        .surfaces
        .iter()
        .map(|s| Surface {
            tris: dedup_facets::<3>(&s.tris),
            quads: dedup_facets::<4>(&s.quads),
            ..s.clone()
        })
        .collect();
    let before = mesh.num_facets();
    let after: usize = surfaces.iter().map(|s| s.num_facets()).sum();
    log::debug!("Removed {} duplicate facets", before - after);
    Ok(Mesh {
        surfaces,
        ..mesh.clone()
    })
}

/// Keep only the triangles touching a vertex whose UV falls inside `mask`,
/// then remove the vertices and UVs left unused.
///
/// Non-zero pixels of `mask` are inside. UV `(0, 0)` is the bottom left
/// corner of the mask and UVs beyond its edges are clamped to the border
/// pixels. A vertex with several UVs is inside if any of them is. Surface
/// points on removed triangles are dropped, and marked vertices keep their
/// vertex.
pub fn mask_from_uvs(mesh: &Mesh, mask: &GrayImage) -> Result<Mesh, Error> {
    let (w, h) = mask.dimensions();
    if w == 0 || h == 0 {
        return Err(Error::EmptyImage);
    }
    for surf in &mesh.surfaces {
        if !surf.quads.is_empty() {
            return Err(Error::QuadsNotSupported("mask_from_uvs"));
        }
        if !surf.tris.is_empty() && !surf.tris.has_uvs() {
            return Err(Error::MissingUvIndices);
        }
    }
    mesh.check_consistency()?;
    let inside = |uv: Vec2| {
        let x = (uv.x * w as f32).clamp(0.0, (w - 1) as f32) as u32;
        let y = ((1.0 - uv.y) * h as f32).clamp(0.0, (h - 1) as f32) as u32;
        mask.get_pixel(x, y)[0] != 0
    };
    let mut keep = vec![false; mesh.verts.len()];
    for surf in &mesh.surfaces {
        for (verts, uvs) in surf.tris.vert_inds.iter().zip(&surf.tris.uv_inds) {
            for (&v, &uv) in verts.iter().zip(uvs) {
                if inside(mesh.uvs[uv as usize]) {
                    keep[v as usize] = true;
                }
            }
        }
    }
    let surfaces = mesh
        .surfaces
        .iter()
        .map(|s| {
            let kept: Vec<usize> = (0..s.num_tris())
                .filter(|&i| s.tris.vert_inds[i].iter().any(|&v| keep[v as usize]))
                .collect();
            let mut tri_map = vec![INVALID; s.num_tris()];
            for (new, &old) in kept.iter().enumerate() {
                tri_map[old] = new as u32;
            }
            Surface {
                tris: s.tris.select(&kept),
                surf_points: s
                    .surf_points
                    .iter()
                    .filter_map(|sp| {
                        let idx = tri_map[sp.tri_equiv_idx as usize];
                        (idx != INVALID).then(|| SurfPoint {
                            tri_equiv_idx: idx,
                            ..sp.clone()
                        })
                    })
                    .collect(),
                ..s.clone()
            }
        })
        .collect();
    Ok(remove_unused_verts(&Mesh {
        surfaces,
        ..mesh.clone()
    }))
}

/// Triangle surface over the given vertices. Shorthand for tests and
/// primitives.
pub(crate) fn tri_surface(tris: Vec<[u32; 3]>) -> Surface {
    Surface::from_tris(Tris::from_verts(tris))
}

/// Quad surface with UVs. Shorthand for tests and primitives.
pub(crate) fn quad_surface(quads: Vec<[u32; 4]>, uvs: Vec<[u32; 4]>) -> Result<Surface, Error> {
    Ok(Surface::from_quads(Quads::new(quads, uvs)?))
}
