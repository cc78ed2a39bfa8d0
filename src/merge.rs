/*!
Combining meshes.

[`merge_meshes`] concatenates two independent meshes into one, matching their
morphs by name. [`merge_mesh_surfaces`] instead combines two copies of the
same mesh that differ only in their surfaces.
*/

use glam::Vec3;

use crate::{
    error::Error,
    mesh::{MarkedVert, Mesh},
    surface::Surface,
};

/// Surfaces of `mesh` with the empty names filled in from the mesh name.
///
/// A mesh with several surfaces gets an index suffix per surface so the
/// names stay distinct.
fn named_surfaces(mesh: &Mesh) -> impl Iterator<Item = Surface> + '_ {
    let several = mesh.surfaces.len() > 1;
    mesh.surfaces.iter().enumerate().map(move |(i, surf)| {
        let mut surf = surf.clone();
        if surf.name.is_empty() {
            surf.name = if several {
                format!("{}{}", mesh.name, i)
            } else {
                mesh.name.clone()
            };
        }
        surf
    })
}

/// Concatenate two meshes.
///
/// The vertices and UVs of `m1` follow those of `m0`, and every index coming
/// from `m1` is offset accordingly. Unnamed surfaces are named after their
/// mesh first. Morphs are matched by name: matching delta morphs are joined,
/// and unmatched ones are padded with zero displacements over the other
/// mesh's vertices. Matching target morphs have their entries joined, the
/// rest are kept as they are.
pub fn merge_meshes(m0: &Mesh, m1: &Mesh) -> Mesh {
    let n0 = m0.verts.len();
    let n1 = m1.verts.len();
    let vert_offset = n0 as u32;
    let uv_offset = m0.uvs.len() as u32;
    let mut out = Mesh {
        name: format!("{}{}", m0.name, m1.name),
        verts: m0.verts.iter().chain(&m1.verts).copied().collect(),
        uvs: m0.uvs.iter().chain(&m1.uvs).copied().collect(),
        surfaces: named_surfaces(m0)
            .chain(named_surfaces(m1).map(|s| s.offset(vert_offset, uv_offset)))
            .collect(),
        ..Default::default()
    };
    // Delta morphs.
    out.delta_morphs = m0
        .delta_morphs
        .iter()
        .map(|morph| {
            let mut morph = morph.clone();
            morph.verts.resize(n0, Vec3::ZERO);
            match m1.find_delta_morph(&morph.name) {
                Some(i) => morph.verts.extend_from_slice(&m1.delta_morphs[i].verts),
                None => morph.verts.resize(n0 + n1, Vec3::ZERO),
            }
            morph
        })
        .collect();
    for morph in &m1.delta_morphs {
        if m0.find_delta_morph(&morph.name).is_none() {
            let mut morph = morph.clone();
            morph.verts.splice(0..0, std::iter::repeat_n(Vec3::ZERO, n0));
            out.delta_morphs.push(morph);
        }
    }
    // Target morphs.
    out.target_morphs = m0.target_morphs.clone();
    for morph in &m1.target_morphs {
        let base_inds = morph.base_inds.iter().map(|&i| i + vert_offset);
        match out.target_morphs.iter_mut().find(|m| m.name == morph.name) {
            Some(existing) => {
                existing.base_inds.extend(base_inds);
                existing.verts.extend_from_slice(&morph.verts);
            }
            None => {
                let mut morph = morph.clone();
                morph.base_inds = base_inds.collect();
                out.target_morphs.push(morph);
            }
        }
    }
    out.marked_verts = m0
        .marked_verts
        .iter()
        .cloned()
        .chain(m1.marked_verts.iter().map(|mv| MarkedVert {
            idx: mv.idx + vert_offset,
            label: mv.label.clone(),
        }))
        .collect();
    out
}

/// Merge a list of meshes from first to last. An empty list gives an empty
/// mesh.
pub fn merge_meshes_all(meshes: &[Mesh]) -> Mesh {
    let mut iter = meshes.iter();
    let first = iter.next().cloned().unwrap_or_default();
    iter.fold(first, |acc, m| merge_meshes(&acc, m))
}

/// Combine the surfaces of two meshes sharing the same vertex list.
///
/// The result keeps everything from `m0` and appends the surfaces of `m1`.
/// Both meshes must have the same number of vertices. Identical vertex lists,
/// or identical non-empty UV lists, mean the two are the same mesh and
/// [`merge_same_name_surfaces`](crate::ops::merge_same_name_surfaces) is
/// probably what was wanted, so they are reported as errors.
pub fn merge_mesh_surfaces(m0: &Mesh, m1: &Mesh) -> Result<Mesh, Error> {
    if m0.verts.len() != m1.verts.len() {
        return Err(Error::MismatchedArrayLengths(m0.verts.len(), m1.verts.len()));
    }
    if m0.verts == m1.verts {
        return Err(Error::IdenticalVertexLists);
    }
    if !m0.uvs.is_empty() && m0.uvs == m1.uvs {
        return Err(Error::IdenticalUvLists);
    }
    let mut out = m0.clone();
    out.surfaces.extend(m1.surfaces.iter().cloned());
    out.check_consistency()?;
    Ok(out)
}
