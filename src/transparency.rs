/*!
Draw order for transparent triangles.

Painting transparent triangles back to front only looks right if the order
respects which triangle covers which. [`sort_transparent_faces`] estimates
that order by sampling an orthographic view along -Z: wherever one
transparent triangle lies over another, the covered one collects a weight
equal to how much light still reaches it. Triangles are then peeled off
greedily, least covered first. The result is approximate, but depends only
on its inputs.
*/

use std::collections::BTreeMap;

use glam::{Vec2, Vec3};
use image::RgbaImage;

use crate::{
    error::Error,
    geometry::{AffineEw2, Bounds2},
    grid::{GridTriangles, TriPoint},
    mesh::Mesh,
    sample::{is_empty, sample_clip},
    surface::Surface,
};

/// Samples along each side of the view.
pub const DEFAULT_SAMPLES: u32 = 512;

/// [`sort_transparent_faces_with_samples`] with [`DEFAULT_SAMPLES`].
pub fn sort_transparent_faces(
    transparent: &Mesh,
    opaque: &Mesh,
    albedo: &RgbaImage,
) -> Result<Surface, Error> {
    sort_transparent_faces_with_samples(transparent, opaque, albedo, DEFAULT_SAMPLES)
}

/// Reorder the facets of `transparent` for back to front painting.
///
/// Returns a single triangle surface, named after `transparent`, with the
/// tri-equivalents of all its surfaces in painting order. Triangles of
/// `opaque` hide whatever lies behind them but are not part of the output.
/// The alpha channel of `albedo` gives the opacity of the transparent
/// triangles at their UVs. Triangles without UVs are treated as opaque
/// occluders of each other.
///
/// The view is sampled on a `samples` by `samples` grid over the XY bounds
/// of `transparent`.
pub fn sort_transparent_faces_with_samples(
    transparent: &Mesh,
    opaque: &Mesh,
    albedo: &RgbaImage,
    samples: u32,
) -> Result<Surface, Error> {
    let merged = transparent.merged_surface();
    let trans_tris = merged.tri_equivs();
    let num_trans = trans_tris.len();
    let domain = Bounds2::from_points(transparent.verts.iter().map(|v| v.truncate()))
        .ok_or(Error::EmptyMesh)?;
    if !(domain.area() > 0.0) {
        return Err(Error::ZeroAreaDomain);
    }
    let to_unit = AffineEw2::from_bounds(domain, Bounds2::UNIT);
    let verts: Vec<Vec3> = transparent.verts.iter().chain(&opaque.verts).copied().collect();
    let verts2: Vec<Vec2> = verts.iter().map(|v| to_unit.apply(v.truncate())).collect();
    let offset = transparent.verts.len() as u32;
    let tris: Vec<[u32; 3]> = trans_tris
        .vert_inds
        .iter()
        .copied()
        .chain(
            opaque
                .all_tri_equivs()
                .into_iter()
                .map(|t| t.map(|i| i + offset)),
        )
        .collect();
    let grid = GridTriangles::new(&verts2, &tris, 1.0)?;
    let alpha = |tp: &TriPoint| -> f32 {
        match trans_tris.uvs_of(tp.tri_ind as usize) {
            Some(inds) if !is_empty(albedo) => {
                let [a, b, c] = inds.map(|i| transparent.uvs[i as usize]);
                let uv = a * tp.bary.x + b * tp.bary.y + c * tp.bary.z;
                sample_clip(albedo, Vec2::new(uv.x, 1.0 - uv.y)).w
            }
            _ => 255.0,
        }
    };
    // weights[far][near]: how much `far` shows through where `near` covers it.
    let mut weights: Vec<BTreeMap<u32, f64>> = vec![BTreeMap::new(); num_trans];
    let step = 1.0 / samples as f32;
    let mut hits: Vec<(f32, TriPoint)> = Vec::new();
    for y in 0..samples {
        for x in 0..samples {
            let pos = Vec2::new((x as f32 + 0.5) * step, (y as f32 + 0.5) * step);
            hits.clear();
            hits.extend(grid.intersects(&tris, &verts2, pos).into_iter().map(|tp| {
                let [a, b, c] = tp.point_inds.map(|i| verts[i as usize].z);
                (a * tp.bary.x + b * tp.bary.y + c * tp.bary.z, tp)
            }));
            // Nearest first.
            hits.sort_by(|(za, ta), (zb, tb)| zb.total_cmp(za).then(ta.tri_ind.cmp(&tb.tri_ind)));
            let mut trans_total = 1.0f64;
            for pair in hits.windows(2) {
                let (near, far) = (&pair[0].1, &pair[1].1);
                if near.tri_ind as usize >= num_trans || far.tri_ind as usize >= num_trans {
                    break;
                }
                trans_total *= 1.0 - alpha(near) as f64 / 255.0;
                *weights[far.tri_ind as usize].entry(near.tri_ind).or_insert(0.0) += trans_total;
            }
        }
    }
    let mut order = peel(&weights);
    order.reverse();
    Ok(Surface {
        name: transparent.name.clone(),
        tris: trans_tris.select(&order),
        material: merged.material,
        ..Default::default()
    })
}

/// Front to back order: repeatedly take the triangle least covered by the
/// triangles not yet taken. Ties go to the lowest index.
fn peel(weights: &[BTreeMap<u32, f64>]) -> Vec<usize> {
    let n = weights.len();
    let mut picked = vec![false; n];
    let mut order = Vec::with_capacity(n);
    while order.len() < n {
        let mut best: Option<(f64, usize)> = None;
        for (i, w) in weights.iter().enumerate().filter(|(i, _)| !picked[*i]) {
            let cost: f64 = w
                .iter()
                .filter(|&(&near, _)| !picked[near as usize])
                .map(|(_, &v)| v)
                .sum();
            if best.is_none_or(|(bc, _)| cost < bc) {
                best = Some((cost, i));
            }
        }
        let Some((_, i)) = best else { break };
        picked[i] = true;
        order.push(i);
    }
    order
}
