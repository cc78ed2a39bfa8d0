/*!
Triangle subdivision.

Both schemes split every triangle `[a, b, c]` into four, using one new vertex
per edge:

```text
[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]
```

Quads are first split into their tri-equivalents. Existing vertices keep their
indices and the edge vertices are appended after them, in order of first
appearance. UVs are split the same way at UV edge midpoints. Each output
vertex is a fixed weighted sum of input vertices. The same weights are applied
to morph displacements, so a morph of the subdivided mesh moves it exactly as
subdividing the morphed mesh would.
*/

use std::collections::HashMap;

use arrayvec::ArrayVec;
use glam::{Vec2, Vec3, vec3};

use crate::{
    error::Error,
    facet::Tris,
    mesh::{IndexedMorph, Mesh, Morph},
    surface::{SurfPoint, Surface},
};

struct Edge {
    verts: [u32; 2],
    /// Vertices opposite this edge, from the first two triangles using it.
    opposite: ArrayVec<u32, 2>,
    num_tris: u32,
}

/// Edges of a list of triangles, numbered in order of first appearance.
#[derive(Default)]
struct EdgeMap {
    edges: Vec<Edge>,
    lookup: HashMap<[u32; 2], u32>,
}

impl EdgeMap {
    fn add(&mut self, a: u32, b: u32, opposite: u32) -> u32 {
        let key = if a < b { [a, b] } else { [b, a] };
        let edges = &mut self.edges;
        let idx = *self.lookup.entry(key).or_insert_with(|| {
            edges.push(Edge {
                verts: key,
                opposite: ArrayVec::new(),
                num_tris: 0,
            });
            (edges.len() - 1) as u32
        });
        let edge = &mut self.edges[idx as usize];
        edge.num_tris += 1;
        if !edge.opposite.is_full() {
            edge.opposite.push(opposite);
        }
        idx
    }

    /// Indices of the edges `(a, b)`, `(b, c)` and `(c, a)`.
    fn add_tri(&mut self, [a, b, c]: [u32; 3]) -> [u32; 3] {
        [self.add(a, b, c), self.add(b, c, a), self.add(c, a, b)]
    }
}

fn split_tri([a, b, c]: [u32; 3], [ab, bc, ca]: [u32; 3]) -> [[u32; 3]; 4] {
    [[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]
}

/// Surface point on the child triangle that contains it, see [`split_tri`].
fn split_surf_point(sp: &SurfPoint) -> SurfPoint {
    let [wa, wb, wc] = sp.weights.to_array();
    let (child, weights) = if wa > wb + wc {
        (0, vec3(wa - wb - wc, 2.0 * wb, 2.0 * wc))
    } else if wb > wa + wc {
        (1, vec3(wb - wa - wc, 2.0 * wc, 2.0 * wa))
    } else if wc > wa + wb {
        (2, vec3(wc - wa - wb, 2.0 * wa, 2.0 * wb))
    } else {
        (3, vec3(wa + wb - wc, wb + wc - wa, wc + wa - wb))
    };
    SurfPoint {
        tri_equiv_idx: sp.tri_equiv_idx * 4 + child,
        weights,
        label: sp.label.clone(),
    }
}

/// Each output point as a weighted sum of input points.
struct Stencils(Vec<Vec<(u32, f32)>>);

impl Stencils {
    fn apply(&self, points: &[Vec3]) -> Vec<Vec3> {
        self.0
            .iter()
            .map(|s| s.iter().map(|&(i, w)| points[i as usize] * w).sum())
            .collect()
    }

    fn flat(num_verts: usize, edges: &[Edge]) -> Self {
        Stencils(
            (0..num_verts as u32)
                .map(|i| vec![(i, 1.0)])
                .chain(edges.iter().map(|e| vec![(e.verts[0], 0.5), (e.verts[1], 0.5)]))
                .collect(),
        )
    }

    fn smooth(num_verts: usize, edges: &[Edge]) -> Result<Self, Error> {
        let mut neighbours: Vec<Vec<u32>> = vec![Vec::new(); num_verts];
        let mut boundary: Vec<Vec<u32>> = vec![Vec::new(); num_verts];
        for e in edges {
            let [a, b] = e.verts;
            neighbours[a as usize].push(b);
            neighbours[b as usize].push(a);
            if e.num_tris == 1 {
                boundary[a as usize].push(b);
                boundary[b as usize].push(a);
            }
        }
        let mut odd = Vec::with_capacity(edges.len());
        for e in edges {
            let [a, b] = e.verts;
            odd.push(match (e.num_tris, e.opposite.as_slice()) {
                (1, _) => vec![(a, 0.5), (b, 0.5)],
                (2, &[c, d]) => vec![(a, 0.375), (b, 0.375), (c, 0.125), (d, 0.125)],
                _ => return Err(Error::NonManifoldEdge(a, b)),
            });
        }
        let mut out = Vec::with_capacity(num_verts + edges.len());
        for (v, (nbrs, bnbrs)) in neighbours.iter().zip(&boundary).enumerate() {
            let v = v as u32;
            out.push(match bnbrs.as_slice() {
                [] if nbrs.is_empty() => vec![(v, 1.0)],
                [] => {
                    let (a, b) = loop_weights(nbrs.len());
                    std::iter::once((v, a))
                        .chain(nbrs.iter().map(|&n| (n, b)))
                        .collect()
                }
                &[n0, n1] => vec![(v, 0.75), (n0, 0.125), (n1, 0.125)],
                _ => return Err(Error::NonManifoldVertex(v, bnbrs.len())),
            });
        }
        out.extend(odd);
        Ok(Stencils(out))
    }
}

/// Weight of an interior vertex and of each of its neighbours, for the given
/// valence.
fn loop_weights(valence: usize) -> (f32, f32) {
    const THREE_EIGHTHS: f64 = 3.0 / 8.0;
    let n = valence as f64;
    let alpha =
        THREE_EIGHTHS + f64::powi(THREE_EIGHTHS + 0.25 * f64::cos(std::f64::consts::TAU / n), 2);
    (alpha as f32, ((1.0 - alpha) / n) as f32)
}

fn subdivide(mesh: &Mesh, smooth: bool) -> Result<Mesh, Error> {
    mesh.check_consistency()?;
    let surfaces: Vec<Surface> = mesh.surfaces.iter().map(Surface::as_tris).collect();
    let mut edges = EdgeMap::default();
    let mut uv_edges = EdgeMap::default();
    let mut tri_edges: Vec<Vec<[u32; 3]>> = Vec::with_capacity(surfaces.len());
    let mut tri_uv_edges: Vec<Vec<[u32; 3]>> = Vec::with_capacity(surfaces.len());
    for surf in &surfaces {
        tri_edges.push(surf.tris.vert_inds.iter().map(|&t| edges.add_tri(t)).collect());
        tri_uv_edges.push(surf.tris.uv_inds.iter().map(|&t| uv_edges.add_tri(t)).collect());
    }
    let num_verts = mesh.verts.len();
    let stencils = if smooth {
        Stencils::smooth(num_verts, &edges.edges)?
    } else {
        Stencils::flat(num_verts, &edges.edges)
    };
    let vert_base = num_verts as u32;
    let uv_base = mesh.uvs.len() as u32;
    let surfaces: Vec<Surface> = surfaces
        .iter()
        .zip(tri_edges.iter().zip(&tri_uv_edges))
        .map(|(surf, (tes, tues))| {
            let split = |tris: &[[u32; 3]], tedges: &[[u32; 3]], base: u32| -> Vec<[u32; 3]> {
                tris.iter()
                    .zip(tedges)
                    .flat_map(|(&t, e)| split_tri(t, e.map(|i| base + i)))
                    .collect()
            };
            Surface {
                name: surf.name.clone(),
                tris: Tris {
                    vert_inds: split(&surf.tris.vert_inds, tes, vert_base),
                    uv_inds: split(&surf.tris.uv_inds, tues, uv_base),
                },
                surf_points: surf.surf_points.iter().map(split_surf_point).collect(),
                ..surf.clone()
            }
        })
        .collect();
    let uvs: Vec<Vec2> = mesh
        .uvs
        .iter()
        .copied()
        .chain(uv_edges.edges.iter().map(|e| {
            let [a, b] = e.verts.map(|i| mesh.uvs[i as usize]);
            (a + b) * 0.5
        }))
        .collect();
    let target_morphs = mesh
        .target_morphs
        .iter()
        .map(|m| {
            let mut dense = vec![Vec3::ZERO; num_verts];
            for (&i, &d) in m.base_inds.iter().zip(&m.verts) {
                dense[i as usize] = d;
            }
            let (base_inds, verts): (Vec<u32>, Vec<Vec3>) = stencils
                .apply(&dense)
                .into_iter()
                .enumerate()
                .filter(|(_, d)| *d != Vec3::ZERO)
                .map(|(i, d)| (i as u32, d))
                .unzip();
            IndexedMorph {
                name: m.name.clone(),
                base_inds,
                verts,
            }
        })
        .collect();
    let out = Mesh {
        name: mesh.name.clone(),
        verts: stencils.apply(&mesh.verts),
        uvs,
        surfaces,
        delta_morphs: mesh
            .delta_morphs
            .iter()
            .map(|m| Morph {
                name: m.name.clone(),
                verts: stencils.apply(&m.verts),
            })
            .collect(),
        target_morphs,
        marked_verts: mesh.marked_verts.clone(),
    };
    log::debug!(
        "Subdivided {} triangles into {}",
        mesh.num_tri_equivs(),
        out.num_tris()
    );
    Ok(out)
}

/// Split every triangle into four without moving any vertex. The new
/// vertices sit at edge midpoints.
pub fn subdivide_flat(mesh: &Mesh) -> Result<Mesh, Error> {
    subdivide(mesh, false)
}

/// Split every triangle into four and smooth the result with Loop's scheme.
///
/// Boundary vertices and edges use the boundary rules, so open meshes are
/// fine, but every edge must belong to at most two triangles and every
/// boundary vertex must lie on exactly two boundary edges.
pub fn subdivide_loop(mesh: &Mesh) -> Result<Mesh, Error> {
    subdivide(mesh, true)
}
