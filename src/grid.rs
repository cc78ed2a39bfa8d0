use glam::{UVec2, Vec2, Vec3};

use crate::{
    error::Error,
    geometry::{AffineEw2, Bounds2, barycentric},
};

/// Marks a projected vertex that can't be seen, e.g. one behind the camera.
pub const INVALID_POINT: Vec2 = Vec2::splat(f32::MAX);

/// Margin, in bins, between the domain and the edge of the grid, so points
/// on the domain boundary land inside the grid despite rounding.
const GRID_MARGIN: f32 = 0.01;

fn is_valid_point(p: Vec2) -> bool {
    p.is_finite() && p != INVALID_POINT
}

/// Uniform grid of bins over a 2D domain. Each bin holds the values whose
/// bounding box overlaps the cell.
#[derive(Clone, Debug)]
pub struct GridIndex<T> {
    client_to_grid: AffineEw2,
    dims: UVec2,
    bins: Vec<Vec<T>>,
}

impl<T: Clone> GridIndex<T> {
    /// Grid over `domain` with roughly `approx_bins` square-ish bins.
    pub fn new(domain: Bounds2, approx_bins: usize) -> Result<Self, Error> {
        let size = domain.size();
        let area = domain.area();
        if !(area > 0.0) || !area.is_finite() {
            return Err(Error::ZeroAreaDomain);
        }
        let scale = (approx_bins.max(1) as f32 / area).sqrt();
        let dims = (size * scale + 0.5).as_uvec2().max(UVec2::ONE);
        let client_to_grid = AffineEw2::from_bounds(
            domain,
            Bounds2::new(
                Vec2::splat(GRID_MARGIN),
                dims.as_vec2() - GRID_MARGIN,
            ),
        );
        Ok(GridIndex {
            client_to_grid,
            dims,
            bins: vec![Vec::new(); (dims.x * dims.y) as usize],
        })
    }

    pub fn dims(&self) -> UVec2 {
        self.dims
    }

    pub fn client_to_grid(&self) -> AffineEw2 {
        self.client_to_grid
    }

    /// Add `val` to every bin overlapping `bounds`, given in client
    /// coordinates. The parts of `bounds` outside the grid are ignored.
    pub fn add(&mut self, val: T, bounds: Bounds2) {
        let lo = self.client_to_grid.apply(bounds.min).floor();
        let hi = self.client_to_grid.apply(bounds.max).floor();
        let top = (self.dims - 1).as_vec2();
        if !(lo.x <= hi.x && lo.y <= hi.y)
            || hi.x < 0.0
            || hi.y < 0.0
            || lo.x > top.x
            || lo.y > top.y
        {
            return;
        }
        let lo = lo.max(Vec2::ZERO).as_uvec2();
        let hi = hi.min(top).as_uvec2();
        for y in lo.y..=hi.y {
            for x in lo.x..=hi.x {
                self.bins[(y * self.dims.x + x) as usize].push(val.clone());
            }
        }
    }

    /// Values in the bin containing `pos`, or nothing if `pos` is outside the
    /// grid.
    pub fn get(&self, pos: Vec2) -> &[T] {
        let g = self.client_to_grid.apply(pos);
        let dims = self.dims.as_vec2();
        // Also rejects NaN.
        if !(g.x >= 0.0 && g.y >= 0.0 && g.x < dims.x && g.y < dims.y) {
            return &[];
        }
        let idx = g.as_uvec2().min(self.dims - 1);
        &self.bins[(idx.y * self.dims.x + idx.x) as usize]
    }
}

/// A triangle containing a query point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriPoint {
    pub tri_ind: u32,
    pub point_inds: [u32; 3],
    pub bary: Vec3,
}

/// Index over a fixed list of triangles in 2D for point-in-triangle queries.
///
/// The index holds no geometry. Queries are answered against the vertex
/// positions passed in, which may differ from the construction positions as
/// long as the triangles still fall roughly in the same bins.
#[derive(Clone, Debug)]
pub struct GridTriangles {
    grid: GridIndex<u32>,
}

impl GridTriangles {
    /// Index `tris` over the projected `verts`.
    ///
    /// Vertices equal to [`INVALID_POINT`] (or non-finite) are not visible.
    /// Triangles using them are left out of the index and never returned by
    /// a query. The grid has about `bins_per_tri` bins per valid vertex.
    pub fn new(verts: &[Vec2], tris: &[[u32; 3]], bins_per_tri: f32) -> Result<Self, Error> {
        if let Some(&index) = tris.iter().flatten().find(|&&i| i as usize >= verts.len()) {
            return Err(Error::IndexOutOfBounds {
                what: "Triangle vertex",
                index,
                len: verts.len(),
            });
        }
        let valid = || verts.iter().copied().filter(|p| is_valid_point(*p));
        let domain = Bounds2::from_points(valid()).ok_or(Error::ZeroAreaDomain)?;
        let approx_bins = (valid().count() as f32 * bins_per_tri).round() as usize;
        let mut grid = GridIndex::new(domain, approx_bins)?;
        let mut count = 0usize;
        for (ti, tri) in tris.iter().enumerate() {
            let pts = tri.map(|i| verts[i as usize]);
            if !pts.iter().all(|p| is_valid_point(*p)) {
                continue;
            }
            if let Some(bounds) = Bounds2::from_points(pts) {
                grid.add(ti as u32, bounds);
                count += 1;
            }
        }
        log::debug!(
            "Indexed {} of {} triangles in a {}x{} grid",
            count,
            tris.len(),
            grid.dims.x,
            grid.dims.y
        );
        Ok(GridTriangles { grid })
    }

    pub fn dims(&self) -> UVec2 {
        self.grid.dims()
    }

    /// Every triangle containing `pos`, including on its boundary, in no
    /// particular order. Degenerate triangles never match.
    pub fn intersects(&self, tris: &[[u32; 3]], verts: &[Vec2], pos: Vec2) -> Vec<TriPoint> {
        self.grid
            .get(pos)
            .iter()
            .filter_map(|&ti| tri_point(tris, verts, ti, pos))
            .collect()
    }

    /// The triangle containing `pos` with the greatest interpolated inverse
    /// depth, i.e. the one nearest the camera.
    pub fn nearest_intersect(
        &self,
        tris: &[[u32; 3]],
        verts: &[Vec2],
        inv_depths: &[f32],
        pos: Vec2,
    ) -> Option<TriPoint> {
        self.grid
            .get(pos)
            .iter()
            .filter_map(|&ti| tri_point(tris, verts, ti, pos))
            .map(|tp| (interp_inv_depth(&tp, inv_depths), tp))
            .fold(None, |best: Option<(f32, TriPoint)>, (d, tp)| match best {
                Some((bd, _)) if bd >= d => best,
                _ => Some((d, tp)),
            })
            .map(|(_, tp)| tp)
    }
}

/// Inverse depth at the query point, interpolated from the vertices with the
/// barycentric weights. Inverse depth is linear in screen space.
pub fn interp_inv_depth(tp: &TriPoint, inv_depths: &[f32]) -> f32 {
    let [a, b, c] = tp.point_inds;
    tp.bary.x * inv_depths[a as usize]
        + tp.bary.y * inv_depths[b as usize]
        + tp.bary.z * inv_depths[c as usize]
}

fn tri_point(tris: &[[u32; 3]], verts: &[Vec2], ti: u32, pos: Vec2) -> Option<TriPoint> {
    let point_inds = tris[ti as usize];
    let [a, b, c] = point_inds.map(|i| verts[i as usize]);
    if !(is_valid_point(a) && is_valid_point(b) && is_valid_point(c)) {
        return None;
    }
    let bary = barycentric(pos, a, b, c)?;
    (bary.min_element() >= 0.0).then_some(TriPoint {
        tri_ind: ti,
        point_inds,
        bary,
    })
}
