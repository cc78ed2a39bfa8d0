/*!
Ray-cast fragment renderer.

A [`RayCaster`] is built once for a set of meshes and a camera, then answers
per-pixel [`cast`](RayCaster::cast) queries. Nothing is mutated after
construction, so pixels can be cast in any order or in parallel. Moving the
camera or changing vertex positions means building a new one.

Coordinate systems:

- OECS: eye space. The camera sits at the origin looking down -Z, Y up.
- ITCS: image tangent space, `(x / -z, -y / -z)`, Y down.
- IUCS: image unit space, `[0, 1]` across the image, Y down. Reached from
  ITCS with a caller-supplied element-wise affine transform.
*/

use std::sync::Arc;

use glam::{UVec2, Vec2, Vec3, Vec4, vec4};
use image::RgbaImage;

use crate::{
    best::BestN,
    error::Error,
    geometry::{AffineEw2, Bounds2, Similarity, barycentric},
    grid::GridIndex,
    lighting::Lighting,
    mesh::Mesh,
    normals::calc_normals,
    sample::{composite_fragment, is_empty, sample_clip, to_rgba8},
    surface::Surface,
};

/// Albedo of surfaces without a texture.
const DEFAULT_ALBEDO: Vec4 = vec4(230.0, 230.0, 230.0, 255.0);

/// Number of overlapping fragments composited per pixel.
const MAX_LAYERS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RayCasterOptions {
    /// Sample the albedo and specular maps of surfaces that have UVs.
    pub use_textures: bool,
    /// Treat every surface as shiny.
    pub all_shiny: bool,
    /// Use facet normals instead of interpolated vertex normals.
    pub flat_shading: bool,
}

impl Default for RayCasterOptions {
    fn default() -> Self {
        RayCasterOptions {
            use_textures: true,
            all_shiny: false,
            flat_shading: false,
        }
    }
}

/// Address of a triangle: mesh, then surface, then tri-equivalent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriInd {
    pub tri_idx: u32,
    pub surf_idx: u32,
    pub mesh_idx: u32,
}

/// A triangle hit by a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersect {
    pub tri_ind: TriInd,
    pub barycentric: Vec3,
}

/// Everything the caster needs from one mesh, in eye space.
#[derive(Clone, Debug)]
struct MeshCache {
    /// Surfaces with quads split into tri-equivalents.
    surfaces: Vec<Surface>,
    uvs: Vec<Vec2>,
    /// Projected vertices, meaningful only where `inv_depths` is positive.
    iucs: Vec<Vec2>,
    inv_depths: Vec<f32>,
    vert_normals: Vec<Vec3>,
    /// By surface, by tri-equivalent.
    facet_normals: Vec<Vec<Vec3>>,
}

#[derive(Clone, Debug)]
pub struct RayCaster {
    meshes: Vec<MeshCache>,
    itcs_to_iucs: AffineEw2,
    grid: GridIndex<TriInd>,
    lighting: Lighting,
    background: Vec4,
    options: RayCasterOptions,
}

/// Inverse depth of an eye space point. Points at or behind the camera get a
/// non-positive value.
fn inv_depth(p: Vec3) -> f32 {
    if p.z == 0.0 { -1.0 } else { -1.0 / p.z }
}

impl RayCaster {
    /// Prepare `meshes` for casting.
    ///
    /// `modelview` takes the meshes into eye space, and `itcs_to_iucs` maps
    /// the image tangent plane onto the image. `lighting` is in eye space and
    /// `background` is alpha-weighted RGBA in `[0, 255]`.
    ///
    /// Triangles with any vertex at or behind the camera are left out rather
    /// than clipped. Fails if any mesh has out of range indices.
    pub fn new(
        meshes: &[Mesh],
        modelview: &Similarity,
        itcs_to_iucs: AffineEw2,
        lighting: Lighting,
        background: Vec4,
        options: RayCasterOptions,
    ) -> Result<Self, Error> {
        for mesh in meshes {
            mesh.check_consistency()?;
        }
        let caches: Vec<MeshCache> = meshes
            .iter()
            .map(|mesh| Self::cache_mesh(mesh, modelview, &itcs_to_iucs))
            .collect();
        let num_tris: usize = meshes.iter().map(|m| m.num_tri_equivs()).sum();
        let mut grid = GridIndex::new(Bounds2::UNIT, num_tris)?;
        let mut count = 0usize;
        for (mesh_idx, cache) in caches.iter().enumerate() {
            for (surf_idx, surf) in cache.surfaces.iter().enumerate() {
                for (tri_idx, tri) in surf.tris.vert_inds.iter().enumerate() {
                    if tri.iter().any(|&i| cache.inv_depths[i as usize] <= 0.0) {
                        continue;
                    }
                    let bounds = Bounds2::from_points(tri.map(|i| cache.iucs[i as usize]));
                    if let Some(bounds) = bounds {
                        let tri_ind = TriInd {
                            tri_idx: tri_idx as u32,
                            surf_idx: surf_idx as u32,
                            mesh_idx: mesh_idx as u32,
                        };
                        grid.add(tri_ind, bounds);
                        count += 1;
                    }
                }
            }
        }
        log::debug!("Ray caster indexed {} of {} triangles", count, num_tris);
        Ok(RayCaster {
            meshes: caches,
            itcs_to_iucs,
            grid,
            lighting,
            background,
            options,
        })
    }

    fn cache_mesh(mesh: &Mesh, modelview: &Similarity, itcs_to_iucs: &AffineEw2) -> MeshCache {
        let verts: Vec<Vec3> = mesh
            .verts
            .iter()
            .map(|v| modelview.transform_point(*v))
            .collect();
        let normals = calc_normals(&mesh.surfaces, &verts);
        let facet_normals: Vec<Vec<Vec3>> = mesh
            .surfaces
            .iter()
            .zip(&normals.facet)
            .map(|(surf, fnorms)| {
                (0..surf.num_tri_equivs())
                    .map(|i| fnorms.tri_equiv(i))
                    .collect()
            })
            .collect();
        let (iucs, inv_depths): (Vec<Vec2>, Vec<f32>) = verts
            .iter()
            .map(|&v| project(itcs_to_iucs, v))
            .map(|p| (p.truncate(), p.z))
            .unzip();
        MeshCache {
            surfaces: mesh.surfaces.iter().map(|s| s.as_tris()).collect(),
            uvs: mesh.uvs.clone(),
            iucs,
            inv_depths,
            vert_normals: normals.vert,
            facet_normals,
        }
    }

    /// Project an eye space point. X and Y of the result are in IUCS, Z is
    /// the inverse depth, which is not positive unless the point is in front
    /// of the camera.
    pub fn oecs_to_iucs(&self, pos: Vec3) -> Vec3 {
        project(&self.itcs_to_iucs, pos)
    }

    /// Up to four triangles under `pos`, nearest first.
    pub fn closest_intersects(&self, pos: Vec2) -> BestN<f32, Intersect, MAX_LAYERS> {
        let mut best = BestN::new();
        for &tri_ind in self.grid.get(pos) {
            let cache = &self.meshes[tri_ind.mesh_idx as usize];
            let tri = cache.surfaces[tri_ind.surf_idx as usize].tris.vert_inds
                [tri_ind.tri_idx as usize];
            let [a, b, c] = tri.map(|i| cache.iucs[i as usize]);
            let Some(bc) = barycentric(pos, a, b, c) else {
                continue;
            };
            if bc.min_element() < 0.0 {
                continue;
            }
            let depths = Vec3::from_array(tri.map(|i| cache.inv_depths[i as usize]));
            best.update(
                bc.dot(depths),
                Intersect {
                    tri_ind,
                    barycentric: bc,
                },
            );
        }
        best
    }

    /// Colour seen through `pos` in IUCS, as alpha-weighted RGBA.
    ///
    /// Channels can exceed 255 where highlights saturate. The background is
    /// returned unchanged where nothing is hit.
    pub fn cast(&self, pos: Vec2) -> Vec4 {
        self.closest_intersects(pos)
            .iter()
            .rev()
            .fold(self.background, |acc, (_, isect)| {
                composite_fragment(self.shade(isect), acc)
            })
    }

    fn shade(&self, isect: &Intersect) -> Vec4 {
        let TriInd {
            tri_idx,
            surf_idx,
            mesh_idx,
        } = isect.tri_ind;
        let cache = &self.meshes[mesh_idx as usize];
        let surf = &cache.surfaces[surf_idx as usize];
        let tri_idx = tri_idx as usize;
        let bc = isect.barycentric;
        let interp = |vals: [Vec3; 3]| vals[0] * bc.x + vals[1] * bc.y + vals[2] * bc.z;
        let normal = if self.options.flat_shading {
            cache.facet_normals[surf_idx as usize][tri_idx]
        } else {
            let tri = surf.tris.vert_inds[tri_idx];
            interp(tri.map(|i| cache.vert_normals[i as usize])).normalize_or_zero()
        };
        // Image rows run top down, texture V runs bottom up.
        let uv = surf
            .tris
            .uvs_of(tri_idx)
            .filter(|_| self.options.use_textures)
            .map(|inds| {
                let uv = interp(inds.map(|i| cache.uvs[i as usize].extend(0.0))).truncate();
                Vec2::new(uv.x, 1.0 - uv.y)
            });
        let material = &surf.material;
        let texture = |map: &Option<Arc<RgbaImage>>| -> Option<Vec4> {
            let map = map.as_deref().filter(|m| !is_empty(m))?;
            Some(sample_clip(map, uv?))
        };
        let albedo = texture(&material.albedo_map).unwrap_or(DEFAULT_ALBEDO);
        let mut specular = if material.shiny || self.options.all_shiny {
            1.0
        } else {
            0.0
        };
        if let Some(spec) = texture(&material.specular_map) {
            specular = spec.x / 255.0;
        }
        let surf_colour = albedo.truncate() * (albedo.w / 255.0);
        self.lighting
            .shade(normal, surf_colour, specular)
            .extend(albedo.w)
    }

    /// Cast through the centre of every pixel of an image of the given
    /// size. Rows are returned top to bottom.
    pub fn render(&self, dims: UVec2) -> Vec<Vec4> {
        let mut out = vec![Vec4::ZERO; (dims.x * dims.y) as usize];
        let size = dims.as_vec2();
        let row_fn = |y: usize, row: &mut [Vec4]| {
            let py = (y as f32 + 0.5) / size.y;
            for (x, px) in row.iter_mut().enumerate() {
                *px = self.cast(Vec2::new((x as f32 + 0.5) / size.x, py));
            }
        };
        let width = (dims.x as usize).max(1);
        #[cfg(feature = "auto-threads")]
        {
            use rayon::iter::{IndexedParallelIterator as _, ParallelIterator as _};
            use rayon::slice::ParallelSliceMut as _;
            out.par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, row)| row_fn(y, row));
        }
        #[cfg(not(feature = "auto-threads"))]
        {
            for (y, row) in out.chunks_mut(width).enumerate() {
                row_fn(y, row);
            }
        }
        out
    }

    /// [`render`](Self::render) with every colour clamped to 8 bits.
    pub fn render_image(&self, dims: UVec2) -> RgbaImage {
        let pixels = self.render(dims);
        let mut img = RgbaImage::new(dims.x, dims.y);
        for (px, c) in img.pixels_mut().zip(pixels) {
            *px = to_rgba8(c);
        }
        img
    }
}

/// IUCS position and inverse depth of an eye space point.
fn project(itcs_to_iucs: &AffineEw2, p: Vec3) -> Vec3 {
    let id = inv_depth(p);
    let itcs = Vec2::new(p.x * id, -p.y * id);
    itcs_to_iucs.apply(itcs).extend(id)
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use glam::{UVec2, Vec2, Vec4, vec2, vec3, vec4};
    use image::{Rgba, RgbaImage};

    use super::{RayCaster, RayCasterOptions};
    use crate::{
        error::Error,
        facet::{Quads, Tris},
        geometry::{AffineEw2, Bounds2, Similarity},
        lighting::Lighting,
        macros::{assert_f32_eq, assert_vec_eq},
        mesh::Mesh,
        surface::{Material, Surface},
    };

    const BACKGROUND: Vec4 = vec4(10.0, 20.0, 30.0, 255.0);

    /// Maps the tangent square `[-1, 1]^2` onto the image.
    fn fov_90() -> AffineEw2 {
        AffineEw2::from_bounds(Bounds2::new(Vec2::splat(-1.0), Vec2::ONE), Bounds2::UNIT)
    }

    /// Camera-facing triangle at depth `z`, covering the image centre.
    fn facing_tri(z: f32) -> Mesh {
        let h = z * 0.5;
        Mesh::from_tris(
            vec![vec3(h, h, z), vec3(-h, h, z), vec3(0.0, -h, z)],
            vec![[0, 1, 2]],
        )
        .expect("Cannot create triangle")
    }

    fn textured(mut mesh: Mesh, colour: [u8; 4]) -> Mesh {
        mesh.uvs = vec![Vec2::ZERO, Vec2::X, Vec2::Y];
        let surf = &mut mesh.surfaces[0];
        surf.tris.uv_inds = vec![[0, 1, 2]];
        surf.material.albedo_map = Some(Arc::new(RgbaImage::from_pixel(1, 1, Rgba(colour))));
        mesh
    }

    fn caster(meshes: &[Mesh], options: RayCasterOptions) -> RayCaster {
        RayCaster::new(
            meshes,
            &Similarity::IDENTITY,
            fov_90(),
            Lighting::default(),
            BACKGROUND,
            options,
        )
        .expect("Cannot create ray caster")
    }

    #[test]
    fn t_single_triangle() {
        let mesh = facing_tri(-2.0);
        let rc = caster(std::slice::from_ref(&mesh), RayCasterOptions::default());
        let centre = vec2(0.5, 0.5);
        assert_eq!(rc.closest_intersects(centre).len(), 1);
        // Ambient plus full diffuse from the default light behind the camera.
        assert_vec_eq!(rc.cast(centre), vec4(230.0, 230.0, 230.0, 255.0), 1e-3);
        assert_eq!(rc.cast(vec2(0.02, 0.02)), BACKGROUND);
        assert_eq!(rc.cast(vec2(-0.5, 0.5)), BACKGROUND);
        let proj = rc.oecs_to_iucs(mesh.verts[2]);
        assert_vec_eq!(proj, vec3(0.5, 0.25, 0.5));
        assert!(rc.oecs_to_iucs(vec3(0.0, 0.0, 1.0)).z <= 0.0);
    }

    #[test]
    fn t_near_plane_drops_triangles() {
        let mut mesh = facing_tri(-2.0);
        mesh.verts[1].z = 0.5;
        let rc = caster(&[mesh], RayCasterOptions::default());
        assert!(rc.closest_intersects(vec2(0.5, 0.5)).is_empty());
        assert_eq!(rc.cast(vec2(0.5, 0.5)), BACKGROUND);
    }

    #[test]
    fn t_textures() {
        let mesh = textured(facing_tri(-2.0), [255, 0, 0, 255]);
        let rc = caster(std::slice::from_ref(&mesh), RayCasterOptions::default());
        assert_vec_eq!(rc.cast(vec2(0.5, 0.5)), vec4(255.0, 0.0, 0.0, 255.0), 1e-3);
        let rc = caster(
            &[mesh],
            RayCasterOptions {
                use_textures: false,
                ..Default::default()
            },
        );
        assert_vec_eq!(rc.cast(vec2(0.5, 0.5)), vec4(230.0, 230.0, 230.0, 255.0), 1e-3);
    }

    #[test]
    fn t_composite_layers() {
        let near = textured(facing_tri(-1.0), [255, 255, 255, 128]);
        let far = facing_tri(-2.0);
        let rc = caster(&[far, near], RayCasterOptions::default());
        let hits = rc.closest_intersects(vec2(0.5, 0.5));
        assert_eq!(hits.len(), 2);
        let (depth, isect) = hits.best().expect("Two hits expected");
        assert_f32_eq!(*depth, 1.0, 1e-6);
        assert_eq!(isect.tri_ind.mesh_idx, 1);
        // Half transparent white over opaque grey.
        let grey = 128.0 + 230.0 * 127.0 / 255.0;
        assert_vec_eq!(rc.cast(vec2(0.5, 0.5)), vec4(grey, grey, grey, 255.0), 1e-2);
    }

    #[test]
    fn t_shiny_and_flat() {
        let mesh = facing_tri(-2.0);
        let shiny = caster(
            std::slice::from_ref(&mesh),
            RayCasterOptions {
                all_shiny: true,
                flat_shading: true,
                ..Default::default()
            },
        );
        // The highlight peaks where the normal faces the light.
        assert_vec_eq!(shiny.cast(vec2(0.5, 0.5)), vec4(485.0, 485.0, 485.0, 255.0), 1e-2);
        let mut quad = Mesh::new(
            vec![
                vec3(-1.0, -1.0, -2.0),
                vec3(1.0, -1.0, -2.0),
                vec3(1.0, 1.0, -2.0),
                vec3(-1.0, 1.0, -2.0),
            ],
            Vec::new(),
            vec![Surface::new(
                "quad",
                Tris::default(),
                Quads::from_verts(vec![[0, 1, 2, 3]]),
            )],
        )
        .expect("Cannot create quad");
        quad.surfaces[0].material = Material {
            shiny: true,
            ..Default::default()
        };
        let rc = caster(&[quad], RayCasterOptions::default());
        // Both halves of the quad are indexed.
        assert_eq!(rc.closest_intersects(vec2(0.3, 0.3)).len(), 1);
        assert_eq!(rc.closest_intersects(vec2(0.7, 0.7)).len(), 1);
        let img = rc.render_image(UVec2::new(8, 4));
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(img.get_pixel(4, 2), &Rgba([255, 255, 255, 255]));
        assert_eq!(img.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
        let raw = rc.render(UVec2::new(8, 4));
        assert_eq!(raw.len(), 32);
        assert!(raw[2 * 8 + 4].x > 255.0);
        assert_eq!(raw[0], BACKGROUND);
    }

    #[test]
    fn t_specular_map() {
        let mut mesh = textured(facing_tri(-2.0), [230, 230, 230, 255]);
        mesh.surfaces[0].material.specular_map =
            Some(Arc::new(RgbaImage::from_pixel(1, 1, Rgba([128, 0, 0, 255]))));
        // The map switches the highlight on for a dull surface, scaled by red.
        let rc = caster(std::slice::from_ref(&mesh), RayCasterOptions::default());
        let lit = 230.0 + 255.0 * 128.0 / 255.0;
        assert_vec_eq!(rc.cast(vec2(0.5, 0.5)), vec4(lit, lit, lit, 255.0), 1e-2);
        // It also overrides the shiny flag.
        mesh.surfaces[0].material.shiny = true;
        let rc = caster(std::slice::from_ref(&mesh), RayCasterOptions::default());
        assert_vec_eq!(rc.cast(vec2(0.5, 0.5)), vec4(lit, lit, lit, 255.0), 1e-2);
        // Without textures only the flag counts.
        let rc = caster(
            std::slice::from_ref(&mesh),
            RayCasterOptions {
                use_textures: false,
                ..Default::default()
            },
        );
        assert_vec_eq!(rc.cast(vec2(0.5, 0.5)), vec4(485.0, 485.0, 485.0, 255.0), 1e-2);
        mesh.surfaces[0].material.shiny = false;
        let rc = caster(
            &[mesh],
            RayCasterOptions {
                use_textures: false,
                ..Default::default()
            },
        );
        assert_vec_eq!(rc.cast(vec2(0.5, 0.5)), vec4(230.0, 230.0, 230.0, 255.0), 1e-3);
    }

    #[test]
    fn t_render_matches_cast() {
        // Serial or parallel depending on the `auto-threads` feature.
        let meshes = [
            facing_tri(-2.0),
            textured(facing_tri(-1.5), [200, 100, 50, 128]),
        ];
        let rc = caster(&meshes, RayCasterOptions::default());
        let dims = UVec2::new(13, 7);
        let pixels = rc.render(dims);
        assert_eq!(pixels.len(), 13 * 7);
        for y in 0..dims.y {
            for x in 0..dims.x {
                let pos = vec2((x as f32 + 0.5) / 13.0, (y as f32 + 0.5) / 7.0);
                assert_eq!(pixels[(y * dims.x + x) as usize], rc.cast(pos));
            }
        }
    }

    #[test]
    fn t_rejects_bad_indices() {
        let mut mesh = facing_tri(-2.0);
        mesh.surfaces[0].tris.vert_inds.push([0, 1, 3]);
        assert!(matches!(
            RayCaster::new(
                &[mesh],
                &Similarity::IDENTITY,
                fov_90(),
                Lighting::default(),
                BACKGROUND,
                RayCasterOptions::default(),
            ),
            Err(Error::IndexOutOfBounds { .. })
        ));
    }
}
