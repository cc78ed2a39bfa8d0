use glam::{Vec2, Vec3, vec3};
use image::{ImageBuffer, Luma};

use crate::{
    error::Error,
    facet::Quads,
    mesh::Mesh,
    ops::{quad_surface, subdivide_flat, tri_surface},
    surface::Surface,
};

/// Single channel floating point image, e.g. a height field.
pub type HeightMap = ImageBuffer<Luma<f32>, Vec<f32>>;

fn tri_mesh(verts: Vec<Vec3>, tris: Vec<[u32; 3]>) -> Mesh {
    Mesh {
        verts,
        surfaces: vec![tri_surface(tris)],
        ..Default::default()
    }
}

impl Mesh {
    /// Makes a cube with quad faces spanning from -1 to 1 along each axis,
    /// with the following topology. An open cube has no top face
    /// `(2, 3, 7, 6)`.
    ///
    ///  ```text
    ///       7-----------6
    ///      /|          /|
    ///     / |         / |
    ///    4-----------5  |
    ///    |  |        |  |
    ///    |  3--------|--2
    ///    | /         | /
    ///    |/          |/
    ///    0-----------1
    ///  ```
    pub fn cube(open: bool) -> Mesh {
        const BOX_POS: [(bool, bool, bool); 8] = [
            (false, false, false),
            (true, false, false),
            (true, true, false),
            (false, true, false),
            (false, false, true),
            (true, false, true),
            (true, true, true),
            (false, true, true),
        ];
        const BOX_IDX: [[u32; 4]; 6] = [
            [0, 3, 2, 1],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [3, 0, 4, 7],
            [4, 5, 6, 7],
            [2, 3, 7, 6],
        ];
        let coord = |f: bool| if f { 1.0 } else { -1.0 };
        let verts = BOX_POS
            .iter()
            .map(|&(x, y, z)| vec3(coord(x), coord(y), coord(z)))
            .collect();
        let nfaces = if open { 5 } else { 6 };
        Mesh {
            verts,
            surfaces: vec![Surface::from_quads(Quads::from_verts(
                BOX_IDX[..nfaces].to_vec(),
            ))],
            ..Default::default()
        }
    }

    /// Regular tetrahedron with edges of length `2 * sqrt(2)`, centred on the
    /// origin. An open tetrahedron is missing one face.
    pub fn tetrahedron(open: bool) -> Mesh {
        let verts = vec![
            vec3(1.0, 1.0, 1.0),
            vec3(-1.0, -1.0, 1.0),
            vec3(-1.0, 1.0, -1.0),
            vec3(1.0, -1.0, -1.0),
        ];
        let mut tris = vec![[0, 1, 3], [0, 2, 1], [2, 0, 3]];
        if !open {
            tris.push([1, 2, 3]);
        }
        tri_mesh(verts, tris)
    }

    /// Square pyramid with its base on the `y = 0` plane and its apex at
    /// `(0, 1, 0)`. An open pyramid has no base.
    pub fn pyramid(open: bool) -> Mesh {
        let verts = vec![
            vec3(-1.0, 0.0, -1.0),
            vec3(1.0, 0.0, -1.0),
            vec3(-1.0, 0.0, 1.0),
            vec3(1.0, 0.0, 1.0),
            vec3(0.0, 1.0, 0.0),
        ];
        let mut tris = vec![[0, 4, 1], [0, 2, 4], [2, 3, 4], [1, 4, 3]];
        if !open {
            tris.extend([[0, 1, 3], [3, 2, 0]]);
        }
        tri_mesh(verts, tris)
    }

    /// Octahedron with its vertices on the coordinate axes at distance 1.
    pub fn octahedron() -> Mesh {
        let verts = (0..3)
            .flat_map(|axis| {
                [-1.0f32, 1.0].map(|s| {
                    let mut v = Vec3::ZERO;
                    v[axis] = s;
                    v
                })
            })
            .collect();
        tri_mesh(
            verts,
            vec![
                [0, 2, 5],
                [0, 3, 4],
                [0, 4, 2],
                [0, 5, 3],
                [1, 2, 4],
                [1, 3, 5],
                [1, 4, 3],
                [1, 5, 2],
            ],
        )
    }

    /// A tent with `n` sides: an apex at `(0, 1, 0)` joined to `n` points on
    /// the unit circle in the `y = 0` plane. The bottom is open.
    pub fn n_tent(n: u32) -> Result<Mesh, Error> {
        if n < 3 {
            return Err(Error::TooFewSides(n));
        }
        let step = std::f32::consts::TAU / n as f32;
        let verts = std::iter::once(Vec3::Y)
            .chain((0..n).map(|i| {
                let angle = step * i as f32;
                vec3(angle.cos(), 0.0, angle.sin())
            }))
            .collect();
        let tris = (0..n).map(|i| [0, (i + 1) % n + 1, i + 1]).collect();
        Ok(tri_mesh(verts, tris))
    }

    /// Quad grid over the unit square with one vertex per pixel of `heights`.
    ///
    /// Image row 0 is at `y = 1`. Heights are rescaled to span `[0, 1]` along
    /// Z, or are all zero if the image is flat. Each vertex has a UV equal to
    /// its XY position and faces point towards +Z.
    pub fn from_heights(heights: &HeightMap) -> Result<Mesh, Error> {
        let (w, h) = heights.dimensions();
        if w < 2 || h < 2 {
            return Err(Error::ZeroAreaDomain);
        }
        let (lo, hi) = heights
            .pixels()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
        let zscale = if hi > lo { 1.0 / (hi - lo) } else { 0.0 };
        let (wf, hf) = ((w - 1) as f32, (h - 1) as f32);
        let uvs: Vec<Vec2> = (0..h)
            .flat_map(|y| (0..w).map(move |x| Vec2::new(x as f32 / wf, 1.0 - y as f32 / hf)))
            .collect();
        let verts = uvs
            .iter()
            .zip(heights.pixels())
            .map(|(uv, p)| uv.extend((p[0] - lo) * zscale))
            .collect();
        let quads: Vec<[u32; 4]> = (0..h - 1)
            .flat_map(|y| {
                (0..w - 1).map(move |x| {
                    let (r0, r1) = (y * w, (y + 1) * w);
                    [r0 + x, r1 + x, r1 + x + 1, r0 + x + 1]
                })
            })
            .collect();
        Mesh::new(verts, uvs, vec![quad_surface(quads.clone(), quads)?])
    }

    /// Triangulated sphere centred on the origin, made by repeatedly
    /// subdividing a tetrahedron and pushing its vertices out to `radius`.
    /// Each subdivision quadruples the triangle count, from 4 with no
    /// subdivisions, up to a limit of 9.
    pub fn sphere(radius: f32, subdivisions: u32) -> Result<Mesh, Error> {
        const MAX_SUBDIVISIONS: u32 = 9;
        if subdivisions > MAX_SUBDIVISIONS {
            return Err(Error::TooManySubdivisions(subdivisions));
        }
        let inflate = |mut mesh: Mesh| {
            for v in &mut mesh.verts {
                let scale = radius / v.length();
                *v *= scale;
            }
            mesh
        };
        let mut mesh = Mesh::tetrahedron(false);
        for _ in 0..subdivisions {
            mesh = subdivide_flat(&inflate(mesh))?;
        }
        Ok(inflate(mesh))
    }
}

#[cfg(test)]
mod test {
    use glam::{Vec3, vec3};
    use image::Luma;

    use super::HeightMap;
    use crate::{
        error::Error,
        macros::{assert_f32_eq, assert_vec_eq},
        mesh::Mesh,
    };

    /// Every facet normal points away from the centre of the vertices.
    fn assert_outward(mesh: &Mesh) {
        let centre = mesh.verts.iter().sum::<Vec3>() / mesh.verts.len() as f32;
        let normals = mesh.normals();
        for (surf, fnorms) in mesh.surfaces.iter().zip(&normals.facet) {
            for i in 0..surf.num_tri_equivs() {
                let tri = surf.tri_equiv(i);
                let c = tri.iter().map(|&v| mesh.verts[v as usize]).sum::<Vec3>() / 3.0;
                assert!(fnorms.tri_equiv(i).dot(c - centre) > 0.0, "{tri:?}");
            }
        }
    }

    #[test]
    fn t_cube() {
        let cube = Mesh::cube(false);
        mesh_ok(&cube);
        assert_eq!(cube.verts.len(), 8);
        assert_eq!(cube.num_quads(), 6);
        assert_eq!(cube.num_tri_equivs(), 12);
        assert_outward(&cube);
        let open = Mesh::cube(true);
        assert_eq!(open.num_quads(), 5);
        assert_outward(&open);
    }

    #[test]
    fn t_tetrahedron() {
        let tet = Mesh::tetrahedron(false);
        mesh_ok(&tet);
        assert_eq!(tet.num_tris(), 4);
        assert_outward(&tet);
        for (i, a) in tet.verts.iter().enumerate() {
            for b in &tet.verts[i + 1..] {
                assert_f32_eq!(a.distance(*b), 8.0f32.sqrt(), 1e-6);
            }
        }
        assert_eq!(Mesh::tetrahedron(true).num_tris(), 3);
    }

    #[test]
    fn t_pyramid_and_octahedron() {
        let pyr = Mesh::pyramid(false);
        mesh_ok(&pyr);
        assert_eq!(pyr.num_tris(), 6);
        assert_outward(&pyr);
        assert_eq!(Mesh::pyramid(true).num_tris(), 4);
        let oct = Mesh::octahedron();
        mesh_ok(&oct);
        assert_eq!(oct.verts.len(), 6);
        assert_outward(&oct);
    }

    #[test]
    fn t_sphere() {
        let sphere = Mesh::sphere(2.0, 3).expect("Cannot create sphere");
        mesh_ok(&sphere);
        // V' = V + E, E' = 2E + 3F, F' = 4F, from the tetrahedron.
        assert_eq!(sphere.verts.len(), 130);
        assert_eq!(sphere.num_tris(), 256);
        for v in &sphere.verts {
            assert_f32_eq!(v.length(), 2.0, 1e-5);
        }
        assert_outward(&sphere);
        let tet = Mesh::sphere(1.0, 0).expect("Cannot create sphere");
        assert_eq!(tet.num_tris(), 4);
        assert!(matches!(
            Mesh::sphere(1.0, 10),
            Err(Error::TooManySubdivisions(10))
        ));
    }

    #[test]
    fn t_n_tent() {
        let tent = Mesh::n_tent(7).expect("Cannot create tent");
        mesh_ok(&tent);
        assert_eq!(tent.verts.len(), 8);
        assert_eq!(tent.num_tris(), 7);
        let normals = tent.normals();
        for (tri, n) in tent.surfaces[0].tris.vert_inds.iter().zip(&normals.facet[0].tri) {
            let c = tri.iter().map(|&v| tent.verts[v as usize]).sum::<Vec3>() / 3.0;
            assert!(n.dot(c) > 0.0);
            assert!(n.y > 0.0);
        }
        assert!(matches!(Mesh::n_tent(2), Err(Error::TooFewSides(2))));
    }

    #[test]
    fn t_from_heights() {
        let heights = HeightMap::from_fn(3, 2, |x, y| Luma([(x + 10 * y) as f32]));
        let mesh = Mesh::from_heights(&heights).expect("Cannot create height mesh");
        assert_eq!(mesh.verts.len(), 6);
        assert_eq!(mesh.num_quads(), 2);
        assert!(mesh.surfaces[0].has_uvs());
        // Row 0 is at the top, lowest value maps to zero.
        assert_vec_eq!(mesh.verts[0], vec3(0.0, 1.0, 0.0));
        assert_vec_eq!(mesh.verts[5], vec3(1.0, 0.0, 1.0));
        for n in &mesh.normals().facet[0].quad {
            assert!(n.z > 0.0);
        }
        let flat = HeightMap::from_pixel(2, 2, Luma([3.0]));
        let mesh = Mesh::from_heights(&flat).expect("Cannot create height mesh");
        assert!(mesh.verts.iter().all(|v| v.z == 0.0));
        assert!(Mesh::from_heights(&HeightMap::new(1, 5)).is_err());
    }

    fn mesh_ok(mesh: &Mesh) {
        mesh.check_consistency()
            .expect("Primitive mesh is not consistent");
    }
}
