use std::{io::BufRead, path::Path};

use glam::{Vec2, Vec3};

use crate::{
    error::Error,
    facet::{Quads, Tris},
    mesh::Mesh,
    surface::Surface,
};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

impl Mesh {
    /// Load a Wavefront OBJ file. Each object in the file becomes one surface
    /// named after it, and the mesh is named after the file. Materials are
    /// not loaded.
    pub fn load_obj(path: &Path) -> Result<Self, Error> {
        let (models, _) = tobj::load_obj(path, &load_options())
            .map_err(|e| Error::ObjLoadFailed(format!("{}", e)))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_obj_models(models)?.with_name(name))
    }

    /// Load Wavefront OBJ data from a reader, like [`Mesh::load_obj`].
    /// Material libraries referenced by the data are ignored.
    pub fn load_obj_buf<B: BufRead>(reader: &mut B) -> Result<Self, Error> {
        let (models, _) = tobj::load_obj_buf(reader, &load_options(), |_| {
            Ok(Default::default())
        })
        .map_err(|e| Error::ObjLoadFailed(format!("{}", e)))?;
        Self::from_obj_models(models)
    }

    fn from_obj_models(models: Vec<tobj::Model>) -> Result<Self, Error> {
        let mut verts = Vec::new();
        let mut uvs = Vec::new();
        let mut surfaces = Vec::with_capacity(models.len());
        for model in models {
            let mesh = model.mesh;
            if mesh.positions.len() % 3 != 0 {
                return Err(Error::IncorrectNumberOfCoordinates(mesh.positions.len()));
            }
            if mesh.texcoords.len() % 2 != 0 {
                return Err(Error::IncorrectNumberOfCoordinates(mesh.texcoords.len()));
            }
            let voffset = verts.len() as u32;
            let uvoffset = uvs.len() as u32;
            verts.extend(mesh.positions.chunks(3).map(|p| Vec3::new(p[0], p[1], p[2])));
            uvs.extend(mesh.texcoords.chunks(2).map(|t| Vec2::new(t[0], t[1])));
            let with_uvs = !mesh.texcoord_indices.is_empty();
            if with_uvs && mesh.texcoord_indices.len() != mesh.indices.len() {
                return Err(Error::MismatchedArrayLengths(
                    mesh.texcoord_indices.len(),
                    mesh.indices.len(),
                ));
            }
            let mut tris = Tris::default();
            let mut quads = Quads::default();
            // No arities means every face is a triangle.
            let arities: Vec<usize> = if mesh.face_arities.is_empty() {
                vec![3; mesh.indices.len() / 3]
            } else {
                mesh.face_arities.iter().map(|&a| a as usize).collect()
            };
            let mut start = 0usize;
            for size in arities {
                let range = start..(start + size);
                start += size;
                let fv: Vec<u32> = mesh.indices[range.clone()].iter().map(|i| i + voffset).collect();
                let ft: Vec<u32> = if with_uvs {
                    mesh.texcoord_indices[range].iter().map(|i| i + uvoffset).collect()
                } else {
                    Vec::new()
                };
                match size {
                    0..=2 => continue,
                    4 => {
                        quads.vert_inds.push([fv[0], fv[1], fv[2], fv[3]]);
                        if with_uvs {
                            quads.uv_inds.push([ft[0], ft[1], ft[2], ft[3]]);
                        }
                    }
                    _ => {
                        // Fan out anything that is not a quad.
                        for i in 1..(size - 1) {
                            tris.vert_inds.push([fv[0], fv[i], fv[i + 1]]);
                            if with_uvs {
                                tris.uv_inds.push([ft[0], ft[i], ft[i + 1]]);
                            }
                        }
                    }
                }
            }
            surfaces.push(Surface::new(model.name, tris, quads));
        }
        Mesh::new(verts, uvs, surfaces)
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use glam::vec3;

    use crate::{error::Error, macros::assert_vec_eq, mesh::Mesh};

    const TWO_OBJECTS: &str = "\
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
o pent
v 2 0 0
v 3 0 0
v 3 1 0
v 2.5 1.5 0
v 2 1 0
f 5 6 7 8 9
";

    #[test]
    fn t_load_obj_buf() {
        let mesh = Mesh::load_obj_buf(&mut Cursor::new(TWO_OBJECTS)).expect("Cannot load obj");
        assert_eq!(mesh.verts.len(), 9);
        assert_eq!(mesh.uvs.len(), 4);
        assert_eq!(mesh.surfaces.len(), 2);
        let quad = &mesh.surfaces[0];
        assert_eq!(quad.name, "quad");
        assert_eq!(quad.quads.vert_inds, vec![[0, 1, 2, 3]]);
        assert_eq!(quad.quads.uv_inds, vec![[0, 1, 2, 3]]);
        let pent = &mesh.surfaces[1];
        assert_eq!(pent.name, "pent");
        assert_eq!(pent.num_quads(), 0);
        assert_eq!(pent.tris.vert_inds, vec![[4, 5, 6], [4, 6, 7], [4, 7, 8]]);
        assert!(pent.tris.uv_inds.is_empty());
        assert_eq!(mesh.verts[7], vec3(2.5, 1.5, 0.0));
        for n in &mesh.normals().vert {
            assert_vec_eq!(*n, vec3(0.0, 0.0, 1.0));
        }
    }

    #[test]
    fn t_load_obj_errors() {
        let bad = "v 0 0 0\nv 1 x 0\nv 0 1 0\nf 1 2 3\n";
        assert!(matches!(
            Mesh::load_obj_buf(&mut Cursor::new(bad)),
            Err(Error::ObjLoadFailed(_))
        ));
    }
}
