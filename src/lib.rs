/*!
Triangle and quad meshes with morphs, the topology operations that edit them,
and a small ray-casting renderer.

# Overview

+ A [`Mesh`] is a list of vertex positions and a list of UVs shared by an
  ordered list of [`Surface`]s. Each surface holds triangles and quads as
  index lists ([`Tris`], [`Quads`]) into those two lists, along with a
  [`Material`] and labelled surface points. Meshes also carry delta morphs
  (dense displacements), target morphs (sparse displacements) and labelled
  vertices.

+ Quads are often handled as their two tri-equivalents: a quad
  `[a, b, c, d]` splits into `[a, b, c]` and `[c, d, a]`, after all the
  triangles of the surface.

+ Topology operations live in [`ops`] and [`merge`]. They are pure: each
  takes meshes by reference and returns a new mesh whose indices are all
  valid, or an [`Error`] without touching the input. This includes flat and
  Loop subdivision, which [`Mesh::sphere`] builds on.

+ [`GridTriangles`] bins 2D triangles into a uniform grid to answer
  point-in-triangle queries quickly.

+ [`RayCaster`] projects meshes through a pinhole camera and shades pixels
  with interpolated normals, optional textures, Gaussian specular highlights
  and alpha compositing of up to four layers. With the `auto-threads` feature
  whole images are rendered in parallel.

+ [`sort_transparent_faces`] finds an approximate back to front painting
  order for transparent triangles.

+ Meshes can be loaded from Wavefront OBJ files with the `obj` feature, which
  is enabled by default.
*/

mod best;
mod error;
mod facet;
mod geometry;
mod grid;
mod lighting;
mod macros;
mod mesh;
mod normals;
#[cfg(feature = "obj")]
mod obj;
mod primitive;
mod raycast;
mod sample;
mod subdiv;
mod surface;
mod transparency;

pub mod merge;
pub mod ops;

pub use best::BestN;
pub use error::Error;
pub use facet::{FacetInds, Quads, Tris, quad_half, rewind};
pub use geometry::{AffineEw2, Bounds2, Similarity, barycentric, bounds3};
pub use grid::{GridIndex, GridTriangles, INVALID_POINT, TriPoint, interp_inv_depth};
pub use lighting::{Light, Lighting};
pub use mesh::{IndexedMorph, MarkedVert, Mesh, Morph};
pub use normals::{FacetNormals, Normals, calc_normals, polygon_normal, tri_normal};
pub use primitive::HeightMap;
pub use raycast::{Intersect, RayCaster, RayCasterOptions, TriInd};
pub use sample::{composite_fragment, sample_clip, to_rgba8};
pub use surface::{Material, SurfPoint, Surface};
pub use transparency::{
    DEFAULT_SAMPLES, sort_transparent_faces, sort_transparent_faces_with_samples,
};
