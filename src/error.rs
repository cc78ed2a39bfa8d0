use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Preconditions on facet kinds.
    #[error("Quads not supported: {0}")]
    QuadsNotSupported(&'static str),
    #[error("Tris not currently supported for this operation (quads only): {0}")]
    TrisNotSupported(&'static str),
    #[error("Facets have no UV indices")]
    MissingUvIndices,
    #[error("Surface points not supported: {0}")]
    SurfPointsNotSupported(&'static str),
    // Index consistency.
    #[error("{what} index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        what: &'static str,
        index: u32,
        len: usize,
    },
    #[error("Facet UV index list has length {uvs}, expected 0 or {verts}")]
    InvalidFacetUvs { verts: usize, uvs: usize },
    // Geometry.
    #[error("Spatial index domain has zero area")]
    ZeroAreaDomain,
    #[error("Mesh has no facets")]
    EmptyMesh,
    #[error("A tent needs at least 3 sides, got {0}")]
    TooFewSides(u32),
    #[error("Too many subdivisions requested: {0}")]
    TooManySubdivisions(u32),
    #[error("Edge ({0}, {1}) is shared by more than two triangles")]
    NonManifoldEdge(u32, u32),
    #[error("Boundary vertex {0} has {1} boundary neighbours, expected 2")]
    NonManifoldVertex(u32, usize),
    #[error("Image has no pixels")]
    EmptyImage,
    // Morphs.
    #[error("Target morph '{0}' has no displaced vertices")]
    EmptyTargetMorph(String),
    // Merging.
    #[error("Meshes share an identical vertex list, merge the surfaces of one mesh instead")]
    IdenticalVertexLists,
    #[error("Meshes share an identical UV list, merge the surfaces of one mesh instead")]
    IdenticalUvLists,
    // Obj.
    #[error("Failed to load obj: {0}")]
    ObjLoadFailed(String),
    #[error("Obj data has {0} coordinates, which is not a whole number of points")]
    IncorrectNumberOfCoordinates(usize),
    // Other.
    #[error("Mismatched array lengths: {0} and {1}")]
    MismatchedArrayLengths(usize, usize),
}
