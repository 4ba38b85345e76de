use std::fmt::{self, Display};
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading a `.glb` file into a
/// [`Document`](crate::gltf::Document).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The binary container framing (header or chunks) is invalid.
    #[error("malformed glb container: {0}")]
    MalformedContainer(String),
    /// The JSON chunk could not be decoded into a document.
    #[error("malformed glTF structure: {0}")]
    MalformedStructure(String),
    #[error("could not decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// The kind of array an out-of-range index pointed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Buffer,
    BufferView,
    Accessor,
    Mesh,
    Node,
    Scene,
}

impl Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceKind::Buffer => "buffer",
            ReferenceKind::BufferView => "buffer view",
            ReferenceKind::Accessor => "accessor",
            ReferenceKind::Mesh => "mesh",
            ReferenceKind::Node => "node",
            ReferenceKind::Scene => "scene",
        };
        f.write_str(name)
    }
}

/// Errors raised while binding a document to GPU resources or drawing it.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{kind} index {index} is out of range ({len} declared)")]
    Reference {
        kind: ReferenceKind,
        index: usize,
        len: usize,
    },
    #[error("buffer view {view} covers bytes {start}..{end}, but buffer {buffer} is {len} bytes long")]
    OutOfBounds {
        view: usize,
        buffer: usize,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("accessor {accessor} reads bytes up to {end} of buffer view {view}, which is {len} bytes long")]
    AccessorOutOfBounds {
        accessor: usize,
        view: usize,
        end: usize,
        len: usize,
    },
    /// The bind phase recorded a different number of vertex arrays for a
    /// mesh than it has primitives.
    #[error("mesh has {primitives} primitives but {vertex_arrays} vertex arrays")]
    VertexArrayMismatch {
        primitives: usize,
        vertex_arrays: usize,
    },
    #[error("node {0} is its own ancestor")]
    Cycle(usize),
    /// A buffer view that should have been uploaded during the bind phase
    /// has no GPU buffer.
    #[error("buffer view {0} has no GPU buffer")]
    MissingResource(usize),
    #[error("accessor {0} does not reference a buffer view")]
    DetachedAccessor(usize),
    #[error("could not create {what}: {reason}")]
    ResourceCreation { what: &'static str, reason: String },
}

/// The window system refused to make a graphics context current.
#[derive(Debug, Error)]
#[error("could not make the graphics context current: {0}")]
pub struct ContextError(pub String);

impl RenderError {
    pub(crate) fn reference(kind: ReferenceKind, index: usize, len: usize) -> RenderError {
        RenderError::Reference { kind, index, len }
    }
}
