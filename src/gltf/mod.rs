use std::collections::BTreeMap;

use glam::Mat4;

use crate::error::{ReferenceKind, RenderError};

mod loader;

pub use loader::{load, parse_glb};

/// The in-memory form of a loaded glTF asset. Nothing mutates it after
/// loading; the renderer only reads from it.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub buffers: Vec<Buffer>,
    pub buffer_views: Vec<BufferView>,
    pub accessors: Vec<Accessor>,
    pub meshes: Vec<Mesh>,
    pub nodes: Vec<Node>,
    pub scenes: Vec<Scene>,
    pub default_scene: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Buffer {
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Not meant to be bound as a GPU buffer (e.g. image data).
    None,
    VertexData,
    IndexData,
}

#[derive(Debug, Clone)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: TargetKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    UnsignedInt,
    Float,
}

impl ComponentType {
    pub fn from_gltf(code: usize) -> Option<ComponentType> {
        match code {
            5120 => Some(ComponentType::Byte),
            5121 => Some(ComponentType::UnsignedByte),
            5122 => Some(ComponentType::Short),
            5123 => Some(ComponentType::UnsignedShort),
            5125 => Some(ComponentType::UnsignedInt),
            5126 => Some(ComponentType::Float),
            _ => None,
        }
    }

    /// The glTF component type code, which is also the matching GL enum.
    pub fn code(self) -> u32 {
        match self {
            ComponentType::Byte => 5120,
            ComponentType::UnsignedByte => 5121,
            ComponentType::Short => 5122,
            ComponentType::UnsignedShort => 5123,
            ComponentType::UnsignedInt => 5125,
            ComponentType::Float => 5126,
        }
    }

    pub fn size_in_bytes(self) -> usize {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort => 2,
            ComponentType::UnsignedInt | ComponentType::Float => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl Shape {
    pub fn from_gltf(name: &str) -> Option<Shape> {
        match name {
            "SCALAR" => Some(Shape::Scalar),
            "VEC2" => Some(Shape::Vec2),
            "VEC3" => Some(Shape::Vec3),
            "VEC4" => Some(Shape::Vec4),
            "MAT2" => Some(Shape::Mat2),
            "MAT3" => Some(Shape::Mat3),
            "MAT4" => Some(Shape::Mat4),
            _ => None,
        }
    }

    pub fn component_count(self) -> usize {
        match self {
            Shape::Scalar => 1,
            Shape::Vec2 => 2,
            Shape::Vec3 => 3,
            Shape::Vec4 | Shape::Mat2 => 4,
            Shape::Mat3 => 9,
            Shape::Mat4 => 16,
        }
    }

    pub fn is_matrix(self) -> bool {
        matches!(self, Shape::Mat2 | Shape::Mat3 | Shape::Mat4)
    }
}

#[derive(Debug, Clone)]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    pub component_type: ComponentType,
    pub shape: Shape,
    pub count: usize,
    pub byte_offset: usize,
    pub normalized: bool,
    /// The stride declared by the accessor's buffer view, if any.
    pub byte_stride: Option<usize>,
}

impl Accessor {
    /// The distance between consecutive elements, falling back to tightly
    /// packed elements when the buffer view does not declare a stride.
    pub fn stride(&self) -> usize {
        self.byte_stride
            .unwrap_or(self.shape.component_count() * self.component_type.size_in_bytes())
    }
}

/// Primitive topology, with the glTF mode numbers (which match GL's).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl Topology {
    pub fn from_gltf(mode: usize) -> Option<Topology> {
        match mode {
            0 => Some(Topology::Points),
            1 => Some(Topology::Lines),
            2 => Some(Topology::LineLoop),
            3 => Some(Topology::LineStrip),
            4 => Some(Topology::Triangles),
            5 => Some(Topology::TriangleStrip),
            6 => Some(Topology::TriangleFan),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone)]
pub struct Primitive {
    /// Semantic name (e.g. `POSITION`) to accessor index.
    pub attributes: BTreeMap<String, usize>,
    pub indices: Option<usize>,
    pub mode: Topology,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
    pub transform: Mat4,
}

impl Default for Node {
    fn default() -> Self {
        Node {
            mesh: None,
            children: Vec::new(),
            transform: Mat4::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub nodes: Vec<usize>,
}

fn lookup<T>(items: &[T], kind: ReferenceKind, index: usize) -> Result<&T, RenderError> {
    items
        .get(index)
        .ok_or_else(|| RenderError::reference(kind, index, items.len()))
}

impl Document {
    pub fn buffer_view(&self, index: usize) -> Result<&BufferView, RenderError> {
        lookup(&self.buffer_views, ReferenceKind::BufferView, index)
    }

    pub fn accessor(&self, index: usize) -> Result<&Accessor, RenderError> {
        lookup(&self.accessors, ReferenceKind::Accessor, index)
    }

    pub fn mesh(&self, index: usize) -> Result<&Mesh, RenderError> {
        lookup(&self.meshes, ReferenceKind::Mesh, index)
    }

    pub fn node(&self, index: usize) -> Result<&Node, RenderError> {
        lookup(&self.nodes, ReferenceKind::Node, index)
    }

    /// The scene drawn by the viewer, if the document declares one.
    pub fn active_scene(&self) -> Result<Option<&Scene>, RenderError> {
        match self.default_scene {
            Some(index) => lookup(&self.scenes, ReferenceKind::Scene, index).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the bytes a buffer view covers, checking both the buffer index
    /// and the byte range.
    pub fn view_bytes(&self, view_index: usize) -> Result<&[u8], RenderError> {
        let view = self.buffer_view(view_index)?;
        let buffer = lookup(&self.buffers, ReferenceKind::Buffer, view.buffer)?;
        let start = view.byte_offset;
        let end = start.saturating_add(view.byte_length);
        buffer
            .data
            .get(start..end)
            .ok_or(RenderError::OutOfBounds {
                view: view_index,
                buffer: view.buffer,
                start,
                end,
                len: buffer.data.len(),
            })
    }

    /// Checks that every element the accessor reads lies inside its buffer
    /// view.
    pub fn check_accessor_range(&self, accessor_index: usize) -> Result<(), RenderError> {
        let accessor = self.accessor(accessor_index)?;
        let Some(view_index) = accessor.buffer_view else {
            return Ok(());
        };
        let view = self.buffer_view(view_index)?;
        if accessor.count == 0 {
            return Ok(());
        }
        let element_size = accessor.shape.component_count() * accessor.component_type.size_in_bytes();
        let end = (accessor.count - 1)
            .checked_mul(accessor.stride())
            .and_then(|last| last.checked_add(accessor.byte_offset))
            .and_then(|last| last.checked_add(element_size))
            .unwrap_or(usize::MAX);
        if end > view.byte_length {
            return Err(RenderError::AccessorOutOfBounds {
                accessor: accessor_index,
                view: view_index,
                end,
                len: view.byte_length,
            });
        }
        Ok(())
    }

    /// Checks every cross reference in the document. Loading does not do
    /// this, so callers run it before handing the document to the renderer.
    ///
    /// Cycles in the node hierarchy are not detected here; the traversal
    /// reports them when it reaches them.
    pub fn validate(&self) -> Result<(), RenderError> {
        for view_index in 0..self.buffer_views.len() {
            self.view_bytes(view_index)?;
        }
        for accessor_index in 0..self.accessors.len() {
            self.check_accessor_range(accessor_index)?;
        }
        for mesh in &self.meshes {
            for primitive in &mesh.primitives {
                for &accessor in primitive.attributes.values() {
                    self.accessor(accessor)?;
                }
                if let Some(indices) = primitive.indices {
                    self.accessor(indices)?;
                }
            }
        }
        for node in &self.nodes {
            if let Some(mesh) = node.mesh {
                self.mesh(mesh)?;
            }
            for &child in &node.children {
                self.node(child)?;
            }
        }
        for scene in &self.scenes {
            for &root in &scene.nodes {
                self.node(root)?;
            }
        }
        self.active_scene()?;
        Ok(())
    }
}
