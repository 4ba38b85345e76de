use glam::{Mat4, Vec3};

use crate::error::RenderError;
use crate::gltf::{ComponentType, Topology};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexArrayHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgramHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UniformLocation(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    VertexData,
    IndexData,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Bool(bool),
    Int(i32),
    Vec3(Vec3),
    Mat4(Mat4),
}

/// The arguments of one `glVertexAttribPointer` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub slot: u32,
    pub component_count: usize,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub stride: usize,
    pub byte_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedDraw {
    pub mode: Topology,
    pub index_count: usize,
    pub index_type: ComponentType,
    pub byte_offset: usize,
}

/// The operations the renderer needs from the graphics API. All calls must
/// happen on the thread the context is current on.
pub trait GpuBackend {
    fn create_buffer(&mut self) -> Result<BufferHandle, RenderError>;
    fn delete_buffer(&mut self, buffer: BufferHandle);
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>);
    /// Uploads `bytes` into the buffer currently bound to `target`.
    fn upload_buffer(&mut self, target: BufferTarget, bytes: &[u8]);

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, RenderError>;
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>);
    /// Enables `attribute.slot`, sourcing it from the buffer bound to
    /// [`BufferTarget::VertexData`].
    fn enable_vertex_attribute(&mut self, attribute: &VertexAttribute);

    /// Draws with the buffer bound to [`BufferTarget::IndexData`].
    fn draw_elements(&mut self, draw: &IndexedDraw);
    fn draw_arrays(&mut self, mode: Topology, first: usize, count: usize);

    fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle, RenderError>;
    fn delete_program(&mut self, program: ProgramHandle);
    fn use_program(&mut self, program: Option<ProgramHandle>);
    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;
    /// Sets a uniform of the program currently in use.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Creates a 2D texture from tightly packed RGBA8 pixels.
    fn create_texture_2d(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureHandle, RenderError>;
    fn delete_texture(&mut self, texture: TextureHandle);
    fn bind_texture_2d(&mut self, unit: u32, texture: Option<TextureHandle>);

    fn set_viewport(&mut self, width: u32, height: u32);
    fn clear(&mut self, color: [f32; 4]);
    fn enable_depth_test_and_culling(&mut self);
}
