//! A [`GpuBackend`] that records calls instead of talking to a driver.

use std::collections::{BTreeSet, HashMap};

use crate::error::RenderError;
use crate::gltf::Topology;
use crate::renderer::backend::{
    BufferHandle, BufferTarget, GpuBackend, IndexedDraw, ProgramHandle, TextureHandle,
    UniformLocation, UniformValue, VertexArrayHandle, VertexAttribute,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateBuffer(BufferHandle),
    DeleteBuffer(BufferHandle),
    Upload {
        target: BufferTarget,
        buffer: BufferHandle,
        len: usize,
    },
    EnableAttribute {
        vertex_array: Option<VertexArrayHandle>,
        buffer: Option<BufferHandle>,
        attribute: VertexAttribute,
    },
    DrawElements {
        vertex_array: Option<VertexArrayHandle>,
        index_buffer: Option<BufferHandle>,
        draw: IndexedDraw,
    },
    DrawArrays {
        vertex_array: Option<VertexArrayHandle>,
        mode: Topology,
        count: usize,
    },
    SetUniform(String, UniformValue),
    Clear,
    Viewport(u32, u32),
}

#[derive(Default)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
    pub live_buffers: BTreeSet<u32>,
    pub live_vertex_arrays: BTreeSet<u32>,
    pub live_programs: BTreeSet<u32>,
    pub live_textures: BTreeSet<u32>,
    pub bound_buffers: HashMap<BufferTarget, BufferHandle>,
    pub bound_vertex_array: Option<VertexArrayHandle>,
    pub current_program: Option<ProgramHandle>,
    pub bound_textures: HashMap<u32, TextureHandle>,
    /// Fail every buffer creation after this many have succeeded.
    pub buffer_budget: Option<usize>,
    pub fail_program_link: bool,
    next_name: u32,
    uniform_names: Vec<String>,
}

impl RecordingBackend {
    pub fn new() -> RecordingBackend {
        RecordingBackend::default()
    }

    fn next_name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }

    pub fn created_buffers(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::CreateBuffer(_)))
            .count()
    }

    pub fn draws(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::DrawElements { .. } | Call::DrawArrays { .. }))
            .collect()
    }

    pub fn enabled_slots(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::EnableAttribute { attribute, .. } => Some(attribute.slot),
                _ => None,
            })
            .collect()
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::SetUniform(uniform, value) if uniform == name => Some(*value),
            _ => None,
        })
    }

    pub fn is_unbound(&self) -> bool {
        self.bound_vertex_array.is_none()
            && self.current_program.is_none()
            && self.bound_textures.is_empty()
    }
}

impl GpuBackend for RecordingBackend {
    fn create_buffer(&mut self) -> Result<BufferHandle, RenderError> {
        if let Some(budget) = self.buffer_budget {
            if self.created_buffers() >= budget {
                return Err(RenderError::ResourceCreation {
                    what: "buffer",
                    reason: "out of memory".to_string(),
                });
            }
        }
        let buffer = BufferHandle(self.next_name());
        self.live_buffers.insert(buffer.0);
        self.calls.push(Call::CreateBuffer(buffer));
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        assert!(
            self.live_buffers.remove(&buffer.0),
            "buffer {buffer:?} deleted twice or never created"
        );
        self.bound_buffers.retain(|_, bound| *bound != buffer);
        self.calls.push(Call::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>) {
        match buffer {
            Some(buffer) => {
                assert!(self.live_buffers.contains(&buffer.0), "binding dead buffer");
                self.bound_buffers.insert(target, buffer);
            }
            None => {
                self.bound_buffers.remove(&target);
            }
        }
    }

    fn upload_buffer(&mut self, target: BufferTarget, bytes: &[u8]) {
        let buffer = *self
            .bound_buffers
            .get(&target)
            .expect("upload without a bound buffer");
        self.calls.push(Call::Upload {
            target,
            buffer,
            len: bytes.len(),
        });
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, RenderError> {
        let vao = VertexArrayHandle(self.next_name());
        self.live_vertex_arrays.insert(vao.0);
        Ok(vao)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        assert!(self.live_vertex_arrays.remove(&vertex_array.0));
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        if let Some(vao) = vertex_array {
            assert!(self.live_vertex_arrays.contains(&vao.0), "binding dead vao");
        }
        self.bound_vertex_array = vertex_array;
    }

    fn enable_vertex_attribute(&mut self, attribute: &VertexAttribute) {
        self.calls.push(Call::EnableAttribute {
            vertex_array: self.bound_vertex_array,
            buffer: self.bound_buffers.get(&BufferTarget::VertexData).copied(),
            attribute: *attribute,
        });
    }

    fn draw_elements(&mut self, draw: &IndexedDraw) {
        let index_buffer = self.bound_buffers.get(&BufferTarget::IndexData).copied();
        if let Some(buffer) = index_buffer {
            assert!(self.live_buffers.contains(&buffer.0), "drawing with dead index buffer");
        }
        self.calls.push(Call::DrawElements {
            vertex_array: self.bound_vertex_array,
            index_buffer,
            draw: *draw,
        });
    }

    fn draw_arrays(&mut self, mode: Topology, _first: usize, count: usize) {
        self.calls.push(Call::DrawArrays {
            vertex_array: self.bound_vertex_array,
            mode,
            count,
        });
    }

    fn create_program(
        &mut self,
        _vertex_source: &str,
        _fragment_source: &str,
    ) -> Result<ProgramHandle, RenderError> {
        if self.fail_program_link {
            return Err(RenderError::ResourceCreation {
                what: "shader program",
                reason: "link failed".to_string(),
            });
        }
        let program = ProgramHandle(self.next_name());
        self.live_programs.insert(program.0);
        Ok(program)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        assert!(self.live_programs.remove(&program.0));
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.current_program = program;
    }

    fn uniform_location(&mut self, _program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.uniform_names.push(name.to_string());
        Some(UniformLocation(self.uniform_names.len() as i32 - 1))
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        assert!(self.current_program.is_some(), "uniform set without a program");
        let name = self.uniform_names[location.0 as usize].clone();
        self.calls.push(Call::SetUniform(name, value));
    }

    fn create_texture_2d(
        &mut self,
        _width: u32,
        _height: u32,
        _rgba: &[u8],
    ) -> Result<TextureHandle, RenderError> {
        let texture = TextureHandle(self.next_name());
        self.live_textures.insert(texture.0);
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        assert!(self.live_textures.remove(&texture.0));
    }

    fn bind_texture_2d(&mut self, unit: u32, texture: Option<TextureHandle>) {
        match texture {
            Some(texture) => {
                self.bound_textures.insert(unit, texture);
            }
            None => {
                self.bound_textures.remove(&unit);
            }
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Viewport(width, height));
    }

    fn clear(&mut self, _color: [f32; 4]) {
        self.calls.push(Call::Clear);
    }

    fn enable_depth_test_and_culling(&mut self) {}
}
