use std::ffi::c_void;

use crate::error::RenderError;
use crate::gltf::Topology;
use crate::renderer::backend::{
    BufferHandle, BufferTarget, GpuBackend, IndexedDraw, ProgramHandle, TextureHandle,
    UniformLocation, UniformValue, VertexArrayHandle, VertexAttribute,
};
use crate::renderer::gl;

/// [`GpuBackend`] over the global OpenGL ES 3.0 function pointers.
///
/// Constructing one requires the function pointers to be loaded, so the only
/// way to get one is [`GlBackend::load_with`].
pub struct GlBackend {
    _loaded: (),
}

impl GlBackend {
    pub fn load_with<F>(loader: F) -> GlBackend
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);
        GlBackend { _loaded: () }
    }
}

fn gl_target(target: BufferTarget) -> gl::types::GLenum {
    match target {
        BufferTarget::VertexData => gl::ARRAY_BUFFER,
        BufferTarget::IndexData => gl::ELEMENT_ARRAY_BUFFER,
    }
}

fn gl_mode(mode: Topology) -> gl::types::GLenum {
    mode.code() as gl::types::GLenum
}

fn created<T>(name: u32, what: &'static str, wrap: fn(u32) -> T) -> Result<T, RenderError> {
    if name == 0 {
        Err(RenderError::ResourceCreation {
            what,
            reason: "the driver returned no object name".to_string(),
        })
    } else {
        Ok(wrap(name))
    }
}

impl GpuBackend for GlBackend {
    fn create_buffer(&mut self) -> Result<BufferHandle, RenderError> {
        let mut buffer = 0;
        gl::call!(gl::GenBuffers(1, &mut buffer));
        created(buffer, "buffer", BufferHandle)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        gl::call!(gl::DeleteBuffers(1, &buffer.0));
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>) {
        let name = buffer.map_or(0, |buffer| buffer.0);
        gl::call!(gl::BindBuffer(gl_target(target), name));
    }

    fn upload_buffer(&mut self, target: BufferTarget, bytes: &[u8]) {
        gl::call!(gl::BufferData(
            gl_target(target),
            bytes.len() as isize,
            bytes.as_ptr() as *const c_void,
            gl::STATIC_DRAW,
        ));
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, RenderError> {
        let mut vao = 0;
        gl::call!(gl::GenVertexArrays(1, &mut vao));
        created(vao, "vertex array", VertexArrayHandle)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        gl::call!(gl::DeleteVertexArrays(1, &vertex_array.0));
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        gl::call!(gl::BindVertexArray(vertex_array.map_or(0, |vao| vao.0)));
    }

    fn enable_vertex_attribute(&mut self, attribute: &VertexAttribute) {
        gl::call!(gl::EnableVertexAttribArray(attribute.slot));
        gl::call!(gl::VertexAttribPointer(
            attribute.slot,
            attribute.component_count as gl::types::GLint,
            attribute.component_type.code(),
            if attribute.normalized { gl::TRUE } else { gl::FALSE },
            attribute.stride as gl::types::GLsizei,
            attribute.byte_offset as *const c_void,
        ));
    }

    fn draw_elements(&mut self, draw: &IndexedDraw) {
        gl::call!(gl::DrawElements(
            gl_mode(draw.mode),
            draw.index_count as gl::types::GLsizei,
            draw.index_type.code(),
            draw.byte_offset as *const c_void,
        ));
    }

    fn draw_arrays(&mut self, mode: Topology, first: usize, count: usize) {
        gl::call!(gl::DrawArrays(
            gl_mode(mode),
            first as gl::types::GLint,
            count as gl::types::GLsizei,
        ));
    }

    fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle, RenderError> {
        let vertex_shader = gl::create_shader(gl::VERTEX_SHADER, vertex_source)?;
        let fragment_shader = match gl::create_shader(gl::FRAGMENT_SHADER, fragment_source) {
            Ok(shader) => shader,
            Err(err) => {
                gl::call!(gl::DeleteShader(vertex_shader));
                return Err(err);
            }
        };
        let program = gl::create_program(&[vertex_shader, fragment_shader]);
        gl::call!(gl::DeleteShader(vertex_shader));
        gl::call!(gl::DeleteShader(fragment_shader));
        program.map(ProgramHandle)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        gl::call!(gl::DeleteProgram(program.0));
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        gl::call!(gl::UseProgram(program.map_or(0, |program| program.0)));
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        gl::get_uniform_location(program.0, name).map(UniformLocation)
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let location = location.0;
        match value {
            UniformValue::Float(value) => gl::call!(gl::Uniform1f(location, value)),
            UniformValue::Bool(value) => gl::call!(gl::Uniform1i(location, value as i32)),
            UniformValue::Int(value) => gl::call!(gl::Uniform1i(location, value)),
            UniformValue::Vec3(value) => {
                gl::call!(gl::Uniform3f(location, value.x, value.y, value.z))
            }
            UniformValue::Mat4(value) => {
                let columns = value.to_cols_array();
                gl::call!(gl::UniformMatrix4fv(
                    location,
                    1,
                    gl::FALSE,
                    columns.as_ptr()
                ))
            }
        }
    }

    fn create_texture_2d(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureHandle, RenderError> {
        let expected_len = width as usize * height as usize * 4;
        if rgba.len() != expected_len {
            return Err(RenderError::ResourceCreation {
                what: "texture",
                reason: format!(
                    "{width}x{height} RGBA8 needs {expected_len} bytes, got {}",
                    rgba.len()
                ),
            });
        }
        let mut texture = 0;
        gl::call!(gl::GenTextures(1, &mut texture));
        let texture = created(texture, "texture", TextureHandle)?;
        gl::call!(gl::BindTexture(gl::TEXTURE_2D, texture.0));
        gl::call!(gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1));
        gl::call!(gl::TexImage2D(
            gl::TEXTURE_2D,
            0,
            gl::RGBA8 as gl::types::GLint,
            width as gl::types::GLsizei,
            height as gl::types::GLsizei,
            0,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            rgba.as_ptr() as *const c_void,
        ));
        let linear = gl::LINEAR as gl::types::GLint;
        let repeat = gl::REPEAT as gl::types::GLint;
        gl::call!(gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, linear));
        gl::call!(gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, linear));
        gl::call!(gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, repeat));
        gl::call!(gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, repeat));
        gl::call!(gl::BindTexture(gl::TEXTURE_2D, 0));
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        gl::call!(gl::DeleteTextures(1, &texture.0));
    }

    fn bind_texture_2d(&mut self, unit: u32, texture: Option<TextureHandle>) {
        gl::call!(gl::ActiveTexture(gl::TEXTURE0 + unit));
        gl::call!(gl::BindTexture(
            gl::TEXTURE_2D,
            texture.map_or(0, |texture| texture.0)
        ));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        gl::call!(gl::Viewport(
            0,
            0,
            width as gl::types::GLsizei,
            height as gl::types::GLsizei
        ));
    }

    fn clear(&mut self, color: [f32; 4]) {
        let [r, g, b, a] = color;
        gl::call!(gl::ClearColor(r, g, b, a));
        gl::call!(gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT));
    }

    fn enable_depth_test_and_culling(&mut self) {
        gl::call!(gl::Enable(gl::DEPTH_TEST));
        gl::call!(gl::Enable(gl::CULL_FACE));
    }
}
