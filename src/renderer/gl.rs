use std::ffi::CString;

use crate::error::RenderError;

#[allow(clippy::all, non_upper_case_globals, non_snake_case, unused)]
mod bindings {
    include!(concat!(env!("OUT_DIR"), "/bindings.rs"));
}

pub use bindings::*;

/// Runs a GL call, and in debug builds, logs any error it raised along with
/// the call site.
macro_rules! call {
    ($expr:expr) => {{
        #[allow(unused_unsafe)]
        let result = unsafe { $expr };
        if cfg!(debug_assertions) {
            let error = unsafe { $crate::renderer::gl::GetError() };
            if error != $crate::renderer::gl::NO_ERROR {
                log::error!(
                    "OpenGL error {} at {}:{}:{}",
                    $crate::renderer::gl::error_name(error),
                    file!(),
                    line!(),
                    column!(),
                );
            }
        }
        result
    }};
}
pub(crate) use call;

pub fn error_name(error: types::GLenum) -> String {
    match error {
        INVALID_ENUM => "INVALID_ENUM".to_string(),
        INVALID_VALUE => "INVALID_VALUE".to_string(),
        INVALID_OPERATION => "INVALID_OPERATION".to_string(),
        OUT_OF_MEMORY => "OUT_OF_MEMORY".to_string(),
        INVALID_FRAMEBUFFER_OPERATION => "INVALID_FRAMEBUFFER_OPERATION".to_string(),
        _ => format!("{error}"),
    }
}

const INFO_LOG_CAPACITY: usize = 4096;

fn info_log_to_string(info_log: &[u8], length: types::GLsizei) -> String {
    let length = (length.max(0) as usize).min(info_log.len());
    String::from_utf8_lossy(&info_log[..length]).into_owned()
}

/// Compiles a shader of the given kind (e.g. [`VERTEX_SHADER`]).
pub fn create_shader(
    shader_type: types::GLenum,
    source: &str,
) -> Result<types::GLuint, RenderError> {
    let shader = call!(CreateShader(shader_type));
    if shader == 0 {
        return Err(RenderError::ResourceCreation {
            what: "shader",
            reason: "glCreateShader returned 0".to_string(),
        });
    }
    let sources = [source.as_bytes().as_ptr() as *const types::GLchar];
    let source_lens = [source.len() as types::GLint];
    call!(ShaderSource(shader, 1, sources.as_ptr(), source_lens.as_ptr()));
    call!(CompileShader(shader));
    let mut compile_status = 0;
    call!(GetShaderiv(shader, COMPILE_STATUS, &mut compile_status));
    if compile_status == FALSE as types::GLint {
        let mut info_log = [0u8; INFO_LOG_CAPACITY];
        let mut length = 0;
        call!(GetShaderInfoLog(
            shader,
            INFO_LOG_CAPACITY as types::GLsizei,
            &mut length,
            info_log.as_mut_ptr() as *mut types::GLchar,
        ));
        call!(DeleteShader(shader));
        return Err(RenderError::ResourceCreation {
            what: "shader",
            reason: info_log_to_string(&info_log, length),
        });
    }
    Ok(shader)
}

/// Links the shaders into a program. The shaders are left for the caller to
/// delete.
pub fn create_program(shaders: &[types::GLuint]) -> Result<types::GLuint, RenderError> {
    let program = call!(CreateProgram());
    if program == 0 {
        return Err(RenderError::ResourceCreation {
            what: "shader program",
            reason: "glCreateProgram returned 0".to_string(),
        });
    }
    for &shader in shaders {
        call!(AttachShader(program, shader));
    }
    call!(LinkProgram(program));
    let mut link_status = 0;
    call!(GetProgramiv(program, LINK_STATUS, &mut link_status));
    if link_status == FALSE as types::GLint {
        let mut info_log = [0u8; INFO_LOG_CAPACITY];
        let mut length = 0;
        call!(GetProgramInfoLog(
            program,
            INFO_LOG_CAPACITY as types::GLsizei,
            &mut length,
            info_log.as_mut_ptr() as *mut types::GLchar,
        ));
        call!(DeleteProgram(program));
        return Err(RenderError::ResourceCreation {
            what: "shader program",
            reason: info_log_to_string(&info_log, length),
        });
    }
    Ok(program)
}

/// Returns None if the program has no active uniform with the given name.
pub fn get_uniform_location(program: types::GLuint, name: &str) -> Option<types::GLint> {
    let name = CString::new(name).ok()?;
    let location = call!(GetUniformLocation(program, name.as_ptr()));
    (location != -1).then_some(location)
}
