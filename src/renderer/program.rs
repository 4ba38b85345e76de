use glam::{Mat4, Vec3};

use crate::error::RenderError;
use crate::renderer::backend::{GpuBackend, ProgramHandle, UniformLocation, UniformValue};

const VERTEX_SHADER: &str = r#"#version 300 es
layout(location = 0) in vec3 POSITION;
layout(location = 1) in vec3 NORMAL;
layout(location = 2) in vec2 TEXCOORD_0;
uniform mat4 ModelMat;
uniform mat4 ViewMat;
uniform mat4 ProjMat;
uniform mat4 normalMV;
// 100 keeps the mesh as is, 0 turns it into a unit sphere.
uniform float morphing_coef;
out vec3 view_position;
out vec3 view_normal;
out vec2 uv;
void main() {
    float t = clamp(morphing_coef / 100.0, 0.0, 1.0);
    vec3 sphere = length(POSITION) > 0.0 ? normalize(POSITION) : POSITION;
    vec3 position = mix(sphere, POSITION, t);
    vec3 normal = mix(sphere, NORMAL, t);
    vec4 view = ViewMat * ModelMat * vec4(position, 1.0);
    view_position = view.xyz;
    view_normal = normalize(mat3(normalMV) * normal);
    uv = TEXCOORD_0;
    gl_Position = ProjMat * view;
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;
in vec3 view_position;
in vec3 view_normal;
in vec2 uv;
out vec4 FRAG_COLOR;
uniform sampler2D tex;
uniform mat4 ViewMat;
uniform vec3 sun_coord;
uniform bool directional;
uniform bool spot;
uniform vec3 spot_position;
uniform vec3 spot_direction;
const float SPOT_CUTOFF = 0.94; // cos(20 degrees)
void main() {
    vec3 albedo = texture(tex, uv).rgb;
    vec3 normal = normalize(view_normal);
    vec3 light = vec3(0.25);
    if (directional) {
        vec3 to_sun = normalize(mat3(ViewMat) * sun_coord);
        light += vec3(0.75) * max(dot(normal, to_sun), 0.0);
    }
    if (spot) {
        vec3 spot_view = (ViewMat * vec4(spot_position, 1.0)).xyz;
        vec3 to_light = normalize(spot_view - view_position);
        vec3 axis = normalize(mat3(ViewMat) * spot_direction);
        if (dot(-to_light, axis) > SPOT_CUTOFF) {
            light += vec3(1.0, 0.95, 0.8) * max(dot(normal, to_light), 0.0);
        }
    }
    if (!directional && !spot) {
        light = vec3(1.0);
    }
    vec3 output_linear_color = albedo * light;

    // The framebuffer is not SRGB, so we transform the linear color to close-enough-to-srgb.
    FRAG_COLOR = vec4(pow(output_linear_color, vec3(1.0 / 2.2)), 1.0);
}
"#;

/// The shader program used to render glTF models, with the locations of
/// its uniforms. Uniforms the driver optimized out have no location and are
/// silently not set.
pub struct ShaderProgram {
    pub program: ProgramHandle,
    model: Option<UniformLocation>,
    view: Option<UniformLocation>,
    projection: Option<UniformLocation>,
    normal_transform: Option<UniformLocation>,
    sun_coord: Option<UniformLocation>,
    directional: Option<UniformLocation>,
    spot: Option<UniformLocation>,
    spot_position: Option<UniformLocation>,
    spot_direction: Option<UniformLocation>,
    morphing_coef: Option<UniformLocation>,
    texture: Option<UniformLocation>,
}

/// Per-frame values shared by every node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub sun_coord: Vec3,
    pub directional: bool,
    pub spot: bool,
    pub spot_position: Vec3,
    pub spot_direction: Vec3,
    pub morphing_coef: f32,
}

/// Compiles and returns the shader program which should be used to render
/// the glTF models.
pub fn create_program<G: GpuBackend>(gpu: &mut G) -> Result<ShaderProgram, RenderError> {
    let program = gpu.create_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
    let mut location = |name: &str| {
        let location = gpu.uniform_location(program, name);
        if location.is_none() {
            log::debug!("uniform {name} is not active");
        }
        location
    };
    Ok(ShaderProgram {
        program,
        model: location("ModelMat"),
        view: location("ViewMat"),
        projection: location("ProjMat"),
        normal_transform: location("normalMV"),
        sun_coord: location("sun_coord"),
        directional: location("directional"),
        spot: location("spot"),
        spot_position: location("spot_position"),
        spot_direction: location("spot_direction"),
        morphing_coef: location("morphing_coef"),
        texture: location("tex"),
    })
}

fn set<G: GpuBackend>(gpu: &mut G, location: Option<UniformLocation>, value: UniformValue) {
    if let Some(location) = location {
        gpu.set_uniform(location, value);
    }
}

impl ShaderProgram {
    /// Sets the uniforms that stay the same for a whole frame. The program
    /// must be in use.
    pub fn set_frame_uniforms<G: GpuBackend>(&self, gpu: &mut G, frame: &FrameUniforms) {
        set(gpu, self.view, UniformValue::Mat4(frame.view));
        set(gpu, self.projection, UniformValue::Mat4(frame.projection));
        set(gpu, self.sun_coord, UniformValue::Vec3(frame.sun_coord));
        set(gpu, self.directional, UniformValue::Bool(frame.directional));
        set(gpu, self.spot, UniformValue::Bool(frame.spot));
        set(gpu, self.spot_position, UniformValue::Vec3(frame.spot_position));
        set(gpu, self.spot_direction, UniformValue::Vec3(frame.spot_direction));
        set(gpu, self.morphing_coef, UniformValue::Float(frame.morphing_coef));
        set(gpu, self.texture, UniformValue::Int(0));
    }

    /// Sets the model matrix and the matching normal transform, the
    /// inverse-transpose of `view * model`.
    pub fn set_model<G: GpuBackend>(&self, gpu: &mut G, view: Mat4, model: Mat4) {
        let normal_transform = (view * model).inverse().transpose();
        set(gpu, self.model, UniformValue::Mat4(model));
        set(gpu, self.normal_transform, UniformValue::Mat4(normal_transform));
    }

    pub fn destroy<G: GpuBackend>(self, gpu: &mut G) {
        gpu.delete_program(self.program);
    }
}
