//! The per-frame sequence: clear, push uniforms, draw the scene, unbind.

use std::time::{Duration, Instant};

use glam::{Mat4, Vec3};

use crate::error::RenderError;
use crate::gltf::Document;
use crate::input::RenderState;
use crate::renderer::backend::{GpuBackend, TextureHandle};
use crate::renderer::program::{self, FrameUniforms, ShaderProgram};
use crate::renderer::resources::CleanupPolicy;
use crate::renderer::SceneRenderer;
use crate::texture::TextureImage;

const CLEAR_COLOR: [f32; 4] = [0.3, 0.3, 0.3, 1.0];
const MODEL_ROTATION_DEGREES: f32 = 45.0;
const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
const Z_NEAR: f32 = 0.01;
const Z_FAR: f32 = 100.0;
const SUN_COORD: Vec3 = Vec3::new(3.0, 5.0, 1.0);
/// The spot light points from its position towards this point.
const SPOT_TARGET: Vec3 = Vec3::new(0.0, 1.0, -2.0);
const FPS_INTERVAL: Duration = Duration::from_millis(1000);

/// Counts frames and turns them into a frames-per-second value about once a
/// second.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: u32,
    last_reset: Instant,
    fps: Option<u32>,
}

impl FpsCounter {
    pub fn starting_at(now: Instant) -> FpsCounter {
        FpsCounter {
            frames: 0,
            last_reset: now,
            fps: None,
        }
    }

    pub fn record_frame(&mut self) {
        self.frames += 1;
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// The most recently computed value.
    pub fn fps(&self) -> Option<u32> {
        self.fps
    }

    /// Recomputes the fps and resets the counter if at least a second has
    /// passed since the last reset. Returns the new value if it did.
    pub fn sample(&mut self, now: Instant) -> Option<u32> {
        let elapsed = now.saturating_duration_since(self.last_reset);
        if elapsed < FPS_INTERVAL {
            return None;
        }
        let fps = (self.frames as f64 / elapsed.as_secs_f64()).round() as u32;
        self.frames = 0;
        self.last_reset = now;
        self.fps = Some(fps);
        Some(fps)
    }
}

/// Samples the [`FpsCounter`] when dropped, at the end of the frame whether
/// it succeeded or not, and hands any new value to the observer.
pub struct FrameTiming<'a, F: FnMut(u32)> {
    counter: &'a mut FpsCounter,
    on_fps: F,
}

impl<'a, F: FnMut(u32)> FrameTiming<'a, F> {
    pub fn start(counter: &'a mut FpsCounter, on_fps: F) -> FrameTiming<'a, F> {
        FrameTiming { counter, on_fps }
    }

    pub fn count_frame(&mut self) {
        self.counter.record_frame();
    }
}

impl<F: FnMut(u32)> Drop for FrameTiming<'_, F> {
    fn drop(&mut self) {
        if let Some(fps) = self.counter.sample(Instant::now()) {
            log::trace!("{fps} fps");
            (self.on_fps)(fps);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerOptions {
    pub cleanup: CleanupPolicy,
    /// Request a new frame after every frame instead of only on input.
    pub animate: bool,
}

/// The shader program, texture and bound scene of one loaded model.
pub struct Viewer {
    program: ShaderProgram,
    texture: TextureHandle,
    scene: SceneRenderer,
    fps: FpsCounter,
    animated: bool,
}

impl Viewer {
    /// Creates every GPU resource the viewer needs. If any of them can't be
    /// created, the ones created before it are released.
    pub fn new<G: GpuBackend>(
        gpu: &mut G,
        document: Document,
        texture: &TextureImage,
        options: ViewerOptions,
    ) -> Result<Viewer, RenderError> {
        let program = program::create_program(gpu)?;
        let texture = match gpu.create_texture_2d(texture.width, texture.height, &texture.pixels) {
            Ok(texture) => texture,
            Err(err) => {
                program.destroy(gpu);
                return Err(err);
            }
        };
        gpu.enable_depth_test_and_culling();
        let scene = match SceneRenderer::new(gpu, document, options.cleanup) {
            Ok(scene) => scene,
            Err(err) => {
                gpu.delete_texture(texture);
                program.destroy(gpu);
                return Err(err);
            }
        };
        Ok(Viewer {
            program,
            texture,
            scene,
            fps: FpsCounter::starting_at(Instant::now()),
            animated: options.animate,
        })
    }

    pub fn scene(&self) -> &SceneRenderer {
        &self.scene
    }

    pub fn fps(&self) -> Option<u32> {
        self.fps.fps()
    }

    pub fn is_animated(&self) -> bool {
        self.animated
    }

    pub fn set_animated(&mut self, animated: bool) {
        self.animated = animated;
    }

    pub fn toggle_animation(&mut self) {
        self.animated = !self.animated;
        log::info!("continuous animation {}", if self.animated { "on" } else { "off" });
    }

    /// Renders one frame and returns whether another one should follow
    /// without waiting for input. `on_fps` is called whenever a new fps value
    /// is computed.
    pub fn render_frame<G, F>(
        &mut self,
        gpu: &mut G,
        state: &RenderState,
        viewport: Viewport,
        on_fps: F,
    ) -> Result<bool, RenderError>
    where
        G: GpuBackend,
        F: FnMut(u32),
    {
        let mut timing = FrameTiming::start(&mut self.fps, on_fps);

        gpu.set_viewport(viewport.width, viewport.height);
        gpu.clear(CLEAR_COLOR);
        gpu.use_program(Some(self.program.program));
        gpu.bind_texture_2d(0, Some(self.texture));

        let model = Mat4::from_rotation_y(MODEL_ROTATION_DEGREES.to_radians());
        let view = state.camera.view_matrix();
        let projection = Mat4::perspective_rh_gl(
            FIELD_OF_VIEW_DEGREES.to_radians(),
            viewport.aspect_ratio(),
            Z_NEAR,
            Z_FAR,
        );
        self.program.set_frame_uniforms(
            gpu,
            &FrameUniforms {
                view,
                projection,
                sun_coord: SUN_COORD,
                directional: state.directional_light,
                spot: state.spot_light,
                spot_position: state.spot_position,
                spot_direction: SPOT_TARGET - state.spot_position,
                morphing_coef: state.morph_coefficient(),
            },
        );

        let program = &self.program;
        let drawn = self
            .scene
            .draw(gpu, model, |gpu, world| program.set_model(gpu, view, world));

        gpu.bind_vertex_array(None);
        gpu.bind_texture_2d(0, None);
        gpu.use_program(None);
        drawn?;

        timing.count_frame();
        Ok(self.animated)
    }

    /// Releases every GPU resource. The context must be current.
    pub fn destroy<G: GpuBackend>(self, gpu: &mut G) {
        self.scene.destroy(gpu);
        gpu.delete_texture(self.texture);
        self.program.destroy(gpu);
        log::debug!("viewer resources released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::backend::UniformValue;
    use crate::renderer::mock::{Call, RecordingBackend};
    use crate::test_support::textured_document;

    const VIEWPORT: Viewport = Viewport {
        width: 948,
        height: 533,
    };

    fn viewer(gpu: &mut RecordingBackend, options: ViewerOptions) -> Viewer {
        Viewer::new(gpu, textured_document(), &TextureImage::white(), options).unwrap()
    }

    #[test]
    fn fps_is_computed_once_a_second_has_passed() {
        let start = Instant::now();
        let mut counter = FpsCounter::starting_at(start);
        for _ in 0..60 {
            counter.record_frame();
        }

        assert_eq!(counter.sample(start + Duration::from_millis(500)), None);
        assert_eq!(counter.frames(), 60);

        assert_eq!(counter.sample(start + Duration::from_millis(1000)), Some(60));
        assert_eq!(counter.frames(), 0);
        assert_eq!(counter.fps(), Some(60));

        // The timer restarts at the sample.
        counter.record_frame();
        assert_eq!(counter.sample(start + Duration::from_millis(1500)), None);
    }

    #[test]
    fn frame_timing_notifies_on_drop() {
        let start = Instant::now()
            .checked_sub(Duration::from_secs(2))
            .unwrap();
        let mut counter = FpsCounter::starting_at(start);
        let mut notified = Vec::new();
        {
            let mut timing = FrameTiming::start(&mut counter, |fps| notified.push(fps));
            for _ in 0..3 {
                timing.count_frame();
            }
        }
        assert_eq!(notified.len(), 1);
        assert_eq!(counter.frames(), 0);
    }

    #[test]
    fn frame_pushes_uniforms_and_leaves_nothing_bound() {
        let mut gpu = RecordingBackend::new();
        let mut viewer = viewer(&mut gpu, ViewerOptions::default());
        let mut state = RenderState::default();
        state.spherify = 25;
        state.spot_light = true;

        let again = viewer
            .render_frame(&mut gpu, &state, VIEWPORT, |_| {})
            .unwrap();
        assert!(!again);
        assert!(gpu.calls.contains(&Call::Viewport(948, 533)));
        assert!(gpu.calls.contains(&Call::Clear));
        assert_eq!(gpu.draws().len(), 5);
        assert!(gpu.is_unbound());

        assert_eq!(gpu.uniform("morphing_coef"), Some(UniformValue::Float(75.0)));
        assert_eq!(gpu.uniform("spot"), Some(UniformValue::Bool(true)));
        assert_eq!(gpu.uniform("directional"), Some(UniformValue::Bool(false)));
        assert_eq!(gpu.uniform("tex"), Some(UniformValue::Int(0)));
        assert_eq!(gpu.uniform("sun_coord"), Some(UniformValue::Vec3(SUN_COORD)));
        assert_eq!(
            gpu.uniform("spot_direction"),
            Some(UniformValue::Vec3(Vec3::new(0.0, -4.0, -5.0)))
        );
        assert_eq!(
            gpu.uniform("ViewMat"),
            Some(UniformValue::Mat4(state.camera.view_matrix()))
        );
        let model = Mat4::from_rotation_y(45f32.to_radians());
        assert_eq!(gpu.uniform("ModelMat"), Some(UniformValue::Mat4(model)));
        for name in ["ProjMat", "normalMV"] {
            assert!(gpu.uniform(name).is_some(), "{name} was not set");
        }

        viewer.destroy(&mut gpu);
        assert!(gpu.live_buffers.is_empty());
        assert!(gpu.live_textures.is_empty());
        assert!(gpu.live_programs.is_empty());
    }

    #[test]
    fn animation_requests_another_frame() {
        let mut gpu = RecordingBackend::new();
        let mut viewer = viewer(
            &mut gpu,
            ViewerOptions {
                animate: true,
                ..ViewerOptions::default()
            },
        );
        let state = RenderState::default();
        assert!(viewer.render_frame(&mut gpu, &state, VIEWPORT, |_| {}).unwrap());
        viewer.toggle_animation();
        assert!(!viewer.render_frame(&mut gpu, &state, VIEWPORT, |_| {}).unwrap());
        viewer.destroy(&mut gpu);
    }

    #[test]
    fn program_link_failure_aborts_without_leaking() {
        let mut gpu = RecordingBackend::new();
        gpu.fail_program_link = true;
        let result = Viewer::new(
            &mut gpu,
            textured_document(),
            &TextureImage::white(),
            ViewerOptions::default(),
        );
        assert!(matches!(result, Err(RenderError::ResourceCreation { .. })));
        assert_eq!(gpu.created_buffers(), 0);
        assert!(gpu.live_textures.is_empty());
    }

    #[test]
    fn invalid_document_releases_program_and_texture() {
        let mut gpu = RecordingBackend::new();
        let mut document = textured_document();
        document.nodes[0].children.push(9);
        let result = Viewer::new(&mut gpu, document, &TextureImage::white(), ViewerOptions::default());
        assert!(matches!(result, Err(RenderError::Reference { index: 9, .. })));
        assert_eq!(gpu.created_buffers(), 0);
        assert!(gpu.live_textures.is_empty());
        assert!(gpu.live_programs.is_empty());
    }

    #[test]
    fn scene_failure_releases_program_and_texture() {
        let mut gpu = RecordingBackend::new();
        gpu.buffer_budget = Some(1);
        let result = Viewer::new(
            &mut gpu,
            textured_document(),
            &TextureImage::white(),
            ViewerOptions::default(),
        );
        assert!(matches!(result, Err(RenderError::ResourceCreation { .. })));
        assert!(gpu.live_buffers.is_empty());
        assert!(gpu.live_textures.is_empty());
        assert!(gpu.live_programs.is_empty());
    }
}
