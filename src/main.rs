use std::ffi::c_void;
use std::ptr;

use anyhow::Context;
use clap::Parser;
use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::mouse::MouseButton;
use sdl2::video::{GLContext, GLProfile, Window};

use glb_viewer::camera::{Camera, Movement};
use glb_viewer::config::Config;
use glb_viewer::context::{ContextGuard, GraphicsContext};
use glb_viewer::error::ContextError;
use glb_viewer::frame::{Viewer, Viewport};
use glb_viewer::gltf;
use glb_viewer::input::{InputEvent, RenderState};
use glb_viewer::renderer::gl_backend::GlBackend;
use glb_viewer::texture::TextureImage;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::parse();

    let document = gltf::load(&config.model)
        .with_context(|| format!("could not load model {}", config.model.display()))?;
    let texture = match &config.texture {
        Some(path) => TextureImage::load(path)
            .with_context(|| format!("could not load texture {}", path.display()))?,
        None => TextureImage::white(),
    };

    let sdl_context = sdl2::init().map_err(SdlErr)?;
    let video_subsystem = sdl_context.video().map_err(SdlErr)?;
    let gl_attr = video_subsystem.gl_attr();
    gl_attr.set_context_profile(GLProfile::GLES);
    gl_attr.set_context_version(3, 0);
    gl_attr.set_depth_size(24);
    // Linear->SRGB conversion is done in the fragment shader.
    gl_attr.set_framebuffer_srgb_compatible(false);
    let mut window = video_subsystem
        .window(env!("CARGO_PKG_NAME"), config.width, config.height)
        .resizable()
        .opengl()
        .build()?;
    let gl_context = window.gl_create_context().map_err(SdlErr)?;
    let mut gpu =
        GlBackend::load_with(|s| video_subsystem.gl_get_proc_address(s) as *const c_void);
    if let Err(err) = video_subsystem.gl_set_swap_interval(1) {
        log::warn!("vsync is not available: {err}");
    }
    let mut event_pump = sdl_context.event_pump().map_err(SdlErr)?;

    let mut viewer = Viewer::new(&mut gpu, document, &texture, config.viewer_options())
        .context("could not set up the renderer")?;
    let mut state =
        RenderState::with_camera(Camera::default().with_pitch_limit(config.pitch_limit()));

    let mut redraw = true;
    'running: loop {
        // Block until something happens unless a frame is already pending.
        let waited = if redraw {
            None
        } else {
            Some(event_pump.wait_event())
        };
        let events = waited.into_iter().chain(event_pump.poll_iter()).collect::<Vec<_>>();
        for event in events {
            match handle_event(event, &mut state, &mut viewer) {
                Handled::Quit => break 'running,
                Handled::Redraw => redraw = true,
                Handled::Nothing => {}
            }
        }
        if !redraw {
            continue;
        }

        let (width, height) = window.drawable_size();
        let mut fps = None;
        redraw = match viewer.render_frame(&mut gpu, &state, Viewport { width, height }, |value| {
            fps = Some(value)
        }) {
            Ok(again) => again,
            Err(err) => {
                log::error!("frame failed: {err}");
                false
            }
        };
        if let Some(fps) = fps {
            let title = format!("{} - {fps} fps", env!("CARGO_PKG_NAME"));
            if let Err(err) = window.set_title(&title) {
                log::warn!("could not set the window title: {err}");
            }
        }
        window.gl_swap_window();
    }

    let context = SdlGlContext {
        window: &window,
        context: &gl_context,
    };
    let _current = ContextGuard::acquire(&context)?;
    viewer.destroy(&mut gpu);
    log::info!("bye");
    Ok(())
}

enum Handled {
    Quit,
    Redraw,
    Nothing,
}

fn handle_event(event: Event, state: &mut RenderState, viewer: &mut Viewer) -> Handled {
    let input = match event {
        Event::Quit { .. }
        | Event::KeyDown {
            keycode: Some(Keycode::Escape),
            ..
        } => return Handled::Quit,
        Event::KeyDown {
            keycode: Some(Keycode::Space),
            repeat: false,
            ..
        } => {
            viewer.toggle_animation();
            return Handled::Redraw;
        }
        Event::Window {
            win_event: WindowEvent::SizeChanged(..) | WindowEvent::Exposed,
            ..
        } => return Handled::Redraw,
        Event::MouseButtonDown {
            mouse_btn: MouseButton::Left,
            x,
            y,
            ..
        } => InputEvent::PointerPressed { x, y },
        Event::MouseButtonUp {
            mouse_btn: MouseButton::Left,
            ..
        } => InputEvent::PointerReleased,
        Event::MouseMotion { x, y, .. } => InputEvent::PointerMoved { x, y },
        Event::KeyDown {
            keycode: Some(keycode),
            ..
        } => match key_input(keycode) {
            Some(input) => input,
            None => return Handled::Nothing,
        },
        _ => return Handled::Nothing,
    };
    if state.apply(input) {
        Handled::Redraw
    } else {
        Handled::Nothing
    }
}

fn key_input(keycode: Keycode) -> Option<InputEvent> {
    Some(match keycode {
        Keycode::W => InputEvent::Move(Movement::Forward),
        Keycode::S => InputEvent::Move(Movement::Backward),
        Keycode::A => InputEvent::Move(Movement::Left),
        Keycode::D => InputEvent::Move(Movement::Right),
        Keycode::V => InputEvent::Move(Movement::Up),
        Keycode::C => InputEvent::Move(Movement::Down),
        Keycode::Equals => InputEvent::SpeedChanged(1),
        Keycode::Minus => InputEvent::SpeedChanged(-1),
        Keycode::RightBracket => InputEvent::SpherifyChanged(1),
        Keycode::LeftBracket => InputEvent::SpherifyChanged(-1),
        Keycode::Num1 => InputEvent::ToggleDirectionalLight,
        Keycode::Num2 => InputEvent::ToggleSpotLight,
        _ => return None,
    })
}

struct SdlGlContext<'a> {
    window: &'a Window,
    context: &'a GLContext,
}

impl GraphicsContext for SdlGlContext<'_> {
    fn make_current(&self) -> Result<(), ContextError> {
        self.window.gl_make_current(self.context).map_err(ContextError)
    }

    fn release(&self) {
        let result = unsafe { sdl2::sys::SDL_GL_MakeCurrent(self.window.raw(), ptr::null_mut()) };
        if result != 0 {
            log::warn!("could not release the GL context: {}", sdl2::get_error());
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("sdl error: {0}")]
pub struct SdlErr(String);
