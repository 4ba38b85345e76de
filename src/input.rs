//! The interactive state of the viewer and the events that change it.

use glam::Vec3;

use crate::camera::{Camera, DragState, Movement};

pub const SPHERIFY_MAX: u32 = 100;
pub const SPEED_STEP: i32 = 10;
pub const SPHERIFY_STEP: i32 = 5;

/// Host-independent input, translated from window system events by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerPressed { x: i32, y: i32 },
    PointerMoved { x: i32, y: i32 },
    PointerReleased,
    Move(Movement),
    /// Moves the speed slider by this many steps of its range.
    SpeedChanged(i32),
    /// Moves the spherify slider by this many percent.
    SpherifyChanged(i32),
    ToggleDirectionalLight,
    ToggleSpotLight,
}

/// Everything a frame reads besides the scene itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub camera: Camera,
    pub drag: DragState,
    /// 0 draws the model as is, 100 as a unit sphere.
    pub spherify: u32,
    pub directional_light: bool,
    pub spot_light: bool,
    pub spot_position: Vec3,
}

impl Default for RenderState {
    fn default() -> Self {
        RenderState {
            camera: Camera::default(),
            drag: DragState::default(),
            spherify: 0,
            directional_light: false,
            spot_light: false,
            spot_position: Vec3::new(0.0, 5.0, 3.0),
        }
    }
}

impl RenderState {
    pub fn with_camera(camera: Camera) -> RenderState {
        RenderState {
            camera,
            ..RenderState::default()
        }
    }

    /// The shader's morphing coefficient: 100 keeps the mesh, 0 is a sphere.
    pub fn morph_coefficient(&self) -> f32 {
        (SPHERIFY_MAX - self.spherify.min(SPHERIFY_MAX)) as f32
    }

    /// Applies the event and returns whether the view changed and needs a
    /// redraw.
    pub fn apply(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::PointerPressed { x, y } => {
                self.drag.press(x, y);
                false
            }
            InputEvent::PointerMoved { x, y } => match self.drag.moved(x, y) {
                Some((dx, dy)) => {
                    self.camera.rotate(dx, dy);
                    true
                }
                None => false,
            },
            InputEvent::PointerReleased => {
                self.drag.release();
                false
            }
            InputEvent::Move(movement) => {
                self.camera.translate(movement);
                true
            }
            InputEvent::SpeedChanged(steps) => {
                let slider = self.camera.speed_slider() as i32 + steps * SPEED_STEP;
                self.camera.set_speed_slider(slider.max(0) as u32);
                log::debug!("camera speed is now {}", self.camera.speed);
                true
            }
            InputEvent::SpherifyChanged(steps) => {
                let spherify = self.spherify as i32 + steps * SPHERIFY_STEP;
                self.spherify = spherify.clamp(0, SPHERIFY_MAX as i32) as u32;
                true
            }
            InputEvent::ToggleDirectionalLight => {
                self.directional_light = !self.directional_light;
                log::info!("directional light {}", on_off(self.directional_light));
                true
            }
            InputEvent::ToggleSpotLight => {
                self.spot_light = !self.spot_light;
                log::info!("spot light {}", on_off(self.spot_light));
                true
            }
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
