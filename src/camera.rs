//! Free-fly camera driven by pointer drags and movement keys.

use glam::{Mat4, Vec3};

/// Degrees of rotation per pixel of pointer movement.
pub const MOUSE_SENSITIVITY: f32 = 0.1;
/// Default pitch limit, short of straight up/down where the view flips.
pub const PITCH_LIMIT_DEGREES: f32 = 89.0;
/// The camera speed slider range. Slider values are thousandths of a unit
/// per key press.
pub const SPEED_SLIDER_MIN: u32 = 10;
pub const SPEED_SLIDER_MAX: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    /// Horizontal angle in degrees, -90 looks down -Z.
    pub yaw: f32,
    /// Vertical angle in degrees.
    pub pitch: f32,
    /// Distance moved per key press.
    pub speed: f32,
    /// `None` lets the pitch go past straight up/down.
    pub pitch_limit: Option<f32>,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Camera {
            position: Vec3::new(0.0, 2.0, 7.0),
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            yaw: -90.0,
            pitch: -13.6,
            speed: 0.01,
            pitch_limit: Some(PITCH_LIMIT_DEGREES),
        };
        camera.update_front();
        camera
    }
}

impl Camera {
    pub fn with_pitch_limit(mut self, pitch_limit: Option<f32>) -> Self {
        self.pitch_limit = pitch_limit;
        self.set_orientation(self.yaw, self.pitch);
        self
    }

    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = match self.pitch_limit {
            Some(limit) => pitch.clamp(-limit, limit),
            None => pitch,
        };
        self.update_front();
    }

    /// Turns the camera by a pointer movement in pixels, with positive `dy`
    /// looking up.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.set_orientation(
            self.yaw + dx * MOUSE_SENSITIVITY,
            self.pitch + dy * MOUSE_SENSITIVITY,
        );
    }

    fn update_front(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
    }

    pub fn translate(&mut self, movement: Movement) {
        let right = self.front.cross(self.up).normalize();
        let direction = match movement {
            Movement::Forward => self.front,
            Movement::Backward => -self.front,
            Movement::Left => -right,
            Movement::Right => right,
            Movement::Up => Vec3::Y,
            Movement::Down => Vec3::NEG_Y,
        };
        self.position += self.speed * direction;
    }

    /// Sets the speed from a slider value, clamped to the slider range.
    pub fn set_speed_slider(&mut self, value: u32) {
        let value = value.clamp(SPEED_SLIDER_MIN, SPEED_SLIDER_MAX);
        self.speed = value as f32 / 1000.0;
    }

    pub fn speed_slider(&self) -> u32 {
        (self.speed * 1000.0).round() as u32
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }
}

/// Tracks a pointer drag. Only movement while the button is held turns the
/// camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragState {
    last: Option<(i32, i32)>,
}

impl DragState {
    pub fn press(&mut self, x: i32, y: i32) {
        self.last = Some((x, y));
    }

    /// Returns the `(dx, dy)` since the last position, with `dy` positive
    /// when the pointer moves up, or `None` when no drag is in progress.
    pub fn moved(&mut self, x: i32, y: i32) -> Option<(f32, f32)> {
        let (last_x, last_y) = self.last?;
        self.last = Some((x, y));
        Some(((x - last_x) as f32, (last_y - y) as f32))
    }

    pub fn release(&mut self) {
        self.last = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.last.is_some()
    }
}
