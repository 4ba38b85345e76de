use std::path::PathBuf;

use clap::Parser;

use crate::camera::PITCH_LIMIT_DEGREES;
use crate::frame::ViewerOptions;
use crate::renderer::resources::CleanupPolicy;

/// When vertex buffers are released after the scene has been bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliCleanup {
    /// Keep every buffer until the viewer closes.
    RetainAll,
    /// Release vertex buffers once their layout is recorded, keep index
    /// buffers for drawing.
    #[default]
    RetainIndexOnly,
}

impl From<CliCleanup> for CleanupPolicy {
    fn from(cli: CliCleanup) -> Self {
        match cli {
            CliCleanup::RetainAll => CleanupPolicy::RetainAll,
            CliCleanup::RetainIndexOnly => CleanupPolicy::RetainIndexOnly,
        }
    }
}

/// Views a binary glTF model.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "glb-viewer", version)]
pub struct Config {
    /// The .glb file to view.
    #[arg(default_value = "Models/vert_cube.glb")]
    pub model: PathBuf,

    /// PNG or JPEG texture sampled with the model's TEXCOORD_0. The model is
    /// drawn white without one.
    #[arg(long)]
    pub texture: Option<PathBuf>,

    /// Initial window width in pixels.
    #[arg(long, default_value = "948")]
    pub width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value = "533")]
    pub height: u32,

    /// Start with continuous animation (redraw every frame).
    #[arg(long)]
    pub animate: bool,

    /// When to release vertex buffers.
    #[arg(long, default_value = "retain-index-only", value_enum)]
    pub cleanup: CliCleanup,

    /// Let the camera pitch past straight up and down.
    #[arg(long)]
    pub free_pitch: bool,
}

impl Config {
    pub fn viewer_options(&self) -> ViewerOptions {
        ViewerOptions {
            cleanup: self.cleanup.into(),
            animate: self.animate,
        }
    }

    pub fn pitch_limit(&self) -> Option<f32> {
        if self.free_pitch {
            None
        } else {
            Some(PITCH_LIMIT_DEGREES)
        }
    }
}
