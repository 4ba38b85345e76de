//! Loads binary glTF (`.glb`) models and draws them with OpenGL ES 3.0.
//!
//! The window system lives in the binary. Everything here talks to the GPU
//! through [`renderer::backend::GpuBackend`].

pub mod camera;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod gltf;
pub mod input;
pub mod renderer;
pub mod texture;

#[cfg(test)]
mod test_support;
