//! Global draw state: viewport, clear color and depth testing.

use tracing::info;

use crate::error::{Error, Result};
use crate::gpu::{gl_size, Gpu};

/// Opaque black.
const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// The fixed drawing-buffer configuration.
///
/// Width and height are set once; the renderer does not handle resizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    width: u32,
    height: u32,
}

impl RenderContext {
    /// Configure the viewport to cover the whole drawing buffer, clear to
    /// opaque black and enable depth testing.
    ///
    /// Must run exactly once, before any mesh, texture or program is
    /// created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextInit`] if the drawing buffer is empty or too
    /// large for GL, or if the context is below GL 3.0 / GLES 3.0 (no vertex
    /// array objects).
    pub fn initialize<G: Gpu>(gpu: &G, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::ContextInit(format!(
                "drawing buffer is {width}x{height}"
            )));
        }
        let w = gl_size(width).map_err(|e| Error::ContextInit(e.to_string()))?;
        let h = gl_size(height).map_err(|e| Error::ContextInit(e.to_string()))?;

        let version = gpu.version();
        if !version.supports_vertex_arrays() {
            return Err(Error::ContextInit(format!(
                "{version} is too old; OpenGL 3.0 or OpenGL ES 3.0 is required"
            )));
        }

        gpu.viewport(0, 0, w, h);
        let [r, g, b, a] = CLEAR_COLOR;
        gpu.clear_color(r, g, b, a);
        gpu.enable(glow::DEPTH_TEST);

        info!("Initialized {version} context at {width}x{height}");
        Ok(Self { width, height })
    }

    /// Drawing-buffer width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Drawing-buffer height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
}
