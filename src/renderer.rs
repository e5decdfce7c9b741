//! Per-frame drawing of the quad through the active filter.

use std::fmt;

use tracing::info;

use crate::error::{Error, Result};
use crate::filter::{FilterExtra, FilterName, HEIGHT_UNIFORM, TIME_UNIFORM, WIDTH_UNIFORM};
use crate::gpu::Gpu;
use crate::library::ShaderLibrary;
use crate::mesh::QuadMesh;
use crate::program::{ShaderProgram, IMAGE_SAMPLER, MODEL_MATRIX, PROJECTION_MATRIX, VIEW_MATRIX};
use crate::texture::VideoTexture;

/// Lifecycle of the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// Shaders, mesh or texture are not ready; nothing may be drawn.
    Uninitialized,
    /// Everything is loaded, no frame drawn yet.
    Ready,
    /// At least one frame has been drawn.
    Rendering,
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderState::Uninitialized => "uninitialized",
            RenderState::Ready => "ready",
            RenderState::Rendering => "rendering",
        })
    }
}

/// Column-major 4x4 matrix, as GL expects it.
pub type Mat4 = [f32; 16];

/// The identity matrix.
pub const IDENTITY: Mat4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Orthographic projection of the given view volume onto clip space.
#[must_use]
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let rl = right - left;
    let tb = top - bottom;
    let fnr = far - near;
    [
        2.0 / rl, 0.0, 0.0, 0.0, //
        0.0, 2.0 / tb, 0.0, 0.0, //
        0.0, 0.0, -2.0 / fnr, 0.0, //
        -(right + left) / rl, -(top + bottom) / tb, -(far + near) / fnr, 1.0,
    ]
}

/// Transform matrices uploaded every frame. They never change after
/// startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    /// Maps the quad's [-1, 1] square onto the whole viewport.
    pub projection: Mat4,
    /// Camera transform.
    pub view: Mat4,
    /// Quad transform.
    pub model: Mat4,
}

impl FrameUniforms {
    /// Orthographic projection over the unit quad, identity view and model.
    #[must_use]
    pub fn fixed() -> Self {
        Self {
            projection: orthographic(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0),
            view: IDENTITY,
            model: IDENTITY,
        }
    }
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self::fixed()
    }
}

/// Selects the active filter and draws one frame with it.
#[derive(Debug)]
pub struct FilterRenderer {
    filter: FilterName,
    uniforms: FrameUniforms,
    state: RenderState,
}

impl FilterRenderer {
    /// A renderer that will draw `filter` once resources are ready.
    #[must_use]
    pub fn new(filter: FilterName) -> Self {
        Self {
            filter,
            uniforms: FrameUniforms::fixed(),
            state: RenderState::Uninitialized,
        }
    }

    /// The filter the next frame will use.
    #[must_use]
    pub fn filter(&self) -> FilterName {
        self.filter
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RenderState {
        self.state
    }

    /// The matrices uploaded every frame.
    #[must_use]
    pub fn uniforms(&self) -> &FrameUniforms {
        &self.uniforms
    }

    /// Switch filters. Takes effect on the next frame and is not validated
    /// against the loaded library.
    pub fn set_filter(&mut self, filter: FilterName) {
        if filter != self.filter {
            info!("Filter {} -> {filter}", self.filter);
        }
        self.filter = filter;
    }

    /// Record that the library, mesh and texture all exist.
    pub fn mark_ready(&mut self) {
        if self.state == RenderState::Uninitialized {
            self.transition(RenderState::Ready);
        }
    }

    /// Forget loaded resources; drawing is refused until the next
    /// [`mark_ready`](Self::mark_ready).
    pub fn reset(&mut self) {
        if self.state != RenderState::Uninitialized {
            self.transition(RenderState::Uninitialized);
        }
    }

    fn transition(&mut self, next: RenderState) {
        info!("Renderer {} -> {next}", self.state);
        self.state = next;
    }

    /// Draw one frame with the active filter.
    ///
    /// `time_ms` is the time since startup; the ripple filter receives it in
    /// seconds. The custom filter receives the texture's current size as
    /// `width` and `height`: the video frame size after a
    /// [`VideoTexture::refresh`], or the 3x2 placeholder size before the
    /// first one. Vertex array, texture and
    /// program are all unbound on return, including on error after the
    /// program was bound.
    ///
    /// # Errors
    ///
    /// - [`Error::NotReady`] before [`mark_ready`](Self::mark_ready); no GPU
    ///   call is made,
    /// - [`Error::UnknownFilter`] if the active filter is not in `library`,
    /// - [`Error::MissingUniform`] if the program lacks a uniform the frame
    ///   needs.
    pub fn render_frame<G: Gpu>(
        &mut self,
        gpu: &G,
        library: &ShaderLibrary<G>,
        mesh: &QuadMesh<G>,
        texture: &VideoTexture<G>,
        time_ms: f32,
    ) -> Result<()> {
        if self.state == RenderState::Uninitialized {
            return Err(Error::NotReady);
        }

        gpu.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        let program = library.get(self.filter)?;

        gpu.use_program(Some(program.program()));
        let drawn = self.draw(gpu, program, mesh, texture, time_ms);
        gpu.bind_vertex_array(None);
        gpu.bind_texture(glow::TEXTURE_2D, None);
        gpu.use_program(None);
        drawn?;

        if self.state == RenderState::Ready {
            self.transition(RenderState::Rendering);
        }
        Ok(())
    }

    fn draw<G: Gpu>(
        &self,
        gpu: &G,
        program: &ShaderProgram<G>,
        mesh: &QuadMesh<G>,
        texture: &VideoTexture<G>,
        time_ms: f32,
    ) -> Result<()> {
        let filter = self.filter;
        let location = |name: &'static str| {
            program
                .uniform(name)
                .ok_or(Error::MissingUniform { filter, name })
        };

        gpu.uniform_matrix_4_f32(location(PROJECTION_MATRIX)?, &self.uniforms.projection);
        gpu.uniform_matrix_4_f32(location(VIEW_MATRIX)?, &self.uniforms.view);
        gpu.uniform_matrix_4_f32(location(MODEL_MATRIX)?, &self.uniforms.model);

        match filter.extra() {
            Some(FilterExtra::Time) => {
                gpu.uniform_1_f32(location(TIME_UNIFORM)?, time_ms / 1000.0);
            }
            Some(FilterExtra::VideoSize) => {
                let [width, height] = texture.dimensions();
                #[expect(clippy::cast_precision_loss)]
                let (width, height) = (width as f32, height as f32);
                gpu.uniform_1_f32(location(WIDTH_UNIFORM)?, width);
                gpu.uniform_1_f32(location(HEIGHT_UNIFORM)?, height);
            }
            None => {}
        }

        gpu.active_texture(glow::TEXTURE0);
        gpu.bind_texture(glow::TEXTURE_2D, Some(texture.texture()));
        gpu.uniform_1_i32(location(IMAGE_SAMPLER)?, 0);
        gpu.bind_vertex_array(Some(mesh.vertex_array()));

        gpu.draw_elements(
            glow::TRIANGLES,
            mesh.draw_index_count(),
            glow::UNSIGNED_SHORT,
            0,
        );
        Ok(())
    }
}
