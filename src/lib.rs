//! Live video filters on a single textured quad, using OpenGL via [glow].
//!
//! A [`FilterApp`] streams frames from a [`VideoSource`] into one texture
//! and draws it each tick through one of a fixed set of filter programs
//! ([`FilterName`]): passthrough, black and white, fish-eye, ripple, toon
//! and a custom edge filter. Programs are loaded from `<name>.vert` /
//! `<name>.frag` source pairs. All sources are fetched concurrently and the
//! load is all-or-nothing: no frame is drawn until every program has
//! compiled and linked.
//!
//! # Features
//!
//! - **Pluggable source fetching**: [`SourceFetcher`] is async, with a
//!   directory reader and an in-memory map provided.
//! - **Per-filter uniforms**: the ripple filter receives elapsed seconds as
//!   `time`, the custom filter receives the video size as `width` and
//!   `height`.
//! - **Placeholder texture**: a checkerboard is shown until
//!   [`FilterApp::set_video_ready`] is called.
//! - **YAML configuration** via [`RendererConfig`].
//!
//! # Safety
//!
//! [`GlowGpu`] requires a valid OpenGL 3.0 / OpenGL ES 3.0 context that stays
//! current on the owning thread; constructing it is therefore `unsafe`.
//! Everything above the [`Gpu`] trait is safe code.
//!
//! # Logging
//!
//! Diagnostics are emitted with [tracing]; install a subscriber in the host
//! to see them.
//!
//! [glow]: https://docs.rs/glow
//! [tracing]: https://docs.rs/tracing

mod app;
mod config;
mod context;
mod driver;
mod error;
mod filter;
mod gpu;
mod library;
mod mesh;
mod program;
mod renderer;
mod texture;
mod video;

pub use app::{FilterApp, TickOutcome};
pub use config::RendererConfig;
pub use context::RenderContext;
pub use driver::{FpsCounter, FrameClock, IntervalClock, StopHandle};
pub use error::{Error, Result};
pub use filter::{FilterExtra, FilterName};
pub use gpu::{ApiVersion, GlowGpu, Gpu};
pub use library::{
    DirectoryFetcher, ShaderLayout, ShaderLibrary, ShaderSources, ShaderVariant, SourceFetcher,
    SourcePair,
};
pub use mesh::QuadMesh;
pub use program::{ShaderProgram, ShaderStage};
pub use renderer::{FilterRenderer, FrameUniforms, Mat4, RenderState};
pub use texture::{placeholder_image, VideoTexture};
pub use video::{load_still, VideoSource};
