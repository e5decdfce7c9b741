//! Error type shared by every stage of the pipeline.
//!
//! Load-phase errors ([`ShaderLoad`](Error::ShaderLoad),
//! [`ShaderCompile`](Error::ShaderCompile), [`ShaderLink`](Error::ShaderLink),
//! [`MissingUniform`](Error::MissingUniform)) abort startup. Render-phase
//! errors ([`UnknownFilter`](Error::UnknownFilter)) end the frame loop.

use std::io;

use crate::filter::FilterName;
use crate::program::ShaderStage;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while bringing up or driving the renderer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable graphics context: bad drawing-buffer size or a context
    /// below the required feature level.
    #[error("graphics context unusable: {0}")]
    ContextInit(String),

    /// Fetching a shader source failed.
    #[error("failed to load {stage} shader for `{filter}` from {path}")]
    ShaderLoad {
        /// Filter whose source was being fetched.
        filter: FilterName,
        /// Which stage the source belongs to.
        stage: ShaderStage,
        /// Location handed to the fetcher.
        path: String,
        /// Underlying fetch error.
        #[source]
        source: io::Error,
    },

    /// A shader stage failed to compile.
    #[error("failed to compile {stage} shader for `{filter}`: {log}")]
    ShaderCompile {
        /// Filter whose program was being built.
        filter: FilterName,
        /// The stage that failed.
        stage: ShaderStage,
        /// Driver info log.
        log: String,
    },

    /// The program failed to link.
    #[error("failed to link program for `{filter}`: {log}")]
    ShaderLink {
        /// Filter whose program was being built.
        filter: FilterName,
        /// Driver info log.
        log: String,
    },

    /// A linked program does not expose a uniform the renderer always sets.
    #[error("program for `{filter}` has no active uniform `{name}`")]
    MissingUniform {
        /// Filter whose program is incomplete.
        filter: FilterName,
        /// The missing uniform.
        name: &'static str,
    },

    /// An active uniform reported by the driver has no location.
    #[error("active uniform `{name}` of `{filter}` has no location")]
    UnresolvedUniform {
        /// Filter whose program was being built.
        filter: FilterName,
        /// The uniform as reported, without any `[0]` suffix.
        name: String,
    },

    /// Two active uniforms resolved to the same location.
    #[error("uniforms `{name}` and `{other}` of `{filter}` share a location")]
    DuplicateUniformLocation {
        /// Filter whose program was being built.
        filter: FilterName,
        /// The uniform resolved second.
        name: String,
        /// The uniform already holding that location.
        other: String,
    },

    /// The selected filter has no program in the loaded library, or a name
    /// could not be parsed as a filter.
    #[error("unknown filter `{0}`")]
    UnknownFilter(String),

    /// A frame was requested before shaders, mesh and texture were loaded.
    #[error("renderer is not ready: resources are still loading")]
    NotReady,

    /// A video frame's pixel buffer does not match its dimensions.
    #[error("video frame is {width}x{height} but carries {len} bytes (expected {expected})")]
    FrameSize {
        /// Reported frame width.
        width: u32,
        /// Reported frame height.
        height: u32,
        /// Actual buffer length.
        len: usize,
        /// `width * height * 4`.
        expected: usize,
    },

    /// GPU object creation failed; the context should be considered lost.
    #[error("GPU error: {0}")]
    Gpu(String),

    /// The renderer configuration could not be parsed or is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A still image could not be decoded.
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    /// I/O failure outside of shader fetching (e.g. reading a config file).
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}
