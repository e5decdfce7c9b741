//! Compiling and linking one filter's program, and introspecting its
//! uniforms.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::filter::FilterName;
use crate::gpu::Gpu;
use crate::mesh::{POSITION_ATTRIB, TEXCOORD_ATTRIB};

/// `mat4` projection uniform.
pub const PROJECTION_MATRIX: &str = "projection_matrix";
/// `mat4` view uniform.
pub const VIEW_MATRIX: &str = "view_matrix";
/// `mat4` model uniform.
pub const MODEL_MATRIX: &str = "model_matrix";
/// `sampler2D` bound to the video texture.
pub const IMAGE_SAMPLER: &str = "image";

/// Uniforms every filter program must expose.
pub const REQUIRED_UNIFORMS: [&str; 4] = [PROJECTION_MATRIX, VIEW_MATRIX, MODEL_MATRIX, IMAGE_SAMPLER];

/// Vertex attribute names bound to fixed locations before linking, so every
/// program shares the quad's vertex array layout.
pub const ATTRIBUTE_BINDINGS: [(u32, &str); 2] = [
    (POSITION_ATTRIB, "vertex_position"),
    (TEXCOORD_ATTRIB, "vertex_texcoord"),
];

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader (`.vert`).
    Vertex,
    /// Fragment shader (`.frag`).
    Fragment,
}

impl ShaderStage {
    /// The GL shader type constant.
    #[must_use]
    pub fn gl_type(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }

    /// File extension of sources for this stage.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// A linked filter program with its uniform locations.
pub struct ShaderProgram<G: Gpu> {
    program: G::Program,
    uniforms: HashMap<String, G::UniformLocation>,
}

impl<G: Gpu> fmt::Debug for ShaderProgram<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.uniforms.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ShaderProgram")
            .field("program", &self.program)
            .field("uniforms", &names)
            .finish()
    }
}

impl<G: Gpu> ShaderProgram<G> {
    /// Compile both stages, bind the fixed attribute locations, link and
    /// record every active uniform's location.
    ///
    /// The stage objects are detached and deleted once the program is
    /// linked; on failure every object created here is deleted.
    ///
    /// # Errors
    ///
    /// - [`Error::ShaderCompile`] if a stage fails to compile,
    /// - [`Error::ShaderLink`] if linking fails,
    /// - [`Error::MissingUniform`] if the program lacks one of
    ///   [`REQUIRED_UNIFORMS`] or an extra uniform its filter needs,
    /// - [`Error::UnresolvedUniform`] if an active uniform other than a
    ///   `gl_*` built-in has no location,
    /// - [`Error::DuplicateUniformLocation`] if two uniforms share one,
    /// - [`Error::Gpu`] if GL objects cannot be created.
    pub fn build(gpu: &G, filter: FilterName, vertex_src: &str, fragment_src: &str) -> Result<Self> {
        let vs = compile_shader(gpu, filter, ShaderStage::Vertex, vertex_src)?;
        let fs = match compile_shader(gpu, filter, ShaderStage::Fragment, fragment_src) {
            Ok(fs) => fs,
            Err(err) => {
                gpu.delete_shader(vs);
                return Err(err);
            }
        };

        let linked = link_program(gpu, filter, vs, fs);
        gpu.delete_shader(vs);
        gpu.delete_shader(fs);
        let program = linked?;

        let uniforms = match introspect_uniforms(gpu, filter, program) {
            Ok(uniforms) => uniforms,
            Err(err) => {
                gpu.delete_program(program);
                return Err(err);
            }
        };

        Ok(Self { program, uniforms })
    }

    /// The program handle.
    #[must_use]
    pub fn program(&self) -> G::Program {
        self.program
    }

    /// Location of an active uniform.
    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<&G::UniformLocation> {
        self.uniforms.get(name)
    }

    /// Whether the program exposes `name`.
    #[must_use]
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Iterate over active uniform names.
    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniforms.keys().map(String::as_str)
    }

    /// Delete the GL program.
    pub fn delete(&self, gpu: &G) {
        gpu.delete_program(self.program);
    }
}

/// Compile a single shader stage from source.
fn compile_shader<G: Gpu>(
    gpu: &G,
    filter: FilterName,
    stage: ShaderStage,
    source: &str,
) -> Result<G::Shader> {
    let shader = gpu.create_shader(stage.gl_type()).map_err(Error::Gpu)?;
    gpu.shader_source(shader, source);
    gpu.compile_shader(shader);

    if !gpu.get_shader_compile_status(shader) {
        let log = gpu.get_shader_info_log(shader);
        gpu.delete_shader(shader);
        return Err(Error::ShaderCompile { filter, stage, log });
    }

    Ok(shader)
}

/// Attach both stages, bind attribute locations and link. Stages are
/// detached again whatever the outcome; the caller deletes them.
fn link_program<G: Gpu>(
    gpu: &G,
    filter: FilterName,
    vs: G::Shader,
    fs: G::Shader,
) -> Result<G::Program> {
    let program = gpu.create_program().map_err(Error::Gpu)?;
    gpu.attach_shader(program, vs);
    gpu.attach_shader(program, fs);
    for (index, name) in ATTRIBUTE_BINDINGS {
        gpu.bind_attrib_location(program, index, name);
    }
    gpu.link_program(program);

    let linked = gpu.get_program_link_status(program);
    gpu.detach_shader(program, vs);
    gpu.detach_shader(program, fs);

    if !linked {
        let log = gpu.get_program_info_log(program);
        gpu.delete_program(program);
        return Err(Error::ShaderLink { filter, log });
    }

    Ok(program)
}

/// Map every active uniform to its own location and check the ones the
/// renderer sets unconditionally.
fn introspect_uniforms<G: Gpu>(
    gpu: &G,
    filter: FilterName,
    program: G::Program,
) -> Result<HashMap<String, G::UniformLocation>> {
    let mut uniforms: HashMap<String, G::UniformLocation> = HashMap::new();
    for reported in gpu.get_active_uniform_names(program) {
        // Arrays are reported as `name[0]`.
        let name = reported
            .strip_suffix("[0]")
            .map_or_else(|| reported.clone(), str::to_owned);
        let Some(location) = gpu.get_uniform_location(program, &name) else {
            // Built-ins (`gl_*`) are listed by some drivers but have no location.
            if name.starts_with("gl_") {
                continue;
            }
            return Err(Error::UnresolvedUniform { filter, name });
        };
        if let Some(other) = uniforms
            .iter()
            .find_map(|(other, existing)| (*existing == location).then(|| other.clone()))
        {
            return Err(Error::DuplicateUniformLocation {
                filter,
                name,
                other,
            });
        }
        uniforms.insert(name, location);
    }

    for &name in REQUIRED_UNIFORMS.iter().chain(filter.extra_uniforms()) {
        if !uniforms.contains_key(name) {
            return Err(Error::MissingUniform { filter, name });
        }
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        let mut names: Vec<&String> = uniforms.keys().collect();
        names.sort_unstable();
        debug!("`{filter}` uniforms: {names:?}");
    }
    Ok(uniforms)
}
