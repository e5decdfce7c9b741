//! The narrow slice of OpenGL this crate drives, and its [glow] backing.
//!
//! Every GPU call the pipeline makes goes through [`Gpu`]. Method names
//! follow [`glow::HasContext`] so the GL protocol stays readable at the call
//! sites, and enum arguments are the raw `glow::*` constants. Keeping the seam
//! this small lets the whole pipeline run against a recording backend in
//! tests.
//!
//! [glow]: https://docs.rs/glow

use std::fmt;
use std::sync::Arc;

use glow::{HasContext, PixelUnpackData};

use crate::error::{Error, Result};

#[cfg(test)]
pub(crate) mod recording;

/// Version reported by the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// `true` for OpenGL ES / WebGL contexts.
    pub embedded: bool,
}

impl ApiVersion {
    /// Whether the context offers vertex array objects and GLSL ES 3.00
    /// level shaders, i.e. desktop GL 3.0+ or GLES 3.0+ (WebGL2).
    #[must_use]
    pub fn supports_vertex_arrays(self) -> bool {
        self.major >= 3
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api = if self.embedded { "OpenGL ES" } else { "OpenGL" };
        write!(f, "{api} {}.{}", self.major, self.minor)
    }
}

/// The GL calls used by the pipeline.
///
/// Implementations must be driven from the single thread that owns the
/// context. Object creation mirrors glow and reports failure as a `String`.
pub trait Gpu {
    /// Compiled shader stage handle.
    type Shader: Copy + fmt::Debug;
    /// Linked program handle.
    type Program: Copy + fmt::Debug;
    /// Buffer object handle.
    type Buffer: Copy + fmt::Debug;
    /// Vertex array object handle.
    type VertexArray: Copy + fmt::Debug;
    /// Texture object handle.
    type Texture: Copy + fmt::Debug;
    /// Uniform location handle. Equal handles name the same location.
    type UniformLocation: Clone + PartialEq + fmt::Debug;

    /// Version of the underlying context.
    fn version(&self) -> ApiVersion;

    /// `glViewport`.
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    /// `glClearColor`.
    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32);
    /// `glEnable`.
    fn enable(&self, capability: u32);
    /// `glClear`.
    fn clear(&self, mask: u32);

    /// `glCreateShader`.
    fn create_shader(&self, shader_type: u32) -> Result<Self::Shader, String>;
    /// `glShaderSource`.
    fn shader_source(&self, shader: Self::Shader, source: &str);
    /// `glCompileShader`.
    fn compile_shader(&self, shader: Self::Shader);
    /// `GL_COMPILE_STATUS`.
    fn get_shader_compile_status(&self, shader: Self::Shader) -> bool;
    /// `glGetShaderInfoLog`.
    fn get_shader_info_log(&self, shader: Self::Shader) -> String;
    /// `glDeleteShader`.
    fn delete_shader(&self, shader: Self::Shader);

    /// `glCreateProgram`.
    fn create_program(&self) -> Result<Self::Program, String>;
    /// `glAttachShader`.
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    /// `glDetachShader`.
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    /// `glBindAttribLocation`; only effective before linking.
    fn bind_attrib_location(&self, program: Self::Program, index: u32, name: &str);
    /// `glLinkProgram`.
    fn link_program(&self, program: Self::Program);
    /// `GL_LINK_STATUS`.
    fn get_program_link_status(&self, program: Self::Program) -> bool;
    /// `glGetProgramInfoLog`.
    fn get_program_info_log(&self, program: Self::Program) -> String;
    /// Names of all active uniforms (`GL_ACTIVE_UNIFORMS` + `glGetActiveUniform`).
    fn get_active_uniform_names(&self, program: Self::Program) -> Vec<String>;
    /// `glGetUniformLocation`.
    fn get_uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    /// `glUseProgram`.
    fn use_program(&self, program: Option<Self::Program>);
    /// `glDeleteProgram`.
    fn delete_program(&self, program: Self::Program);

    /// `glUniformMatrix4fv` with a column-major matrix.
    fn uniform_matrix_4_f32(&self, location: &Self::UniformLocation, value: &[f32; 16]);
    /// `glUniform1f`.
    fn uniform_1_f32(&self, location: &Self::UniformLocation, value: f32);
    /// `glUniform1i`.
    fn uniform_1_i32(&self, location: &Self::UniformLocation, value: i32);

    /// `glGenVertexArrays`.
    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    /// `glBindVertexArray`.
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    /// `glDeleteVertexArrays`.
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);
    /// `glGenBuffers`.
    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    /// `glBindBuffer`.
    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>);
    /// `glBufferData`.
    fn buffer_data_u8_slice(&self, target: u32, data: &[u8], usage: u32);
    /// `glDeleteBuffers`.
    fn delete_buffer(&self, buffer: Self::Buffer);
    /// `glEnableVertexAttribArray`.
    fn enable_vertex_attrib_array(&self, index: u32);
    /// `glVertexAttribPointer` for float attributes.
    fn vertex_attrib_pointer_f32(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    /// `glDrawElements`.
    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32);

    /// `glGenTextures`.
    fn create_texture(&self) -> Result<Self::Texture, String>;
    /// `glActiveTexture`.
    fn active_texture(&self, unit: u32);
    /// `glBindTexture`.
    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>);
    /// `glTexParameteri`.
    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32);
    /// `glTexImage2D` at level 0; (re)specifies storage.
    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &self,
        target: u32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    );
    /// `glTexSubImage2D` at level 0 covering the whole image; keeps storage.
    fn tex_sub_image_2d(
        &self,
        target: u32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    );
    /// `glDeleteTextures`.
    fn delete_texture(&self, texture: Self::Texture);
}

/// Convert a `u32` dimension to the `i32` GL expects.
///
/// # Errors
///
/// Returns [`Error::Gpu`] if `value > i32::MAX`.
pub fn gl_size(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::Gpu(format!("dimension {value} exceeds i32::MAX")))
}

/// [`Gpu`] backed by a [`glow::Context`].
///
/// # Example
///
/// ```no_run
/// # use glow_video_filters::GlowGpu;
/// # use std::sync::Arc;
/// # fn example(gl: Arc<glow::Context>) {
/// // With the context current on this thread:
/// let gpu = unsafe { GlowGpu::new(gl) };
/// # }
/// ```
pub struct GlowGpu {
    gl: Arc<glow::Context>,
}

impl GlowGpu {
    /// Wrap a glow context.
    ///
    /// # Safety
    ///
    /// The context must be current on the calling thread for as long as the
    /// returned value is used, and only used from that thread. Every
    /// [`Gpu`] call issues raw GL commands on that assumption.
    #[must_use]
    pub unsafe fn new(gl: Arc<glow::Context>) -> Self {
        Self { gl }
    }

    /// The wrapped context.
    #[must_use]
    pub fn context(&self) -> &Arc<glow::Context> {
        &self.gl
    }
}

// SAFETY (all blocks below): `GlowGpu::new` requires the context to be
// current on this thread for the wrapper's lifetime.
impl Gpu for GlowGpu {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Buffer = glow::Buffer;
    type VertexArray = glow::VertexArray;
    type Texture = glow::Texture;
    type UniformLocation = glow::UniformLocation;

    fn version(&self) -> ApiVersion {
        let version = self.gl.version();
        ApiVersion {
            major: version.major,
            minor: version.minor,
            embedded: version.is_embedded,
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        unsafe { self.gl.clear_color(red, green, blue, alpha) }
    }

    fn enable(&self, capability: u32) {
        unsafe { self.gl.enable(capability) }
    }

    fn clear(&self, mask: u32) {
        unsafe { self.gl.clear(mask) }
    }

    fn create_shader(&self, shader_type: u32) -> Result<Self::Shader, String> {
        unsafe { self.gl.create_shader(shader_type) }
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.compile_shader(shader) }
    }

    fn get_shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn get_shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.detach_shader(program, shader) }
    }

    fn bind_attrib_location(&self, program: Self::Program, index: u32, name: &str) {
        unsafe { self.gl.bind_attrib_location(program, index, name) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { self.gl.link_program(program) }
    }

    fn get_program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn get_program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn get_active_uniform_names(&self, program: Self::Program) -> Vec<String> {
        unsafe {
            let count = self.gl.get_active_uniforms(program);
            (0..count)
                .filter_map(|index| self.gl.get_active_uniform(program, index))
                .map(|uniform| uniform.name)
                .collect()
        }
    }

    fn get_uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn uniform_matrix_4_f32(&self, location: &Self::UniformLocation, value: &[f32; 16]) {
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(Some(location), false, value);
        }
    }

    fn uniform_1_f32(&self, location: &Self::UniformLocation, value: f32) {
        unsafe { self.gl.uniform_1_f32(Some(location), value) }
    }

    fn uniform_1_i32(&self, location: &Self::UniformLocation, value: i32) {
        unsafe { self.gl.uniform_1_i32(Some(location), value) }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String> {
        unsafe { self.gl.create_vertex_array() }
    }

    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>) {
        unsafe { self.gl.bind_vertex_array(vertex_array) }
    }

    fn delete_vertex_array(&self, vertex_array: Self::VertexArray) {
        unsafe { self.gl.delete_vertex_array(vertex_array) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>) {
        unsafe { self.gl.bind_buffer(target, buffer) }
    }

    fn buffer_data_u8_slice(&self, target: u32, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer_f32(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, data_type, normalized, stride, offset);
        }
    }

    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32) {
        unsafe { self.gl.draw_elements(mode, count, element_type, offset) }
    }

    fn create_texture(&self) -> Result<Self::Texture, String> {
        unsafe { self.gl.create_texture() }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(unit) }
    }

    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>) {
        unsafe { self.gl.bind_texture(target, texture) }
    }

    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, parameter, value) }
    }

    fn tex_image_2d(
        &self,
        target: u32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) {
        unsafe {
            self.gl.tex_image_2d(
                target,
                0,
                internal_format,
                width,
                height,
                0,
                format,
                ty,
                PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    fn tex_sub_image_2d(
        &self,
        target: u32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) {
        unsafe {
            self.gl.tex_sub_image_2d(
                target,
                0,
                0,
                0,
                width,
                height,
                format,
                ty,
                PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    fn delete_texture(&self, texture: Self::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }
}
