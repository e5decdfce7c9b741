//! In-memory [`Gpu`] that records every call, for tests.
//!
//! Shader "compilation" scans the source for `uniform <type> <name>;`
//! declarations; a source containing `#error` fails to compile and a
//! program with a `LINK_FAIL` marker in either stage fails to link.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use super::{ApiVersion, Gpu};

/// One recorded GL call. Object handles are plain integers.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Viewport(i32, i32, i32, i32),
    ClearColor([f32; 4]),
    Enable(u32),
    Clear(u32),
    CreateShader(u32),
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader(u32, u32),
    DetachShader(u32, u32),
    BindAttribLocation(u32, u32, String),
    LinkProgram(u32),
    UseProgram(Option<u32>),
    DeleteProgram(u32),
    UniformMatrix4(String, [f32; 16]),
    Uniform1f(String, f32),
    Uniform1i(String, i32),
    CreateVertexArray(u32),
    BindVertexArray(Option<u32>),
    DeleteVertexArray(u32),
    CreateBuffer(u32),
    BindBuffer(u32, Option<u32>),
    BufferData(u32, Vec<u8>, u32),
    DeleteBuffer(u32),
    EnableVertexAttribArray(u32),
    VertexAttribPointer(u32, i32, u32, bool, i32, i32),
    DrawElements(u32, i32, u32, i32),
    CreateTexture(u32),
    ActiveTexture(u32),
    BindTexture(u32, Option<u32>),
    TexParameter(u32, u32, i32),
    TexImage2d(i32, i32, usize),
    TexSubImage2d(i32, i32, usize),
    DeleteTexture(u32),
}

/// Uniform location handle: owning program plus name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Location {
    pub program: u32,
    pub name: String,
}

#[derive(Debug, Default)]
struct ProgramState {
    shaders: Vec<u32>,
    uniforms: Vec<String>,
    linked: bool,
    log: String,
}

/// Recording backend.
#[derive(Debug)]
pub(crate) struct RecordingGpu {
    version: ApiVersion,
    calls: RefCell<Vec<Call>>,
    next_id: Cell<u32>,
    sources: RefCell<HashMap<u32, String>>,
    compiled: RefCell<HashMap<u32, bool>>,
    programs: RefCell<HashMap<u32, ProgramState>>,
    unresolved: RefCell<Vec<String>>,
    aliases: RefCell<HashMap<String, String>>,
}

impl Default for RecordingGpu {
    fn default() -> Self {
        Self::with_version(ApiVersion {
            major: 3,
            minor: 0,
            embedded: true,
        })
    }
}

impl RecordingGpu {
    pub fn with_version(version: ApiVersion) -> Self {
        Self {
            version,
            calls: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            sources: RefCell::new(HashMap::new()),
            compiled: RefCell::new(HashMap::new()),
            programs: RefCell::new(HashMap::new()),
            unresolved: RefCell::new(Vec::new()),
            aliases: RefCell::new(HashMap::new()),
        }
    }

    /// Make `name` active but without a location, like a driver bug would.
    pub fn unresolve(&self, name: &str) {
        self.unresolved.borrow_mut().push(name.to_owned());
    }

    /// Resolve `name` to the same location as `target`.
    pub fn alias(&self, name: &str, target: &str) {
        self.aliases
            .borrow_mut()
            .insert(name.to_owned(), target.to_owned());
    }

    /// Snapshot of all calls so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Forget recorded calls (object state is kept).
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Number of programs created and not yet deleted.
    pub fn live_programs(&self) -> usize {
        self.programs.borrow().len()
    }

    /// Names of the float uniforms uploaded so far.
    pub fn uploaded_f32(&self) -> Vec<(String, f32)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Uniform1f(name, value) => Some((name.clone(), *value)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn allocate(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

/// Pull `name` out of every `uniform <type> <name>;` line.
fn declared_uniforms(source: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("uniform ")?;
            let declaration = rest.split(';').next()?;
            let name = declaration.split_whitespace().last()?;
            Some(name.to_owned())
        })
        .collect()
}

impl Gpu for RecordingGpu {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type VertexArray = u32;
    type Texture = u32;
    type UniformLocation = Location;

    fn version(&self) -> ApiVersion {
        self.version
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Viewport(x, y, width, height));
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        self.record(Call::ClearColor([red, green, blue, alpha]));
    }

    fn enable(&self, capability: u32) {
        self.record(Call::Enable(capability));
    }

    fn clear(&self, mask: u32) {
        self.record(Call::Clear(mask));
    }

    fn create_shader(&self, shader_type: u32) -> Result<u32, String> {
        self.record(Call::CreateShader(shader_type));
        Ok(self.allocate())
    }

    fn shader_source(&self, shader: u32, source: &str) {
        self.sources.borrow_mut().insert(shader, source.to_owned());
    }

    fn compile_shader(&self, shader: u32) {
        self.record(Call::CompileShader(shader));
        let ok = self
            .sources
            .borrow()
            .get(&shader)
            .is_some_and(|source| !source.contains("#error"));
        self.compiled.borrow_mut().insert(shader, ok);
    }

    fn get_shader_compile_status(&self, shader: u32) -> bool {
        self.compiled.borrow().get(&shader).copied().unwrap_or(false)
    }

    fn get_shader_info_log(&self, shader: u32) -> String {
        if self.get_shader_compile_status(shader) {
            String::new()
        } else {
            format!("ERROR: 0:1: shader {shader} hit #error")
        }
    }

    fn delete_shader(&self, shader: u32) {
        self.record(Call::DeleteShader(shader));
        self.sources.borrow_mut().remove(&shader);
    }

    fn create_program(&self) -> Result<u32, String> {
        let id = self.allocate();
        self.record(Call::CreateProgram(id));
        self.programs.borrow_mut().insert(id, ProgramState::default());
        Ok(id)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.record(Call::AttachShader(program, shader));
        if let Some(state) = self.programs.borrow_mut().get_mut(&program) {
            state.shaders.push(shader);
        }
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        self.record(Call::DetachShader(program, shader));
        if let Some(state) = self.programs.borrow_mut().get_mut(&program) {
            state.shaders.retain(|&s| s != shader);
        }
    }

    fn bind_attrib_location(&self, program: u32, index: u32, name: &str) {
        self.record(Call::BindAttribLocation(program, index, name.to_owned()));
    }

    fn link_program(&self, program: u32) {
        self.record(Call::LinkProgram(program));
        let sources = self.sources.borrow();
        let mut programs = self.programs.borrow_mut();
        let Some(state) = programs.get_mut(&program) else {
            return;
        };
        let attached: Vec<&String> = state
            .shaders
            .iter()
            .filter_map(|shader| sources.get(shader))
            .collect();
        if attached.iter().any(|source| source.contains("LINK_FAIL")) {
            state.linked = false;
            state.log = "error: vertex output `v_uv` not matched by fragment input".to_owned();
            return;
        }
        let mut uniforms: Vec<String> = Vec::new();
        for name in attached.iter().flat_map(|source| declared_uniforms(source)) {
            if !uniforms.contains(&name) {
                uniforms.push(name);
            }
        }
        state.uniforms = uniforms;
        state.linked = true;
    }

    fn get_program_link_status(&self, program: u32) -> bool {
        self.programs
            .borrow()
            .get(&program)
            .is_some_and(|state| state.linked)
    }

    fn get_program_info_log(&self, program: u32) -> String {
        self.programs
            .borrow()
            .get(&program)
            .map(|state| state.log.clone())
            .unwrap_or_default()
    }

    fn get_active_uniform_names(&self, program: u32) -> Vec<String> {
        self.programs
            .borrow()
            .get(&program)
            .map(|state| state.uniforms.clone())
            .unwrap_or_default()
    }

    fn get_uniform_location(&self, program: u32, name: &str) -> Option<Location> {
        let programs = self.programs.borrow();
        let state = programs.get(&program)?;
        let base = name.strip_suffix("[0]").unwrap_or(name);
        if self.unresolved.borrow().iter().any(|u| u == base) {
            return None;
        }
        let resolved = self
            .aliases
            .borrow()
            .get(base)
            .cloned()
            .unwrap_or_else(|| base.to_owned());
        state
            .uniforms
            .iter()
            .any(|u| u == name || u.strip_suffix("[0]") == Some(base))
            .then_some(Location {
                program,
                name: resolved,
            })
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(Call::UseProgram(program));
    }

    fn delete_program(&self, program: u32) {
        self.record(Call::DeleteProgram(program));
        self.programs.borrow_mut().remove(&program);
    }

    fn uniform_matrix_4_f32(&self, location: &Location, value: &[f32; 16]) {
        self.record(Call::UniformMatrix4(location.name.clone(), *value));
    }

    fn uniform_1_f32(&self, location: &Location, value: f32) {
        self.record(Call::Uniform1f(location.name.clone(), value));
    }

    fn uniform_1_i32(&self, location: &Location, value: i32) {
        self.record(Call::Uniform1i(location.name.clone(), value));
    }

    fn create_vertex_array(&self) -> Result<u32, String> {
        let id = self.allocate();
        self.record(Call::CreateVertexArray(id));
        Ok(id)
    }

    fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        self.record(Call::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        self.record(Call::DeleteVertexArray(vertex_array));
    }

    fn create_buffer(&self) -> Result<u32, String> {
        let id = self.allocate();
        self.record(Call::CreateBuffer(id));
        Ok(id)
    }

    fn bind_buffer(&self, target: u32, buffer: Option<u32>) {
        self.record(Call::BindBuffer(target, buffer));
    }

    fn buffer_data_u8_slice(&self, target: u32, data: &[u8], usage: u32) {
        self.record(Call::BufferData(target, data.to_vec(), usage));
    }

    fn delete_buffer(&self, buffer: u32) {
        self.record(Call::DeleteBuffer(buffer));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::EnableVertexAttribArray(index));
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
        self.record(Call::VertexAttribPointer(
            index, size, data_type, normalized, stride, offset,
        ));
    }

    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32) {
        self.record(Call::DrawElements(mode, count, element_type, offset));
    }

    fn create_texture(&self) -> Result<u32, String> {
        let id = self.allocate();
        self.record(Call::CreateTexture(id));
        Ok(id)
    }

    fn active_texture(&self, unit: u32) {
        self.record(Call::ActiveTexture(unit));
    }

    fn bind_texture(&self, target: u32, texture: Option<u32>) {
        self.record(Call::BindTexture(target, texture));
    }

    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32) {
        self.record(Call::TexParameter(target, parameter, value));
    }

    fn tex_image_2d(
        &self,
        _target: u32,
        _internal_format: i32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
        pixels: &[u8],
    ) {
        self.record(Call::TexImage2d(width, height, pixels.len()));
    }

    fn tex_sub_image_2d(
        &self,
        _target: u32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
        pixels: &[u8],
    ) {
        self.record(Call::TexSubImage2d(width, height, pixels.len()));
    }

    fn delete_texture(&self, texture: u32) {
        self.record(Call::DeleteTexture(texture));
    }
}
