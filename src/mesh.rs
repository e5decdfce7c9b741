//! The single textured quad: vertex data and its vertex array object.

use bytemuck::{Pod, Zeroable};

use crate::error::{Error, Result};
use crate::gpu::Gpu;

/// Attribute index of `vertex_position`, bound before every link.
pub const POSITION_ATTRIB: u32 = 0;
/// Attribute index of `vertex_texcoord`, bound before every link.
pub const TEXCOORD_ATTRIB: u32 = 1;

/// A position in model space.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    /// `x, y, z`
    pub xyz: [f32; 3],
}

/// A texture coordinate.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct TexCoord {
    /// `u, v`
    pub uv: [f32; 2],
}

/// Quad corners in the XY plane at z=0, counter-clockwise from bottom-left.
pub const QUAD_POSITIONS: [Position; 4] = [
    Position { xyz: [-1.0, -1.0, 0.0] },
    Position { xyz: [1.0, -1.0, 0.0] },
    Position { xyz: [1.0, 1.0, 0.0] },
    Position { xyz: [-1.0, 1.0, 0.0] },
];

/// Texture coordinates per corner.
///
/// Video rows arrive top-first, so v runs opposite to y and the image is
/// upright; u is mirrored like a webcam preview.
pub const QUAD_TEXCOORDS: [TexCoord; 4] = [
    TexCoord { uv: [1.0, 1.0] },
    TexCoord { uv: [0.0, 1.0] },
    TexCoord { uv: [0.0, 0.0] },
    TexCoord { uv: [1.0, 0.0] },
];

/// Two triangles.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// GPU-side quad: a VAO holding position, texcoord and index buffers.
///
/// Created once and never resized or modified.
#[derive(Debug)]
pub struct QuadMesh<G: Gpu> {
    vertex_array: G::VertexArray,
    position_buffer: G::Buffer,
    texcoord_buffer: G::Buffer,
    index_buffer: G::Buffer,
}

impl<G: Gpu> QuadMesh<G> {
    /// Upload the quad and record its attribute layout in a new VAO.
    ///
    /// The VAO is unbound on return; the element buffer binding lives inside
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Gpu`] if any GL object cannot be created.
    pub fn create(gpu: &G) -> Result<Self> {
        let vertex_array = gpu.create_vertex_array().map_err(Error::Gpu)?;
        gpu.bind_vertex_array(Some(vertex_array));

        let position_buffer = gpu.create_buffer().map_err(Error::Gpu)?;
        gpu.bind_buffer(glow::ARRAY_BUFFER, Some(position_buffer));
        gpu.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(&QUAD_POSITIONS),
            glow::STATIC_DRAW,
        );
        gpu.enable_vertex_attrib_array(POSITION_ATTRIB);
        gpu.vertex_attrib_pointer_f32(POSITION_ATTRIB, 3, glow::FLOAT, false, 0, 0);

        let texcoord_buffer = gpu.create_buffer().map_err(Error::Gpu)?;
        gpu.bind_buffer(glow::ARRAY_BUFFER, Some(texcoord_buffer));
        gpu.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(&QUAD_TEXCOORDS),
            glow::STATIC_DRAW,
        );
        gpu.enable_vertex_attrib_array(TEXCOORD_ATTRIB);
        gpu.vertex_attrib_pointer_f32(TEXCOORD_ATTRIB, 2, glow::FLOAT, false, 0, 0);

        let index_buffer = gpu.create_buffer().map_err(Error::Gpu)?;
        gpu.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));
        gpu.buffer_data_u8_slice(
            glow::ELEMENT_ARRAY_BUFFER,
            bytemuck::cast_slice(&QUAD_INDICES),
            glow::STATIC_DRAW,
        );

        gpu.bind_vertex_array(None);
        gpu.bind_buffer(glow::ARRAY_BUFFER, None);

        Ok(Self {
            vertex_array,
            position_buffer,
            texcoord_buffer,
            index_buffer,
        })
    }

    /// Number of indices for one draw of the quad.
    #[must_use]
    // Six indices; the cast cannot truncate.
    #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn draw_index_count(&self) -> i32 {
        QUAD_INDICES.len() as i32
    }

    /// The VAO to bind before drawing.
    #[must_use]
    pub fn vertex_array(&self) -> G::VertexArray {
        self.vertex_array
    }

    /// Release the VAO and its buffers.
    pub fn destroy(&self, gpu: &G) {
        gpu.delete_vertex_array(self.vertex_array);
        gpu.delete_buffer(self.position_buffer);
        gpu.delete_buffer(self.texcoord_buffer);
        gpu.delete_buffer(self.index_buffer);
    }
}
