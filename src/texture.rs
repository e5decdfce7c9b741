//! The video texture: one GL texture whose pixels are replaced every frame.

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::error::{Error, Result};
use crate::gpu::{gl_size, Gpu};
use crate::video::VideoSource;

/// GL internal format for RGBA8 textures, pre-cast to the `i32` that
/// `tex_image_2d` expects.
#[expect(clippy::cast_possible_wrap)]
const RGBA8_INTERNAL_FORMAT: i32 = glow::RGBA8 as i32;

const PLACEHOLDER_WIDTH: u32 = 3;
const PLACEHOLDER_HEIGHT: u32 = 2;

/// Build the image shown before video starts: a 3x2 black and white
/// checkerboard, so the quad is visible from the first frame.
#[must_use]
pub fn placeholder_image() -> RgbaImage {
    RgbaImage::from_fn(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    })
}

/// A single 2D texture streamed from a [`VideoSource`].
///
/// Filtering and wrapping are set once in
/// [`initialize_placeholder`](Self::initialize_placeholder) and never touched
/// again; [`refresh`](Self::refresh) only replaces pixel data.
#[derive(Debug)]
pub struct VideoTexture<G: Gpu> {
    texture: G::Texture,
    /// Size of the last upload; decides between sub-image and re-specify.
    size: [u32; 2],
}

impl<G: Gpu> VideoTexture<G> {
    /// Create the texture, fix its sampling parameters and upload the
    /// placeholder checkerboard.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Gpu`] if the texture cannot be created.
    pub fn initialize_placeholder(gpu: &G) -> Result<Self> {
        let texture = gpu.create_texture().map_err(Error::Gpu)?;
        let placeholder = placeholder_image();
        let (width, height) = placeholder.dimensions();

        gpu.bind_texture(glow::TEXTURE_2D, Some(texture));
        set_sampling_params(gpu);
        gpu.tex_image_2d(
            glow::TEXTURE_2D,
            RGBA8_INTERNAL_FORMAT,
            gl_size(width)?,
            gl_size(height)?,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            placeholder.as_raw(),
        );
        gpu.bind_texture(glow::TEXTURE_2D, None);

        Ok(Self {
            texture,
            size: [width, height],
        })
    }

    /// Replace the texture's pixels with the source's current frame.
    ///
    /// Reuses the same texture object. When the frame size matches the last
    /// upload the existing storage is overwritten in place; otherwise (the
    /// first frame after the placeholder) storage is re-specified.
    ///
    /// The caller must only call this once the source is producing frames.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameSize`] if the pixel buffer does not hold exactly
    /// `width * height` RGBA pixels; no GPU call is made in that case.
    pub fn refresh<V: VideoSource + ?Sized>(&mut self, gpu: &G, source: &V) -> Result<()> {
        let (width, height) = (source.width(), source.height());
        let pixels = source.pixels();
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected || expected == 0 {
            return Err(Error::FrameSize {
                width,
                height,
                len: pixels.len(),
                expected,
            });
        }
        let (w, h) = (gl_size(width)?, gl_size(height)?);

        gpu.bind_texture(glow::TEXTURE_2D, Some(self.texture));
        if self.size == [width, height] {
            gpu.tex_sub_image_2d(glow::TEXTURE_2D, w, h, glow::RGBA, glow::UNSIGNED_BYTE, pixels);
        } else {
            debug!(
                "Video texture storage {}x{} -> {width}x{height}",
                self.size[0], self.size[1]
            );
            gpu.tex_image_2d(
                glow::TEXTURE_2D,
                RGBA8_INTERNAL_FORMAT,
                w,
                h,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                pixels,
            );
            self.size = [width, height];
        }
        gpu.bind_texture(glow::TEXTURE_2D, None);
        Ok(())
    }

    /// The texture object to bind for drawing.
    #[must_use]
    pub fn texture(&self) -> G::Texture {
        self.texture
    }

    /// Width and height of the last upload.
    #[must_use]
    pub fn dimensions(&self) -> [u32; 2] {
        self.size
    }

    /// Release the texture.
    pub fn destroy(&self, gpu: &G) {
        gpu.delete_texture(self.texture);
    }
}

/// Linear filtering, clamp-to-edge wrapping.
fn set_sampling_params<G: Gpu>(gpu: &G) {
    // GL constant values are small enough that the cast is always safe.
    #[expect(clippy::cast_possible_wrap)]
    let params = [
        (glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32),
        (glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32),
        (glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32),
        (glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32),
    ];
    for (parameter, value) in params {
        gpu.tex_parameter_i32(glow::TEXTURE_2D, parameter, value);
    }
}
