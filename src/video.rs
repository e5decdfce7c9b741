//! Video frame sources sampled by the texture stream.

use std::path::Path;

use image::RgbaImage;

use crate::error::Result;

/// Something that exposes the current decoded video frame.
///
/// The renderer never starts or stops playback; it only samples the source
/// after the host has signalled that frames are available
/// ([`FilterApp::set_video_ready`](crate::FilterApp::set_video_ready)).
pub trait VideoSource {
    /// Frame width in pixels.
    fn width(&self) -> u32;
    /// Frame height in pixels.
    fn height(&self) -> u32;
    /// Current frame as tightly packed RGBA8, top row first.
    fn pixels(&self) -> &[u8];
}

impl VideoSource for RgbaImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn pixels(&self) -> &[u8] {
        self.as_raw()
    }
}

impl<V: VideoSource + ?Sized> VideoSource for &V {
    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }

    fn pixels(&self) -> &[u8] {
        (**self).pixels()
    }
}

/// Decode a still image (PNG or JPEG) to use as a frozen video frame.
///
/// # Errors
///
/// Returns [`Error::Image`](crate::Error::Image) if the file cannot be read
/// or decoded.
pub fn load_still(path: impl AsRef<Path>) -> Result<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}
