// crates/framecut-core/src/frame.rs
//
// Decoded-frame payload shared between framecut-media and the UI.
// No ffmpeg types cross this boundary — just plain data.

use std::sync::Arc;

/// Pixel layout of a decoded frame.
///
/// The decoder converts everything to RGBA on the way out, so today this has
/// a single variant; it travels with the frame so consumers never have to
/// assume the layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// One decoded video frame, identified by its frame index.
///
/// Immutable once produced. `Clone` is an Arc bump on the pixel payload, so
/// a frame handed to the renderer stays valid for the whole render call even
/// if the cache evicts its entry concurrently.
#[derive(Clone, Debug)]
pub struct Frame {
    pub index:  u32,
    pub width:  u32,
    pub height: u32,
    pub format: PixelFormat,
    data:       Arc<[u8]>,
}

impl Frame {
    pub fn new(index: u32, width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * format.bytes_per_pixel(),
            "Frame::new — payload size mismatch for {width}x{height}",
        );
        Self {
            index,
            width,
            height,
            format,
            data: Arc::from(data.into_boxed_slice()),
        }
    }

    /// Tightly packed pixel rows (stride == width * bytes_per_pixel).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Resident byte size of the pixel payload.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}
