use std::sync::Arc;

pub mod decode;

/// Decoded source raster, kept for display in the drawer layout.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}
