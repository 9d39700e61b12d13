use std::sync::Arc;

use image::{DynamicImage, GrayImage};

use crate::{
    assets::PreparedImage,
    foundation::error::{EpicycleError, EpicycleResult},
};

/// A raster decoded once into the two views the pipeline needs.
#[derive(Clone, Debug)]
pub struct DecodedRaster {
    /// Luma plane the contour is traced on.
    pub luma: GrayImage,
    /// Premultiplied color copy for display.
    pub display: PreparedImage,
}

pub fn decode_raster(bytes: &[u8]) -> EpicycleResult<DecodedRaster> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| EpicycleError::extraction(format!("decode image: {e}")))?;
    Ok(prepare_raster(&dyn_img))
}

pub fn prepare_raster(img: &DynamicImage) -> DecodedRaster {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    DecodedRaster {
        luma: img.to_luma8(),
        display: PreparedImage {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        },
    }
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
