use crate::{compile::RenderPlan, foundation::error::EpicycleResult};

pub mod cpu;

/// A rendered frame as RGBA8 pixels, tightly packed, row-major.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize * self.width as usize) + x as usize) * 4;
        self.data.get(i..i + 4).map(|px| [px[0], px[1], px[2], px[3]])
    }
}

/// Rasterizes compiled plans. [`cpu::CpuBackend`] is the only implementation.
pub trait RenderBackend {
    fn render_plan(&mut self, plan: &RenderPlan) -> EpicycleResult<FrameRGBA>;
}
