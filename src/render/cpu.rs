use std::sync::Arc;

use crate::{
    assets::PreparedImage,
    compile::{DrawOp, RenderPlan},
    foundation::{
        core::{Affine, BezPath, Point, Rect, Rgba8},
        error::{EpicycleError, EpicycleResult},
    },
    render::{FrameRGBA, RenderBackend},
};

/// `vello_cpu` rasterizer. The decoded source image is converted once and reused across frames.
#[derive(Default)]
pub struct CpuBackend {
    image_cache: Option<(usize, vello_cpu::Image)>,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn image_paint_for(&mut self, image: &PreparedImage) -> EpicycleResult<vello_cpu::Image> {
        let key = Arc::as_ptr(&image.rgba8_premul) as usize;
        if let Some((cached, paint)) = &self.image_cache
            && *cached == key
        {
            return Ok(paint.clone());
        }

        let pixmap =
            image_premul_bytes_to_pixmap(image.rgba8_premul.as_slice(), image.width, image.height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        self.image_cache = Some((key, paint.clone()));
        Ok(paint)
    }
}

impl RenderBackend for CpuBackend {
    fn render_plan(&mut self, plan: &RenderPlan) -> EpicycleResult<FrameRGBA> {
        let width: u16 = plan
            .canvas
            .width
            .try_into()
            .map_err(|_| EpicycleError::render("frame width exceeds u16"))?;
        let height: u16 = plan
            .canvas
            .height
            .try_into()
            .map_err(|_| EpicycleError::render("frame height exceeds u16"))?;
        if width == 0 || height == 0 {
            return Err(EpicycleError::render("cannot allocate an empty frame buffer"));
        }

        let mut ctx = vello_cpu::RenderContext::new(width, height);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(color_to_cpu(plan.clear));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(width),
            f64::from(height),
        ));

        for op in &plan.ops {
            draw_op(self, &mut ctx, op)?;
        }

        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width: plan.canvas.width,
            height: plan.canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn draw_op(
    backend: &mut CpuBackend,
    ctx: &mut vello_cpu::RenderContext,
    op: &DrawOp,
) -> EpicycleResult<()> {
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);

    match op {
        DrawOp::Stroke { path, color, width } => {
            ctx.set_paint(color_to_cpu(*color));
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(*width));
            ctx.stroke_path(&bezpath_to_cpu(path));
            Ok(())
        }
        DrawOp::Fill { path, color } => {
            ctx.set_paint(color_to_cpu(*color));
            ctx.fill_path(&bezpath_to_cpu(path));
            Ok(())
        }
        DrawOp::Image {
            image,
            dest,
            opacity,
        } => {
            if image.width == 0 || image.height == 0 || dest.area() <= 0.0 {
                return Ok(());
            }
            let paint = backend.image_paint_for(image)?;
            let (w, h) = (f64::from(image.width), f64::from(image.height));
            let transform = Affine::translate(dest.origin().to_vec2())
                * Affine::scale_non_uniform(dest.width() / w, dest.height() / h);

            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_paint(paint);
            if *opacity < 1.0 {
                ctx.push_opacity_layer(*opacity);
            }
            ctx.fill_rect(&rect_to_cpu(Rect::new(0.0, 0.0, w, h)));
            if *opacity < 1.0 {
                ctx.pop_layer();
            }
            Ok(())
        }
    }
}

fn color_to_cpu(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> EpicycleResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| EpicycleError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| EpicycleError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(EpicycleError::render("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}
