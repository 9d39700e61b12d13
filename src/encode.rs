//! Encoding sinks. Frames arrive in order; the output file appears only once the last frame
//! is encoded, so a failed run never leaves a partial artifact behind.

use std::{
    io::Write as _,
    path::{Path, PathBuf},
};

use crate::foundation::error::{EpicycleError, EpicycleResult};

pub mod ffmpeg;
pub mod gif;
pub mod sink;

pub fn ensure_parent_dir(path: &Path) -> EpicycleResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            EpicycleError::io(
                format!("create output directory '{}'", parent.display()),
                e,
            )
        })?;
    }
    Ok(())
}

/// Hidden sibling of `path` used while the output is being produced.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.partial{ext}", std::process::id()))
}

/// Writes `bytes` to a temp sibling, then renames it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> EpicycleResult<()> {
    ensure_parent_dir(path)?;
    let tmp = temp_sibling(path);
    let res = (|| {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        drop(f);
        std::fs::rename(&tmp, path)
    })();
    if let Err(e) = res {
        let _ = std::fs::remove_file(&tmp);
        return Err(EpicycleError::io(
            format!("write output '{}'", path.display()),
            e,
        ));
    }
    Ok(())
}

/// Composites RGBA8 over an opaque background so every output pixel has alpha 255.
pub fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
) -> EpicycleResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(EpicycleError::render(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;

        let (r, g, b) = if src_is_premul {
            (
                s[0] as u16 + mul_div255(bg_r, inv),
                s[1] as u16 + mul_div255(bg_g, inv),
                s[2] as u16 + mul_div255(bg_b, inv),
            )
        } else {
            (
                mul_div255(s[0] as u16, a) + mul_div255(bg_r, inv),
                mul_div255(s[1] as u16, a) + mul_div255(bg_g, inv),
                mul_div255(s[2] as u16, a) + mul_div255(bg_b, inv),
            )
        };

        d[0] = r.min(255) as u8;
        d[1] = g.min(255) as u8;
        d[2] = b.min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}
