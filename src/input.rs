//! Loading the run's input: a raster to trace, or an already-traced point list.

use std::path::Path;

use crate::{
    assets::decode::{DecodedRaster, decode_raster},
    foundation::{
        core::Point,
        error::{EpicycleError, EpicycleResult},
    },
};

#[derive(Clone, Debug)]
pub enum SourceInput {
    Raster(DecodedRaster),
    Points(Vec<Point>),
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum PointRecord {
    Pair([f64; 2]),
    Object { x: f64, y: f64 },
}

impl From<PointRecord> for Point {
    fn from(r: PointRecord) -> Self {
        match r {
            PointRecord::Pair([x, y]) | PointRecord::Object { x, y } => Point::new(x, y),
        }
    }
}

impl SourceInput {
    /// Reads `path` fully; `.json`, `.csv` and `.txt` are point lists, anything else a raster.
    #[tracing::instrument]
    pub fn load(path: &Path) -> EpicycleResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| EpicycleError::io(format!("read input '{}'", path.display()), e))?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let input = match ext.as_deref() {
            Some("json") => Self::Points(parse_point_json(&bytes)?),
            Some("csv") | Some("txt") => {
                let text = std::str::from_utf8(&bytes).map_err(|e| {
                    EpicycleError::extraction(format!("point list is not utf-8: {e}"))
                })?;
                Self::Points(parse_point_text(text)?)
            }
            _ => Self::Raster(decode_raster(&bytes)?),
        };

        match &input {
            Self::Raster(r) => tracing::debug!(
                width = r.display.width,
                height = r.display.height,
                "loaded raster input"
            ),
            Self::Points(p) => tracing::debug!(points = p.len(), "loaded point list"),
        }
        Ok(input)
    }

    /// The decoded raster, when the input was an image.
    pub fn raster(&self) -> Option<&DecodedRaster> {
        match self {
            Self::Raster(r) => Some(r),
            Self::Points(_) => None,
        }
    }
}

pub fn parse_point_json(bytes: &[u8]) -> EpicycleResult<Vec<Point>> {
    let records: Vec<PointRecord> = serde_json::from_slice(bytes)
        .map_err(|e| EpicycleError::extraction(format!("parse point list json: {e}")))?;
    Ok(records.into_iter().map(Point::from).collect())
}

/// One `x,y` pair per line. Blank lines and `#` comments are skipped; whitespace also separates.
pub fn parse_point_text(text: &str) -> EpicycleResult<Vec<Point>> {
    let mut points = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        let [x, y] = fields.as_slice() else {
            return Err(EpicycleError::extraction(format!(
                "line {}: expected 'x,y', got '{line}'",
                i + 1
            )));
        };
        let parse = |f: &str| {
            f.parse::<f64>().map_err(|e| {
                EpicycleError::extraction(format!("line {}: bad number '{f}': {e}", i + 1))
            })
        };
        points.push(Point::new(parse(*x)?, parse(*y)?));
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_accepts_pairs_and_objects() {
        let pts = parse_point_json(br#"[[0, 0], {"x": 1.5, "y": -2}]"#).unwrap();
        assert_eq!(pts, vec![Point::new(0.0, 0.0), Point::new(1.5, -2.0)]);
    }

    #[test]
    fn json_garbage_is_extraction_error() {
        let err = parse_point_json(b"{ not json").unwrap_err();
        assert!(matches!(err, EpicycleError::Extraction(_)));
    }

    #[test]
    fn text_skips_comments_and_blank_lines() {
        let text = "# unit square\n0,0\n\n1, 0\n1 1   # corner\n0,1\n";
        let pts = parse_point_text(text).unwrap();
        assert_eq!(pts.len(), 4);
        assert_eq!(pts[2], Point::new(1.0, 1.0));
    }

    #[test]
    fn text_rejects_wrong_arity() {
        assert!(parse_point_text("1,2,3\n").is_err());
        assert!(parse_point_text("1\n").is_err());
        assert!(parse_point_text("a,b\n").is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SourceInput::load(Path::new("target/definitely/missing.json")).unwrap_err();
        assert!(matches!(err, EpicycleError::Io { .. }));
    }
}
