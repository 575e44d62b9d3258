//! Figure descriptions and their gnuplot rendering.
//!
//! Commands first build plain figure values ([`SeriesPlot`], [`HeatmapFigure`])
//! and only then hand them to gnuplot, so everything up to the final `draw`
//! call can be inspected without a gnuplot binary.

use std::path::Path;

use gnuplot::Figure;
use tracing::info;

use crate::error::{Error, Result};

mod heatmap;
mod series;

pub use heatmap::{
    grid_layout, ColorScale, HeatmapFigure, Panel, PanelBody, DEGENERATE_TEXT, PLACEHOLDER_TEXT,
};
pub use series::{Series, SeriesPlot, Style, ValueAxis};

/// Physical figure size; pixel size follows from the configured DPI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width_in: f64,
    pub height_in: f64,
}

impl Size {
    pub const fn new(width_in: f64, height_in: f64) -> Self {
        Self {
            width_in,
            height_in,
        }
    }

    pub fn pixels(&self, dpi: u32) -> (u32, u32) {
        (
            (self.width_in * dpi as f64).round() as u32,
            (self.height_in * dpi as f64).round() as u32,
        )
    }
}

/// `cache_line_size` -> `Cache Line Size`.
pub fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Writes the figure as PNG and waits for gnuplot to exit so the file is
/// complete and the process released before the next figure.
fn save(fg: &mut Figure, path: &Path, size: Size, dpi: u32) -> Result<()> {
    let (width, height) = size.pixels(dpi);
    let saved = fg.save_to_png(path, width, height);
    fg.close();
    saved.map_err(|e| Error::Render {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_splits_on_underscores() {
        assert_eq!(title_case("cache_line_size"), "Cache Line Size");
        assert_eq!(title_case("evaluation_type"), "Evaluation Type");
        assert_eq!(title_case("k"), "K");
    }

    #[test]
    fn pixels_follow_dpi() {
        assert_eq!(Size::new(12.0, 8.0).pixels(300), (3600, 2400));
        assert_eq!(Size::new(4.5, 3.5).pixels(100), (450, 350));
    }
}
