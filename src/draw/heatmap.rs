use std::path::Path;

use gnuplot::{
    AlignType::AlignCenter,
    AutoOption::Fix,
    AxesCommon,
    Coordinate::Graph,
    Figure,
    LabelOption::{TextAlign, TextColor},
    PaletteType,
    PlotOption::{Color, PointSymbol},
    GRAY, HOT,
};
use tracing::{debug, warn};

use super::{save, title_case, Size};
use crate::{
    config::{ColorMap, PlotConfig},
    error::Result,
    interpolate::{interpolate, Grid, Surface, MIN_POINTS},
    pipeline::group_by,
    schema::{Role, Schema},
    table::Table,
};

pub const PLACEHOLDER_TEXT: &str = "Data points < 3\nCannot interpolate";
pub const DEGENERATE_TEXT: &str = "Degenerate samples\nCannot interpolate";

/// Size of one grid cell.
const CELL: Size = Size::new(4.5, 3.5);

const VIRIDIS: &[(f32, f32, f32, f32)] = &[
    (0.0, 0.267, 0.005, 0.329),
    (0.25, 0.230, 0.322, 0.546),
    (0.5, 0.128, 0.567, 0.551),
    (0.75, 0.369, 0.789, 0.383),
    (1.0, 0.993, 0.906, 0.144),
];

/// Color scale shared by every panel of a figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorScale {
    Linear { min: f64, max: f64 },
    Log { min: f64, max: f64 },
}

impl ColorScale {
    /// Global min/max of the finite values. With `log`, the lower bound is
    /// the smallest strictly positive value; when that leaves no usable range
    /// the scale falls back to linear.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I, log: bool) -> Option<Self> {
        let values: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        let max = values.iter().copied().reduce(f64::max)?;
        let min = values.iter().copied().reduce(f64::min)?;
        if log {
            let positive_min = values.iter().copied().filter(|v| *v > 0.0).reduce(f64::min);
            match positive_min {
                Some(lo) if lo < max => return Some(ColorScale::Log { min: lo, max }),
                _ => debug!("No positive range for a log scale, using linear"),
            }
        }
        Some(ColorScale::Linear { min, max })
    }

    pub fn range(&self) -> (f64, f64) {
        match *self {
            ColorScale::Linear { min, max } | ColorScale::Log { min, max } => (min, max),
        }
    }

    pub fn is_log(&self) -> bool {
        matches!(self, ColorScale::Log { .. })
    }

    /// Snaps a value to the middle of its band when the scale is cut into
    /// `levels` equal bands (equal in log space for a log scale). Values a
    /// log scale cannot show become NaN.
    pub fn quantize(&self, value: f64, levels: usize) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let (forward, inverse): (fn(f64) -> f64, fn(f64) -> f64) = match self {
            ColorScale::Linear { .. } => (|v| v, |v| v),
            ColorScale::Log { .. } => (f64::log10, |v| 10f64.powf(v)),
        };
        if self.is_log() && value <= 0.0 {
            return f64::NAN;
        }
        let (min, max) = self.range();
        let (lo, hi) = (forward(min), forward(max));
        if levels == 0 || hi <= lo {
            return value;
        }
        let t = ((forward(value) - lo) / (hi - lo)).clamp(0.0, 1.0);
        let band = ((t * levels as f64).floor() as usize).min(levels - 1);
        inverse(lo + (band as f64 + 0.5) / levels as f64 * (hi - lo))
    }
}

/// `(rows, cols)` for `facets` panels with at most `max_cols` per row.
pub fn grid_layout(facets: usize, max_cols: usize) -> (usize, usize) {
    if facets == 0 {
        return (0, 0);
    }
    let cols = max_cols.max(1).min(facets);
    (facets.div_ceil(cols), cols)
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelBody {
    Surface(Grid),
    Placeholder(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub facet: String,
    pub title: String,
    pub body: PanelBody,
    /// Carries the labelled color bar; set on the last surface panel only.
    pub colorbar: bool,
}

/// One figure per group: a grid of facet panels on a shared color scale.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapFigure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub colorbar_label: String,
    pub rows: usize,
    pub cols: usize,
    pub scale: Option<ColorScale>,
    pub color_map: ColorMap,
    pub panels: Vec<Panel>,
}

impl HeatmapFigure {
    pub fn build(group: &Table, schema: &Schema, plot: &PlotConfig, title: String) -> Result<Self> {
        let x_column = schema.column(Role::X)?;
        let y_column = schema.column(Role::Y)?;
        let z_column = schema.column(Role::Z)?;
        let facet_column = schema.column(Role::Facet)?;

        let z_values = group.numeric_column(z_column)?;
        let scale = ColorScale::from_values(z_values.iter().flatten().copied(), plot.log_scale);
        debug!("{}: color scale {:?}", title, scale);

        let facets = group_by(group, facet_column)?;
        let (rows, cols) = grid_layout(facets.len(), plot.subplot_cols);

        let mut panels = Vec::with_capacity(facets.len());
        for facet in facets {
            let label = facet.key.to_string();
            let samples = samples(&facet.table, (x_column, y_column, z_column))?;
            let body = if samples.len() < MIN_POINTS {
                warn!("{}: facet {} has {} points, not interpolating", title, label, samples.len());
                PanelBody::Placeholder(PLACEHOLDER_TEXT)
            } else {
                match interpolate(&samples, plot.grid_resolution, plot.interpolation) {
                    Surface::Interpolated(mut grid) => {
                        if let Some(scale) = scale {
                            for v in grid.values.iter_mut() {
                                *v = scale.quantize(*v, plot.contour_levels);
                            }
                        }
                        PanelBody::Surface(grid)
                    }
                    Surface::InsufficientData { .. } => PanelBody::Placeholder(PLACEHOLDER_TEXT),
                    Surface::Degenerate => {
                        warn!("{}: facet {} samples are degenerate", title, label);
                        PanelBody::Placeholder(DEGENERATE_TEXT)
                    }
                }
            };
            panels.push(Panel {
                title: format!("{} = {}", title_case(facet_column), label),
                facet: label,
                body,
                colorbar: false,
            });
        }
        if let Some(last) = panels
            .iter_mut()
            .rev()
            .find(|p| matches!(p.body, PanelBody::Surface(_)))
        {
            last.colorbar = true;
        }

        let mut colorbar_label = title_case(z_column);
        if scale.is_some_and(|s| s.is_log()) {
            colorbar_label.push_str(" (Log Scale)");
        }

        Ok(Self {
            title,
            x_label: title_case(x_column),
            y_label: title_case(y_column),
            colorbar_label,
            rows,
            cols,
            scale,
            color_map: plot.color_map,
            panels,
        })
    }

    pub fn size(&self) -> Size {
        Size::new(
            CELL.width_in * self.cols as f64,
            CELL.height_in * self.rows as f64,
        )
    }

    pub fn draw(&self, path: &Path, dpi: u32) -> Result<()> {
        let mut fg = Figure::new();
        fg.set_multiplot_layout(self.rows, self.cols);
        fg.set_title(&self.title);

        for panel in &self.panels {
            let axes = fg.axes2d();
            axes.set_title(&panel.title, &[])
                .set_x_label(&self.x_label, &[])
                .set_y_label(&self.y_label, &[]);

            match &panel.body {
                PanelBody::Surface(grid) => {
                    match self.color_map {
                        ColorMap::Viridis => axes.set_palette(PaletteType::Custom(VIRIDIS)),
                        ColorMap::Hot => axes.set_palette(HOT),
                        ColorMap::Gray => axes.set_palette(GRAY),
                    };
                    if panel.colorbar {
                        axes.set_cb_label(&self.colorbar_label, &[]);
                    } else {
                        axes.set_cb_ticks(None, &[], &[]);
                    }
                    axes.set_x_range(Fix(grid.x_range.0), Fix(grid.x_range.1))
                        .set_y_range(Fix(grid.y_range.0), Fix(grid.y_range.1));
                    if let Some(scale) = self.scale {
                        let (lo, hi) = scale.range();
                        axes.set_cb_range(Fix(lo), Fix(hi));
                        if scale.is_log() {
                            axes.set_cb_log(Some(10.0));
                        }
                    }
                    axes.image(
                        grid.values.iter(),
                        grid.ny,
                        grid.nx,
                        Some((grid.x_range.0, grid.y_range.0, grid.x_range.1, grid.y_range.1)),
                        &[],
                    );
                }
                PanelBody::Placeholder(text) => {
                    axes.set_x_range(Fix(0.0), Fix(1.0))
                        .set_y_range(Fix(0.0), Fix(1.0))
                        .label(text, Graph(0.5), Graph(0.5), &[TextAlign(AlignCenter), TextColor("gray")])
                        // gnuplot needs at least one element per plot
                        .points([0.5], [0.5], &[PointSymbol('.'), Color("white")]);
                }
            }
        }

        save(&mut fg, path, self.size(), dpi)
    }
}

/// Rows of a facet where x, y and z are all numeric.
fn samples(table: &Table, (x, y, z): (&str, &str, &str)) -> Result<Vec<(f64, f64, f64)>> {
    let xs = table.numeric_column(x)?;
    let ys = table.numeric_column(y)?;
    let zs = table.numeric_column(z)?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .zip(zs)
        .filter_map(|((x, y), z)| Some((x?, y?, z?)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeatmapConfig;
    use approx::assert_relative_eq;

    fn schema() -> Schema {
        Schema::cache_sweep(&HeatmapConfig::default())
    }

    fn sweep(rows: &[(&str, f64, f64, f64)]) -> Table {
        let mut text = String::from("evaluation_type,cache_line_size,cache_line_number,cache_miss\n");
        for (facet, x, y, z) in rows {
            text.push_str(&format!("{facet},{x},{y},{z}\n"));
        }
        Table::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn layout_trims_to_facet_count() {
        assert_eq!(grid_layout(0, 3), (0, 0));
        assert_eq!(grid_layout(2, 3), (1, 2));
        assert_eq!(grid_layout(3, 3), (1, 3));
        assert_eq!(grid_layout(4, 3), (2, 3));
        assert_eq!(grid_layout(7, 3), (3, 3));
    }

    #[test]
    fn log_scale_uses_smallest_positive_value() {
        let scale = ColorScale::from_values([0.0, 5.0, 100.0, -2.0], true).unwrap();
        assert_eq!(scale, ColorScale::Log { min: 5.0, max: 100.0 });
    }

    #[test]
    fn log_scale_without_positive_range_falls_back() {
        let scale = ColorScale::from_values([0.0, -1.0, 3.0], true);
        assert_eq!(scale, Some(ColorScale::Linear { min: -1.0, max: 3.0 }));
        assert_eq!(ColorScale::from_values([f64::NAN], false), None);
    }

    #[test]
    fn quantize_snaps_to_band_centres() {
        let linear = ColorScale::Linear { min: 0.0, max: 10.0 };
        assert_relative_eq!(linear.quantize(0.0, 5), 1.0, epsilon = 1e-12);
        assert_relative_eq!(linear.quantize(3.9, 5), 3.0, epsilon = 1e-12);
        assert_relative_eq!(linear.quantize(10.0, 5), 9.0, epsilon = 1e-12);
        assert_eq!(linear.quantize(3.9, 0), 3.9);
        assert!(linear.quantize(f64::NAN, 5).is_nan());

        let log = ColorScale::Log { min: 1.0, max: 100.0 };
        assert_relative_eq!(log.quantize(2.0, 2), 10f64.powf(0.5), epsilon = 1e-12);
        assert!(log.quantize(0.0, 2).is_nan());
    }

    #[test]
    fn small_facets_get_a_placeholder() {
        let group = sweep(&[
            ("Sijk", 16.0, 1.0, 10.0),
            ("Sijk", 32.0, 1.0, 20.0),
            ("Tlm", 16.0, 1.0, 5.0),
            ("Tlm", 32.0, 1.0, 6.0),
            ("Tlm", 16.0, 4.0, 7.0),
            ("Tlm", 32.0, 4.0, 8.0),
        ]);
        let figure =
            HeatmapFigure::build(&group, &schema(), &PlotConfig::default(), "Dimension = A".into())
                .unwrap();
        assert_eq!((figure.rows, figure.cols), (1, 2));
        assert_eq!(figure.panels[0].facet, "Sijk");
        assert_eq!(figure.panels[0].title, "Evaluation Type = Sijk");
        assert_eq!(figure.panels[0].body, PanelBody::Placeholder(PLACEHOLDER_TEXT));
        assert!(matches!(figure.panels[1].body, PanelBody::Surface(_)));
        assert!(!figure.panels[0].colorbar);
        assert!(figure.panels[1].colorbar);
        assert_eq!(figure.scale, Some(ColorScale::Linear { min: 5.0, max: 20.0 }));
        assert_eq!(figure.colorbar_label, "Cache Miss");
        assert_eq!(figure.size(), Size::new(9.0, 3.5));
    }

    #[test]
    fn log_figures_label_the_colorbar() {
        let group = sweep(&[
            ("Sijk", 16.0, 1.0, 0.0),
            ("Sijk", 32.0, 1.0, 10.0),
            ("Sijk", 16.0, 4.0, 1000.0),
        ]);
        let plot = PlotConfig {
            log_scale: true,
            ..PlotConfig::default()
        };
        let figure =
            HeatmapFigure::build(&group, &schema(), &plot, "t".into()).unwrap();
        assert_eq!(figure.scale, Some(ColorScale::Log { min: 10.0, max: 1000.0 }));
        assert_eq!(figure.colorbar_label, "Cache Miss (Log Scale)");
    }

    #[test]
    fn only_the_last_surface_carries_the_colorbar() {
        let mut rows = Vec::new();
        for facet in ["Sijk", "Tlm", "Uv"] {
            rows.extend([
                (facet, 16.0, 1.0, 1.0),
                (facet, 32.0, 1.0, 2.0),
                (facet, 16.0, 4.0, 3.0),
                (facet, 32.0, 4.0, 4.0),
            ]);
        }
        rows.push(("Zz", 16.0, 1.0, 9.0));
        let figure =
            HeatmapFigure::build(&sweep(&rows), &schema(), &PlotConfig::default(), "t".into())
                .unwrap();
        let bars: Vec<bool> = figure.panels.iter().map(|p| p.colorbar).collect();
        assert_eq!(bars, [false, false, true, false]);
        assert_eq!((figure.rows, figure.cols), (2, 3));
    }

    #[test]
    fn schema_without_a_facet_role_cannot_build() {
        let group = sweep(&[("Sijk", 16.0, 1.0, 1.0)]);
        let schema = Schema::new()
            .required("cache_line_size", Role::X)
            .required("cache_line_number", Role::Y)
            .required("cache_miss", Role::Z);
        let err = HeatmapFigure::build(&group, &schema, &PlotConfig::default(), "t".into())
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::MissingRole(Role::Facet)));
    }

    #[test]
    fn placeholder_reads_as_two_lines() {
        assert_eq!(
            PLACEHOLDER_TEXT.lines().collect::<Vec<_>>(),
            ["Data points < 3", "Cannot interpolate"]
        );
    }
}
