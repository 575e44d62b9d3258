use std::path::Path;

use gnuplot::{
    AutoOption::Auto,
    Axes2D, AxesCommon, Figure,
    LabelOption::TextColor,
    PlotOption::{Axes, Caption, Color, FillAlpha, PointSymbol},
    TickOption::Mirror,
    XAxis::X1,
    YAxis::{self, Y1, Y2},
};

use super::{save, Size};
use crate::{error::Result, table::Table};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Style {
    /// Connected line with a marker on every point
    LinePoints { symbol: char },
    Bars { alpha: f64 },
}

/// One (x, y) series; points keep table order.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub color: &'static str,
    pub style: Style,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    /// Pairs two numeric columns row by row. Rows where either side is
    /// missing are not drawn.
    pub fn from_columns(
        table: &Table,
        x: &str,
        y: &str,
        label: &str,
        color: &'static str,
        style: Style,
    ) -> Result<Self> {
        let xs = table.numeric_column(x)?;
        let ys = table.numeric_column(y)?;
        let points = xs
            .into_iter()
            .zip(ys)
            .filter_map(|pair| match pair {
                (Some(x), Some(y)) => Some((x, y)),
                _ => None,
            })
            .collect();
        Ok(Self {
            label: label.to_string(),
            color,
            style,
            points,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueAxis {
    pub label: String,
    /// Tints the axis label to match its series
    pub color: Option<&'static str>,
    pub series: Vec<Series>,
}

/// Series on a shared x axis, optionally split over a secondary y axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPlot {
    pub title: String,
    pub x_label: String,
    pub primary: ValueAxis,
    pub secondary: Option<ValueAxis>,
    pub size: Size,
}

impl SeriesPlot {
    pub fn draw(&self, path: &Path, dpi: u32) -> Result<()> {
        let mut fg = Figure::new();
        let axes = fg.axes2d();
        axes.set_title(&self.title, &[])
            .set_x_label(&self.x_label, &[])
            .set_x_grid(true)
            .set_y_grid(true);
        match self.primary.color {
            Some(color) => axes.set_y_label(&self.primary.label, &[TextColor(color)]),
            None => axes.set_y_label(&self.primary.label, &[]),
        };
        for series in &self.primary.series {
            plot(axes, series, Y1);
        }

        if let Some(secondary) = &self.secondary {
            axes.set_y_ticks(Some((Auto, 0)), &[Mirror(false)], &[])
                .set_y2_ticks(Some((Auto, 0)), &[Mirror(false)], &[]);
            match secondary.color {
                Some(color) => axes.set_y2_label(&secondary.label, &[TextColor(color)]),
                None => axes.set_y2_label(&secondary.label, &[]),
            };
            for series in &secondary.series {
                plot(axes, series, Y2);
            }
        }

        save(&mut fg, path, self.size, dpi)
    }
}

fn plot(axes: &mut Axes2D, series: &Series, y_axis: YAxis) {
    let xs = series.points.iter().map(|(x, _)| *x);
    let ys = series.points.iter().map(|(_, y)| *y);
    match series.style {
        Style::LinePoints { symbol } => {
            axes.lines_points(
                xs,
                ys,
                &[
                    Caption(series.label.as_str()),
                    Color(series.color),
                    PointSymbol(symbol),
                    Axes(X1, y_axis),
                ],
            );
        }
        Style::Bars { alpha } => {
            axes.boxes(
                xs,
                ys,
                &[
                    Caption(series.label.as_str()),
                    Color(series.color),
                    FillAlpha(alpha),
                    Axes(X1, y_axis),
                ],
            );
        }
    }
}
