use std::path::Path;

use tracing::info;

use crate::{
    config::{Config, LineArgs},
    draw::{Series, SeriesPlot, Size, Style, ValueAxis},
    error::Result,
    schema::{Role, Schema, ELAPSED_TIME_MS, RUN_LENGTH},
    table::Table,
};

use super::ensure_parent;

const SIZE: Size = Size::new(12.0, 8.0);

/// Loads and validates the benchmark, sorted by run length so the line
/// connects points left to right.
pub fn load(path: &Path) -> Result<Table> {
    let schema = Schema::run_length();
    let mut table = Table::from_path(path)?;
    schema.validate(&table, &path.display().to_string())?;
    if let Some(key) = schema.name_of(Role::Key) {
        table.sort_by_column(key)?;
    }
    Ok(table)
}

pub fn figure(table: &Table) -> Result<SeriesPlot> {
    let series = Series::from_columns(
        table,
        RUN_LENGTH,
        ELAPSED_TIME_MS,
        "Elapsed Time",
        "royalblue",
        Style::LinePoints { symbol: 'O' },
    )?;
    Ok(SeriesPlot {
        title: "Run Length vs. Elapsed Time".to_string(),
        x_label: "Run Length".to_string(),
        primary: ValueAxis {
            label: "Elapsed Time (ms)".to_string(),
            color: None,
            series: vec![series],
        },
        secondary: None,
        size: SIZE,
    })
}

pub fn run(args: &LineArgs, config: &Config) -> Result<()> {
    let table = load(&args.input)?;
    info!("Loaded {} rows from {}", table.len(), args.input.display());
    let plot = figure(&table)?;
    ensure_parent(&args.output)?;
    plot.draw(&args.output, config.plot.dpi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;

    #[test]
    fn points_are_connected_in_run_length_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.csv");
        fs::write(&path, "run_length,elapsed_time_ms\n10,5.0\n5,2.0\n").unwrap();

        let plot = figure(&load(&path).unwrap()).unwrap();
        assert_eq!(plot.primary.series[0].points, vec![(5.0, 2.0), (10.0, 5.0)]);
        assert!(plot.secondary.is_none());
    }

    #[test]
    fn missing_column_stops_before_drawing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.csv");
        fs::write(&path, "run_length,time\n10,5.0\n").unwrap();

        match load(&path).unwrap_err() {
            Error::MissingColumns { columns, .. } => assert_eq!(columns, [ELAPSED_TIME_MS]),
            other => panic!("unexpected error: {other}"),
        }
    }
}
