use std::{fs, path::Path};

use tracing::{error, info};

use crate::{
    config::{Config, MergeArgs},
    draw::{Series, SeriesPlot, Size, Style, ValueAxis},
    error::{Error, Result},
    schema::*,
    table::{Table, Value},
};

pub const SUMMARY_FILE: &str = "project_3_analysis.csv";

const SIZE: Size = Size::new(10.0, 6.0);
const K_LABEL: &str = "k (loser tree leaves)";

pub fn load(path: &Path) -> Result<Table> {
    let schema = Schema::merge_sweep();
    let mut table = Table::from_path(path)?;
    schema.validate(&table, &path.display().to_string())?;
    if let Some(key) = schema.name_of(Role::Key) {
        table.sort_by_column(key)?;
    }
    Ok(table)
}

/// The three sweep figures, keyed by output file name.
pub fn figures(table: &Table) -> Result<Vec<(&'static str, SeriesPlot)>> {
    let line = |y: &str, label: &str, color: &'static str, symbol: char| {
        Series::from_columns(table, K, y, label, color, Style::LinePoints { symbol })
    };
    let bars = |y: &str, label: &str, color: &'static str, alpha: f64| {
        Series::from_columns(table, K, y, label, color, Style::Bars { alpha })
    };

    let run_lengths = SeriesPlot {
        title: "Run length statistics by k".to_string(),
        x_label: K_LABEL.to_string(),
        primary: ValueAxis {
            label: "Run length".to_string(),
            color: None,
            series: vec![
                line(MIN_RUN_LENGTH, "Shortest run", "#440154", 'O')?,
                line(AVG_RUN_LENGTH, "Average run", "#21918c", 'O')?,
                line(MAX_RUN_LENGTH, "Longest run", "#5ec962", 'O')?,
            ],
        },
        secondary: None,
        size: SIZE,
    };

    let performance = SeriesPlot {
        title: "Sort time and run count by k".to_string(),
        x_label: K_LABEL.to_string(),
        primary: ValueAxis {
            label: "Sort time / ms".to_string(),
            color: Some("#1f77b4"),
            series: vec![line(TOTAL_TIME_MS, "Time (ms)", "#1f77b4", 'S')?],
        },
        secondary: Some(ValueAxis {
            label: "Run count".to_string(),
            color: Some("#2ca02c"),
            series: vec![bars(RUN_COUNT, "Run count", "#2ca02c", 0.35)?],
        }),
        size: SIZE,
    };

    let tree = SeriesPlot {
        title: "Huffman merge tree metrics".to_string(),
        x_label: K_LABEL.to_string(),
        primary: ValueAxis {
            label: "Max tree depth".to_string(),
            color: None,
            series: vec![bars(MAX_TREE_DEPTH, "Max tree depth", "#1f77b4", 0.6)?],
        },
        secondary: Some(ValueAxis {
            label: "Weighted path length".to_string(),
            color: None,
            series: vec![line(
                WEIGHTED_PATH_LENGTH,
                "Weighted path length",
                "#d62728",
                'T',
            )?],
        }),
        size: SIZE,
    };

    Ok(vec![
        ("run_length_stats.png", run_lengths),
        ("performance.png", performance),
        ("merge_tree_metrics.png", tree),
    ])
}

/// Input columns plus `numbers_per_run` and `time_per_number_ms`.
pub fn summary(table: &Table) -> Result<Table> {
    let total_numbers = table.numeric_column(TOTAL_NUMBERS)?;
    let run_count = table.numeric_column(RUN_COUNT)?;
    let total_time = table.numeric_column(TOTAL_TIME_MS)?;

    let mut summary = table.clone();
    summary.append_column(NUMBERS_PER_RUN, ratios(&total_numbers, &run_count));
    summary.append_column(TIME_PER_NUMBER_MS, ratios(&total_time, &total_numbers));
    Ok(summary)
}

/// Element-wise division; a zero or missing divisor leaves the cell missing.
fn ratios(numerators: &[Option<f64>], divisors: &[Option<f64>]) -> Vec<Value> {
    numerators
        .iter()
        .zip(divisors)
        .map(|pair| match pair {
            (Some(n), Some(d)) if *d != 0.0 => Value::Number(n / d),
            _ => Value::Missing,
        })
        .collect()
}

pub fn run(args: &MergeArgs, config: &Config) -> Result<()> {
    let table = load(&args.csv)?;
    info!("Loaded {} rows from {}", table.len(), args.csv.display());
    render(&table, &args.output_dir, |plot, path| plot.draw(path, config.plot.dpi))
}

/// Draws each figure with `draw`, then writes the summary CSV. A figure that
/// fails does not stop the others, and the summary is written regardless.
pub fn render<F>(table: &Table, output_dir: &Path, mut draw: F) -> Result<()>
where
    F: FnMut(&SeriesPlot, &Path) -> Result<()>,
{
    fs::create_dir_all(output_dir)?;

    let plots = figures(table)?;
    let total = plots.len();
    let mut failed = 0;
    for (name, plot) in plots {
        if let Err(e) = draw(&plot, &output_dir.join(name)) {
            error!("{}", e);
            failed += 1;
        }
    }

    let summary_path = output_dir.join(SUMMARY_FILE);
    summary(table)?.write_csv_path(&summary_path)?;
    info!("Wrote summary {}", summary_path.display());

    if failed > 0 {
        return Err(Error::PartialFailure { failed, total });
    }
    Ok(())
}
