use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serfig::collectors::from_file;
use serfig::parsers::Toml;
use tracing::debug;

use crate::error::{Error, Result};
use crate::interpolate::InterpolationMethod;

#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plot elapsed time against run length from one benchmark CSV
    Line(LineArgs),
    /// Plot the per-k merge sort sweep and write the derived summary CSV
    Merge(MergeArgs),
    /// Render one faceted cache-miss heatmap per dimension
    Heatmap(HeatmapArgs),
}

#[derive(Debug, Clone, Args, Default)]
pub struct CommonArgs {
    /// Path to a TOML file overriding the rendering configuration
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

#[derive(Debug, Clone, Args)]
pub struct LineArgs {
    /// Input CSV with `run_length` and `elapsed_time_ms` columns
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Path to the output image
    #[arg(long, value_name = "FILE", default_value = "line_plot.png")]
    pub output: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Clone, Args)]
pub struct MergeArgs {
    /// Input CSV of the merge sort sweep
    #[arg(value_name = "FILE", default_value = "data/project_3/origin_data.csv")]
    pub csv: PathBuf,

    /// Directory receiving the plots and the summary CSV
    #[arg(long, value_name = "DIR", default_value = "data/project_3/plots")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Clone, Args)]
pub struct HeatmapArgs {
    /// Directory holding the `evaluation_<facet>.csv` files
    #[arg(value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory receiving one image per group
    #[arg(long, value_name = "DIR", default_value = "output")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub plot: PlotConfig,
    pub heatmap: HeatmapConfig,
}

/// Rendering parameters. Built once per run and only read afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlotConfig {
    /// Interpolation grid points along each axis
    pub grid_resolution: usize,
    pub interpolation: InterpolationMethod,
    pub color_map: ColorMap,
    /// Number of color bands a surface is quantised into; 0 keeps it smooth
    pub contour_levels: usize,
    pub subplot_cols: usize,
    pub log_scale: bool,
    pub dpi: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 50,
            interpolation: InterpolationMethod::Cubic,
            color_map: ColorMap::Viridis,
            contour_levels: 200,
            subplot_cols: 3,
            log_scale: false,
            dpi: 300,
        }
    }
}

/// Column mapping and file naming of the cache sweep inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeatmapConfig {
    pub group_column: String,
    pub x_column: String,
    pub y_column: String,
    pub z_column: String,
    /// Column the facet label extracted from the file name is stored in
    pub facet_column: String,
    pub file_prefix: String,
    pub file_suffix: String,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            group_column: "dimension".to_string(),
            x_column: "cache_line_size".to_string(),
            y_column: "cache_line_number".to_string(),
            z_column: "cache_miss".to_string(),
            facet_column: "evaluation_type".to_string(),
            file_prefix: "evaluation_".to_string(),
            file_suffix: ".csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColorMap {
    #[default]
    Viridis,
    Hot,
    Gray,
}

impl Config {
    /// Layers the optional TOML file over the built-in defaults.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder: serfig::Builder<Self> = serfig::Builder::default();

        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(Error::InputNotFound(path.to_path_buf()));
            }
            let path = path
                .to_str()
                .ok_or_else(|| Error::Config(format!("non UTF-8 path {}", path.display())))?;
            debug!("Loading configuration from {}", path);
            builder = builder.collect(from_file(Toml, path));
        }

        let config = builder.build().map_err(|e| Error::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    fn check(&self) -> Result<()> {
        if self.plot.grid_resolution < 2 {
            return Err(Error::Config("plot.grid_resolution must be at least 2".into()));
        }
        if self.plot.subplot_cols == 0 {
            return Err(Error::Config("plot.subplot_cols must be positive".into()));
        }
        if self.plot.dpi == 0 {
            return Err(Error::Config("plot.dpi must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_sweep_layout() {
        let config = Config::default();
        assert_eq!(config.plot.grid_resolution, 50);
        assert_eq!(config.plot.contour_levels, 200);
        assert_eq!(config.plot.subplot_cols, 3);
        assert!(!config.plot.log_scale);
        assert_eq!(config.heatmap.group_column, "dimension");
        assert_eq!(config.heatmap.file_prefix, "evaluation_");
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [plot]
            log_scale = true
            interpolation = "nearest"
            color_map = "hot"
            "#,
        )
        .unwrap();
        assert!(config.plot.log_scale);
        assert_eq!(config.plot.interpolation, InterpolationMethod::Nearest);
        assert_eq!(config.plot.color_map, ColorMap::Hot);
        assert_eq!(config.plot.grid_resolution, 50);
        assert_eq!(config.heatmap, HeatmapConfig::default());
    }

    #[test]
    fn rejects_zero_subplot_columns() {
        let err = Config::from_toml("[plot]\nsubplot_cols = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn printed_config_parses_back() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn load_reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[heatmap]\ngroup_column = \"policy\"").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.heatmap.group_column, "policy");
        assert_eq!(config.heatmap.x_column, "cache_line_size");
    }

    #[test]
    fn load_without_file_uses_defaults() {
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }
}
