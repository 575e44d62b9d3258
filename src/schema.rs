//! Column schemas shared by validation, aggregation and drawing.

use hashbrown::HashSet;

use crate::{
    config::HeatmapConfig,
    error::{Error, Result},
    table::Table,
};

pub const RUN_LENGTH: &str = "run_length";
pub const ELAPSED_TIME_MS: &str = "elapsed_time_ms";

pub const K: &str = "k";
pub const RUN_COUNT: &str = "run_count";
pub const TOTAL_NUMBERS: &str = "total_numbers";
pub const MIN_RUN_LENGTH: &str = "min_run_length";
pub const MAX_RUN_LENGTH: &str = "max_run_length";
pub const AVG_RUN_LENGTH: &str = "avg_run_length";
pub const TOTAL_TIME_MS: &str = "total_time_ms";
pub const MAX_TREE_DEPTH: &str = "max_tree_depth";
pub const WEIGHTED_PATH_LENGTH: &str = "weighted_path_length";
pub const NUMBERS_PER_RUN: &str = "numbers_per_run";
pub const TIME_PER_NUMBER_MS: &str = "time_per_number_ms";

/// What a column is used for once the table is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Primary ordering key; rows are sorted by it before drawing lines.
    Key,
    X,
    Y,
    /// Color channel of a surface plot.
    Z,
    Group,
    Facet,
    Metric,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub role: Role,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column that must be present in every loaded table.
    pub fn required(mut self, name: &str, role: Role) -> Self {
        self.columns.push(ColumnSpec {
            name: name.to_string(),
            role,
            required: true,
        });
        self
    }

    /// Adds a column the pipeline itself attaches, such as the facet tag.
    /// Never checked against loaded tables.
    pub fn attached(mut self, name: &str, role: Role) -> Self {
        self.columns.push(ColumnSpec {
            name: name.to_string(),
            role,
            required: false,
        });
        self
    }

    /// First column with the given role.
    pub fn name_of(&self, role: Role) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.role == role)
            .map(|c| c.name.as_str())
    }

    /// Like [`Schema::name_of`], but a schema without the role is an error.
    pub fn column(&self, role: Role) -> Result<&str> {
        self.name_of(role).ok_or(Error::MissingRole(role))
    }

    /// Required columns the table lacks, in schema order.
    pub fn missing_columns(&self, table: &Table) -> Vec<String> {
        let present: HashSet<&str> = table.columns().iter().map(String::as_str).collect();
        self.columns
            .iter()
            .filter(|c| c.required && !present.contains(c.name.as_str()))
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn validate(&self, table: &Table, input: &str) -> Result<()> {
        let columns = self.missing_columns(table);
        if columns.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingColumns {
                input: input.to_string(),
                columns,
            })
        }
    }

    /// `run_length` against `elapsed_time_ms` from a single sort benchmark.
    pub fn run_length() -> Self {
        Self::new()
            .required(RUN_LENGTH, Role::Key)
            .required(ELAPSED_TIME_MS, Role::Y)
    }

    /// Per-`k` results of the external merge sort experiment.
    pub fn merge_sweep() -> Self {
        Self::new()
            .required(K, Role::Key)
            .required(RUN_COUNT, Role::Metric)
            .required(TOTAL_NUMBERS, Role::Metric)
            .required(MIN_RUN_LENGTH, Role::Metric)
            .required(MAX_RUN_LENGTH, Role::Metric)
            .required(AVG_RUN_LENGTH, Role::Metric)
            .required(TOTAL_TIME_MS, Role::Metric)
            .required(MAX_TREE_DEPTH, Role::Metric)
            .required(WEIGHTED_PATH_LENGTH, Role::Metric)
    }

    /// Cache simulation sweep; column names come from the configuration.
    pub fn cache_sweep(config: &HeatmapConfig) -> Self {
        Self::new()
            .required(&config.x_column, Role::X)
            .required(&config.y_column, Role::Y)
            .required(&config.z_column, Role::Z)
            .required(&config.group_column, Role::Group)
            .attached(&config.facet_column, Role::Facet)
    }
}
