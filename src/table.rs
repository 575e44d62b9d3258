//! In-memory observation tables loaded from experiment CSV files.
//!
//! A [`Table`] keeps its header order and stores every cell as a [`Value`],
//! so tables with different column sets can be concatenated and written back
//! without losing anything.

use std::{
    cmp::Ordering,
    fmt,
    fs::File,
    io::{self, BufReader},
    path::Path,
};

use csv::{ReaderBuilder, WriterBuilder};
use hashbrown::{HashMap, HashSet};

use crate::error::{Error, Result};

/// Tokens that load as [`Value::Missing`] in addition to the empty field.
const MISSING_TOKENS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL"];

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    pub fn parse(field: &str) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() || MISSING_TOKENS.contains(&trimmed) {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_nan() => Value::Missing,
            // `-0` and `0` must land in the same group
            Ok(n) if n == 0.0 => Value::Number(0.0),
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(field.to_string()),
        }
    }

    /// Total order used for sorting and grouping: numbers ascending, then
    /// text, then missing cells.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Number(_) => 0,
            Value::Text(_) => 1,
            Value::Missing => 2,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
            Value::Missing => Ok(()),
        }
    }
}

/// Shortest round-trip rendering; integral values are written without a
/// fractional part so `8` stays `8` after a load/write cycle.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn first_repeat(names: &[String]) -> Option<String> {
    let mut seen = HashSet::with_capacity(names.len());
    names.iter().find(|n| !seen.insert(n.as_str())).cloned()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InputNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        if let Some(dup) = first_repeat(&columns) {
            return Err(Error::DuplicateColumn(dup));
        }
        let mut table = Table::new(columns);
        for result in rdr.records() {
            let record = result?;
            table.rows.push(record.iter().map(Value::parse).collect());
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Cells of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Numeric view of a column: missing cells become `None`, text is an error.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self.column_index(name).ok_or_else(|| Error::MissingColumns {
            input: "table".to_string(),
            columns: vec![name.to_string()],
        })?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, cells)| match &cells[idx] {
                Value::Number(n) => Ok(Some(*n)),
                Value::Missing => Ok(None),
                Value::Text(s) => Err(Error::NotNumeric {
                    column: name.to_string(),
                    row,
                    value: s.clone(),
                }),
            })
            .collect()
    }

    /// Tags every row with the same value under a new (or replaced) column.
    pub fn with_constant_column(mut self, name: &str, value: Value) -> Self {
        match self.column_index(name) {
            Some(idx) => self.rows.iter_mut().for_each(|r| r[idx] = value.clone()),
            None => {
                self.columns.push(name.to_string());
                self.rows.iter_mut().for_each(|r| r.push(value.clone()));
            }
        }
        self
    }

    pub fn append_column(&mut self, name: &str, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Row-wise concatenation. Columns keep their first-seen order and cells
    /// of columns an input lacks are filled with [`Value::Missing`].
    pub fn concat<I: IntoIterator<Item = Table>>(tables: I) -> Table {
        let tables: Vec<Table> = tables.into_iter().collect();
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for table in &tables {
            for name in &table.columns {
                if !index.contains_key(name) {
                    index.insert(name.clone(), columns.len());
                    columns.push(name.clone());
                }
            }
        }

        let mut merged = Table::new(columns);
        for table in tables {
            let targets: Vec<usize> = table.columns.iter().map(|c| index[c]).collect();
            for row in table.rows {
                let mut out = vec![Value::Missing; merged.columns.len()];
                for (cell, &target) in row.into_iter().zip(&targets) {
                    out[target] = cell;
                }
                merged.rows.push(out);
            }
        }
        merged
    }

    /// Stable sort by one column using [`Value::total_cmp`].
    pub fn sort_by_column(&mut self, name: &str) -> Result<()> {
        let idx = self.column_index(name).ok_or_else(|| Error::MissingColumns {
            input: "table".to_string(),
            columns: vec![name.to_string()],
        })?;
        self.rows.sort_by(|a, b| a[idx].total_cmp(&b[idx]));
        Ok(())
    }

    pub fn subset(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(Value::to_string))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_csv(io::BufWriter::new(file))
    }
}
