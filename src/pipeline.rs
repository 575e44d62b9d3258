//! Aggregation and grouping stages shared by the commands.

use tracing::{debug, info, warn};

use crate::{
    discovery::FacetFile,
    error::{Error, Result},
    schema::{Role, Schema},
    table::{Table, Value},
};

/// One partition of the aggregated table.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: Value,
    pub table: Table,
}

/// Loads every facet file, validates it and concatenates the survivors,
/// tagging each row with its facet label. Files that fail to load or miss
/// required columns are logged and skipped.
pub fn aggregate(files: &[FacetFile], schema: &Schema) -> Table {
    let facet_column = schema.name_of(Role::Facet);
    let mut tables = Vec::with_capacity(files.len());

    for file in files {
        let name = file.path.display().to_string();
        let loaded = Table::from_path(&file.path).and_then(|t| {
            schema.validate(&t, &name)?;
            Ok(t)
        });
        match loaded {
            Ok(table) => {
                debug!("Loaded {} rows from {}", table.len(), name);
                let table = match facet_column {
                    Some(col) => table.with_constant_column(col, Value::Text(file.facet.clone())),
                    None => table,
                };
                tables.push(table);
            }
            Err(e) => warn!("Skipping {}: {}", name, e),
        }
    }

    let merged = Table::concat(tables);
    info!("Aggregated {} rows from {} files", merged.len(), files.len());
    merged
}

/// Splits the table by the distinct values of `column`, in ascending
/// [`Value::total_cmp`] order. Row order inside a group is kept and rows with
/// a missing value form their own group.
pub fn group_by(table: &Table, column: &str) -> Result<Vec<Group>> {
    let keys = table.column(column).ok_or_else(|| Error::MissingColumns {
        input: "aggregated table".to_string(),
        columns: vec![column.to_string()],
    })?;

    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].total_cmp(keys[b]));

    let mut groups = Vec::new();
    let mut start = 0;
    while start < order.len() {
        let key = keys[order[start]];
        let end = order[start..]
            .iter()
            .position(|&i| keys[i].total_cmp(key).is_ne())
            .map_or(order.len(), |offset| start + offset);
        groups.push(Group {
            key: key.clone(),
            table: table.subset(&order[start..end]),
        });
        start = end;
    }
    Ok(groups)
}
