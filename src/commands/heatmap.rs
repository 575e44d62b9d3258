use std::{
    fs,
    path::{Path, PathBuf},
};

use hashbrown::HashSet;
use tracing::{error, info, warn};

use crate::{
    config::{Config, HeatmapArgs},
    discovery::{discover, label, FacetPattern},
    draw::{title_case, HeatmapFigure},
    error::{Error, Result},
    pipeline::{aggregate, group_by},
    schema::{Role, Schema},
    table::{Table, Value},
};

/// A figure waiting to be drawn, or the reason its group cannot be.
#[derive(Debug)]
pub struct GroupPlan {
    pub key: Value,
    pub path: PathBuf,
    pub figure: Result<HeatmapFigure>,
}

/// Discovers, validates and merges the sweep files. `Ok(None)` when the
/// directory holds no matching file.
pub fn collect(data_dir: &Path, config: &Config) -> Result<Option<Table>> {
    let pattern = FacetPattern::new(&config.heatmap.file_prefix, &config.heatmap.file_suffix)?;
    let paths = match discover(data_dir, &pattern) {
        Ok(paths) => paths,
        Err(e @ Error::NoMatchingFiles { .. }) => {
            warn!("{}", e);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    info!("Found {} files, aggregating", paths.len());

    let files = label(paths, &pattern);
    let merged = aggregate(&files, &Schema::cache_sweep(&config.heatmap));
    if merged.is_empty() {
        return Err(Error::NoData(data_dir.to_path_buf()));
    }
    Ok(Some(merged))
}

/// One plan per distinct group value, in ascending order. Every plan gets
/// its own output path.
pub fn plan(table: &Table, config: &Config, output_dir: &Path) -> Result<Vec<GroupPlan>> {
    let schema = Schema::cache_sweep(&config.heatmap);
    let group_column = schema.column(Role::Group)?;
    let groups = group_by(table, group_column)?;
    info!(
        "Rendering {} figures, one per `{}` value",
        groups.len(),
        group_column
    );

    let mut taken = HashSet::with_capacity(groups.len());
    Ok(groups
        .into_iter()
        .map(|group| {
            let title = format!("{} = {}", title_case(group_column), group.key);
            let figure = HeatmapFigure::build(&group.table, &schema, &config.plot, title);
            let path = unique_path(output_path(output_dir, group_column, &group.key), &mut taken);
            GroupPlan {
                path,
                key: group.key,
                figure,
            }
        })
        .collect())
}

/// Appends `_2`, `_3`, ... to the file stem until the path is unused.
fn unique_path(path: PathBuf, taken: &mut HashSet<PathBuf>) -> PathBuf {
    if taken.insert(path.clone()) {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut n = 2;
    loop {
        let candidate = path.with_file_name(format!("{stem}_{n}.png"));
        if taken.insert(candidate.clone()) {
            warn!(
                "{} is taken by another group, writing {}",
                path.display(),
                candidate.display()
            );
            return candidate;
        }
        n += 1;
    }
}

/// `<dir>/<group_column>_<key>.png`.
pub fn output_path(output_dir: &Path, group_column: &str, key: &Value) -> PathBuf {
    let key = match key {
        Value::Missing => "missing".to_string(),
        other => other
            .to_string()
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect(),
    };
    output_dir.join(format!("{}_{}.png", group_column, key))
}

pub fn run(args: &HeatmapArgs, config: &Config) -> Result<()> {
    let Some(table) = collect(&args.data_dir, config)? else {
        return Ok(());
    };
    fs::create_dir_all(&args.output_dir)?;

    let plans = plan(&table, config, &args.output_dir)?;
    render(plans, |figure, path| figure.draw(path, config.plot.dpi))
}

/// Hands every planned figure to `draw`. A group that fails to plan or draw
/// is logged and the others still run; any failure ends in
/// [`Error::PartialFailure`].
pub fn render<F>(plans: Vec<GroupPlan>, mut draw: F) -> Result<()>
where
    F: FnMut(&HeatmapFigure, &Path) -> Result<()>,
{
    let total = plans.len();
    let mut failed = 0;
    for plan in plans {
        let drawn = plan.figure.and_then(|figure| {
            if figure.panels.is_empty() {
                warn!("No facets for {}, skipping", plan.path.display());
                return Ok(());
            }
            draw(&figure, &plan.path)
        });
        if let Err(e) = drawn {
            error!("Group {}: {}", plan.key, e);
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(Error::PartialFailure { failed, total });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_follows_group_key() {
        let dir = Path::new("out");
        assert_eq!(
            output_path(dir, "dimension", &Value::Text("A".into())),
            dir.join("dimension_A.png")
        );
        assert_eq!(
            output_path(dir, "dimension", &Value::Number(3.0)),
            dir.join("dimension_3.png")
        );
        assert_eq!(
            output_path(dir, "dimension", &Value::Missing),
            dir.join("dimension_missing.png")
        );
        assert_eq!(
            output_path(dir, "dimension", &Value::Text("a/b".into())),
            dir.join("dimension_a_b.png")
        );
    }

    #[test]
    fn colliding_group_keys_get_distinct_paths() {
        let table = Table::from_reader(
            "dimension,v\n0,1\n-0,2\nmissing,3\n,4\na/b,5\na_b,6\n".as_bytes(),
        )
        .unwrap();
        let plans = plan(&table, &Config::default(), Path::new("out")).unwrap();
        assert_eq!(plans.len(), 5);

        let paths: HashSet<&Path> = plans.iter().map(|p| p.path.as_path()).collect();
        assert_eq!(paths.len(), plans.len());
        assert!(paths.contains(Path::new("out/dimension_0.png")));
        assert!(paths.contains(Path::new("out/dimension_a_b.png")));
        assert!(paths.contains(Path::new("out/dimension_a_b_2.png")));
        assert!(paths.contains(Path::new("out/dimension_missing_2.png")));
    }
}
