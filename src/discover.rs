use anyhow::{Context, Result};
use glob::{glob, Pattern};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Category;

/// Recursively collects every `*<pattern>*.csv` under `root`.
/// A root that does not exist, or a pattern nothing matches, yields an empty list.
pub fn find_csv_files(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let glob_pattern = format!(
        "{}/**/*{}*.csv",
        Pattern::escape(&root.display().to_string()),
        Pattern::escape(pattern)
    );
    debug!(pattern = %glob_pattern, "searching");

    let mut paths = Vec::new();
    for entry in glob(&glob_pattern)
        .with_context(|| format!("invalid glob pattern {}", glob_pattern))?
    {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => warn!("skipping unreadable path: {}", e),
        }
    }
    paths.sort();
    Ok(paths)
}

/// Finds the files for every category under `root`.
#[tracing::instrument(level = "info", skip(root), fields(root = %root.display()))]
pub fn discover(root: &Path) -> Result<BTreeMap<Category, Vec<PathBuf>>> {
    let mut found = BTreeMap::new();
    for category in Category::ALL {
        let files = find_csv_files(root, category.file_pattern())?;
        info!("found {} {} files", files.len(), category);
        found.insert(category, files);
    }
    Ok(found)
}
