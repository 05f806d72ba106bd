// src/load/mod.rs
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use polars::prelude::*;
use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

pub mod normalize;
pub mod utils;

pub use normalize::{normalize_column_name, normalize_header, DISTRICT, STATE};

use utils::clean_cell;

/// Rows read from one source, plus how many were rejected as malformed.
#[derive(Debug)]
pub struct ReadOutcome {
    /// Every column as strings under its normalized name; `None` when the source has no header row.
    pub frame: Option<DataFrame>,
    pub skipped_rows: usize,
}

/// Reads a headed CSV stream into a frame of string columns.
/// Rows longer than the header, or that the reader cannot decode, are skipped;
/// short rows are padded with missing cells.
pub fn read_csv<R: Read>(reader: R) -> Result<ReadOutcome> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().context("reading CSV header")?.clone();
    if headers.is_empty() {
        return Ok(ReadOutcome {
            frame: None,
            skipped_rows: 0,
        });
    }

    let names = normalize_header(headers.iter());
    let width = names.len();
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); width];
    let mut skipped_rows = 0;
    for (idx, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(e).with_context(|| format!("reading record {}", idx));
            }
            Err(e) => {
                debug!(record = idx, "skipping undecodable row: {}", e);
                skipped_rows += 1;
                continue;
            }
        };
        if record.len() > width {
            debug!(
                record = idx,
                "skipping row with {} fields, expected {}",
                record.len(),
                width
            );
            skipped_rows += 1;
            continue;
        }
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(record.get(i).and_then(clean_cell));
        }
    }

    let columns: Vec<Column> = names
        .iter()
        .zip(cells)
        .map(|(name, values)| Column::from(Series::new(name.as_str().into(), values)))
        .collect();
    let frame = DataFrame::new(columns).context("building frame")?;

    Ok(ReadOutcome {
        frame: Some(frame),
        skipped_rows,
    })
}

pub fn read_csv_file(path: &Path) -> Result<ReadOutcome> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_csv(BufReader::new(file)).with_context(|| format!("reading {}", path.display()))
}

/// Casts every non-key column whose present cells all parse as numbers to `Float64`.
/// Columns with no present cells count as numeric.
pub fn infer_count_dtypes(mut frame: DataFrame) -> PolarsResult<DataFrame> {
    for name in frame.get_column_names_owned() {
        if name.as_str() == STATE || name.as_str() == DISTRICT {
            continue;
        }
        let column = frame.column(&name)?;
        let parsed = column.cast(&DataType::Float64)?;
        if parsed.null_count() != column.null_count() {
            continue;
        }
        let parsed = parsed.as_materialized_series().clone();
        frame.replace(&name, parsed)?;
    }
    Ok(frame)
}

/// Reads every file of one category and stacks them by column name;
/// columns a file lacks are null for its rows. An empty list produces an empty frame.
#[tracing::instrument(level = "info", skip(paths), fields(files = paths.len()))]
pub fn load_category(paths: &[PathBuf]) -> Result<DataFrame> {
    let mut frames = Vec::with_capacity(paths.len());
    let mut skipped = 0;
    for path in paths {
        let outcome = read_csv_file(path)?;
        let Some(frame) = outcome.frame else {
            warn!(file = %path.display(), "no header row, file ignored");
            continue;
        };
        debug!(
            file = %path.display(),
            rows = frame.height(),
            skipped = outcome.skipped_rows,
            "read"
        );
        skipped += outcome.skipped_rows;
        frames.push(frame.lazy());
    }
    if skipped > 0 {
        info!("skipped {} malformed rows", skipped);
    }
    if frames.is_empty() {
        return Ok(DataFrame::empty());
    }

    let stacked = concat(
        frames,
        UnionArgs {
            rechunk: true,
            to_supertypes: true,
            diagonal: true,
            ..Default::default()
        },
    )?
    .collect()
    .context("concatenating files")?;
    Ok(infer_count_dtypes(stacked)?)
}
