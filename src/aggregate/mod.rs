// src/aggregate/mod.rs
use polars::prelude::*;
use tracing::{debug, info};

use crate::config::{Category, CountFields};
use crate::error::PipelineError;
use crate::load::{DISTRICT, STATE};

pub mod join;
pub mod region;

pub use join::join_categories;
pub use region::{Region, RegionKey};

/// Grouping keys added to every aggregated frame. Normalized headers are
/// lowercase, so these never collide with a loaded column.
pub const STATE_KEY: &str = "State_Key";
pub const DISTRICT_KEY: &str = "District_Key";

/// A category grouped to one row per region.
#[derive(Debug, Clone)]
pub struct CategoryAggregate {
    pub category: Category,
    /// Columns summed into each region's total, in header order.
    pub count_columns: Vec<String>,
    /// Region keys, display `State`/`District`, one sum per count column and
    /// the category total, sorted by key.
    pub frame: DataFrame,
}

impl CategoryAggregate {
    pub fn empty(category: Category) -> Self {
        let schema = Schema::from_iter([
            (PlSmallStr::from_static(STATE_KEY), DataType::String),
            (PlSmallStr::from_static(DISTRICT_KEY), DataType::String),
            (PlSmallStr::from_static(STATE), DataType::String),
            (PlSmallStr::from_static(DISTRICT), DataType::String),
            (PlSmallStr::from_static(category.total_column()), DataType::Float64),
        ]);
        Self {
            category,
            count_columns: Vec::new(),
            frame: DataFrame::empty_with_schema(&schema),
        }
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

fn is_count_column(frame: &DataFrame, name: &str) -> bool {
    frame
        .column(name)
        .map(|c| c.dtype() == &DataType::Float64)
        .unwrap_or(false)
}

/// First present cell of `column` that does not parse as a number.
fn first_non_numeric(column: &Column) -> PolarsResult<Option<String>> {
    let parsed = column.cast(&DataType::Float64)?;
    let raw = column.str()?;
    let found = raw
        .into_iter()
        .zip(parsed.f64()?.into_iter())
        .find_map(|(raw, parsed)| match (raw, parsed) {
            (Some(raw), None) => Some(raw.to_string()),
            _ => None,
        });
    Ok(found)
}

/// Picks the columns summed into a category total.
fn resolve_count_columns(
    frame: &DataFrame,
    category: Category,
    names: &[String],
    count_fields: &CountFields,
) -> Result<Vec<String>, PipelineError> {
    match count_fields {
        CountFields::Positional => {
            let (numeric, dropped): (Vec<String>, Vec<String>) = names
                .iter()
                .filter(|name| name.as_str() != STATE && name.as_str() != DISTRICT)
                .cloned()
                .partition(|name| is_count_column(frame, name));
            if !dropped.is_empty() {
                debug!(%category, "dropping non-numeric columns {:?}", dropped);
            }
            Ok(numeric)
        }
        CountFields::Declared(fields) => fields
            .iter()
            .map(|field| -> Result<String, PipelineError> {
                let column = frame
                    .column(field)
                    .map_err(|_| PipelineError::UnknownCountField {
                        category: category.to_string(),
                        field: field.clone(),
                    })?;
                if column.dtype() == &DataType::Float64 {
                    return Ok(field.clone());
                }
                Err(PipelineError::NonNumericCountField {
                    category: category.to_string(),
                    field: field.clone(),
                    value: first_non_numeric(column)?.unwrap_or_default(),
                })
            })
            .collect(),
    }
}

/// Adds the grouping keys and rewrites `State`/`District` with collapsed spacing.
/// Rows missing either name get null keys.
fn with_region_keys(frame: &DataFrame) -> PolarsResult<DataFrame> {
    let states = frame.column(STATE)?.str()?;
    let districts = frame.column(DISTRICT)?.str()?;

    let n = frame.height();
    let mut state_names = Vec::with_capacity(n);
    let mut district_names = Vec::with_capacity(n);
    let mut state_keys = Vec::with_capacity(n);
    let mut district_keys = Vec::with_capacity(n);
    for pair in states.into_iter().zip(districts.into_iter()) {
        let region = match pair {
            (Some(state), Some(district)) => Some(Region::new(state, district)),
            _ => None,
        };
        let key = region.as_ref().map(Region::key);
        state_keys.push(key.as_ref().map(|k| k.0.clone()));
        district_keys.push(key.map(|k| k.1));
        state_names.push(region.as_ref().map(|r| r.state.clone()));
        district_names.push(region.map(|r| r.district));
    }

    let mut keyed = frame.clone();
    keyed.replace(STATE, Series::new(STATE.into(), state_names))?;
    keyed.replace(DISTRICT, Series::new(DISTRICT.into(), district_names))?;
    keyed.with_column(Series::new(STATE_KEY.into(), state_keys))?;
    keyed.with_column(Series::new(DISTRICT_KEY.into(), district_keys))?;
    Ok(keyed)
}

/// Groups `frame` by region and sums its count columns.
///
/// Rows missing either key are left out of every group. A frame with no
/// columns at all (nothing was loaded) aggregates to no regions.
#[tracing::instrument(level = "info", skip(frame, count_fields), fields(rows = frame.height()))]
pub fn aggregate(
    category: Category,
    frame: &DataFrame,
    count_fields: &CountFields,
) -> Result<CategoryAggregate, PipelineError> {
    if frame.width() == 0 {
        return Ok(CategoryAggregate::empty(category));
    }

    let names: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    for column in [STATE, DISTRICT] {
        if !names.iter().any(|n| n == column) {
            return Err(PipelineError::MissingKeyColumn {
                category: category.to_string(),
                column,
                found: names.clone(),
            });
        }
    }
    let count_columns = resolve_count_columns(frame, category, &names, count_fields)?;

    let keyed = with_region_keys(frame)?;
    let keyless = keyed.column(STATE_KEY)?.null_count();
    if keyless > 0 {
        debug!(%category, "{} rows without a region key", keyless);
    }

    let mut sums = vec![col(STATE).first(), col(DISTRICT).first()];
    sums.extend(count_columns.iter().map(|c| col(c.as_str()).sum()));
    let total = count_columns
        .iter()
        .map(|c| col(c.as_str()))
        .reduce(|acc, next| acc + next)
        .unwrap_or_else(|| lit(0.0));

    let grouped = keyed
        .lazy()
        .filter(col(STATE_KEY).is_not_null())
        .group_by_stable([col(STATE_KEY), col(DISTRICT_KEY)])
        .agg(sums)
        .with_column(total.alias(category.total_column()))
        .sort([STATE_KEY, DISTRICT_KEY], Default::default())
        .collect()?;
    info!(%category, regions = grouped.height(), "count columns {:?}", count_columns);

    Ok(CategoryAggregate {
        category,
        count_columns,
        frame: grouped,
    })
}
