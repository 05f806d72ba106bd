use polars::prelude::*;
use std::cmp::Ordering;
use tracing::info;

use crate::aggregate::{Region, DISTRICT_KEY, STATE_KEY};
use crate::config::Category;
use crate::error::PipelineError;
use crate::load::{DISTRICT, STATE};

pub const TOTAL_UPDATES: &str = "Total_Updates";
pub const UPDATE_INTENSITY: &str = "Update_Intensity";
pub const Z_SCORE: &str = "Z_Score";

/// One scored region of the master table.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterRow {
    pub region: Region,
    pub total_enrolment: f64,
    pub total_demo_updates: f64,
    pub total_bio_updates: f64,
    pub total_updates: f64,
    /// Updates per thousand enrolments.
    pub update_intensity: f64,
    /// Set by [`score`]; zero until then.
    pub z_score: f64,
}

/// Adds `Total_Updates` and `Update_Intensity` to the joined totals, dropping
/// regions with `Total_Enrolment <= 0`.
pub fn derive_master(joined: DataFrame) -> PolarsResult<DataFrame> {
    let before = joined.height();
    let enrolment = Category::Enrolment.total_column();
    let master = joined
        .lazy()
        .with_column(
            (col(Category::Demographic.total_column()) + col(Category::Biometric.total_column()))
                .alias(TOTAL_UPDATES),
        )
        .filter(col(enrolment).gt(lit(0.0)))
        .with_column((col(TOTAL_UPDATES) / col(enrolment) * lit(1000.0)).alias(UPDATE_INTENSITY))
        .sort([STATE_KEY, DISTRICT_KEY], Default::default())
        .collect()?;
    info!(
        kept = master.height(),
        dropped = before - master.height(),
        "filtered regions without enrolment"
    );
    Ok(master)
}

/// Spread of update intensity over the scored population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
}

impl IntensityStats {
    /// Intensity `sigma` standard deviations above the mean.
    pub fn threshold(&self, sigma: f64) -> f64 {
        self.mean + sigma * self.std
    }
}

/// Mean and sample standard deviation of `Update_Intensity`.
pub fn intensity_stats(master: &DataFrame) -> Result<IntensityStats, PipelineError> {
    let count = master.height();
    let summary = master
        .clone()
        .lazy()
        .select([
            col(UPDATE_INTENSITY).mean().alias("mean"),
            col(UPDATE_INTENSITY).std(1).alias("std"),
        ])
        .collect()?;
    let mean = summary.column("mean")?.f64()?.get(0);
    let std = summary.column("std")?.f64()?.get(0);
    match (mean, std) {
        (Some(mean), Some(std)) if std > 0.0 && std.is_finite() => {
            info!(regions = count, mean, std, "scored update intensity");
            Ok(IntensityStats { count, mean, std })
        }
        (_, std) => Err(PipelineError::DegenerateSpread {
            count,
            std: std.unwrap_or(f64::NAN),
        }),
    }
}

/// Adds `Z_Score` to the master table and converts it into typed rows.
pub fn score(master: DataFrame, stats: &IntensityStats) -> PolarsResult<Vec<MasterRow>> {
    let scored = master
        .lazy()
        .with_column(
            ((col(UPDATE_INTENSITY) - lit(stats.mean)) / lit(stats.std)).alias(Z_SCORE),
        )
        .collect()?;
    master_rows(&scored)
}

fn floats<'a>(frame: &'a DataFrame, name: &str) -> PolarsResult<&'a Float64Chunked> {
    frame.column(name)?.f64()
}

/// Typed rows of a master table; `z_score` stays zero when the table is unscored.
pub fn master_rows(master: &DataFrame) -> PolarsResult<Vec<MasterRow>> {
    let states = master.column(STATE)?.str()?;
    let districts = master.column(DISTRICT)?.str()?;
    let enrolment = floats(master, Category::Enrolment.total_column())?;
    let demo = floats(master, Category::Demographic.total_column())?;
    let bio = floats(master, Category::Biometric.total_column())?;
    let updates = floats(master, TOTAL_UPDATES)?;
    let intensity = floats(master, UPDATE_INTENSITY)?;
    let z = match master.column(Z_SCORE) {
        Ok(column) => Some(column.f64()?),
        Err(_) => None,
    };

    Ok((0..master.height())
        .map(|i| MasterRow {
            region: Region::new(
                states.get(i).unwrap_or_default(),
                districts.get(i).unwrap_or_default(),
            ),
            total_enrolment: enrolment.get(i).unwrap_or(0.0),
            total_demo_updates: demo.get(i).unwrap_or(0.0),
            total_bio_updates: bio.get(i).unwrap_or(0.0),
            total_updates: updates.get(i).unwrap_or(0.0),
            update_intensity: intensity.get(i).unwrap_or(0.0),
            z_score: z.and_then(|z| z.get(i)).unwrap_or(0.0),
        })
        .collect())
}

/// The `n` highest z-scores, descending.
pub fn top_anomalies(rows: &[MasterRow], n: usize) -> Vec<&MasterRow> {
    let mut ranked: Vec<&MasterRow> = rows.iter().collect();
    ranked.sort_by(|a, b| b.z_score.partial_cmp(&a.z_score).unwrap_or(Ordering::Equal));
    ranked.truncate(n);
    ranked
}
