use polars::prelude::*;
use tracing::info;

use super::{CategoryAggregate, DISTRICT_KEY, STATE_KEY};
use crate::config::Category;
use crate::load::{DISTRICT, STATE};

fn totals_of(agg: &CategoryAggregate) -> LazyFrame {
    agg.frame.clone().lazy().select([
        col(STATE_KEY),
        col(DISTRICT_KEY),
        col(agg.category.total_column()),
    ])
}

/// Left-joins demographic then biometric totals onto the enrolment regions.
/// Regions with no recorded updates get zero totals.
pub fn join_categories(
    enrolment: &CategoryAggregate,
    demographic: &CategoryAggregate,
    biometric: &CategoryAggregate,
) -> PolarsResult<DataFrame> {
    let keys = [col(STATE_KEY), col(DISTRICT_KEY)];
    let demo_total = Category::Demographic.total_column();
    let bio_total = Category::Biometric.total_column();

    let joined = enrolment
        .frame
        .clone()
        .lazy()
        .select([
            col(STATE_KEY),
            col(DISTRICT_KEY),
            col(STATE),
            col(DISTRICT),
            col(Category::Enrolment.total_column()),
        ])
        .join(
            totals_of(demographic),
            keys.clone(),
            keys.clone(),
            JoinArgs::new(JoinType::Left),
        )
        .join(
            totals_of(biometric),
            keys.clone(),
            keys,
            JoinArgs::new(JoinType::Left),
        )
        .with_columns([col(demo_total).fill_null(0.0), col(bio_total).fill_null(0.0)])
        .collect()?;

    info!(regions = joined.height(), "joined category totals");
    Ok(joined)
}
