use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::aggregate::{aggregate, join_categories, CategoryAggregate};
use crate::config::{Category, Config};
use crate::discover::discover;
use crate::figures;
use crate::load::load_category;
use crate::metrics::{
    derive_master, intensity_stats, score, top_anomalies, IntensityStats, MasterRow,
};
use crate::report::{render_json, render_table, Anomaly};

/// Everything one run produced.
#[derive(Debug)]
pub struct RunOutput {
    pub master: Vec<MasterRow>,
    pub stats: IntensityStats,
    pub anomalies: Vec<Anomaly>,
    /// Rendered anomaly report, table or JSON per the config.
    pub report: String,
    pub charts: Vec<PathBuf>,
}

/// Loads every category's files, each file normalized before stacking.
pub fn load_all(
    files: &BTreeMap<Category, Vec<PathBuf>>,
) -> Result<BTreeMap<Category, DataFrame>> {
    let mut frames = BTreeMap::new();
    for category in Category::ALL {
        let paths = files.get(&category).map(Vec::as_slice).unwrap_or(&[]);
        let frame =
            load_category(paths).with_context(|| format!("loading {} files", category))?;
        info!(%category, rows = frame.height(), columns = frame.width(), "loaded");
        frames.insert(category, frame);
    }
    if let Some(enrolment) = frames.get(&Category::Enrolment) {
        let head: Vec<&str> = enrolment
            .get_column_names()
            .into_iter()
            .take(5)
            .map(|n| n.as_str())
            .collect();
        info!("enrolment columns: {:?}", head);
    }
    Ok(frames)
}

/// Aggregates and joins the loaded categories into the unscored master table.
pub fn build_master(
    frames: &BTreeMap<Category, DataFrame>,
    config: &Config,
) -> Result<DataFrame> {
    let empty = DataFrame::empty();
    let mut aggregates: BTreeMap<Category, CategoryAggregate> = BTreeMap::new();
    for category in Category::ALL {
        let frame = frames.get(&category).unwrap_or(&empty);
        let agg = aggregate(category, frame, config.count_fields(category))?;
        aggregates.insert(category, agg);
    }

    let joined = join_categories(
        &aggregates[&Category::Enrolment],
        &aggregates[&Category::Demographic],
        &aggregates[&Category::Biometric],
    )?;
    Ok(derive_master(joined)?)
}

/// Runs the whole analysis once: discover, load, aggregate, score, report, chart.
#[tracing::instrument(level = "info", skip(config), fields(data_dir = %config.data_dir.display()))]
pub fn run(config: &Config) -> Result<RunOutput> {
    let files = discover(&config.data_dir)?;
    let frames = load_all(&files)?;

    let master = build_master(&frames, config)?;
    let stats = intensity_stats(&master)?;
    let master = score(master, &stats)?;

    let anomalies: Vec<Anomaly> = top_anomalies(&master, config.top_n)
        .into_iter()
        .map(Anomaly::from)
        .collect();
    let report = if config.json_report {
        render_json(&anomalies, &stats)?
    } else {
        render_table(&anomalies)
    };

    let intensities: Vec<f64> = master.iter().map(|r| r.update_intensity).collect();
    let anomaly_chart = figures::intensity_histogram(
        &config.anomaly_chart,
        &intensities,
        &stats,
        config.histogram_bins,
        config.threshold_sigma,
    )?;
    debug!("threshold line at {:.3}", stats.threshold(config.threshold_sigma));

    let points: Vec<(f64, f64)> = master
        .iter()
        .map(|r| (r.total_enrolment, r.total_bio_updates))
        .collect();
    let prediction_chart = figures::enrolment_vs_biometric(&config.prediction_chart, &points)?;

    info!(
        "charts saved: {}, {}",
        anomaly_chart.display(),
        prediction_chart.display()
    );

    Ok(RunOutput {
        master,
        stats,
        anomalies,
        report,
        charts: vec![anomaly_chart, prediction_chart],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CountFields;
    use crate::metrics::master_rows;
    use crate::stats::approx_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,stressmap=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn write(dir: &Path, name: &str, body: &str) -> Result<()> {
        if let Some(parent) = dir.join(name).parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dir.join(name), body)?;
        Ok(())
    }

    fn config_for(tmp: &TempDir) -> Config {
        Config {
            data_dir: tmp.path().join("data"),
            anomaly_chart: tmp.path().join("Chart1_Anomalies.png"),
            prediction_chart: tmp.path().join("Chart2_Prediction.png"),
            ..Config::default()
        }
    }

    fn master_for(config: &Config) -> Result<Vec<MasterRow>> {
        let files = discover(&config.data_dir)?;
        let frames = load_all(&files)?;
        Ok(master_rows(&build_master(&frames, config)?)?)
    }

    #[test]
    fn single_region_end_to_end_totals() -> Result<()> {
        init_test_logging();
        let tmp = tempdir()?;
        let data = tmp.path().join("data");
        write(&data, "enrol/api_enrolment_1.csv", "State,District,age0_5,age5_18\nA,X,10,5\n")?;
        write(&data, "demo/api_demographic_1.csv", "state,district,updates\nA,X,3\n")?;
        write(&data, "bio/api_biometric_1.csv", " STATE , District ,updates\nA,X,12\n")?;

        let master = master_for(&config_for(&tmp))?;
        assert_eq!(master.len(), 1);
        let row = &master[0];
        assert_eq!(row.region.state, "A");
        assert_eq!(row.region.district, "X");
        assert_eq!(row.total_enrolment, 15.0);
        assert_eq!(row.total_demo_updates, 3.0);
        assert_eq!(row.total_bio_updates, 12.0);
        assert_eq!(row.total_updates, 15.0);
        assert!(approx_eq(row.update_intensity, 1000.0));
        Ok(())
    }

    #[test]
    fn enrolment_only_region_has_zero_intensity() -> Result<()> {
        let tmp = tempdir()?;
        let data = tmp.path().join("data");
        write(&data, "enrolment.csv", "state,district,n\nA,X,10\nB,Y,20\n")?;
        write(&data, "demographic.csv", "state,district,n\nA,X,4\n")?;

        let master = master_for(&config_for(&tmp))?;
        let b = master.iter().find(|r| r.region.state == "B").unwrap();
        assert_eq!(b.total_demo_updates, 0.0);
        assert_eq!(b.total_bio_updates, 0.0);
        assert_eq!(b.update_intensity, 0.0);
        Ok(())
    }

    #[test]
    fn zero_enrolment_region_is_excluded_everywhere() -> Result<()> {
        init_test_logging();
        let tmp = tempdir()?;
        let data = tmp.path().join("data");
        write(
            &data,
            "enrolment.csv",
            "date,state,district,pincode,age_0_5\n\
             01-03-2025,A,P,,10\n\
             01-03-2025,A,Q,,20\n\
             01-03-2025,A,R,,40\n\
             01-03-2025,A,Z,,0\n",
        )?;
        write(
            &data,
            "demographic.csv",
            "state,district,demo_age_5_17\nA,P,1\nA,Q,8\nA,R,2\nA,Z,50\n",
        )?;
        write(&data, "biometric.csv", "state,district,bio_age_5_17\nA,P,3\nA,Z,9\n")?;

        let config = config_for(&tmp);
        let out = run(&config)?;
        assert_eq!(out.master.len(), 3);
        assert!(out.master.iter().all(|r| r.region.district != "Z"));
        assert_eq!(out.stats.count, 3);
        assert_eq!(out.anomalies.len(), 3);
        assert!(out.anomalies[0].z_score >= out.anomalies[1].z_score);
        for chart in &out.charts {
            assert_eq!(chart.extension().and_then(|e| e.to_str()), Some("svg"));
            assert!(chart.exists());
        }
        Ok(())
    }

    #[test]
    fn missing_update_files_are_not_errors() -> Result<()> {
        let tmp = tempdir()?;
        let data = tmp.path().join("data");
        write(&data, "enrolment.csv", "state,district,n\nA,X,10\nA,Y,30\n")?;

        let master = master_for(&config_for(&tmp))?;
        assert_eq!(master.len(), 2);
        assert!(master.iter().all(|r| r.total_updates == 0.0));
        Ok(())
    }

    #[test]
    fn declared_fields_exclude_identifier_columns() -> Result<()> {
        let tmp = tempdir()?;
        let data = tmp.path().join("data");
        write(&data, "enrolment.csv", "state,district,pincode,age_0_5\nA,X,800001,50\n")?;
        write(&data, "biometric.csv", "state,district,pincode,bio\nA,X,800001,5\n")?;

        let mut config = config_for(&tmp);
        config.enrolment_fields = CountFields::from_list("age_0_5");
        config.biometric_fields = CountFields::from_list("bio");
        let master = master_for(&config)?;
        assert_eq!(master[0].total_enrolment, 50.0);
        assert!(approx_eq(master[0].update_intensity, 100.0));
        Ok(())
    }

    #[test]
    fn missing_key_column_aborts_the_run() -> Result<()> {
        let tmp = tempdir()?;
        let data = tmp.path().join("data");
        write(&data, "enrolment.csv", "region,n\nA,10\n")?;

        let err = run(&config_for(&tmp)).unwrap_err();
        assert!(err.to_string().contains("State"));
        Ok(())
    }

    #[test]
    fn json_report_lists_top_regions() -> Result<()> {
        let tmp = tempdir()?;
        let data = tmp.path().join("data");
        let mut enrol = String::from("state,district,n\n");
        let mut demo = String::from("state,district,n\n");
        for i in 1..=7 {
            enrol.push_str(&format!("S,D{},100\n", i));
            demo.push_str(&format!("S,D{},{}\n", i, i * i));
        }
        write(&data, "enrolment.csv", &enrol)?;
        write(&data, "demographic.csv", &demo)?;

        let mut config = config_for(&tmp);
        config.json_report = true;
        let out = run(&config)?;
        let value: serde_json::Value = serde_json::from_str(&out.report)?;
        assert_eq!(value["anomalies"].as_array().map(Vec::len), Some(5));
        assert_eq!(value["anomalies"][0]["District"], "D7");
        Ok(())
    }

    #[test]
    fn header_case_differences_across_files_keep_every_region() -> Result<()> {
        init_test_logging();
        let tmp = tempdir()?;
        let data = tmp.path().join("data");
        write(&data, "a_enrolment.csv", "State,District,n\nA,X,10\nA,Y,20\n")?;
        write(&data, "b_enrolment.csv", "state,district,n\nB,Z,30\n")?;

        let master = master_for(&config_for(&tmp))?;
        assert_eq!(master.len(), 3);
        let z = master.iter().find(|r| r.region.district == "Z").unwrap();
        assert_eq!(z.region.state, "B");
        assert_eq!(z.total_enrolment, 30.0);
        Ok(())
    }

    #[test]
    fn file_order_and_header_spelling_do_not_change_totals() -> Result<()> {
        let plain = "State,District,age_0_5\nA,X,1\nB,Y,2\n";
        let shuffled = "district, STATE ,age_5_17,Age_0_5\nx,a,5,1\n";

        let mut totals = Vec::new();
        for (first, second) in [(plain, shuffled), (shuffled, plain)] {
            let tmp = tempdir()?;
            let data = tmp.path().join("data");
            write(&data, "1/part_enrolment.csv", first)?;
            write(&data, "2/part_enrolment.csv", second)?;

            let mut master = master_for(&config_for(&tmp))?;
            master.sort_by_key(|r| r.region.key());
            totals.push(
                master
                    .iter()
                    .map(|r| (r.region.key(), r.total_enrolment))
                    .collect::<Vec<_>>(),
            );
        }
        let expected = vec![
            (("a".to_string(), "x".to_string()), 7.0),
            (("b".to_string(), "y".to_string()), 2.0),
        ];
        assert_eq!(totals[0], expected);
        assert_eq!(totals[1], expected);
        Ok(())
    }
}
