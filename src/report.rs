use anyhow::Result;
use prettytable::{format, Cell, Row, Table};
use serde::Serialize;

use crate::metrics::{IntensityStats, MasterRow};

/// A row of the anomaly report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "District")]
    pub district: String,
    #[serde(rename = "Update_Intensity")]
    pub update_intensity: f64,
    #[serde(rename = "Z_Score")]
    pub z_score: f64,
}

impl From<&MasterRow> for Anomaly {
    fn from(row: &MasterRow) -> Self {
        Self {
            state: row.region.state.clone(),
            district: row.region.district.clone(),
            update_intensity: row.update_intensity,
            z_score: row.z_score,
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    regions: usize,
    mean_intensity: f64,
    std_intensity: f64,
    anomalies: &'a [Anomaly],
}

pub fn render_table(anomalies: &[Anomaly]) -> String {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(Row::new(vec![
        Cell::new("State").style_spec("bFg"),
        Cell::new("District").style_spec("bFg"),
        Cell::new("Update_Intensity").style_spec("bFg"),
        Cell::new("Z_Score").style_spec("bFg"),
    ]));
    for a in anomalies {
        table.add_row(Row::new(vec![
            Cell::new(&a.state),
            Cell::new(&a.district),
            Cell::new(&format!("{:.6}", a.update_intensity)).style_spec("r"),
            Cell::new(&format!("{:.6}", a.z_score)).style_spec("r"),
        ]));
    }
    table.to_string()
}

pub fn render_json(anomalies: &[Anomaly], stats: &IntensityStats) -> Result<String> {
    let report = JsonReport {
        regions: stats.count,
        mean_intensity: stats.mean,
        std_intensity: stats.std,
        anomalies,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Anomaly> {
        vec![Anomaly {
            state: "Bihar".into(),
            district: "Patna".into(),
            update_intensity: 1234.5,
            z_score: 4.25,
        }]
    }

    #[test]
    fn table_lists_every_anomaly() {
        let out = render_table(&sample());
        assert!(out.contains("Update_Intensity"));
        assert!(out.contains("Patna"));
        assert!(out.contains("4.250000"));
    }

    #[test]
    fn json_uses_report_column_names() -> Result<()> {
        let stats = IntensityStats {
            count: 12,
            mean: 800.0,
            std: 100.0,
        };
        let out = render_json(&sample(), &stats)?;
        let value: serde_json::Value = serde_json::from_str(&out)?;
        assert_eq!(value["regions"], 12);
        assert_eq!(value["anomalies"][0]["District"], "Patna");
        assert_eq!(value["anomalies"][0]["Z_Score"], 4.25);
        Ok(())
    }
}
