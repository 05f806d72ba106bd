//! Run configuration and the category definitions shared by every stage.

use std::fmt;
use std::path::PathBuf;

/// The three extract families found under the data root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Enrolment,
    Demographic,
    Biometric,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Enrolment,
        Category::Demographic,
        Category::Biometric,
    ];

    /// Case-sensitive substring a file name must contain to belong to this category.
    pub fn file_pattern(self) -> &'static str {
        match self {
            Category::Enrolment => "enrolment",
            Category::Demographic => "demographic",
            Category::Biometric => "biometric",
        }
    }

    /// Name of the summed column this category contributes to the master table.
    pub fn total_column(self) -> &'static str {
        match self {
            Category::Enrolment => "Total_Enrolment",
            Category::Demographic => "Total_Demo_Updates",
            Category::Biometric => "Total_Bio_Updates",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Enrolment => "Enrolment",
            Category::Demographic => "Demographic",
            Category::Biometric => "Biometric",
        };
        f.write_str(name)
    }
}

/// Which columns of an aggregated category make up its total.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CountFields {
    /// Every numeric column after the two region keys.
    #[default]
    Positional,
    /// Exactly these (normalized) column names, checked against the header.
    Declared(Vec<String>),
}

impl CountFields {
    /// Builds a declared list from a comma-separated flag value, normalizing each name
    /// the same way column headers are normalized.
    pub fn from_list(raw: &str) -> Self {
        let fields: Vec<String> = raw
            .split(',')
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.is_empty() {
            CountFields::Positional
        } else {
            CountFields::Declared(fields)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the directory tree searched for extracts.
    pub data_dir: PathBuf,
    /// Histogram of update intensity.
    pub anomaly_chart: PathBuf,
    /// Enrolment vs biometric-update scatter.
    pub prediction_chart: PathBuf,
    /// Number of regions listed in the anomaly report.
    pub top_n: usize,
    pub histogram_bins: usize,
    /// Reference line position, in standard deviations above the mean.
    pub threshold_sigma: f64,
    pub enrolment_fields: CountFields,
    pub demographic_fields: CountFields,
    pub biometric_fields: CountFields,
    /// Emit the anomaly report as JSON rather than a table.
    pub json_report: bool,
}

impl Config {
    pub fn count_fields(&self, category: Category) -> &CountFields {
        match category {
            Category::Enrolment => &self.enrolment_fields,
            Category::Demographic => &self.demographic_fields,
            Category::Biometric => &self.biometric_fields,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            anomaly_chart: PathBuf::from("Chart1_Anomalies.svg"),
            prediction_chart: PathBuf::from("Chart2_Prediction.svg"),
            top_n: 5,
            histogram_bins: 50,
            threshold_sigma: 3.0,
            enrolment_fields: CountFields::Positional,
            demographic_fields: CountFields::Positional,
            biometric_fields: CountFields::Positional,
            json_report: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_list_falls_back_to_positional() {
        assert_eq!(CountFields::from_list(""), CountFields::Positional);
        assert_eq!(CountFields::from_list(" , "), CountFields::Positional);
    }

    #[test]
    fn declared_fields_are_normalized() {
        assert_eq!(
            CountFields::from_list(" Age_0_5 ,AGE_5_17"),
            CountFields::Declared(vec!["age_0_5".into(), "age_5_17".into()])
        );
    }
}
