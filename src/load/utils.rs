/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Markers that stand for an absent value in the extracts.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Clean a raw cell, mapping missing-value markers to `None`.
pub fn clean_cell(raw: &str) -> Option<String> {
    let cleaned = clean_str(raw);
    if MISSING_MARKERS.contains(&cleaned.as_str()) {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_quotes_and_markers() {
        assert_eq!(clean_str("  \" Pune \" "), "Pune");
        assert_eq!(clean_cell(" NA "), None);
        assert_eq!(clean_cell(""), None);
        assert_eq!(clean_cell("12"), Some("12".to_string()));
    }

    #[test]
    fn every_reader_missing_marker_is_absent() {
        for marker in ["n/a", "<NA>", "#N/A", "-nan", "-NaN", "1.#QNAN", "#N/A N/A"] {
            assert_eq!(clean_cell(marker), None, "{marker}");
        }
        assert_eq!(clean_cell("na"), Some("na".to_string()));
    }
}
