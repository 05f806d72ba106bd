use std::collections::HashMap;

use super::utils::clean_str;

/// Canonical key column names used by every join.
pub const STATE: &str = "State";
pub const DISTRICT: &str = "District";

/// Trim, lowercase, then map `state`/`district` to their canonical spelling.
pub fn normalize_column_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    match lowered.as_str() {
        "state" => STATE.to_string(),
        "district" => DISTRICT.to_string(),
        _ => lowered,
    }
}

/// Normalizes one file's header. Names that collide after normalization get a
/// `.N` suffix so every column stays addressable. Applying it twice is a no-op.
pub fn normalize_header<'a, I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .map(|name| {
            let name = normalize_column_name(&clean_str(name));
            let n = seen.entry(name.clone()).or_insert(0);
            let unique = if *n == 0 {
                name
            } else {
                format!("{}.{}", name, n)
            };
            *n += 1;
            unique
        })
        .collect()
}
