use std::fmt;

/// Grouping key of a region: whitespace-collapsed, lowercased state and district.
pub type RegionKey = (String, String);

/// An administrative area, as first spelled in the extracts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region {
    pub state: String,
    pub district: String,
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Region {
    pub fn new(state: &str, district: &str) -> Self {
        Self {
            state: collapse_whitespace(state),
            district: collapse_whitespace(district),
        }
    }

    /// Regions whose names differ only in case or spacing share a key.
    pub fn key(&self) -> RegionKey {
        (self.state.to_lowercase(), self.district.to_lowercase())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.state, self.district)
    }
}
