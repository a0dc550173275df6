pub mod vlm;

pub use vlm::VlmSeasonClassifier;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// The four season sets an image can belong to.
///
/// Membership is non-exclusive: an image may appear in any number of sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [
        Season::Spring,
        Season::Summer,
        Season::Autumn,
        Season::Winter,
    ];

    /// Name of the membership table backing this season's set.
    pub fn table_name(&self) -> &'static str {
        match self {
            Season::Spring => "spring_photos",
            Season::Summer => "summer_photos",
            Season::Autumn => "autumn_photos",
            Season::Winter => "winter_photos",
        }
    }

    /// Normalize a raw model answer into a season.
    ///
    /// Trims whitespace and ignores case, so `" spring\n"` parses as
    /// `Spring`. Anything outside the four canonical labels is `None`.
    pub fn parse_label(raw: &str) -> Option<Season> {
        raw.trim().parse().ok()
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Season {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "autumn" => Ok(Season::Autumn),
            "winter" => Ok(Season::Winter),
            _ => Err(anyhow::anyhow!("Invalid season: {}", s)),
        }
    }
}

/// Trait for season classification providers.
///
/// Every failure path (missing file, decode error, inference failure,
/// unrecognized answer) is logged by the implementation and normalized to
/// `None`; callers treat `None` as "skip this item".
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SeasonClassifier: Send + Sync {
    async fn classify(&self, path: &Path) -> Option<Season>;
}
