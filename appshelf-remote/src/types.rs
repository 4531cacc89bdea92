use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level response from the app details endpoint, keyed by the id as a string.
pub type AppDetailsResponse = HashMap<String, AppDetailsEntry>;

/// One id's entry in an app details response.
#[derive(Debug, Deserialize)]
pub struct AppDetailsEntry {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<AppData>,
}

/// The subset of app data appshelf reads.
///
/// `pc_requirements` is an object when present and an empty array when the
/// store has nothing, so it is kept untyped until needed.
#[derive(Debug, Deserialize)]
pub struct AppData {
    #[serde(rename = "type", default)]
    pub app_type: Option<String>,
    #[serde(default)]
    pub pc_requirements: serde_json::Value,
}

impl AppData {
    /// Raw HTML for the minimum and recommended sections.
    pub fn raw_requirements(&self) -> (String, String) {
        let field = |name: &str| {
            self.pc_requirements
                .get(name)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        (field("minimum"), field("recommended"))
    }
}

/// Cleaned requirement text, ready to render as light HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub minimum: String,
    #[serde(default)]
    pub recommended: String,
}

impl Requirements {
    pub fn is_empty(&self) -> bool {
        self.minimum.is_empty() && self.recommended.is_empty()
    }
}
