use std::collections::BTreeMap;

use catalog::CatalogProvider;
use foundation::EntryId;
use interaction::InteractionState;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    Malformed(String),
    InvalidList(String),
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptError::Malformed(msg) => write!(f, "script is malformed: {msg}"),
            ScriptError::InvalidList(msg) => write!(f, "script list is invalid: {msg}"),
        }
    }
}

impl std::error::Error for ScriptError {}

/// Layout of the simulated list: a viewport and per-entry card heights.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ListLayout {
    pub client_height: f64,
    pub item_height: f64,
    /// Per-entry overrides of `item_height`.
    pub heights: BTreeMap<String, f64>,
}

impl Default for ListLayout {
    fn default() -> Self {
        Self {
            client_height: 600.0,
            item_height: 400.0,
            heights: BTreeMap::new(),
        }
    }
}

impl ListLayout {
    pub fn height_of(&self, id: &str) -> f64 {
        self.heights.get(id).copied().unwrap_or(self.item_height)
    }

    /// Cards the timeline shows for `state`: entries passing the active
    /// filters, in catalog order.
    pub fn items(
        &self,
        catalog: &dyn CatalogProvider,
        state: &InteractionState,
    ) -> Vec<(EntryId, f64)> {
        catalog
            .filtered(&state.active_filters, state.active_country.as_deref())
            .into_iter()
            .map(|e| (e.entry_id(), self.height_of(&e.id)))
            .collect()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Via {
    #[default]
    Card,
    Marker,
    Tooltip,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Timeline,
    Globe,
}

/// One user gesture (or pause) in a replay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Select {
        id: String,
        #[serde(default)]
        via: Via,
    },
    ScrollTo {
        px: f64,
    },
    WaitMs {
        ms: u64,
    },
    Hover {
        id: Option<String>,
    },
    Explore,
    Narrative,
    View {
        view: View,
    },
    ToggleFilter {
        tag: String,
    },
    Country {
        country: Option<String>,
    },
    ClearFilters,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Script {
    pub list: ListLayout,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json_str(json: &str) -> Result<Self, ScriptError> {
        let script: Script =
            serde_json::from_str(json).map_err(|e| ScriptError::Malformed(e.to_string()))?;
        script.validate()?;
        Ok(script)
    }

    fn validate(&self) -> Result<(), ScriptError> {
        let list = &self.list;
        if list.client_height.is_nan() || list.client_height <= 0.0 {
            return Err(ScriptError::InvalidList(format!(
                "client_height must be positive, got {}",
                list.client_height
            )));
        }
        let heights = std::iter::once(("item_height", list.item_height))
            .chain(list.heights.iter().map(|(id, h)| (id.as_str(), *h)));
        for (name, height) in heights {
            if height.is_nan() || height < 0.0 {
                return Err(ScriptError::InvalidList(format!(
                    "height of {name} must not be negative, got {height}"
                )));
            }
        }
        Ok(())
    }
}
