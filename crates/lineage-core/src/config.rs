use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Engine configuration.
///
/// Every field has a default, so hosts usually pass a partial JSON object to
/// [`TreeViewConfig::from_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeViewConfig {
    pub endpoint: String,
    pub tree_id: String,
    pub root_id: String,
    pub period_date: Option<NaiveDate>,
    pub page_size: u32,
    pub queries: QueryDocuments,
    pub viewport: ViewportConfig,
    pub layout: LayoutConfig,
    pub surrogate: SurrogateConfig,
}

impl Default for TreeViewConfig {
    fn default() -> Self {
        Self {
            endpoint: "/graphql".to_string(),
            tree_id: String::new(),
            root_id: String::new(),
            period_date: None,
            page_size: 100,
            queries: QueryDocuments::default(),
            viewport: ViewportConfig::default(),
            layout: LayoutConfig::default(),
            surrogate: SurrogateConfig::default(),
        }
    }
}

/// GraphQL documents. The host owns the query text; the engine only supplies variables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryDocuments {
    pub root: String,
    pub children: String,
    pub node: String,
    pub bottom_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom factor per 100 units of wheel delta.
    pub wheel_step: f64,
    /// Pointer travel (screen px) after which a press is a drag, not a click.
    pub drag_threshold: f64,
    /// Fraction of a node's height used as the anchor when centring it.
    pub center_bias: f64,
    /// Vertical position (fraction of viewport height) a centred node lands on.
    pub center_target_y: f64,
    pub fallback_width: f64,
    pub fallback_height: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.2,
            max_zoom: 3.0,
            wheel_step: 1.1,
            drag_threshold: 4.0,
            center_bias: 0.25,
            center_target_y: 0.3,
            fallback_width: 1280.0,
            fallback_height: 800.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_height: f64,
    pub placeholder_width: f64,
    pub placeholder_height: f64,
    pub sibling_gap: f64,
    pub level_gap: f64,
    pub expander_size: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 180.0,
            node_height: 80.0,
            placeholder_width: 120.0,
            placeholder_height: 40.0,
            sibling_gap: 20.0,
            level_gap: 60.0,
            expander_size: 18.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurrogateConfig {
    /// Enables "Expand Up" on collapsed-chain placeholders. Off by default: the affordance is
    /// rendered but inert until hosts opt in.
    pub expand_chain_enabled: bool,
}

impl TreeViewConfig {
    /// Builds a config from a partial JSON object merged over the defaults.
    pub fn from_json(overrides: &Value) -> Result<Self> {
        if !overrides.is_object() {
            return Err(Error::InvalidConfig {
                message: "expected a JSON object".to_string(),
            });
        }
        let mut base = serde_json::to_value(Self::default())?;
        deep_merge_value(&mut base, overrides);
        let config: Self = serde_json::from_value(base)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::InvalidConfig {
                message: "pageSize must be at least 1".to_string(),
            });
        }
        let vp = &self.viewport;
        if !(vp.min_zoom > 0.0 && vp.min_zoom <= vp.max_zoom) {
            return Err(Error::InvalidConfig {
                message: format!(
                    "zoom range {}..{} is empty or non-positive",
                    vp.min_zoom, vp.max_zoom
                ),
            });
        }
        Ok(())
    }
}

/// Parses the date argument of `set_period_date`: a plain ISO date or an RFC 3339 timestamp.
pub fn parse_period_date(iso: &str) -> Result<NaiveDate> {
    let s = iso.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    Err(Error::InvalidDate {
        input: iso.to_string(),
    })
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}
