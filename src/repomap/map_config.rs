//! Mapping engine configuration and the config merger
//!
//! Callers may tune the mapping engine with a flat string-keyed mapping. Four
//! keys are recognized and type-checked; anything else is carried through to
//! the engine verbatim.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{PipelineError, PipelineResult};

pub const MAP_TOKENS_KEY: &str = "map_tokens";
pub const MAX_CONTEXT_WINDOW_KEY: &str = "max_context_window";
pub const MAP_MUL_NO_FILES_KEY: &str = "map_mul_no_files";
pub const REFRESH_KEY: &str = "refresh";

/// Defaults applied under every request's overrides
///
/// Initialised once and never mutated.
pub static DEFAULT_MAP_CONFIG: Lazy<MapConfig> = Lazy::new(|| MapConfig {
    map_tokens: 1024,
    max_context_window: 8192,
    map_mul_no_files: 8.0,
    refresh: "auto".to_string(),
    extra: Map::new(),
});

/// Fully resolved configuration handed to the mapping engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Target size budget for the produced map
    pub map_tokens: i64,
    /// Upper bound on the context considered by the engine
    pub max_context_window: i64,
    /// Multiplier used by the engine when no files are marked active
    pub map_mul_no_files: f64,
    /// Recompute cadence inside the engine, e.g. "auto" or "always"
    pub refresh: String,
    /// Unrecognized keys, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for MapConfig {
    fn default() -> Self {
        DEFAULT_MAP_CONFIG.clone()
    }
}

impl MapConfig {
    /// Renders the configuration as the flat mapping the engine consumes
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(MAP_TOKENS_KEY.to_string(), Value::from(self.map_tokens));
        map.insert(
            MAX_CONTEXT_WINDOW_KEY.to_string(),
            Value::from(self.max_context_window),
        );
        map.insert(
            MAP_MUL_NO_FILES_KEY.to_string(),
            Value::from(self.map_mul_no_files),
        );
        map.insert(REFRESH_KEY.to_string(), Value::from(self.refresh.clone()));
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        map
    }
}

/// Caller-supplied configuration after type checking
///
/// Each recognized key is `Some` only when the caller supplied it. The raw
/// mapping is kept so the response can echo exactly what the caller sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub map_tokens: Option<i64>,
    pub max_context_window: Option<i64>,
    pub map_mul_no_files: Option<f64>,
    pub refresh: Option<String>,
    pub extra: Map<String, Value>,
    raw: Map<String, Value>,
}

impl ConfigOverrides {
    /// Type-checks a caller-supplied config mapping
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::RequestShape` when a recognized key holds a value
    /// of the wrong type. `null` counts as the wrong type.
    pub fn from_map(raw: Map<String, Value>) -> PipelineResult<Self> {
        let mut overrides = ConfigOverrides::default();

        for (key, value) in &raw {
            match key.as_str() {
                MAP_TOKENS_KEY => overrides.map_tokens = Some(expect_integer(key, value)?),
                MAX_CONTEXT_WINDOW_KEY => {
                    overrides.max_context_window = Some(expect_integer(key, value)?)
                }
                MAP_MUL_NO_FILES_KEY => {
                    overrides.map_mul_no_files = Some(value.as_f64().ok_or_else(|| {
                        type_error(key, "a number", value)
                    })?)
                }
                REFRESH_KEY => {
                    overrides.refresh = Some(
                        value
                            .as_str()
                            .ok_or_else(|| type_error(key, "a string", value))?
                            .to_string(),
                    )
                }
                _ => {
                    overrides.extra.insert(key.clone(), value.clone());
                }
            }
        }

        overrides.raw = raw;
        Ok(overrides)
    }

    /// The mapping exactly as the caller supplied it
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

fn expect_integer(key: &str, value: &Value) -> PipelineResult<i64> {
    match value {
        Value::Number(n) if n.is_u64() && !n.is_i64() => Err(PipelineError::RequestShape(
            format!("config.{} is out of range, got {}", key, n),
        )),
        _ => value
            .as_i64()
            .ok_or_else(|| type_error(key, "an integer", value)),
    }
}

fn type_error(key: &str, expected: &str, value: &Value) -> PipelineError {
    PipelineError::RequestShape(format!(
        "config.{} must be {}, got {}",
        key,
        expected,
        json_type_name(value)
    ))
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Shallow single-level merge of `overrides` over `defaults`
///
/// Keys present in `overrides` replace the default or are added; every other
/// key keeps its default value.
pub fn merge(defaults: &MapConfig, overrides: &ConfigOverrides) -> MapConfig {
    let mut resolved = defaults.clone();

    if let Some(map_tokens) = overrides.map_tokens {
        resolved.map_tokens = map_tokens;
    }
    if let Some(max_context_window) = overrides.max_context_window {
        resolved.max_context_window = max_context_window;
    }
    if let Some(map_mul_no_files) = overrides.map_mul_no_files {
        resolved.map_mul_no_files = map_mul_no_files;
    }
    if let Some(refresh) = &overrides.refresh {
        resolved.refresh = refresh.clone();
    }
    for (key, value) in &overrides.extra {
        resolved.extra.insert(key.clone(), value.clone());
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn overrides(value: Value) -> PipelineResult<ConfigOverrides> {
        match value {
            Value::Object(map) => ConfigOverrides::from_map(map),
            other => panic!("test config must be an object, got {other}"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = MapConfig::default();
        assert_eq!(config.map_tokens, 1024);
        assert_eq!(config.max_context_window, 8192);
        assert_eq!(config.map_mul_no_files, 8.0);
        assert_eq!(config.refresh, "auto");
        assert!(config.extra.is_empty());
    }

    #[test]
    fn test_merge_empty_overrides_returns_defaults() {
        let merged = merge(&DEFAULT_MAP_CONFIG, &ConfigOverrides::default());
        assert_eq!(merged, *DEFAULT_MAP_CONFIG);
    }

    #[test]
    fn test_merge_single_key_changes_only_that_key() {
        let merged = merge(
            &DEFAULT_MAP_CONFIG,
            &overrides(json!({"map_tokens": 512})).unwrap(),
        );
        assert_eq!(merged.map_tokens, 512);
        assert_eq!(merged.max_context_window, 8192);
        assert_eq!(merged.map_mul_no_files, 8.0);
        assert_eq!(merged.refresh, "auto");
    }

    #[test]
    fn test_merge_all_keys() {
        let merged = merge(
            &DEFAULT_MAP_CONFIG,
            &overrides(json!({
                "map_tokens": 2048,
                "max_context_window": 16384,
                "map_mul_no_files": 4,
                "refresh": "always"
            }))
            .unwrap(),
        );
        assert_eq!(merged.map_tokens, 2048);
        assert_eq!(merged.max_context_window, 16384);
        assert_eq!(merged.map_mul_no_files, 4.0);
        assert_eq!(merged.refresh, "always");
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let merged = merge(
            &DEFAULT_MAP_CONFIG,
            &overrides(json!({"verbose": true, "exclude": {"dirs": ["vendor"]}})).unwrap(),
        );
        let map = merged.to_map();
        assert_eq!(map["verbose"], json!(true));
        assert_eq!(map["exclude"], json!({"dirs": ["vendor"]}));
        assert_eq!(map["map_tokens"], json!(1024));
    }

    #[test]
    fn test_wrong_types_rejected() {
        for bad in [
            json!({"map_tokens": "bad"}),
            json!({"map_tokens": 512.5}),
            json!({"map_tokens": 512.0}),
            json!({"map_tokens": null}),
            json!({"max_context_window": true}),
            json!({"map_mul_no_files": "8"}),
            json!({"refresh": 1}),
        ] {
            let err = overrides(bad.clone()).unwrap_err();
            assert!(
                matches!(err, PipelineError::RequestShape(_)),
                "expected shape error for {bad}"
            );
        }
    }

    #[test]
    fn test_error_message_names_key() {
        let err = overrides(json!({"map_tokens": "bad"})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "config.map_tokens must be an integer, got string"
        );
    }

    #[test]
    fn test_integer_above_i64_range() {
        let err = overrides(json!({"max_context_window": u64::MAX})).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("config.max_context_window is out of range, got {}", u64::MAX)
        );

        let parsed = overrides(json!({"max_context_window": i64::MAX})).unwrap();
        assert_eq!(parsed.max_context_window, Some(i64::MAX));
    }

    #[test]
    fn test_raw_is_kept_verbatim() {
        let raw = json!({"map_tokens": 512, "custom": "x"});
        let parsed = overrides(raw.clone()).unwrap();
        assert_eq!(Value::Object(parsed.raw().clone()), raw);
    }
}
