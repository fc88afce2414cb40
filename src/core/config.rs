/// Configuration store — dotted-key resolution over a schema-shaped tree.
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::core::outcome::{Soft, SoftFailure};
use crate::schema::value::ConfigValue;

/// Schema that doubles as the default configuration: every leaf carries
/// its `default`, so resolving against it yields the stock values.
pub const BUILTIN_SCHEMA: &str = include_str!("../../data/conf_schema.json");

/// Child that a node is transparently descended into before lookup.
const ITEMS_KEY: &str = "items";
/// Child that replaces a resolved mapping.
const DEFAULT_KEY: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("unsupported config file extension: {0}")]
    UnsupportedFormat(String),
}

/// Parse a configuration document from a JSON string.
pub fn parse_json(input: &str) -> Result<ConfigValue, ConfigError> {
    Ok(serde_json::from_str(input)?)
}

/// Parse a configuration document from a RON string.
pub fn parse_ron(input: &str) -> Result<ConfigValue, ConfigError> {
    Ok(ron::from_str(input)?)
}

/// Load a configuration document, picking the parser by file extension.
pub fn load_file(path: &Path) -> Result<ConfigValue, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => parse_json(&contents),
        Some("ron") => parse_ron(&contents),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

/// The built-in schema, parsed.
pub fn builtin_schema() -> Result<ConfigValue, ConfigError> {
    parse_json(BUILTIN_SCHEMA)
}

/// Walk `root` along a dotted key.
///
/// At every step an `items` child is entered first, then the next segment
/// is looked up. After the last segment a mapping with a `default` field
/// resolves to that default. `null` counts as absent, so a `default: null`
/// resolves to nothing.
pub fn resolve_path<'a>(root: &'a ConfigValue, key: &str) -> Result<&'a ConfigValue, SoftFailure> {
    let mut node = root;
    for segment in key.split('.') {
        let Some(mut map) = node.as_map() else {
            return Err(SoftFailure::TypeMismatch {
                key: key.to_string(),
                expected: "mapping",
                found: node.type_name(),
            });
        };
        if let Some(ConfigValue::Map(items)) = map.get(ITEMS_KEY) {
            map = items;
        }
        node = match map.get(segment) {
            Some(child) if !child.is_null() => child,
            _ => {
                return Err(SoftFailure::MissingKey {
                    key: key.to_string(),
                })
            }
        };
    }

    match node.as_map().and_then(|map| map.get(DEFAULT_KEY)) {
        Some(ConfigValue::Null) => Err(SoftFailure::MissingKey {
            key: key.to_string(),
        }),
        Some(default) => Ok(default),
        None => Ok(node),
    }
}

/// A structural difference between the schema and the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMismatch {
    pub path: String,
    pub kind: MismatchKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchKind {
    /// The schema declares a category the configuration lacks.
    MissingCategory,
    /// The schema declares an object but the configuration holds something else.
    NotAMapping { found: &'static str },
    /// An item declared under an object category is absent.
    MissingItem,
}

impl std::fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            MismatchKind::MissingCategory => write!(f, "category '{}' missing", self.path),
            MismatchKind::NotAMapping { found } => {
                write!(f, "'{}' should be a mapping, found {}", self.path, found)
            }
            MismatchKind::MissingItem => write!(f, "item '{}' missing", self.path),
        }
    }
}

/// Compare the configuration against the schema's top-level categories.
///
/// Advisory only: every mismatch is logged as a warning and returned, and
/// nothing here stops the configuration from being used.
pub fn validate_structure(schema: &ConfigValue, config: &ConfigValue) -> Vec<SchemaMismatch> {
    let mut mismatches = Vec::new();
    let Some(categories) = schema.as_map() else {
        return mismatches;
    };

    for (category, declared) in categories {
        let Some(actual) = config.get(category) else {
            mismatches.push(SchemaMismatch {
                path: category.clone(),
                kind: MismatchKind::MissingCategory,
            });
            continue;
        };

        if declared.get("type").and_then(ConfigValue::as_str) != Some("object") {
            continue;
        }
        let Some(actual_map) = actual.as_map() else {
            mismatches.push(SchemaMismatch {
                path: category.clone(),
                kind: MismatchKind::NotAMapping {
                    found: actual.type_name(),
                },
            });
            continue;
        };
        let actual_items = match actual_map.get(ITEMS_KEY) {
            Some(ConfigValue::Map(items)) => items,
            _ => actual_map,
        };

        if let Some(items) = declared.get(ITEMS_KEY).and_then(ConfigValue::as_map) {
            for item in items.keys() {
                if !actual_items.contains_key(item) {
                    mismatches.push(SchemaMismatch {
                        path: format!("{}.{}", category, item),
                        kind: MismatchKind::MissingItem,
                    });
                }
            }
        }
    }

    for mismatch in &mismatches {
        tracing::warn!(%mismatch, "configuration does not match schema");
    }
    mismatches
}

/// Debug overview of the active configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigInfo {
    pub initialized: bool,
    pub categories: Vec<String>,
    pub has_output: bool,
    pub has_sanity: bool,
    pub has_character: bool,
}

#[derive(Debug)]
struct Snapshot {
    schema: ConfigValue,
    tree: ConfigValue,
}

/// Shared handle to the active configuration tree and its schema.
///
/// Constructed once by the host and handed to every component as an
/// `Arc<ConfigStore>`. Reads take a snapshot; `initialize` swaps the whole
/// tree, so a reader never sees a half-replaced configuration.
#[derive(Debug, Default)]
pub struct ConfigStore {
    state: RwLock<Option<Arc<Snapshot>>>,
}

impl ConfigStore {
    /// An uninitialized store. Every lookup yields its fallback until
    /// `initialize` is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store initialized with the given schema and tree.
    pub fn with_config(schema: ConfigValue, tree: ConfigValue) -> Self {
        let store = Self::new();
        store.initialize(schema, tree);
        store
    }

    /// A store whose configuration is the built-in schema itself.
    pub fn builtin() -> Result<Self, ConfigError> {
        let schema = builtin_schema()?;
        Ok(Self::with_config(schema.clone(), schema))
    }

    /// Install a configuration, replacing any previous one. Returns the
    /// advisory schema mismatches.
    pub fn initialize(&self, schema: ConfigValue, tree: ConfigValue) -> Vec<SchemaMismatch> {
        let mismatches = validate_structure(&schema, &tree);
        let snapshot = Arc::new(Snapshot { schema, tree });
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let replaced = state.replace(snapshot).is_some();
        tracing::info!(replaced, mismatches = mismatches.len(), "configuration initialized");
        mismatches
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot().is_some()
    }

    fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Resolve a dotted key, reporting why it could not be found.
    pub fn lookup(&self, key: &str) -> Result<ConfigValue, SoftFailure> {
        let snapshot = self.snapshot().ok_or(SoftFailure::Uninitialized)?;
        resolve_path(&snapshot.tree, key).cloned()
    }

    /// Resolve a dotted key, degrading to `fallback` on any miss.
    pub fn resolve(&self, key: &str, fallback: ConfigValue) -> ConfigValue {
        self.resolve_checked(key, fallback).into_value()
    }

    pub fn resolve_checked(&self, key: &str, fallback: ConfigValue) -> Soft<ConfigValue> {
        match self.lookup(key) {
            Ok(value) => Soft::Clean(value),
            Err(reason) => Soft::degraded(fallback, reason),
        }
    }

    /// Resolve a dotted key into a typed value. Misses and values of the
    /// wrong shape both degrade to `fallback`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        self.get_checked(key, fallback).into_value()
    }

    pub fn get_checked<T: DeserializeOwned>(&self, key: &str, fallback: T) -> Soft<T> {
        let value = match self.lookup(key) {
            Ok(value) => value,
            Err(reason) => return Soft::degraded(fallback, reason),
        };
        match value.deserialize_into::<T>() {
            Ok(typed) => Soft::Clean(typed),
            Err(_) => Soft::degraded(
                fallback,
                SoftFailure::TypeMismatch {
                    key: key.to_string(),
                    expected: std::any::type_name::<T>(),
                    found: value.type_name(),
                },
            ),
        }
    }

    /// Re-run structural validation against the active schema.
    pub fn validate(&self) -> Vec<SchemaMismatch> {
        match self.snapshot() {
            Some(snapshot) => validate_structure(&snapshot.schema, &snapshot.tree),
            None => Vec::new(),
        }
    }

    pub fn info(&self) -> ConfigInfo {
        let Some(snapshot) = self.snapshot() else {
            return ConfigInfo {
                initialized: false,
                categories: Vec::new(),
                has_output: false,
                has_sanity: false,
                has_character: false,
            };
        };
        let categories: Vec<String> = snapshot
            .tree
            .as_map()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        let has = |name: &str| categories.iter().any(|c| c == name);
        ConfigInfo {
            initialized: true,
            has_output: has("output"),
            has_sanity: has("sanity"),
            has_character: has("character"),
            categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: serde_json::Value) -> ConfigValue {
        ConfigValue::from(value)
    }

    #[test]
    fn resolve_plain_leaf() {
        let root = tree(json!({"sanity": {"dice_range": {"max": 100}}}));
        assert_eq!(
            resolve_path(&root, "sanity.dice_range.max"),
            Ok(&ConfigValue::Int(100))
        );
    }

    #[test]
    fn resolve_descends_into_items_first() {
        let root = tree(json!({
            "output": {
                "type": "object",
                "items": {"san": {"type": "object", "items": {"greeting": {"default": "hi"}}}},
                "san": "shadowed"
            }
        }));
        assert_eq!(
            resolve_path(&root, "output.san.greeting").unwrap().as_str(),
            Some("hi")
        );
    }

    #[test]
    fn resolve_prefers_default_field() {
        let root = tree(json!({"a": {"b": {"type": "int", "default": 7}}}));
        assert_eq!(resolve_path(&root, "a.b"), Ok(&ConfigValue::Int(7)));
    }

    #[test]
    fn null_default_resolves_to_nothing() {
        let root = tree(json!({"a": {"b": {"default": null, "x": 1}}}));
        assert!(matches!(
            resolve_path(&root, "a.b"),
            Err(SoftFailure::MissingKey { .. })
        ));
        let store = ConfigStore::with_config(ConfigValue::Null, root);
        assert_eq!(store.get("a.b.x", 0i64), 1);
        assert_eq!(store.get("a.b", "fallback".to_string()), "fallback");
    }

    #[test]
    fn resolve_missing_and_mismatch() {
        let root = tree(json!({"a": {"b": 1}, "n": null}));
        assert!(matches!(
            resolve_path(&root, "a.c"),
            Err(SoftFailure::MissingKey { .. })
        ));
        assert!(matches!(
            resolve_path(&root, "a.b.c"),
            Err(SoftFailure::TypeMismatch { found: "integer", .. })
        ));
        assert!(matches!(
            resolve_path(&root, "n"),
            Err(SoftFailure::MissingKey { .. })
        ));
        assert!(resolve_path(&root, "").is_err());
    }

    #[test]
    fn uninitialized_store_returns_fallback() {
        let store = ConfigStore::new();
        assert!(!store.is_initialized());
        let soft = store.resolve_checked("anything", ConfigValue::Int(3));
        assert_eq!(soft.reason(), Some(&SoftFailure::Uninitialized));
        assert_eq!(soft.into_value(), ConfigValue::Int(3));
        assert_eq!(store.get::<i64>("sanity.dice_range.max", 100), 100);
        assert!(!store.info().initialized);
    }

    #[test]
    fn get_typed_with_fallback_on_mismatch() {
        let store = ConfigStore::with_config(
            ConfigValue::Null,
            tree(json!({"sanity": {"dice_range": {"min": 1, "max": "lots"}}})),
        );
        assert_eq!(store.get::<i64>("sanity.dice_range.min", 5), 1);
        let soft = store.get_checked::<i64>("sanity.dice_range.max", 100);
        assert!(matches!(
            soft.reason(),
            Some(SoftFailure::TypeMismatch { found: "string", .. })
        ));
        assert_eq!(soft.into_value(), 100);
    }

    #[test]
    fn initialize_replaces_previous_tree() {
        let store = ConfigStore::with_config(ConfigValue::Null, tree(json!({"a": 1})));
        assert_eq!(store.get::<i64>("a", 0), 1);
        store.initialize(ConfigValue::Null, tree(json!({"a": 2})));
        assert_eq!(store.get::<i64>("a", 0), 2);
    }

    #[test]
    fn validate_reports_but_does_not_block() {
        let schema = tree(json!({
            "output": {"type": "object", "items": {"san": {}, "dice": {}}},
            "names": {"type": "object", "items": {}},
            "flag": {"type": "bool"}
        }));
        let config = tree(json!({"output": {"san": {}}, "flag": true}));
        let mismatches = validate_structure(&schema, &config);
        assert!(mismatches.contains(&SchemaMismatch {
            path: "output.dice".to_string(),
            kind: MismatchKind::MissingItem,
        }));
        assert!(mismatches.contains(&SchemaMismatch {
            path: "names".to_string(),
            kind: MismatchKind::MissingCategory,
        }));
        assert_eq!(mismatches.len(), 2);

        let store = ConfigStore::with_config(schema, config);
        assert!(store.is_initialized());
        assert_eq!(store.validate().len(), 2);
    }

    #[test]
    fn validate_flags_non_mapping_category() {
        let schema = tree(json!({"sanity": {"type": "object", "items": {}}}));
        let config = tree(json!({"sanity": 5}));
        assert_eq!(
            validate_structure(&schema, &config),
            vec![SchemaMismatch {
                path: "sanity".to_string(),
                kind: MismatchKind::NotAMapping { found: "integer" },
            }]
        );
    }

    #[test]
    fn builtin_schema_validates_against_itself() {
        let schema = builtin_schema().unwrap();
        assert!(validate_structure(&schema, &schema).is_empty());
        let store = ConfigStore::builtin().unwrap();
        let info = store.info();
        assert!(info.has_output && info.has_sanity && info.has_character);
    }

    #[test]
    fn builtin_schema_resolves_defaults() {
        let store = ConfigStore::builtin().unwrap();
        assert_eq!(store.get::<i64>("sanity.dice_range.max", 0), 100);
        assert_eq!(
            store.get::<String>("sanity.insanity_dice.dice", String::new()),
            "1D10"
        );
        let temporary: Vec<String> = store.get("output.san.temporary_insanity_types", Vec::new());
        assert_eq!(temporary.len(), 10);
    }

    #[test]
    fn load_file_rejects_unknown_extension() {
        let err = load_file(Path::new("Cargo.toml"));
        assert!(matches!(err, Err(ConfigError::UnsupportedFormat(ext)) if ext == "toml"));
    }
}
