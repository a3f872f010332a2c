use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value, json};
use std::fs;

/// One segment of a settings lookup path.
///
/// A segment that is purely numeric descends into arrays by index; anything
/// else descends into objects by key. A segment whose type does not match the
/// value it is applied to resolves to nothing rather than guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathSeg<'a> {
    Key(&'a str),
    Index(usize),
}

impl<'a> PathSeg<'a> {
    fn parse(raw: &'a str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            match raw.parse() {
                Ok(index) => PathSeg::Index(index),
                Err(_) => PathSeg::Key(raw),
            }
        } else {
            PathSeg::Key(raw)
        }
    }
}

/// Settings store backed by a single JSON file.
///
/// The tree mirrors arbitrary JSON: scalars, arrays and nested objects. A
/// missing, empty or unreadable file is a valid first-run state and loads as
/// an empty tree; the required settings below are then backfilled in memory.
/// Backfilled defaults are never written back implicitly; only an explicit
/// [`save`](Self::save) touches disk, and it replaces the whole file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: Utf8PathBuf,
    tree: Value,
}

/// Required settings and their built-in defaults.
///
/// These always resolve to a value after load: any key that is absent or
/// holds an empty value is replaced by its default.
fn built_in_defaults() -> [(&'static str, Value); 7] {
    [
        ("default_params", json!("name!, email!, subject!, message!")),
        ("separator", json!(",")),
        ("logs_count", json!(10)),
        ("use_honeypot", json!(true)),
        ("min_sec_after_load", json!("3")),
        ("max_posts_by_hour", json!("10")),
        ("min_sec_between_posts", json!("5")),
    ]
}

// Empty means: null, false, 0, "", "0", [] or {}.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty() || text == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

impl ConfigStore {
    /// Load the settings file at `path`.
    ///
    /// Never fails: a missing or corrupt file is treated as an empty tree and
    /// the required defaults are backfilled either way.
    pub fn load<P: AsRef<Utf8Path>>(path: P) -> Self {
        let mut store = Self {
            path: path.as_ref().to_path_buf(),
            tree: Value::Object(Map::new()),
        };
        store.reload();
        store
    }

    /// Re-read the settings file and backfill defaults again.
    ///
    /// Callers must reload after a successful [`save`](Self::save) to observe
    /// the backfilled view of what was just written.
    pub fn reload(&mut self) {
        self.tree = Self::read_tree(&self.path);
        self.backfill_defaults();
    }

    fn read_tree(path: &Utf8Path) -> Value {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!("No settings file at {}: {}", path, err);
                return Value::Object(Map::new());
            }
        };
        match serde_json::from_str(&raw) {
            Ok(tree) => tree,
            Err(err) => {
                tracing::warn!("Ignoring unreadable settings file {}: {}", path, err);
                Value::Object(Map::new())
            }
        }
    }

    /// Set every required setting that is currently absent or empty to its
    /// built-in default. Runs after every load, before the tree is exposed.
    fn backfill_defaults(&mut self) {
        if !self.tree.is_object() {
            self.tree = Value::Object(Map::new());
        }
        let map = self.tree.as_object_mut().expect("tree is an object");
        for (key, default) in built_in_defaults() {
            if map.get(key).is_none_or(is_empty_value) {
                map.insert(key.to_string(), default);
            }
        }
    }

    /// Look up a value by path.
    ///
    /// Each segment descends one level: purely numeric segments index into
    /// arrays, all others key into objects. Any absent segment, or a segment
    /// applied to the wrong shape, yields `None`, never a panic.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let mut current = &self.tree;
        for raw in path {
            current = match (PathSeg::parse(raw), current) {
                (PathSeg::Index(index), Value::Array(items)) => items.get(index)?,
                (PathSeg::Key(key), Value::Object(map)) => map.get(key)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// String value at `path`, or `None` for anything that is not a string.
    pub fn get_str(&self, path: &[&str]) -> Option<&str> {
        self.get(path)?.as_str()
    }

    /// Integer value at `path`, accepting numeric strings and booleans.
    ///
    /// Settings written by the panel arrive as strings (`"3"`), hand-edited
    /// files may hold numbers (`3`); both resolve here.
    pub fn get_i64(&self, path: &[&str]) -> Option<i64> {
        match self.get(path)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            Value::Bool(flag) => Some(i64::from(*flag)),
            _ => None,
        }
    }

    /// Truthiness of the value at `path`. Absent values are false, as are
    /// `null`, `false`, `0`, `""`, `"0"`, `"false"` and empty collections.
    pub fn get_bool(&self, path: &[&str]) -> bool {
        match self.get(path) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(text)) => {
                !text.is_empty() && text != "0" && !text.eq_ignore_ascii_case("false")
            }
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            _ => false,
        }
    }

    /// Replace the persisted tree with `new_tree`.
    ///
    /// This is a full overwrite, not a merge: callers that want to keep
    /// unknown keys must read-modify-write the complete tree. The in-memory
    /// tree is not touched; call [`reload`](Self::reload) afterwards.
    pub fn save(&self, new_tree: &Value) -> Result<()> {
        let body =
            serde_json::to_string_pretty(new_tree).context("Failed to serialize settings tree")?;
        fs::write(&self.path, body)
            .with_context(|| format!("Failed to write settings: {}", self.path))?;
        tracing::info!("Saved settings to {}", self.path);
        Ok(())
    }

    /// The full in-memory tree, defaults included.
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// Path of the backing settings file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}
