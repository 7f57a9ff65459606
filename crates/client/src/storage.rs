//! Key-value storage with expiration.
//!
//! Values are wrapped in a `{ "value": ..., "expiresAt": ... }` JSON entry so
//! that a sweep can drop stale ones. Backends:
//! - Web: `localStorage`
//! - Desktop: JSON files in the platform-appropriate config directory:
//!   - Linux: `~/.config/blip-chat/`
//!   - macOS: `~/Library/Application Support/blip-chat/`
//!   - Windows: `%APPDATA%\blip-chat\`
//! - [`MemoryStore`] for tests and headless hosts

use std::cell::RefCell;
use std::collections::BTreeMap;

use blipchat_shared::WidgetError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage key of the guest account created by the chat frame.
pub const USER_ACCOUNT_KEY: &str = "blipSdkUAccount";

/// How long a created guest account is remembered.
pub fn account_ttl() -> Duration {
    Duration::days(365)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Persistent storage consumed by the widget.
pub trait KeyValueStore {
    /// Read a value. Expired entries are removed and read as absent.
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a value, optionally expiring `ttl` from now.
    fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<(), WidgetError>;

    fn remove(&self, key: &str);

    /// Remove every entry whose expiry is at or before `now`.
    fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize;

    fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }
}

/// Raw string storage. Every implementor is a [`KeyValueStore`].
pub trait RawStore {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str) -> Result<(), WidgetError>;
    fn delete(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

impl<T: RawStore> KeyValueStore for T {
    fn get(&self, key: &str) -> Option<Value> {
        let raw = self.read(key)?;
        let entry: StoredEntry = serde_json::from_str(&raw).ok()?;
        if entry.is_expired(Utc::now()) {
            crate::log_debug!("storage: '{}' expired, removing", key);
            self.delete(key);
            return None;
        }
        Some(entry.value)
    }

    fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<(), WidgetError> {
        let entry = StoredEntry {
            value: value.clone(),
            expires_at: ttl.map(|ttl| Utc::now() + ttl),
        };
        let json = serde_json::to_string(&entry)?;
        self.write(key, &json)
    }

    fn remove(&self, key: &str) {
        self.delete(key);
    }

    fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for key in self.keys() {
            let Some(raw) = self.read(&key) else {
                continue;
            };
            // Keys written by someone else are not ours to expire
            let Ok(entry) = serde_json::from_str::<StoredEntry>(&raw) else {
                continue;
            };
            if entry.is_expired(now) {
                self.delete(&key);
                removed += 1;
            }
        }
        if removed > 0 {
            crate::log_info!("storage: swept {} expired entries", removed);
        }
        removed
    }
}

/// In-process store. Nothing survives the instance.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl RawStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), WidgetError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

/// The platform's persistent storage (`localStorage` or config-dir files).
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStore;

impl RawStore for LocalStore {
    fn read(&self, key: &str) -> Option<String> {
        load_raw(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), WidgetError> {
        save_raw(key, value)
    }

    fn delete(&self, key: &str) {
        remove_raw(key);
    }

    fn keys(&self) -> Vec<String> {
        keys_raw()
    }
}

// =========================================
// Web (WASM) implementation
// =========================================

#[cfg(target_arch = "wasm32")]
fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

#[cfg(target_arch = "wasm32")]
fn save_raw(key: &str, value: &str) -> Result<(), WidgetError> {
    let storage = local_storage().ok_or_else(|| WidgetError::storage("localStorage unavailable"))?;
    storage
        .set_item(key, value)
        .map_err(|e| WidgetError::storage(format!("set_item '{}' failed: {:?}", key, e)))
}

#[cfg(target_arch = "wasm32")]
fn load_raw(key: &str) -> Option<String> {
    local_storage()?.get_item(key).ok()?
}

#[cfg(target_arch = "wasm32")]
fn remove_raw(key: &str) {
    if let Some(storage) = local_storage() {
        let _ = storage.remove_item(key);
    }
}

#[cfg(target_arch = "wasm32")]
fn keys_raw() -> Vec<String> {
    let Some(storage) = local_storage() else {
        return Vec::new();
    };
    let len = storage.length().unwrap_or(0);
    (0..len)
        .filter_map(|i| storage.key(i).ok().flatten())
        .collect()
}

// =========================================
// Desktop (native) implementation
// =========================================

#[cfg(not(target_arch = "wasm32"))]
fn get_config_dir() -> Option<std::path::PathBuf> {
    let app_dir = dirs::config_dir()?.join("blip-chat");
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir).ok()?;
    }
    Some(app_dir)
}

#[cfg(not(target_arch = "wasm32"))]
fn get_file_path(key: &str) -> Option<std::path::PathBuf> {
    let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
    Some(get_config_dir()?.join(format!("{}.json", safe_key)))
}

#[cfg(not(target_arch = "wasm32"))]
fn save_raw(key: &str, value: &str) -> Result<(), WidgetError> {
    let path = get_file_path(key).ok_or_else(|| WidgetError::storage("no config directory"))?;
    std::fs::write(&path, value)
        .map_err(|e| WidgetError::storage(format!("write {} failed: {}", path.display(), e)))
}

#[cfg(not(target_arch = "wasm32"))]
fn load_raw(key: &str) -> Option<String> {
    std::fs::read_to_string(get_file_path(key)?).ok()
}

#[cfg(not(target_arch = "wasm32"))]
fn remove_raw(key: &str) {
    if let Some(path) = get_file_path(key) {
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn keys_raw() -> Vec<String> {
    let Some(dir) = get_config_dir() else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            if path.extension()? != "json" {
                return None;
            }
            Some(path.file_stem()?.to_string_lossy().into_owned())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get_returns_value() {
        let store = MemoryStore::new();
        store.set("k", &json!({"a": 1}), None).unwrap();
        assert_eq!(store.get("k"), Some(json!({"a": 1})));
    }

    #[test]
    fn expired_entries_read_as_absent_and_are_removed() {
        let store = MemoryStore::new();
        store
            .set("stale", &json!("x"), Some(Duration::seconds(-1)))
            .unwrap();
        assert_eq!(store.get("stale"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_only_touches_expired_entries_it_owns() {
        let store = MemoryStore::new();
        store.set("short", &json!(1), Some(Duration::minutes(5))).unwrap();
        store.set("long", &json!(2), Some(Duration::days(30))).unwrap();
        store.set("forever", &json!(3), None).unwrap();
        store.write("foreign", "plain text").unwrap();

        let removed = store.sweep_expired_at(Utc::now() + Duration::hours(1));

        assert_eq!(removed, 1);
        assert_eq!(store.get("short"), None);
        assert_eq!(store.get("long"), Some(json!(2)));
        assert_eq!(store.get("forever"), Some(json!(3)));
        assert_eq!(store.read("foreign").as_deref(), Some("plain text"));
    }
}
