//! Durable key-value state: the loaded dataset, operator inputs, filters and theme.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::warn;
#[cfg(unix)]
use std::{io::Write, os::unix::fs::OpenOptionsExt};

use crate::error::StoreError;
use crate::types::{FilterState, ScheduleRecord, Theme, UserInputs};

const DATASET_KEY: &str = "dataset";
const USER_INPUTS_KEY: &str = "userInputs";
const FILTER_STATE_KEY: &str = "filterState";
const THEME_KEY: &str = "theme";

/// File name of the state document inside the state directory.
pub const STATE_FILE: &str = "state.json";

/// Raw string storage the typed [`Store`] sits on.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Writes several keys. Backends that can should make this a single write.
    fn set_many(&self, entries: Vec<(&str, String)>) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Removes every key in one step.
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-memory backend. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored text for a key, for assertions.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .expect("memory store lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .read()
            .expect("memory store lock poisoned")
            .is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries
            .write()
            .expect("memory store lock poisoned")
            .insert(key.to_string(), value);
        Ok(())
    }

    fn set_many(&self, entries: Vec<(&str, String)>) -> Result<(), StoreError> {
        let mut map = self.entries.write().expect("memory store lock poisoned");
        for (key, value) in entries {
            map.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries
            .write()
            .expect("memory store lock poisoned")
            .clear();
        Ok(())
    }
}

/// All slots in one JSON document on disk, replaced whole on every write.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<serde_json::Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(serde_json::Map::new());
        }
        let raw = std::fs::read(&self.path)?;
        match serde_json::from_slice::<Value>(&raw) {
            Ok(Value::Object(document)) => Ok(document),
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "state file is corrupt, treating as empty");
                Ok(serde_json::Map::new())
            }
        }
    }

    fn write_document(&self, document: &serde_json::Map<String, Value>) -> Result<(), StoreError> {
        let content = serde_json::to_string(document)?;
        let tmp = self.path.with_extension("json.tmp");
        secure_write(&tmp, &content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_document()?.get(key).map(Value::to_string))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.set_many(vec![(key, value)])
    }

    fn set_many(&self, entries: Vec<(&str, String)>) -> Result<(), StoreError> {
        let mut document = self.read_document()?;
        for (key, value) in entries {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            document.insert(key.to_string(), value);
        }
        self.write_document(&document)
    }

    fn clear(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

fn secure_write(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?
            .write_all(content.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, content)?;
    }

    Ok(())
}

/// Typed access to the four persisted slots.
///
/// Loads never fail: a missing, unreadable or malformed slot is reported as absent.
pub struct Store {
    backend: Box<dyn KeyValueStore>,
}

impl Store {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, "failed to read persisted slot: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, "persisted slot is malformed, ignoring: {}", e);
                None
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        self.backend.set(key, serde_json::to_string(value)?)
    }

    pub fn load_dataset(&self) -> Option<Vec<ScheduleRecord>> {
        self.load(DATASET_KEY)
    }

    pub fn save_dataset(&self, records: &[ScheduleRecord]) -> Result<(), StoreError> {
        self.save(DATASET_KEY, records)
    }

    /// Stores a new dataset and discards the inputs and filters of the previous one,
    /// in a single backend write.
    pub fn replace_dataset(&self, records: &[ScheduleRecord]) -> Result<(), StoreError> {
        self.backend.set_many(vec![
            (DATASET_KEY, serde_json::to_string(records)?),
            (USER_INPUTS_KEY, serde_json::to_string(&UserInputs::new())?),
            (FILTER_STATE_KEY, serde_json::to_string(&FilterState::default())?),
        ])
    }

    pub fn load_user_inputs(&self) -> Option<UserInputs> {
        self.load(USER_INPUTS_KEY)
    }

    pub fn save_user_inputs(&self, inputs: &UserInputs) -> Result<(), StoreError> {
        self.save(USER_INPUTS_KEY, inputs)
    }

    pub fn load_filter_state(&self) -> Option<FilterState> {
        self.load(FILTER_STATE_KEY)
    }

    pub fn save_filter_state(&self, state: &FilterState) -> Result<(), StoreError> {
        self.save(FILTER_STATE_KEY, state)
    }

    pub fn load_theme(&self) -> Option<Theme> {
        self.load(THEME_KEY)
    }

    pub fn save_theme(&self, theme: Theme) -> Result<(), StoreError> {
        self.save(THEME_KEY, &theme)
    }

    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.backend.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserInput;

    fn records() -> Vec<ScheduleRecord> {
        vec![ScheduleRecord {
            id: 0,
            line: "101".into(),
            table: "1".into(),
            operator: "Vega".into(),
            control_post: "Papicu".into(),
            scheduled_time: "08:00".into(),
            passage_type_code: "4".into(),
        }]
    }

    fn inputs() -> UserInputs {
        let mut inputs = UserInputs::new();
        inputs.insert(
            0,
            UserInput {
                vehicle_id: "12345".into(),
                observed_time: "08:04".into(),
            },
        );
        inputs.insert(3, UserInput::default());
        inputs
    }

    fn filter_state() -> FilterState {
        let mut state = FilterState::default();
        state.selected_lines.insert("101".into());
        state.selected_posts.insert("Papicu".into());
        state.end_time = Some("12:00".into());
        state
    }

    #[test]
    fn round_trips_every_slot() {
        let store = Store::new(MemoryStore::new());
        store.save_dataset(&records()).unwrap();
        store.save_user_inputs(&inputs()).unwrap();
        store.save_filter_state(&filter_state()).unwrap();
        store.save_theme(Theme::Dark).unwrap();

        assert_eq!(store.load_dataset(), Some(records()));
        assert_eq!(store.load_user_inputs(), Some(inputs()));
        assert_eq!(store.load_filter_state(), Some(filter_state()));
        assert_eq!(store.load_theme(), Some(Theme::Dark));
    }

    #[test]
    fn empty_store_loads_nothing() {
        let store = Store::new(MemoryStore::new());
        assert!(store.load_dataset().is_none());
        assert!(store.load_user_inputs().is_none());
        assert!(store.load_filter_state().is_none());
        assert!(store.load_theme().is_none());
    }

    #[test]
    fn malformed_slot_loads_as_absent() {
        let backend = MemoryStore::new();
        backend.set(DATASET_KEY, "{not json".into()).unwrap();
        backend.set(THEME_KEY, "\"sepia\"".into()).unwrap();
        let store = Store::new(backend);

        assert!(store.load_dataset().is_none());
        assert!(store.load_theme().is_none());
    }

    #[test]
    fn replace_dataset_resets_dependent_slots_but_keeps_theme() {
        let backend = MemoryStore::new();
        let store = Store::new(backend.clone());
        store.save_user_inputs(&inputs()).unwrap();
        store.save_filter_state(&filter_state()).unwrap();
        store.save_theme(Theme::Dark).unwrap();

        store.replace_dataset(&records()).unwrap();

        assert_eq!(store.load_dataset(), Some(records()));
        assert_eq!(store.load_user_inputs(), Some(UserInputs::new()));
        assert_eq!(store.load_filter_state(), Some(FilterState::default()));
        assert_eq!(store.load_theme(), Some(Theme::Dark));
        assert!(backend.raw(USER_INPUTS_KEY).is_some());
    }

    #[test]
    fn clear_all_empties_every_slot() {
        let backend = MemoryStore::new();
        let store = Store::new(backend.clone());
        store.save_dataset(&records()).unwrap();
        store.save_theme(Theme::Dark).unwrap();

        store.clear_all().unwrap();

        assert!(backend.is_empty());
        assert!(store.load_dataset().is_none());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        Store::new(FileStore::new(dir.path()))
            .save_user_inputs(&inputs())
            .unwrap();
        Store::new(FileStore::new(dir.path()))
            .save_filter_state(&filter_state())
            .unwrap();

        let reopened = Store::new(FileStore::new(dir.path()));
        assert_eq!(reopened.load_user_inputs(), Some(inputs()));
        assert_eq!(reopened.load_filter_state(), Some(filter_state()));
    }

    #[test]
    fn file_store_document_is_plain_json() {
        let dir = tempfile::tempdir().unwrap();
        let file_store = FileStore::new(dir.path());
        Store::new(file_store.clone()).save_theme(Theme::Dark).unwrap();

        let raw = std::fs::read_to_string(file_store.path()).unwrap();
        let document: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(document["theme"], "dark");
    }

    #[test]
    fn corrupt_state_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file_store = FileStore::new(dir.path());
        std::fs::write(file_store.path(), "]]garbage").unwrap();

        let store = Store::new(file_store.clone());
        assert!(store.load_dataset().is_none());

        // next write replaces the corrupt document
        store.save_theme(Theme::Light).unwrap();
        assert_eq!(store.load_theme(), Some(Theme::Light));
    }

    #[test]
    fn file_store_non_utf8_state_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file_store = FileStore::new(dir.path());
        std::fs::write(file_store.path(), [0xff, 0xfe, 0x00, 0x7b]).unwrap();

        let store = Store::new(file_store.clone());
        assert!(store.load_dataset().is_none());

        store.save_theme(Theme::Dark).unwrap();
        store.replace_dataset(&records()).unwrap();
        assert_eq!(store.load_theme(), Some(Theme::Dark));
        assert_eq!(store.load_dataset(), Some(records()));
    }

    #[test]
    fn file_store_clear_removes_document() {
        let dir = tempfile::tempdir().unwrap();
        let file_store = FileStore::new(dir.path());
        let store = Store::new(file_store.clone());
        store.save_dataset(&records()).unwrap();
        assert!(file_store.path().exists());

        store.clear_all().unwrap();
        assert!(!file_store.path().exists());
        assert!(store.load_dataset().is_none());
    }
}
