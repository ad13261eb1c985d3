use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::core::document::{ChapterList, ChapterListError, DocumentConfiguration, DocumentMode};
use crate::core::io::Storage;
use crate::core::state::{GenerationResult, HistoryEntry};
use crate::utils::time::{now_millis, sleep};

pub const FORM_STATE_KEY: &str = "researchFormState";
pub const CHAPTER_STATE_KEY: &str = "chapterState";
pub const HISTORY_KEY: &str = "researchGenHistory";

pub const AUTOSAVE_PERIOD: Duration = Duration::from_secs(30);

/// Lists keyed by mode name. Values are kept raw so an entry this build does
/// not understand survives the next save.
type ChapterState = BTreeMap<String, serde_json::Value>;

/// Saved configuration, edited chapter lists and generation history.
///
/// The three live under separate keys and are loaded independently: a
/// missing or unreadable value only resets that one part to its default.
/// Write failures are logged and otherwise ignored.
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn load_configuration(&self) -> Option<DocumentConfiguration> {
        let raw = self.read(FORM_STATE_KEY).await?;
        match serde_json::from_str(&raw) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Ignoring unreadable saved form state: {}", e);
                None
            }
        }
    }

    pub async fn save_configuration(&self, config: &DocumentConfiguration) {
        self.write_json(FORM_STATE_KEY, config).await;
    }

    /// The editable list saved for `mode`, or the built-in list when the mode
    /// has a fixed one or nothing was saved yet.
    pub async fn chapter_list(&self, mode: DocumentMode) -> ChapterList {
        if !mode.uses_editable_chapters() {
            return ChapterList::defaults(mode);
        }
        let Some(value) = self.chapter_state().await.remove(mode.key()) else {
            return ChapterList::defaults(mode);
        };
        match serde_json::from_value::<Vec<String>>(value) {
            Ok(names) => ChapterList::from_names(names),
            Err(e) => {
                log::warn!("Ignoring unreadable saved {} chapters: {}", mode.key(), e);
                ChapterList::defaults(mode)
            }
        }
    }

    pub async fn save_chapter_list(&self, mode: DocumentMode, chapters: &ChapterList) {
        if !mode.uses_editable_chapters() {
            log::debug!("{:?} chapters are fixed, not saving", mode);
            return;
        }
        let mut state = self.chapter_state().await;
        state.insert(
            mode.key().to_string(),
            serde_json::Value::from(chapters.as_slice().to_vec()),
        );
        self.write_json(CHAPTER_STATE_KEY, &state).await;
    }

    /// Appends a chapter, selects it and saves the list.
    pub async fn add_chapter(
        &self,
        config: &mut DocumentConfiguration,
        chapters: &mut ChapterList,
        name: &str,
    ) -> Result<String, ChapterListError> {
        let name = chapters.add(name)?;
        config.select_chapter(&name);
        self.save_chapter_list(config.mode(), chapters).await;
        Ok(name)
    }

    /// Renames a chapter together with its selection and counts. `Ok(None)`
    /// means the name only changed in case and nothing was touched.
    pub async fn rename_chapter(
        &self,
        config: &mut DocumentConfiguration,
        chapters: &mut ChapterList,
        old: &str,
        new: &str,
    ) -> Result<Option<String>, ChapterListError> {
        let renamed = chapters.rename(old, new)?;
        if let Some(new) = &renamed {
            config.rename_selected(old, new);
            self.save_chapter_list(config.mode(), chapters).await;
        }
        Ok(renamed)
    }

    pub async fn remove_chapter(
        &self,
        config: &mut DocumentConfiguration,
        chapters: &mut ChapterList,
        name: &str,
    ) -> Result<(), ChapterListError> {
        chapters.remove(name)?;
        config.forget_chapter(name);
        self.save_chapter_list(config.mode(), chapters).await;
        Ok(())
    }

    pub async fn reorder_chapters(
        &self,
        mode: DocumentMode,
        chapters: &mut ChapterList,
        order: Vec<String>,
    ) -> Result<(), ChapterListError> {
        chapters.reorder(order)?;
        self.save_chapter_list(mode, chapters).await;
        Ok(())
    }

    /// Makes a suggested title the only selected chapter, adding it to the
    /// list unless a chapter of that name already exists.
    pub async fn adopt_suggested_chapter(
        &self,
        config: &mut DocumentConfiguration,
        chapters: &mut ChapterList,
        title: &str,
    ) -> Result<String, ChapterListError> {
        let wanted = title.trim().to_lowercase();
        let existing = chapters
            .iter()
            .find(|c| c.trim().to_lowercase() == wanted)
            .map(str::to_string);
        let name = match existing {
            Some(name) => name,
            None => {
                let name = chapters.add(title)?;
                self.save_chapter_list(config.mode(), chapters).await;
                name
            }
        };
        config.deselect_all();
        config.select_chapter(&name);
        Ok(name)
    }

    async fn chapter_state(&self) -> ChapterState {
        let Some(raw) = self.read(CHAPTER_STATE_KEY).await else {
            return ChapterState::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable saved chapter lists: {}", e);
            ChapterState::new()
        })
    }

    /// Newest first.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        let Some(raw) = self.read(HISTORY_KEY).await else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable generation history: {}", e);
            Vec::new()
        })
    }

    /// Adds a finished document to the front of the history.
    pub async fn record_generation(
        &self,
        config: &DocumentConfiguration,
        result: &GenerationResult,
    ) -> HistoryEntry {
        let mut history = self.history().await;
        let entry = HistoryEntry {
            id: unique_id(&history),
            title: config.title.clone(),
            date: chrono::Utc::now(),
            content: result.clone(),
            form_state_snapshot: config.clone(),
        };
        history.insert(0, entry.clone());
        self.write_json(HISTORY_KEY, &history).await;
        log::info!("Saved \"{}\" to history ({} entries)", entry.title, history.len());
        entry
    }

    /// Returns `false` when no entry has `id` or the trimmed title is blank
    /// or unchanged.
    pub async fn rename_entry(&self, id: &str, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        self.update_entry(id, |entry| {
            if entry.title == title {
                return false;
            }
            entry.title = title.to_string();
            true
        })
        .await
    }

    /// Stores user edits of a generated document.
    pub async fn replace_content(&self, id: &str, content: GenerationResult) -> bool {
        self.update_entry(id, move |entry| {
            entry.content = content;
            true
        })
        .await
    }

    pub async fn delete_entry(&self, id: &str) -> bool {
        let mut history = self.history().await;
        let before = history.len();
        history.retain(|entry| entry.id != id);
        if history.len() == before {
            return false;
        }
        self.write_json(HISTORY_KEY, &history).await;
        true
    }

    pub async fn clear_history(&self) {
        if let Err(e) = self.storage.remove(HISTORY_KEY).await {
            log::warn!("Failed to clear history: {:#}", e);
        }
    }

    /// `change` returns whether it modified the entry.
    async fn update_entry(&self, id: &str, change: impl FnOnce(&mut HistoryEntry) -> bool) -> bool {
        let mut history = self.history().await;
        let Some(entry) = history.iter_mut().find(|entry| entry.id == id) else {
            return false;
        };
        if !change(entry) {
            return false;
        }
        self.write_json(HISTORY_KEY, &history).await;
        true
    }

    /// Writes the latest `snapshot` every `period` until `cancel` fires.
    pub async fn autosave(
        &self,
        snapshot: Arc<RwLock<DocumentConfiguration>>,
        period: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            if cancel.run_until_cancelled(sleep(period)).await.is_none() {
                log::debug!("Autosave stopped");
                return;
            }
            let current = match snapshot.read() {
                Ok(guard) => guard.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            };
            self.save_configuration(&current).await;
        }
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to read \"{}\": {:#}", key, e);
                None
            }
        }
    }

    async fn write_json<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = self.try_write_json(key, value).await {
            log::warn!("Failed to save \"{}\": {:#}", key, e);
        }
    }

    async fn try_write_json<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).with_context(|| format!("serializing {}", key))?;
        self.storage.set(key, &json).await
    }
}

/// Creation time in milliseconds, bumped past any id already in use.
fn unique_id(history: &[HistoryEntry]) -> String {
    let mut id = now_millis();
    while history.iter().any(|entry| entry.id == id.to_string()) {
        id += 1;
    }
    id.to_string()
}
