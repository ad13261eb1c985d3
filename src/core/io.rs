use async_trait::async_trait;
use anyhow::Result;

#[cfg(target_arch = "wasm32")]
pub trait StorageBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> StorageBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait StorageBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> StorageBounds for T {}

/// String key-value persistence used for saved session state.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Storage: StorageBounds {
    /// `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

// --- In-memory Implementation ---

#[derive(Default)]
pub struct MemoryStorage {
    entries: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, std::collections::HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

// --- Native Implementation ---

/// Stores each key as `<root>/<key>.json`.
#[cfg(not(target_arch = "wasm32"))]
pub struct NativeStorage {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl NativeStorage {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> std::path::PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
impl Storage for NativeStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(tokio::fs::read_to_string(&path).await?))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.path_for(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if tokio::fs::try_exists(&path).await? {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }
}

// --- Web Implementation ---

#[cfg(target_arch = "wasm32")]
use idb::{Factory, ObjectStoreParams, TransactionMode};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;
#[cfg(target_arch = "wasm32")]
use anyhow::anyhow;

#[cfg(target_arch = "wasm32")]
const DB_NAME: &str = "manuscriptgen_db";
#[cfg(target_arch = "wasm32")]
const STORE_NAME: &str = "session";

/// IndexedDB-backed storage for the browser build.
#[cfg(target_arch = "wasm32")]
pub struct WebStorage {
    db: idb::Database,
}

#[cfg(target_arch = "wasm32")]
impl WebStorage {
    pub async fn new() -> Result<Self> {
        let factory = Factory::new().map_err(|e| anyhow!("Failed to create factory: {:?}", e))?;
        let mut open_request = factory.open(DB_NAME, Some(1)).map_err(|e| anyhow!("Failed to open DB: {:?}", e))?;

        open_request.on_upgrade_needed(|event| {
            let db = match event.database() {
                Ok(db) => db,
                Err(e) => {
                    log::error!("Upgrade without database: {:?}", e);
                    return;
                }
            };
            if !db.store_names().iter().any(|n| n.as_str() == STORE_NAME) {
                if let Err(e) = db.create_object_store(STORE_NAME, ObjectStoreParams::new()) {
                    log::error!("Failed to create object store: {:?}", e);
                }
            }
        });

        let db = open_request.await.map_err(|e| anyhow!("Failed to await DB open: {:?}", e))?;
        Ok(Self { db })
    }
}

#[cfg(target_arch = "wasm32")]
#[async_trait(?Send)]
impl Storage for WebStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let transaction = self.db.transaction(&[STORE_NAME], TransactionMode::ReadOnly)
            .map_err(|e| anyhow!("Tx error: {:?}", e))?;
        let store = transaction.object_store(STORE_NAME).map_err(|e| anyhow!("Store error: {:?}", e))?;

        let value = store.get(JsValue::from_str(key))
            .map_err(|e| anyhow!("Get error: {:?}", e))?
            .await
            .map_err(|e| anyhow!("Get await error: {:?}", e))?;

        Ok(value.and_then(|v| v.as_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let transaction = self.db.transaction(&[STORE_NAME], TransactionMode::ReadWrite)
            .map_err(|e| anyhow!("Tx error: {:?}", e))?;
        let store = transaction.object_store(STORE_NAME).map_err(|e| anyhow!("Store error: {:?}", e))?;

        store.put(&JsValue::from_str(value), Some(&JsValue::from_str(key)))
            .map_err(|e| anyhow!("Put error: {:?}", e))?
            .await
            .map_err(|e| anyhow!("Put await error: {:?}", e))?;

        transaction.commit()
            .map_err(|e| anyhow!("Commit error: {:?}", e))?
            .await
            .map_err(|e| anyhow!("Commit await error: {:?}", e))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let transaction = self.db.transaction(&[STORE_NAME], TransactionMode::ReadWrite)
            .map_err(|e| anyhow!("Tx error: {:?}", e))?;
        let store = transaction.object_store(STORE_NAME).map_err(|e| anyhow!("Store error: {:?}", e))?;

        store.delete(JsValue::from_str(key))
            .map_err(|e| anyhow!("Delete error: {:?}", e))?
            .await
            .map_err(|e| anyhow!("Delete await error: {:?}", e))?;

        transaction.commit()
            .map_err(|e| anyhow!("Commit error: {:?}", e))?
            .await
            .map_err(|e| anyhow!("Commit await error: {:?}", e))?;
        Ok(())
    }
}
