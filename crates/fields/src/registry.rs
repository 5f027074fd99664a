use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::field::{default_fields, ExtractField};
use crate::storage::{KeyValueStore, Result};

pub const FIELDS_KEY: &str = "website-whisper-fields";

/// Default fields plus the user's custom fields.
///
/// Storage failures never reach the caller. The registry keeps a session
/// copy of the custom list and serves it whenever the store can't be read,
/// or while the latest change is still unsaved, so an add or remove stays
/// visible for the rest of the session even if it was never persisted.
pub struct FieldRegistry {
    store: Arc<dyn KeyValueStore>,
    session: Mutex<Option<Vec<ExtractField>>>,
    unsaved: AtomicBool,
}

impl FieldRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            session: Mutex::new(None),
            unsaved: AtomicBool::new(false),
        }
    }

    /// Defaults first, then custom fields. Custom entries whose id collides
    /// with a default, or with an earlier custom entry, are dropped.
    pub async fn list_fields(&self) -> Vec<ExtractField> {
        let mut fields = default_fields();
        let mut seen: HashSet<String> = fields.iter().map(|f| f.id.clone()).collect();

        for field in self.custom_fields().await {
            if seen.insert(field.id.clone()) {
                fields.push(field);
            }
        }

        fields
    }

    pub async fn custom_fields(&self) -> Vec<ExtractField> {
        self.current().await
    }

    /// Append a custom field. Adding an id that is already stored is a no-op.
    pub async fn add_field(&self, field: ExtractField) {
        let mut fields = self.current().await;
        if fields.iter().any(|f| f.id == field.id) {
            debug!(id = %field.id, "Field already present, skipping");
            return;
        }

        fields.push(field);
        self.remember(fields.clone());
        self.persist(&fields).await;
    }

    /// Remove a custom field by id. Unknown ids (defaults included) change nothing.
    pub async fn remove_field(&self, id: &str) {
        let fields = self.current().await;
        if !fields.iter().any(|f| f.id == id) {
            debug!(id, "Field not in custom list, nothing to remove");
            return;
        }

        let remaining: Vec<ExtractField> = fields.into_iter().filter(|f| f.id != id).collect();
        self.remember(remaining.clone());
        self.persist(&remaining).await;
    }

    async fn load(&self) -> Result<Vec<ExtractField>> {
        match self.store.get(FIELDS_KEY).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    async fn current(&self) -> Vec<ExtractField> {
        if self.unsaved.load(Ordering::SeqCst) {
            return self.session_copy();
        }

        match self.load().await {
            Ok(fields) => {
                self.remember(fields.clone());
                fields
            }
            Err(e) => {
                warn!(error = %e, "Failed to read custom fields, using session copy");
                self.session_copy()
            }
        }
    }

    async fn persist(&self, fields: &[ExtractField]) {
        let json = match serde_json::to_string(fields) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize custom fields");
                self.unsaved.store(true, Ordering::SeqCst);
                return;
            }
        };

        match self.store.set(FIELDS_KEY, &json).await {
            Ok(()) => self.unsaved.store(false, Ordering::SeqCst),
            Err(e) => {
                warn!(error = %e, "Failed to persist custom fields, keeping them for this session only");
                self.unsaved.store(true, Ordering::SeqCst);
            }
        }
    }

    fn remember(&self, fields: Vec<ExtractField>) {
        if let Ok(mut session) = self.session.lock() {
            *session = Some(fields);
        }
    }

    fn session_copy(&self) -> Vec<ExtractField> {
        self.session
            .lock()
            .ok()
            .and_then(|s| s.clone())
            .unwrap_or_default()
    }
}
