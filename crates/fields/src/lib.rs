pub mod field;
pub mod registry;
pub mod settings;
pub mod storage;

pub use field::{default_fields, ExtractField, DEFAULT_EXTRACT_FIELDS};
pub use registry::FieldRegistry;
pub use settings::{Model, Settings, SettingsStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, TieredStore};
