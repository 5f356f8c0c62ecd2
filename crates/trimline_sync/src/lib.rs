pub mod autosave;
pub mod config;
pub mod error;
pub mod persistence;
pub mod save_flow;
pub mod thumbnails;

pub use autosave::{AutoSave, AutoSaveHandle, SaveStatus};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use persistence::{HttpPersistence, TrimPersistence};
