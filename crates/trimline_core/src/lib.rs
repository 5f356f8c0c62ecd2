pub mod config;
pub mod controller;
pub mod editing;
pub mod editor;
pub mod error;
pub mod events;
pub mod gate;
pub mod history;
pub mod media;
pub mod resolver;
pub mod snapping;
pub mod store;
pub mod timefmt;
pub mod types;
pub mod wire;

pub use config::EditorConfig;
pub use editor::{SaveScheduler, TrimEditor};
pub use error::{CoreError, Result};
pub use types::{Segment, SegmentId};
