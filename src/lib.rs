//! Draft analytics core: turns historical game records into champion
//! statistics, pair synergies and ranked pick/ban predictions.

pub mod analysis;
pub mod api;
pub mod cache;
pub mod champions;
pub mod config;
pub mod display;
pub mod draft;
pub mod engine;
pub mod error;
pub mod store;

pub use champions::{Champion, ChampionCatalog, ChampionId, ChampionRef, Role};
pub use config::{Config, ScoringSettings};
pub use engine::DraftEngine;
pub use error::AppError;
pub use store::{GameRecord, JsonRecordStore, MemoryRecordStore, RecordCursor, RecordStore, Side};
