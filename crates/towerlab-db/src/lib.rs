//! Towerlab DB - persistence and entity managers using native_db
//!
//! Provides:
//! - A store of raw entity catalogs as JSON documents, keyed by storage key
//! - Entity managers loading from the store or the built-in data
//! - The unit lookup towers use for spawned unit statistics
//! - RON settings (database path, buffs, default skin)

mod error;
mod manager;
mod models;
mod queries;
mod settings;
mod store;

pub use error::{Error, Result};
pub use manager::{
    EntityManager, Source, TowerManager, UnitManager, BUILTIN_TOWERS, BUILTIN_UNITS, TOWERS_KEY,
    UNITS_KEY,
};
pub use settings::Settings;
pub use store::Store;
