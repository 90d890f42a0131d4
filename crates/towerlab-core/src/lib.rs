//! Towerlab Core - derived statistics for tower defense balance data
//!
//! This crate turns hand-authored tower and unit records into upgrade
//! ladders with calculated columns:
//! - Dynamic attribute values (`Value`, `ValueMap`)
//! - Attribute location tracking across raw data shapes (`Locator`)
//! - Stat blocks for defaults and upgrades (`Defaults`, `Upgrade`)
//! - Forward-filled ladders evaluated on read (`Levels`, `LevelView`)
//! - A rule engine selecting one formula per derived field (`Catalog`)
//! - Skins and entities that rebuild on every edit (`SkinData`, `Entity`)
//!
//! ## Evaluation
//!
//! Stored values never change behind the caller's back. Calculated fields
//! are pure functions of a level and an [`EvalContext`] holding the active
//! [`BuffState`], so the same ladder can be read under different buffs:
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use towerlab_core::{BuffState, Catalog, EvalContext, FieldRule, SkinData, Value, Variant};
//!
//! let catalog = Catalog::new("towers", vec![
//!     FieldRule::overriding("Damage").with_default(Variant::overriding(|damage, level| {
//!         let buff = level.buffs().towers.damage;
//!         Value::Float(damage.as_float().unwrap_or(f64::NAN) * (1.0 + buff))
//!     })),
//! ])
//! .unwrap();
//!
//! let skin = SkinData::new(
//!     "Scout",
//!     "Default",
//!     json!({ "Defaults": { "Damage": 10, "Cooldown": 1 } }),
//!     Arc::new(catalog),
//! )
//! .unwrap();
//!
//! let mut buffs = BuffState::none();
//! assert_eq!(skin.value(0, "Damage", &EvalContext::new(&buffs)), Some(Value::Float(10.0)));
//! buffs.towers.damage = 0.5;
//! assert_eq!(skin.value(0, "Damage", &EvalContext::new(&buffs)), Some(Value::Float(15.0)));
//! ```

pub mod base_stats;
mod buffs;
mod context;
mod entity;
mod error;
pub mod format;
pub mod level;
pub mod locator;
pub mod rules;
pub mod skin;
mod value;

pub use base_stats::{BaseStats, BlockKind, Defaults, StatBlock, Upgrade};
pub use buffs::{BuffState, RoleBuffs};
pub use context::{EvalContext, Subject, UnitSource};
pub use entity::{Entity, DEFAULT_SKIN};
pub use error::{Error, Result};
pub use level::{AttachedField, FieldKind, Formula, Level, LevelView, Levels, LEVEL};
pub use locator::{Location, Locator};
pub use rules::{select, validate, Catalog, FieldRule, Variant};
pub use skin::{recompute, SkinData};
pub use value::{Value, ValueMap};
