//! Towerlab Catalog - built-in calculation catalogs
//!
//! Two fixed rule sets, built once and shared:
//! - [`tower_catalog`] - buffed combat stats, cumulative cost, damage per
//!   second by attack style, spawned unit damage and cost efficiency
//! - [`unit_catalog`] - buffed unit stats and unit damage per second
//!
//! Numeric edge cases follow the balance sheet conventions: a spawn interval
//! of 0.1 s or less is continuous (`inf`), a rate of exactly zero is "not
//! applicable" (`NaN`), and efficiencies that cannot be computed are `NaN`.

pub mod formulas;
pub mod tower;
pub mod unit;

pub use tower::{build_tower_catalog, tower_catalog};
pub use unit::{build_unit_catalog, unit_catalog};
