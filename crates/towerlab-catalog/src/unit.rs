//! Unit calculations
//!
//! Spawned units are buffed through the `units` role and only derive their
//! own damage output. Towers read the result through a unit lookup.

use crate::formulas::{buffed_cooldown, component_sum, missile_dps, scale};
use std::sync::{Arc, LazyLock};
use towerlab_core::{Catalog, FieldRule, LevelView, Result, Value, Variant};

/// Units that fire in bursts
pub const BURST_UNITS: [&str; 2] = ["Humvee", "Mercenary"];

static UNIT_CATALOG: LazyLock<Arc<Catalog>> =
    LazyLock::new(|| Arc::new(build_unit_catalog().unwrap()));

/// The shared unit catalog
pub fn unit_catalog() -> Arc<Catalog> {
    Arc::clone(&UNIT_CATALOG)
}

/// Build the unit catalog
pub fn build_unit_catalog() -> Result<Catalog> {
    Catalog::new(
        "units",
        vec![
            FieldRule::overriding("Health").with_default(Variant::overriding(health)),
            FieldRule::overriding("Cooldown").with_default(Variant::overriding(cooldown)),
            FieldRule::overriding("Damage").with_default(Variant::overriding(damage)),
            FieldRule::overriding("Range").with_default(Variant::overriding(range)),
            FieldRule::calculated("DPS")
                .depends_on(&["Damage", "Cooldown"])
                .variant(
                    Variant::calculated(burst_dps)
                        .for_types(&BURST_UNITS)
                        .requires(&["Damage", "Cooldown", "Burst", "BurstCooldown"]),
                )
                .with_default(Variant::calculated(direct_dps).requires(&["Damage", "Cooldown"])),
            FieldRule::calculated("MissileDPS").with_default(
                Variant::calculated(unit_missile_dps)
                    .requires(&["MissileDamage", "MissileCooldown"]),
            ),
            FieldRule::calculated("TotalDPS")
                .depends_on(&["DPS", "MissileDPS"])
                .with_default(Variant::calculated(total_dps)),
        ],
    )
}

fn health(value: Value, level: &LevelView<'_>) -> Value {
    let buff = level.buffs().units.health;
    scale(value, |h| h * (1.0 + buff))
}

fn cooldown(value: Value, level: &LevelView<'_>) -> Value {
    let buffs = &level.buffs().units;
    scale(value, |c| buffed_cooldown(c, buffs))
}

fn damage(value: Value, level: &LevelView<'_>) -> Value {
    let buff = level.buffs().units.damage;
    scale(value, |d| d * (1.0 + buff))
}

fn range(value: Value, level: &LevelView<'_>) -> Value {
    let buff = level.buffs().units.range;
    scale(value, |r| r * (1.0 + buff))
}

fn direct_dps(level: &LevelView<'_>) -> Value {
    Value::Float(level.number("Damage") / level.number("Cooldown"))
}

fn burst_dps(level: &LevelView<'_>) -> Value {
    let burst = level.number("Burst");
    let cycle = level.number("Cooldown") * burst + level.number("BurstCooldown");
    Value::Float(level.number("Damage") * burst / cycle)
}

fn unit_missile_dps(level: &LevelView<'_>) -> Value {
    Value::Float(missile_dps(level, level.buffs().units.damage))
}

fn total_dps(level: &LevelView<'_>) -> Value {
    Value::Float(component_sum(level, &["DPS", "MissileDPS"]))
}
