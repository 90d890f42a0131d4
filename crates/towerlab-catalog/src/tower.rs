//! Tower calculations
//!
//! Buffed overrides of the stored combat stats, cumulative cost, damage per
//! second for every attack style, and cost efficiency. Towers that spawn
//! units read the unit's own `TotalDPS` through the [`UnitSource`] in the
//! evaluation context.
//!
//! [`UnitSource`]: towerlab_core::UnitSource

use crate::formulas::{
    aggregate_dps, buffed_cooldown, component_sum, finite_or_nan, missile_dps, nan_if_zero, scale,
};
use std::sync::{Arc, LazyLock};
use towerlab_core::{Catalog, FieldRule, LevelView, Result, Subject, Value, Variant};

/// Towers with no direct damage of their own
pub const SUPPORT_TOWERS: [&str; 5] = [
    "Farm",
    "DJ Booth",
    "Commander",
    "Military Base",
    "Mercenary Base",
];

/// Components summed into `TotalDPS`
pub const DPS_COMPONENTS: [&str; 5] = [
    "DPS",
    "BurnDPS",
    "PoisonDPS",
    "MissileDPS",
    "AggregateUnitDPS",
];

static TOWER_CATALOG: LazyLock<Arc<Catalog>> =
    LazyLock::new(|| Arc::new(build_tower_catalog().unwrap()));

/// The shared tower catalog
pub fn tower_catalog() -> Arc<Catalog> {
    Arc::clone(&TOWER_CATALOG)
}

/// Build the tower catalog
pub fn build_tower_catalog() -> Result<Catalog> {
    Catalog::new(
        "towers",
        vec![
            FieldRule::overriding("Cooldown").with_default(Variant::overriding(cooldown)),
            FieldRule::overriding("Damage").with_default(Variant::overriding(damage)),
            FieldRule::overriding("Range").with_default(Variant::overriding(range)),
            FieldRule::overriding("Cost").with_default(Variant::overriding(cost)),
            FieldRule::overriding("Spawnrate").with_default(Variant::overriding(spawnrate)),
            FieldRule::calculated("NetCost")
                .depends_on(&["Cost"])
                .with_default(Variant::calculated(net_cost).requires(&["Cost"])),
            FieldRule::calculated("LimitNetCost")
                .depends_on(&["NetCost"])
                .with_default(Variant::calculated(limit_net_cost).requires(&["Cost", "Limit"])),
            FieldRule::calculated("DPS")
                .depends_on(&["Damage", "Cooldown"])
                .variant(
                    Variant::calculated(fire_dps)
                        .for_types(&["Elementalist"])
                        .subtype(is_fire)
                        .requires(&["Damage", "Cooldown", "BurnDamage", "BurnTick"]),
                )
                .variant(
                    Variant::calculated(direct_dps)
                        .for_types(&["Elementalist"])
                        .requires(&["Damage", "Cooldown"]),
                )
                .variant(
                    Variant::calculated(shotgun_dps)
                        .for_types(&["Shotgunner"])
                        .requires(&["Damage", "Cooldown", "Bullets"]),
                )
                .variant(
                    Variant::calculated(burst_dps)
                        .for_types(&["Minigunner", "Turret"])
                        .requires(&["Damage", "Cooldown", "MaxAmmo", "ReloadTime"]),
                )
                .with_default(
                    Variant::calculated(direct_dps)
                        .requires(&["Damage", "Cooldown"])
                        .exclude(&SUPPORT_TOWERS),
                ),
            FieldRule::calculated("BurnDPS").with_default(
                Variant::calculated(burn_dps)
                    .requires(&["BurnDamage", "BurnTick"])
                    .exclude(&["Elementalist"]),
            ),
            FieldRule::calculated("PoisonDPS").with_default(
                Variant::calculated(poison_dps).requires(&["PoisonDamage", "PoisonTick"]),
            ),
            FieldRule::calculated("MissileDPS").with_default(
                Variant::calculated(tower_missile_dps)
                    .requires(&["MissileDamage", "MissileCooldown"]),
            ),
            FieldRule::calculated("UnitDPS")
                .with_default(Variant::calculated(unit_dps).requires(&["UnitToSend"])),
            FieldRule::calculated("AggregateUnitDPS")
                .depends_on(&["UnitDPS", "Spawnrate"])
                .with_default(
                    Variant::calculated(aggregate_unit_dps).requires(&["UnitToSend", "Spawnrate"]),
                ),
            FieldRule::calculated("TotalDPS")
                .depends_on(&DPS_COMPONENTS)
                .with_default(Variant::calculated(total_dps).exclude(&["Farm", "DJ Booth"])),
            FieldRule::calculated("CostEfficiency")
                .depends_on(&["NetCost", "TotalDPS"])
                .variant(
                    Variant::calculated(farm_efficiency)
                        .for_types(&["Farm"])
                        .requires(&["Income"]),
                )
                .with_default(
                    Variant::calculated(cost_efficiency)
                        .requires(&["Cost"])
                        .exclude(&["DJ Booth"]),
                ),
        ],
    )
}

fn cooldown(value: Value, level: &LevelView<'_>) -> Value {
    let buffs = &level.buffs().towers;
    scale(value, |c| buffed_cooldown(c, buffs))
}

fn damage(value: Value, level: &LevelView<'_>) -> Value {
    let buff = level.buffs().towers.damage;
    scale(value, |d| d * (1.0 + buff))
}

fn range(value: Value, level: &LevelView<'_>) -> Value {
    let buff = level.buffs().towers.range;
    scale(value, |r| r * (1.0 + buff))
}

fn cost(value: Value, level: &LevelView<'_>) -> Value {
    let discount = level.buffs().towers.discount;
    scale(value, |c| c * (1.0 - discount))
}

fn spawnrate(value: Value, level: &LevelView<'_>) -> Value {
    let buff = level.buffs().units.spawnrate;
    scale(value, |s| s / (1.0 + buff))
}

fn net_cost(level: &LevelView<'_>) -> Value {
    let total: f64 = (0..=level.index())
        .filter_map(|i| level.at(i))
        .map(|rung| rung.number_or("Cost", 0.0))
        .sum();
    Value::Float(total)
}

fn limit_net_cost(level: &LevelView<'_>) -> Value {
    Value::Float(level.number("NetCost") * level.number("Limit"))
}

fn is_fire(subject: &Subject<'_>) -> bool {
    subject.has_attribute("BurnDamage")
}

fn direct_dps(level: &LevelView<'_>) -> Value {
    Value::Float(level.number("Damage") / level.number("Cooldown"))
}

fn fire_dps(level: &LevelView<'_>) -> Value {
    let direct = level.number("Damage") / level.number("Cooldown");
    let burn = level.number("BurnDamage") / level.number("BurnTick");
    Value::Float(direct + burn)
}

fn shotgun_dps(level: &LevelView<'_>) -> Value {
    Value::Float(level.number("Damage") * level.number("Bullets") / level.number("Cooldown"))
}

fn burst_dps(level: &LevelView<'_>) -> Value {
    let ammo = level.number("MaxAmmo");
    let cycle = ammo * level.number("Cooldown") + level.number("ReloadTime");
    Value::Float(level.number("Damage") * ammo / cycle)
}

fn burn_dps(level: &LevelView<'_>) -> Value {
    Value::Float(nan_if_zero(level.number("BurnDamage") / level.number("BurnTick")))
}

fn poison_dps(level: &LevelView<'_>) -> Value {
    Value::Float(nan_if_zero(level.number("PoisonDamage") / level.number("PoisonTick")))
}

fn tower_missile_dps(level: &LevelView<'_>) -> Value {
    Value::Float(missile_dps(level, level.buffs().towers.damage))
}

fn unit_dps(level: &LevelView<'_>) -> Value {
    let dps = level
        .text("UnitToSend")
        .zip(level.units())
        .and_then(|(unit, units)| units.unit_value(&unit, "TotalDPS", level.buffs()))
        .and_then(|v| v.as_float());
    if dps.is_none() {
        tracing::trace!(level = level.index(), "no unit statistics for spawned unit");
    }
    Value::Float(dps.unwrap_or(f64::NAN))
}

fn aggregate_unit_dps(level: &LevelView<'_>) -> Value {
    Value::Float(aggregate_dps(level.number("UnitDPS"), level.number("Spawnrate")))
}

fn total_dps(level: &LevelView<'_>) -> Value {
    Value::Float(component_sum(level, &DPS_COMPONENTS))
}

fn farm_efficiency(level: &LevelView<'_>) -> Value {
    Value::Float(finite_or_nan(level.number("NetCost") / level.number("Income")))
}

fn cost_efficiency(level: &LevelView<'_>) -> Value {
    Value::Float(finite_or_nan(level.number("NetCost") / level.number("TotalDPS")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use towerlab_core::{BuffState, EvalContext, SkinData, UnitSource};

    struct FixedUnits(f64);

    impl UnitSource for FixedUnits {
        fn unit_value(&self, unit: &str, field: &str, _buffs: &BuffState) -> Option<Value> {
            (unit == "Humvee" && field == "TotalDPS").then_some(Value::Float(self.0))
        }
    }

    fn tower(entity: &str, raw: serde_json::Value) -> SkinData {
        SkinData::new(entity, "Default", raw, tower_catalog()).unwrap()
    }

    fn number(skin: &SkinData, level: usize, name: &str, ctx: &EvalContext<'_>) -> f64 {
        skin.value(level, name, ctx).and_then(|v| v.as_float()).unwrap()
    }

    fn scout() -> SkinData {
        tower(
            "Scout",
            json!({
                "Defaults": {
                    "Damage": 2,
                    "Cooldown": 1,
                    "Range": 10,
                    "Price": 200,
                    "Attributes": { "Limit": 4 },
                },
                "Upgrades": [
                    { "Cost": 100, "Stats": { "Damage": 4 } },
                    { "Cost": 300, "Stats": { "Cooldown": 0.5 } },
                ],
            }),
        )
    }

    #[test]
    fn test_catalog_builds_in_dependency_order() {
        let catalog = build_tower_catalog().unwrap();
        let order: Vec<&str> = catalog.ordered_rules().map(|r| r.name()).collect();
        let position = |name: &str| order.iter().position(|n| *n == name).unwrap();

        assert!(position("Damage") < position("DPS"));
        assert!(position("Cost") < position("NetCost"));
        assert!(position("NetCost") < position("LimitNetCost"));
        assert!(position("UnitDPS") < position("AggregateUnitDPS"));
        for component in DPS_COMPONENTS {
            assert!(position(component) < position("TotalDPS"), "{component}");
        }
        assert!(position("TotalDPS") < position("CostEfficiency"));
    }

    #[test]
    fn test_scout_ladder() {
        let skin = scout();
        let buffs = BuffState::none();
        let ctx = EvalContext::new(&buffs);

        assert_eq!(number(&skin, 0, "DPS", &ctx), 2.0);
        assert_eq!(number(&skin, 1, "DPS", &ctx), 4.0);
        assert_eq!(number(&skin, 2, "DPS", &ctx), 8.0);
        assert_eq!(number(&skin, 2, "TotalDPS", &ctx), 8.0);

        assert_eq!(number(&skin, 0, "NetCost", &ctx), 200.0);
        assert_eq!(number(&skin, 1, "NetCost", &ctx), 300.0);
        assert_eq!(number(&skin, 2, "NetCost", &ctx), 600.0);
        assert_eq!(number(&skin, 2, "LimitNetCost", &ctx), 2400.0);
        assert_eq!(number(&skin, 2, "CostEfficiency", &ctx), 75.0);

        assert_eq!(skin.value(0, "BurnDPS", &ctx), None);
        assert_eq!(skin.value(0, "UnitDPS", &ctx), None);
    }

    #[test]
    fn test_buffs_apply_on_read() {
        let skin = scout();
        let mut buffs = BuffState::none();
        buffs.towers.firerate = 1.0;
        buffs.towers.damage = 0.5;
        buffs.towers.discount = 0.5;
        buffs.towers.range = 0.5;
        let ctx = EvalContext::new(&buffs);

        assert_eq!(number(&skin, 0, "Cooldown", &ctx), 0.5);
        assert_eq!(number(&skin, 0, "Damage", &ctx), 3.0);
        assert_eq!(number(&skin, 0, "DPS", &ctx), 6.0);
        assert_eq!(number(&skin, 0, "Cost", &ctx), 100.0);
        assert_eq!(number(&skin, 1, "NetCost", &ctx), 150.0);
        assert_eq!(number(&skin, 0, "Range", &ctx), 15.0);

        // stored values are untouched
        assert_eq!(skin.levels().get(0).unwrap().get("Damage"), Some(&Value::Int(2)));
        let plain = BuffState::none();
        assert_eq!(number(&skin, 0, "DPS", &EvalContext::new(&plain)), 2.0);
    }

    #[test]
    fn test_elementalist_subtypes() {
        let fire = tower(
            "Elementalist",
            json!({ "Defaults": { "Damage": 4, "Cooldown": 2, "BurnDamage": 3, "BurnTick": 1 } }),
        );
        let frost = tower(
            "Elementalist",
            json!({ "Defaults": { "Damage": 4, "Cooldown": 2, "Slowness": 0.3 } }),
        );
        let buffs = BuffState::none();
        let ctx = EvalContext::new(&buffs);

        assert_eq!(number(&fire, 0, "DPS", &ctx), 5.0);
        // burn is already part of the fire DPS
        assert_eq!(fire.value(0, "BurnDPS", &ctx), None);
        assert_eq!(number(&fire, 0, "TotalDPS", &ctx), 5.0);
        assert_eq!(number(&frost, 0, "DPS", &ctx), 2.0);
    }

    #[test]
    fn test_attack_styles() {
        let buffs = BuffState::none();
        let ctx = EvalContext::new(&buffs);

        let shotgunner = tower(
            "Shotgunner",
            json!({ "Defaults": { "Damage": 2, "Cooldown": 1, "Attributes": { "Bullets": 5 } } }),
        );
        assert_eq!(number(&shotgunner, 0, "DPS", &ctx), 10.0);

        let minigunner = tower(
            "Minigunner",
            json!({
                "Defaults": {
                    "Damage": 1,
                    "Cooldown": 0.1,
                    "Attributes": { "MaxAmmo": 100, "ReloadTime": 10 },
                },
            }),
        );
        assert_eq!(number(&minigunner, 0, "DPS", &ctx), 5.0);

        let ranger = tower(
            "Ranger",
            json!({ "Defaults": { "Damage": 10, "Cooldown": 5, "PoisonDamage": 2, "PoisonTick": 0.5,
                                  "MissileDamage": 6, "MissileAmount": 2, "MissileCooldown": 4 } }),
        );
        assert_eq!(number(&ranger, 0, "PoisonDPS", &ctx), 4.0);
        assert_eq!(number(&ranger, 0, "MissileDPS", &ctx), 3.0);
        assert_eq!(number(&ranger, 0, "TotalDPS", &ctx), 9.0);
    }

    #[test]
    fn test_requires_gating() {
        let shotgunner = tower(
            "Shotgunner",
            json!({
                "Defaults": { "Damage": 2, "Cooldown": 1 },
                "Upgrades": [ { "Cost": 10, "Stats": {} } ],
            }),
        );
        let buffs = BuffState::none();
        let ctx = EvalContext::new(&buffs);

        assert!(!shotgunner.levels().attributes().contains("DPS"));
        for level in 0..shotgunner.levels().len() {
            assert_eq!(shotgunner.value(level, "DPS", &ctx), None);
        }
    }

    #[test]
    fn test_support_towers() {
        let buffs = BuffState::none();
        let ctx = EvalContext::new(&buffs);

        let farm = tower(
            "Farm",
            json!({
                "Defaults": { "Price": 250, "Attributes": { "Income": 50 } },
                "Upgrades": [ { "Cost": 200, "Stats": { "Attributes": { "Income": 100 } } } ],
            }),
        );
        assert_eq!(farm.value(0, "DPS", &ctx), None);
        assert_eq!(farm.value(0, "TotalDPS", &ctx), None);
        assert_eq!(number(&farm, 0, "CostEfficiency", &ctx), 5.0);
        assert_eq!(number(&farm, 1, "CostEfficiency", &ctx), 4.5);

        // income alone selects the farm formula; a missing cost is NaN
        let free_farm = tower("Farm", json!({ "Defaults": { "Attributes": { "Income": 50 } } }));
        assert_eq!(free_farm.value(0, "NetCost", &ctx), None);
        assert!(number(&free_farm, 0, "CostEfficiency", &ctx).is_nan());

        let booth = tower("DJ Booth", json!({ "Defaults": { "Price": 900, "Range": 12 } }));
        assert_eq!(booth.value(0, "CostEfficiency", &ctx), None);
        assert_eq!(booth.value(0, "TotalDPS", &ctx), None);
    }

    #[test]
    fn test_zero_dps_efficiency_is_nan() {
        let pacifist = tower(
            "Scout",
            json!({ "Defaults": { "Damage": 0, "Cooldown": 1, "Price": 100 } }),
        );
        let buffs = BuffState::none();
        let ctx = EvalContext::new(&buffs);

        assert_eq!(number(&pacifist, 0, "DPS", &ctx), 0.0);
        assert!(number(&pacifist, 0, "TotalDPS", &ctx).is_nan());
        assert!(number(&pacifist, 0, "CostEfficiency", &ctx).is_nan());
    }

    #[test]
    fn test_spawner_towers() {
        let raw = json!({
            "Defaults": {
                "Price": 1000,
                "Attributes": { "UnitToSend": "Humvee", "Spawnrate": 30 },
            },
            "Upgrades": [ { "Cost": 500, "Stats": { "Attributes": { "Spawnrate": 0.1 } } } ],
        });
        let base = tower("Military Base", raw);
        let units = FixedUnits(10.0);
        let buffs = BuffState::none();
        let ctx = EvalContext::new(&buffs).with_units(&units);

        assert_eq!(base.value(0, "DPS", &ctx), None);
        assert_eq!(number(&base, 0, "UnitDPS", &ctx), 10.0);
        assert_eq!(number(&base, 0, "AggregateUnitDPS", &ctx), 15.0);
        assert_eq!(number(&base, 0, "TotalDPS", &ctx), 15.0);
        assert_eq!(number(&base, 0, "CostEfficiency", &ctx), 1000.0 / 15.0);

        // a 0.1 s spawn interval is continuous
        assert_eq!(number(&base, 1, "AggregateUnitDPS", &ctx), f64::INFINITY);
        assert_eq!(number(&base, 1, "TotalDPS", &ctx), f64::INFINITY);
        assert_eq!(number(&base, 1, "CostEfficiency", &ctx), 0.0);

        // the spawn-rate buff shortens the interval
        let mut faster = BuffState::none();
        faster.units.spawnrate = 1.0;
        let ctx = EvalContext::new(&faster).with_units(&units);
        assert_eq!(number(&base, 0, "Spawnrate", &ctx), 15.0);

        // without a unit lookup the unit numbers are unknown
        let ctx = EvalContext::new(&buffs);
        assert!(number(&base, 0, "UnitDPS", &ctx).is_nan());
    }
}
