//! Numeric helpers shared by the tower and unit catalogs

use towerlab_core::{LevelView, RoleBuffs, Value};

/// Spawn intervals at or below this are treated as continuous
pub const CONTINUOUS_SPAWNRATE: f64 = 0.1;
/// Window over which spawned unit damage is averaged, in seconds
pub const AGGREGATE_WINDOW: f64 = 60.0;

/// Apply `f` to a numeric value; other values pass through
pub fn scale(value: Value, f: impl FnOnce(f64) -> f64) -> Value {
    match value.as_float() {
        Some(x) => Value::Float(f(x)),
        None => value,
    }
}

/// Cooldown after fire-rate buff and flat offsets
pub fn buffed_cooldown(cooldown: f64, buffs: &RoleBuffs) -> f64 {
    cooldown / (1.0 + buffs.firerate) + buffs.extra_cooldown + buffs.rate_of_fire_bug
}

/// `NaN` for an exact zero
pub fn nan_if_zero(x: f64) -> f64 {
    if x == 0.0 {
        f64::NAN
    } else {
        x
    }
}

/// `NaN` for anything non-finite
pub fn finite_or_nan(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        f64::NAN
    }
}

/// Sum the named components, skipping absent and `NaN` ones
///
/// Infinity propagates. A total of exactly zero means nothing applied and
/// reads as `NaN`.
pub fn component_sum(level: &LevelView<'_>, components: &[&str]) -> f64 {
    let total: f64 = components
        .iter()
        .map(|name| level.number(name))
        .filter(|x| !x.is_nan())
        .sum();
    nan_if_zero(total)
}

/// Missile damage per second for the given damage buff
pub fn missile_dps(level: &LevelView<'_>, damage_buff: f64) -> f64 {
    let damage = level.number("MissileDamage");
    let amount = level.number_or("MissileAmount", 1.0);
    let cooldown = level.number("MissileCooldown");
    nan_if_zero(damage * amount * (1.0 + damage_buff) / cooldown)
}

/// Average damage per second of units spawned every `spawnrate` seconds
///
/// Each unit spawned with `remaining` seconds left in the window contributes
/// for that long.
pub fn aggregate_dps(unit_dps: f64, spawnrate: f64) -> f64 {
    if spawnrate <= CONTINUOUS_SPAWNRATE {
        return f64::INFINITY;
    }
    let mut remaining = AGGREGATE_WINDOW;
    let mut total = 0.0;
    while remaining > 0.0 {
        total += unit_dps * remaining;
        remaining -= spawnrate;
    }
    total / AGGREGATE_WINDOW
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffed_cooldown() {
        let mut buffs = RoleBuffs::default();
        assert_eq!(buffed_cooldown(2.0, &buffs), 2.0);
        buffs.firerate = 1.0;
        buffs.extra_cooldown = 0.25;
        buffs.rate_of_fire_bug = 0.25;
        assert_eq!(buffed_cooldown(2.0, &buffs), 1.5);
    }

    #[test]
    fn test_scale_passes_text_through() {
        assert_eq!(scale(Value::Int(4), |x| x * 1.5), Value::Float(6.0));
        assert_eq!(scale(Value::from("n/a"), |x| x * 1.5), Value::from("n/a"));
    }

    #[test]
    fn test_zero_and_non_finite() {
        assert!(nan_if_zero(0.0).is_nan());
        assert_eq!(nan_if_zero(3.0), 3.0);
        assert!(finite_or_nan(500.0 / 0.0).is_nan());
        assert!(finite_or_nan(f64::NAN).is_nan());
        assert_eq!(finite_or_nan(2.5), 2.5);
    }

    #[test]
    fn test_aggregate_dps() {
        assert_eq!(aggregate_dps(10.0, 0.1), f64::INFINITY);
        assert_eq!(aggregate_dps(10.0, 0.0), f64::INFINITY);
        // spawns at 60, 30: (10*60 + 10*30) / 60
        assert_eq!(aggregate_dps(10.0, 30.0), 15.0);
        // a single spawn when the interval exceeds the window
        assert_eq!(aggregate_dps(10.0, 90.0), 10.0);
    }
}
