//! Materialized upgrade ladders
//!
//! A [`Level`] is an immutable record of stored attribute values for one rung
//! of a skin's ladder. [`Levels`] owns the rungs, the attribute-name union and
//! the calculated fields attached by a rule catalog. Calculated values are
//! never stored: every read through [`Levels::value`] or a [`LevelView`]
//! evaluates the attached formula against the current [`EvalContext`].
//!
//! ## Attachment order
//!
//! Fields are attached in a fixed order. A formula attached at position `p`
//! sees stored values and only the fields attached before `p`; a later
//! override of the same name is invisible to it. Several fields may share a
//! name, in which case each override receives the value produced by the one
//! attached before it.

use crate::base_stats::StatBlock;
use crate::context::{EvalContext, UnitSource};
use crate::format::{csv_line, format_cell};
use crate::{BuffState, Value, ValueMap};
use indexmap::IndexSet;
use std::fmt;

/// Name of the synthetic ordinal column
pub const LEVEL: &str = "Level";

/// Formula introducing a value from the level alone
pub type CalculatedFn = fn(&LevelView<'_>) -> Value;
/// Formula reinterpreting an existing value of the same attribute
pub type OverrideFn = fn(Value, &LevelView<'_>) -> Value;

/// A formula attached to a ladder
#[derive(Clone, Copy)]
pub enum Formula {
    Calculated(CalculatedFn),
    Override(OverrideFn),
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Calculated(_) => write!(f, "Formula::Calculated"),
            Formula::Override(_) => write!(f, "Formula::Override"),
        }
    }
}

/// Whether a field introduces a column or reinterprets a stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Calculated,
    Override,
}

/// A calculated field attached to a ladder
#[derive(Debug, Clone)]
pub struct AttachedField {
    pub name: String,
    pub kind: FieldKind,
    pub formula: Formula,
}

/// One rung of an upgrade ladder
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    index: usize,
    values: ValueMap,
}

impl Level {
    /// Materialize rung `index` from its own block and the rung before it
    ///
    /// Attributes the block does not define are copied from `prior`; level 0
    /// simply leaves them absent.
    pub fn materialize(
        index: usize,
        own: &ValueMap,
        names: &IndexSet<String>,
        prior: Option<&Level>,
    ) -> Self {
        let mut values = ValueMap::new();
        values.insert(LEVEL.to_string(), Value::Int(index as i64));
        for name in names.iter().filter(|n| n.as_str() != LEVEL) {
            let value = own
                .get(name)
                .or_else(|| prior.and_then(|p| p.values.get(name)));
            if let Some(value) = value {
                values.insert(name.clone(), value.clone());
            }
        }
        Self { index, values }
    }

    /// Ordinal position (0 = defaults)
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get a stored value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// All stored values
    pub fn values(&self) -> &ValueMap {
        &self.values
    }
}

/// The full ladder of one skin
#[derive(Debug, Clone, Default)]
pub struct Levels {
    levels: Vec<Level>,
    attributes: IndexSet<String>,
    stored: IndexSet<String>,
    fields: Vec<AttachedField>,
}

impl Levels {
    /// Build the ladder from the defaults block followed by each upgrade
    pub fn new(blocks: &[&dyn StatBlock]) -> Self {
        let mut stored = IndexSet::new();
        stored.insert(LEVEL.to_string());
        for block in blocks {
            for name in block.attributes().keys() {
                stored.insert(name.clone());
            }
        }

        let mut levels: Vec<Level> = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.iter().enumerate() {
            let level = Level::materialize(index, block.attributes(), &stored, levels.last());
            levels.push(level);
        }

        Self {
            levels,
            attributes: stored.clone(),
            stored,
            fields: Vec::new(),
        }
    }

    /// All rungs in order
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Get one rung
    pub fn get(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    /// Number of rungs
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if the ladder has no rungs
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Column names: stored attributes then calculated ones
    pub fn attributes(&self) -> &IndexSet<String> {
        &self.attributes
    }

    /// Stored attribute names, `Level` first
    pub fn stored_attributes(&self) -> &IndexSet<String> {
        &self.stored
    }

    /// Names of calculated columns in the order they were added
    pub fn complex_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|name| !self.stored.contains(*name))
            .map(String::as_str)
    }

    /// Attached fields in attachment order
    pub fn fields(&self) -> &[AttachedField] {
        &self.fields
    }

    /// Attach a calculated column
    ///
    /// If `name` is already a column this becomes an override that ignores
    /// the previous value.
    pub fn add_calculated(&mut self, name: &str, formula: CalculatedFn) {
        if self.attributes.contains(name) {
            self.push_field(name, FieldKind::Override, Formula::Calculated(formula));
            return;
        }
        self.attributes.insert(name.to_string());
        self.push_field(name, FieldKind::Calculated, Formula::Calculated(formula));
    }

    /// Reinterpret an existing column through `formula`
    ///
    /// The stored value is left untouched; reads see the formula's result.
    pub fn add_override(&mut self, name: &str, formula: OverrideFn) {
        if !self.attributes.contains(name) {
            tracing::debug!(field = name, "override skipped, no such column");
            return;
        }
        self.push_field(name, FieldKind::Override, Formula::Override(formula));
    }

    fn push_field(&mut self, name: &str, kind: FieldKind, formula: Formula) {
        self.fields.push(AttachedField {
            name: name.to_string(),
            kind,
            formula,
        });
    }

    /// Detach every calculated field
    pub fn clear_calculated(&mut self) {
        self.fields.clear();
        self.attributes = self.stored.clone();
    }

    /// Read `name` at rung `index`, evaluating attached formulas
    pub fn value(&self, index: usize, name: &str, ctx: &EvalContext<'_>) -> Option<Value> {
        self.view(index, ctx)?.get(name)
    }

    /// A view of rung `index` that sees every attached field
    pub fn view<'a>(&'a self, index: usize, ctx: &EvalContext<'a>) -> Option<LevelView<'a>> {
        let level = self.levels.get(index)?;
        Some(LevelView {
            levels: self,
            level,
            ctx: *ctx,
            horizon: self.fields.len(),
        })
    }

    fn resolve(
        &self,
        level: &Level,
        name: &str,
        ctx: &EvalContext<'_>,
        horizon: usize,
    ) -> Option<Value> {
        let visible = &self.fields[..horizon.min(self.fields.len())];
        let Some(position) = visible.iter().rposition(|f| f.name == name) else {
            return level.get(name).cloned();
        };
        let view = LevelView {
            levels: self,
            level,
            ctx: *ctx,
            horizon: position,
        };
        match visible[position].formula {
            Formula::Calculated(f) => Some(f(&view)),
            Formula::Override(f) => {
                let base = view.get(name)?;
                Some(f(base, &view))
            }
        }
    }

    /// Resolve every column of every rung once
    ///
    /// This is the explicit cache layer: the result is a plain snapshot that
    /// does not follow later buff changes.
    pub fn materialize(&self, ctx: &EvalContext<'_>) -> Vec<ValueMap> {
        (0..self.levels.len())
            .map(|index| {
                let mut row = ValueMap::new();
                for name in &self.attributes {
                    if let Some(value) = self.value(index, name, ctx) {
                        row.insert(name.clone(), value);
                    }
                }
                row
            })
            .collect()
    }

    /// Header row followed by one formatted row per rung
    pub fn table(&self, ctx: &EvalContext<'_>) -> Vec<Vec<String>> {
        let mut table = Vec::with_capacity(self.levels.len() + 1);
        table.push(self.attributes.iter().cloned().collect());
        for index in 0..self.levels.len() {
            let row = self
                .attributes
                .iter()
                .map(|name| format_cell(name, self.value(index, name, ctx).as_ref()))
                .collect();
            table.push(row);
        }
        table
    }

    /// The formatted table as CSV text
    pub fn csv(&self, ctx: &EvalContext<'_>) -> String {
        let mut output = String::new();
        for row in self.table(ctx) {
            output.push_str(&csv_line(&row));
            output.push('\n');
        }
        output
    }
}

/// One rung as seen by a formula
///
/// Reads resolve stored values and the calculated fields visible at the
/// formula's attachment position.
#[derive(Clone, Copy)]
pub struct LevelView<'a> {
    levels: &'a Levels,
    level: &'a Level,
    ctx: EvalContext<'a>,
    horizon: usize,
}

impl<'a> LevelView<'a> {
    /// Ordinal of this rung
    pub fn index(&self) -> usize {
        self.level.index()
    }

    /// Resolve `name` at this rung
    pub fn get(&self, name: &str) -> Option<Value> {
        self.levels.resolve(self.level, name, &self.ctx, self.horizon)
    }

    /// Resolve `name` as a number; missing or non-numeric values read as NaN
    pub fn number(&self, name: &str) -> f64 {
        self.get(name)
            .and_then(|v| v.as_float())
            .unwrap_or(f64::NAN)
    }

    /// Resolve `name` as a number, falling back to `default` when missing
    pub fn number_or(&self, name: &str, default: f64) -> f64 {
        self.get(name)
            .and_then(|v| v.as_float())
            .unwrap_or(default)
    }

    /// Resolve `name` as text
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Check if `name` resolves to anything at this rung
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The stored value of `name`, ignoring every formula
    pub fn stored(&self, name: &str) -> Option<&'a Value> {
        self.level.get(name)
    }

    /// The same ladder at another rung, with the same visibility
    pub fn at(&self, index: usize) -> Option<LevelView<'a>> {
        let level = self.levels.get(index)?;
        Some(LevelView { level, ..*self })
    }

    /// Number of rungs in the ladder
    pub fn ladder_len(&self) -> usize {
        self.levels.len()
    }

    /// Active buffs
    pub fn buffs(&self) -> &'a BuffState {
        self.ctx.buffs
    }

    /// Companion unit lookup
    pub fn units(&self) -> Option<&'a dyn UnitSource> {
        self.ctx.units
    }
}
