//! Calculated-field rule engine
//!
//! Each derived field is a [`FieldRule`]: an ordered list of [`Variant`]s
//! scoped to entity types, plus an optional catch-all default. For a given
//! [`Subject`] exactly one variant is selected ([`select`]) and it is
//! attached only if it is applicable ([`validate`]).
//!
//! A [`Catalog`] owns the rules of one entity family and attaches them in
//! dependency order. Dependencies are declared per rule and resolved once,
//! when the catalog is built, by a topological sort; a cycle is an error.
//!
//! # Example
//!
//! ```
//! use towerlab_core::{Catalog, FieldRule, Value, Variant};
//!
//! let catalog = Catalog::new("towers", vec![
//!     FieldRule::calculated("TotalDPS").depends_on(&["DPS"]).with_default(
//!         Variant::calculated(|level| Value::Float(level.number("DPS") * 2.0)),
//!     ),
//!     FieldRule::calculated("DPS").with_default(
//!         Variant::calculated(|level| {
//!             Value::Float(level.number("Damage") / level.number("Cooldown"))
//!         })
//!         .requires(&["Damage", "Cooldown"]),
//!     ),
//! ])
//! .unwrap();
//!
//! let order: Vec<&str> = catalog.ordered_rules().map(|r| r.name()).collect();
//! assert_eq!(order, vec!["DPS", "TotalDPS"]);
//! ```

use crate::context::Subject;
use crate::level::{CalculatedFn, FieldKind, Formula, Levels, OverrideFn};
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Predicate distinguishing sub-forms of one entity type
pub type SubtypeFn = fn(&Subject<'_>) -> bool;

/// One candidate formula for a derived field
#[derive(Clone, Copy)]
pub struct Variant {
    for_types: Option<&'static [&'static str]>,
    exclude: Option<&'static [&'static str]>,
    requires: Option<&'static [&'static str]>,
    subtype: Option<SubtypeFn>,
    formula: Formula,
}

impl Variant {
    /// A variant introducing a value
    pub fn calculated(formula: CalculatedFn) -> Self {
        Self::new(Formula::Calculated(formula))
    }

    /// A variant reinterpreting a stored value
    pub fn overriding(formula: OverrideFn) -> Self {
        Self::new(Formula::Override(formula))
    }

    fn new(formula: Formula) -> Self {
        Self {
            for_types: None,
            exclude: None,
            requires: None,
            subtype: None,
            formula,
        }
    }

    /// Restrict to these entity types
    pub fn for_types(mut self, types: &'static [&'static str]) -> Self {
        self.for_types = Some(types);
        self
    }

    /// Never apply to these entity types
    pub fn exclude(mut self, types: &'static [&'static str]) -> Self {
        self.exclude = Some(types);
        self
    }

    /// Require these stored attributes
    pub fn requires(mut self, attributes: &'static [&'static str]) -> Self {
        self.requires = Some(attributes);
        self
    }

    /// Only match sub-forms for which `predicate` holds
    pub fn subtype(mut self, predicate: SubtypeFn) -> Self {
        self.subtype = Some(predicate);
        self
    }

    /// Entity types this variant is scoped to
    pub fn scope(&self) -> Option<&'static [&'static str]> {
        self.for_types
    }

    /// Required stored attributes
    pub fn required(&self) -> &'static [&'static str] {
        self.requires.unwrap_or(&[])
    }

    /// The formula
    pub fn formula(&self) -> Formula {
        self.formula
    }

    fn matches(&self, subject: &Subject<'_>) -> bool {
        let scoped = self
            .for_types
            .is_some_and(|types| types.contains(&subject.entity));
        scoped && self.subtype.map_or(true, |predicate| predicate(subject))
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("for_types", &self.for_types)
            .field("exclude", &self.exclude)
            .field("requires", &self.requires)
            .field("subtype", &self.subtype.is_some())
            .field("formula", &self.formula)
            .finish()
    }
}

/// All variants of one derived field
#[derive(Debug, Clone)]
pub struct FieldRule {
    name: &'static str,
    kind: FieldKind,
    depends_on: &'static [&'static str],
    variants: Vec<Variant>,
    default: Option<Variant>,
}

impl FieldRule {
    /// A field that introduces a new column
    pub fn calculated(name: &'static str) -> Self {
        Self::new(name, FieldKind::Calculated)
    }

    /// A field that reinterprets a stored column
    pub fn overriding(name: &'static str) -> Self {
        Self::new(name, FieldKind::Override)
    }

    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            depends_on: &[],
            variants: Vec::new(),
            default: None,
        }
    }

    /// Fields that must be attached before this one
    pub fn depends_on(mut self, fields: &'static [&'static str]) -> Self {
        self.depends_on = fields;
        self
    }

    /// Append a scoped variant; declaration order is selection order
    pub fn variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    /// Set the catch-all variant
    pub fn with_default(mut self, variant: Variant) -> Self {
        self.default = Some(variant);
        self
    }

    /// Field name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Calculated or override
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Declared dependencies
    pub fn dependencies(&self) -> &'static [&'static str] {
        self.depends_on
    }

    /// Scoped variants in declaration order
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// The catch-all variant
    pub fn default_variant(&self) -> Option<&Variant> {
        self.default.as_ref()
    }
}

/// Pick the variant of `rule` for `subject`
///
/// The first scoped variant whose types contain the subject and whose
/// subtype predicate (if any) holds wins; otherwise the default.
pub fn select<'r>(rule: &'r FieldRule, subject: &Subject<'_>) -> Option<&'r Variant> {
    rule.variants
        .iter()
        .find(|variant| variant.matches(subject))
        .or(rule.default.as_ref())
}

/// Check if `variant` applies to `subject`
///
/// The subject must not be excluded, must store every required attribute,
/// and must be in the variant's scope when it has one.
pub fn validate(variant: &Variant, subject: &Subject<'_>) -> bool {
    let mut valid = true;
    if let Some(exclude) = variant.exclude {
        valid &= !exclude.contains(&subject.entity);
    }
    if let Some(requires) = variant.requires {
        valid &= requires.iter().all(|name| subject.has_attribute(name));
    }
    if let Some(types) = variant.for_types {
        valid &= types.contains(&subject.entity);
    }
    valid
}

/// The rule set of one entity family, in attachment order
#[derive(Debug, Clone)]
pub struct Catalog {
    name: String,
    rules: Vec<FieldRule>,
    order: Vec<usize>,
}

impl Catalog {
    /// Build a catalog, resolving the attachment order
    ///
    /// Fails on duplicate field names, override fields with calculated
    /// formulas, and dependency cycles.
    pub fn new(name: impl Into<String>, rules: Vec<FieldRule>) -> Result<Self> {
        let mut index: HashMap<&'static str, usize> = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            if index.insert(rule.name, i).is_some() {
                return Err(Error::InvalidRule(format!("duplicate field {}", rule.name)));
            }
            if rule.kind == FieldKind::Override {
                let calculated = rule
                    .variants
                    .iter()
                    .chain(rule.default.iter())
                    .any(|v| matches!(v.formula, Formula::Calculated(_)));
                if calculated {
                    return Err(Error::InvalidRule(format!(
                        "override field {} has a calculated variant",
                        rule.name
                    )));
                }
            }
        }

        let order = topological_order(&rules, &index)?;
        Ok(Self {
            name: name.into(),
            rules,
            order,
        })
    }

    /// Catalog name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a rule by field name
    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    /// Rules in attachment order
    pub fn ordered_rules(&self) -> impl Iterator<Item = &FieldRule> {
        self.order.iter().map(|&i| &self.rules[i])
    }

    /// Selected and applicable variant of every rule, in attachment order
    pub fn resolve<'c>(&'c self, subject: &Subject<'_>) -> Vec<(&'c FieldRule, &'c Variant)> {
        self.ordered_rules()
            .filter_map(|rule| {
                let variant = select(rule, subject)?;
                validate(variant, subject).then_some((rule, variant))
            })
            .collect()
    }

    /// Attach every applicable field to `levels`
    ///
    /// Returns the number of fields attached.
    pub fn attach(&self, levels: &mut Levels, subject: &Subject<'_>) -> usize {
        let mut attached = 0;
        for rule in self.ordered_rules() {
            let Some(variant) = select(rule, subject) else {
                continue;
            };
            if !validate(variant, subject) {
                tracing::trace!(
                    catalog = %self.name,
                    entity = subject.entity,
                    field = rule.name,
                    "field not applicable"
                );
                continue;
            }
            match variant.formula {
                Formula::Calculated(f) => levels.add_calculated(rule.name, f),
                Formula::Override(f) => levels.add_override(rule.name, f),
            }
            attached += 1;
        }
        tracing::debug!(
            catalog = %self.name,
            entity = subject.entity,
            skin = subject.skin,
            attached,
            "calculated fields attached"
        );
        attached
    }
}

/// Kahn's algorithm; ready rules are taken in declaration order
fn topological_order(
    rules: &[FieldRule],
    index: &HashMap<&'static str, usize>,
) -> Result<Vec<usize>> {
    let mut in_degree = vec![0usize; rules.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); rules.len()];
    for (i, rule) in rules.iter().enumerate() {
        for dep in rule.depends_on {
            // stored inputs and self references impose no order
            match index.get(dep) {
                Some(&d) if d != i => {
                    in_degree[i] += 1;
                    dependents[d].push(i);
                }
                _ => {}
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..rules.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(rules.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != rules.len() {
        let cycle = (0..rules.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| rules[i].name.to_string())
            .collect();
        return Err(Error::DependencyCycle(cycle));
    }
    Ok(order)
}
