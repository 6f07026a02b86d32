//! Production rules: the rewrite rules of the L-System.
//!
//! A [`ProductionSpec`] is the open input form accepted by registration:
//! a bare literal, a computed successor, or an alternatives list, each
//! optionally guarded by left/right context patterns and a condition.
//! Registration normalizes a spec into the closed [`Production`] form,
//! whose [`Successor`] is a tagged variant — a production can never end up
//! with both a single successor and an alternatives list.
//!
//! ## Stochastic lists
//!
//! An alternatives list where every element carries a `weight` is
//! stochastic: resolution draws a uniform value in `[0, weight_sum)` and
//! walks the cumulative weights. `weight_sum` is computed once here, at
//! registration, never per lookup. A list where only *some* elements carry
//! a weight is treated as an ordered list and logged as a likely mistake.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::symbol::{Sequence, SymbolEntry};
use crate::LSystemError;

// ─────────────────────────────────────────────
// Callback types
// ─────────────────────────────────────────────

/// Arguments handed to successor and condition functions.
///
/// `sequence` is the pre-rewrite sequence of the current generation.
/// Productions may read any sibling entry through it; the sequence under
/// construction is never exposed.
pub struct ProductionArgs<'a> {
    /// Position of the symbol under rewrite.
    pub index: usize,
    /// The current (pre-rewrite) sequence, read-only.
    pub sequence: &'a Sequence,
    /// The entry under rewrite.
    pub part: &'a SymbolEntry,
    /// The entry's numeric parameters (empty for plain text sequences).
    pub params: &'a [f64],
}

/// A successor-computing function. Returning `None` signals "no match":
/// the resolver falls back to the original symbol, or to the next
/// alternative inside a list.
pub type SuccessorFn = Rc<dyn Fn(&ProductionArgs) -> Option<Sequence>>;

/// A guard evaluated before context checks. Returning `false` fails the
/// whole production (or the one alternative it is attached to).
pub type ConditionFn = Rc<dyn Fn(&ProductionArgs) -> bool>;

// ─────────────────────────────────────────────
// ProductionSpec — open input form
// ─────────────────────────────────────────────

/// The successor value of a spec before normalization.
pub(crate) enum SuccessorSpec {
    Literal(Sequence),
    Computed(SuccessorFn),
}

/// A production as supplied by the caller.
///
/// Bare literals and closures convert via `From`/[`ProductionSpec::computed`];
/// the builder methods add context guards, conditions and weights. Defining
/// both a successor and alternatives is representable here and rejected at
/// registration with [`LSystemError::BothSuccessorForms`].
#[derive(Default)]
pub struct ProductionSpec {
    pub(crate) successor: Option<SuccessorSpec>,
    pub(crate) alternatives: Option<Vec<ProductionSpec>>,
    pub(crate) left_ctx: Option<String>,
    pub(crate) right_ctx: Option<String>,
    pub(crate) condition: Option<ConditionFn>,
    pub(crate) weight: Option<f64>,
}

impl ProductionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a literal successor.
    pub fn successor(mut self, value: impl Into<Sequence>) -> Self {
        self.successor = Some(SuccessorSpec::Literal(value.into()));
        self
    }

    /// Set a computed successor.
    pub fn successor_fn(
        mut self,
        f: impl Fn(&ProductionArgs) -> Option<Sequence> + 'static,
    ) -> Self {
        self.successor = Some(SuccessorSpec::Computed(Rc::new(f)));
        self
    }

    /// Shorthand for `ProductionSpec::new().successor_fn(f)`.
    pub fn computed(f: impl Fn(&ProductionArgs) -> Option<Sequence> + 'static) -> Self {
        Self::new().successor_fn(f)
    }

    /// Set an ordered or weighted alternatives list. Elements are
    /// themselves specs and may carry their own guards and weights.
    pub fn alternatives<P>(mut self, alts: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<ProductionSpec>,
    {
        self.alternatives = Some(alts.into_iter().map(Into::into).collect());
        self
    }

    /// Require `pattern` immediately to the left (classic reading order).
    pub fn left_context(mut self, pattern: &str) -> Self {
        self.left_ctx = Some(pattern.to_owned());
        self
    }

    /// Require `pattern` immediately to the right.
    pub fn right_context(mut self, pattern: &str) -> Self {
        self.right_ctx = Some(pattern.to_owned());
        self
    }

    /// Guard the production with a condition, checked before contexts.
    pub fn condition(mut self, f: impl Fn(&ProductionArgs) -> bool + 'static) -> Self {
        self.condition = Some(Rc::new(f));
        self
    }

    /// Stochastic weight of this spec when used inside an alternatives list.
    pub fn weight(mut self, w: f64) -> Self {
        self.weight = Some(w);
        self
    }
}

impl fmt::Debug for ProductionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProductionSpec")
            .field("successor", &self.successor.as_ref().map(successor_spec_name))
            .field("alternatives", &self.alternatives.as_ref().map(Vec::len))
            .field("left_ctx", &self.left_ctx)
            .field("right_ctx", &self.right_ctx)
            .field("condition", &self.condition.is_some())
            .field("weight", &self.weight)
            .finish()
    }
}

fn successor_spec_name(s: &SuccessorSpec) -> &'static str {
    match s {
        SuccessorSpec::Literal(_) => "literal",
        SuccessorSpec::Computed(_) => "computed",
    }
}

impl From<&str> for ProductionSpec {
    fn from(s: &str) -> Self {
        Self::new().successor(s)
    }
}

impl From<String> for ProductionSpec {
    fn from(s: String) -> Self {
        Self::new().successor(s)
    }
}

impl From<char> for ProductionSpec {
    fn from(c: char) -> Self {
        Self::new().successor(c)
    }
}

impl From<Sequence> for ProductionSpec {
    fn from(seq: Sequence) -> Self {
        Self::new().successor(seq)
    }
}

impl From<SymbolEntry> for ProductionSpec {
    fn from(e: SymbolEntry) -> Self {
        Self::new().successor(e)
    }
}

impl From<Vec<SymbolEntry>> for ProductionSpec {
    fn from(v: Vec<SymbolEntry>) -> Self {
        Self::new().successor(v)
    }
}

// ─────────────────────────────────────────────
// Production — closed normalized form
// ─────────────────────────────────────────────

/// A leaf successor: what an [`Alternative`] replaces the symbol with.
pub(crate) enum Leaf {
    Literal(Sequence),
    Computed(SuccessorFn),
}

/// One element of an alternatives list. Alternatives are flat: their
/// successor is always a leaf, never another list.
pub(crate) struct Alternative {
    pub(crate) leaf: Leaf,
    pub(crate) left_ctx: Option<Vec<char>>,
    pub(crate) right_ctx: Option<Vec<char>>,
    pub(crate) condition: Option<ConditionFn>,
    pub(crate) weight: Option<f64>,
}

/// The successor of a normalized production.
pub(crate) enum Successor {
    Literal(Sequence),
    Computed(SuccessorFn),
    Alternatives(Vec<Alternative>),
}

/// A normalized production: successor plus optional guards. Context
/// patterns are stored pre-tokenized; the engine never parses pattern
/// strings during a rewrite pass.
pub(crate) struct Production {
    pub(crate) successor: Successor,
    pub(crate) left_ctx: Option<Vec<char>>,
    pub(crate) right_ctx: Option<Vec<char>>,
    pub(crate) condition: Option<ConditionFn>,
    /// Only meaningful once this production is merged into a list.
    pub(crate) weight: Option<f64>,
    pub(crate) stochastic: bool,
    pub(crate) weight_sum: f64,
}

impl fmt::Debug for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let successor = match &self.successor {
            Successor::Literal(seq) => format!("literal({seq})"),
            Successor::Computed(_) => "computed".to_owned(),
            Successor::Alternatives(list) => format!("alternatives({})", list.len()),
        };
        f.debug_struct("Production")
            .field("successor", &successor)
            .field("left_ctx", &self.left_ctx)
            .field("right_ctx", &self.right_ctx)
            .field("condition", &self.condition.is_some())
            .field("stochastic", &self.stochastic)
            .field("weight_sum", &self.weight_sum)
            .finish()
    }
}

impl Production {
    /// Recompute the stochastic flag and cached weight sum after the
    /// alternatives list changed.
    fn refresh_weights(&mut self, symbol: char) {
        let Successor::Alternatives(list) = &self.successor else {
            self.stochastic = false;
            self.weight_sum = 0.0;
            return;
        };
        let weighted = list.iter().filter(|a| a.weight.is_some()).count();
        self.stochastic = !list.is_empty() && weighted == list.len();
        if self.stochastic {
            self.weight_sum = list.iter().map(|a| a.weight.unwrap_or(0.0)).sum();
        } else {
            self.weight_sum = 0.0;
            if weighted > 0 {
                tracing::warn!(
                    symbol = %symbol,
                    weighted,
                    total = list.len(),
                    "alternatives list mixes weighted and unweighted entries; treating it as an ordered list"
                );
            }
        }
    }

    /// Break this production up into alternatives for a merge. Guards of an
    /// alternatives-list production push down onto elements that carry no
    /// guard of their own.
    fn into_alternatives(self) -> Vec<Alternative> {
        let Production { successor, left_ctx, right_ctx, condition, weight, .. } = self;
        match successor {
            Successor::Literal(seq) => vec![Alternative {
                leaf: Leaf::Literal(seq),
                left_ctx,
                right_ctx,
                condition,
                weight,
            }],
            Successor::Computed(f) => vec![Alternative {
                leaf: Leaf::Computed(f),
                left_ctx,
                right_ctx,
                condition,
                weight,
            }],
            Successor::Alternatives(list) => list
                .into_iter()
                .map(|mut a| {
                    if a.left_ctx.is_none() {
                        a.left_ctx = left_ctx.clone();
                    }
                    if a.right_ctx.is_none() {
                        a.right_ctx = right_ctx.clone();
                    }
                    if a.condition.is_none() {
                        a.condition = condition.clone();
                    }
                    a
                })
                .collect(),
        }
    }
}

// ─────────────────────────────────────────────
// Normalization
// ─────────────────────────────────────────────

fn tokenize(pattern: String) -> Vec<char> {
    pattern.chars().collect()
}

fn make_leaf(value: SuccessorSpec, force_objects: bool) -> Leaf {
    match value {
        SuccessorSpec::Literal(seq) => {
            Leaf::Literal(if force_objects { seq.into_entries() } else { seq })
        }
        SuccessorSpec::Computed(f) => Leaf::Computed(f),
    }
}

/// Flatten one alternatives element into `out`. Nested alternatives lists
/// are flattened in place, pushing the wrapper's guards and weight down
/// onto elements that carry none of their own.
fn flatten_into(
    symbol: char,
    spec: ProductionSpec,
    force_objects: bool,
    out: &mut Vec<Alternative>,
) -> Result<(), LSystemError> {
    let ProductionSpec { successor, alternatives, left_ctx, right_ctx, condition, weight } = spec;
    match (successor, alternatives) {
        (Some(_), Some(_)) => Err(LSystemError::BothSuccessorForms(symbol)),
        (None, None) => Err(LSystemError::MissingSuccessor(symbol)),
        (Some(value), None) => {
            out.push(Alternative {
                leaf: make_leaf(value, force_objects),
                left_ctx: left_ctx.map(tokenize),
                right_ctx: right_ctx.map(tokenize),
                condition,
                weight,
            });
            Ok(())
        }
        (None, Some(list)) => {
            let mut inner = Vec::new();
            for sub in list {
                flatten_into(symbol, sub, force_objects, &mut inner)?;
            }
            let left = left_ctx.map(tokenize);
            let right = right_ctx.map(tokenize);
            for mut a in inner {
                if a.left_ctx.is_none() {
                    a.left_ctx = left.clone();
                }
                if a.right_ctx.is_none() {
                    a.right_ctx = right.clone();
                }
                if a.condition.is_none() {
                    a.condition = condition.clone();
                }
                if a.weight.is_none() {
                    a.weight = weight;
                }
                out.push(a);
            }
            Ok(())
        }
    }
}

/// Normalize a spec into the closed production form. Fails fast on a spec
/// defining both a successor and alternatives, or neither.
pub(crate) fn normalize(
    symbol: char,
    spec: ProductionSpec,
    force_objects: bool,
) -> Result<Production, LSystemError> {
    let ProductionSpec { successor, alternatives, left_ctx, right_ctx, condition, weight } = spec;
    match (successor, alternatives) {
        (Some(_), Some(_)) => Err(LSystemError::BothSuccessorForms(symbol)),
        (None, None) => Err(LSystemError::MissingSuccessor(symbol)),
        (Some(value), None) => Ok(Production {
            successor: match make_leaf(value, force_objects) {
                Leaf::Literal(seq) => Successor::Literal(seq),
                Leaf::Computed(f) => Successor::Computed(f),
            },
            left_ctx: left_ctx.map(tokenize),
            right_ctx: right_ctx.map(tokenize),
            condition,
            weight,
            stochastic: false,
            weight_sum: 0.0,
        }),
        (None, Some(list)) => {
            let mut alts = Vec::new();
            for sub in list {
                flatten_into(symbol, sub, force_objects, &mut alts)?;
            }
            let mut p = Production {
                successor: Successor::Alternatives(alts),
                left_ctx: left_ctx.map(tokenize),
                right_ctx: right_ctx.map(tokenize),
                condition,
                weight,
                stochastic: false,
                weight_sum: 0.0,
            };
            p.refresh_weights(symbol);
            Ok(p)
        }
    }
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Predecessor-keyed store of normalized productions.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    map: HashMap<char, Production>,
}

impl Registry {
    /// Replace the production for `symbol`.
    pub fn set(&mut self, symbol: char, production: Production) {
        self.map.insert(symbol, production);
    }

    /// Merge a production with whatever is already registered for `symbol`:
    /// an existing single-successor production is promoted to the first
    /// element of an alternatives list, then the incoming production's
    /// alternatives are appended.
    pub fn merge(&mut self, symbol: char, incoming: Production) {
        let merged = match self.map.remove(&symbol) {
            None => incoming,
            Some(existing) => {
                // An existing list keeps its outer guards; a single
                // production takes its guards along into the list.
                let (mut list, left_ctx, right_ctx, condition) = match existing.successor {
                    Successor::Alternatives(list) => {
                        (list, existing.left_ctx, existing.right_ctx, existing.condition)
                    }
                    Successor::Literal(seq) => (
                        vec![Alternative {
                            leaf: Leaf::Literal(seq),
                            left_ctx: existing.left_ctx,
                            right_ctx: existing.right_ctx,
                            condition: existing.condition,
                            weight: existing.weight,
                        }],
                        None,
                        None,
                        None,
                    ),
                    Successor::Computed(f) => (
                        vec![Alternative {
                            leaf: Leaf::Computed(f),
                            left_ctx: existing.left_ctx,
                            right_ctx: existing.right_ctx,
                            condition: existing.condition,
                            weight: existing.weight,
                        }],
                        None,
                        None,
                        None,
                    ),
                };
                list.extend(incoming.into_alternatives());
                let mut p = Production {
                    successor: Successor::Alternatives(list),
                    left_ctx,
                    right_ctx,
                    condition,
                    weight: None,
                    stochastic: false,
                    weight_sum: 0.0,
                };
                p.refresh_weights(symbol);
                p
            }
        };
        self.map.insert(symbol, merged);
    }

    pub fn get(&self, symbol: char) -> Option<&Production> {
        self.map.get(&symbol)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.map.len()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_literal_wraps_into_successor() {
        let p = normalize('F', ProductionSpec::from("F-F"), false).unwrap();
        match p.successor {
            Successor::Literal(seq) => assert_eq!(seq, Sequence::from("F-F")),
            _ => panic!("expected literal successor"),
        }
    }

    #[test]
    fn both_forms_is_a_config_error() {
        let spec = ProductionSpec::from("A").alternatives(["B", "C"]);
        let err = normalize('F', spec, false).unwrap_err();
        assert!(matches!(err, LSystemError::BothSuccessorForms('F')));
    }

    #[test]
    fn empty_spec_is_a_config_error() {
        let err = normalize('F', ProductionSpec::new(), false).unwrap_err();
        assert!(matches!(err, LSystemError::MissingSuccessor('F')));
    }

    #[test]
    fn fully_weighted_list_is_stochastic_with_cached_sum() {
        let spec = ProductionSpec::new().alternatives([
            ProductionSpec::from("A").weight(0.89),
            ProductionSpec::from("B").weight(0.1),
            ProductionSpec::from("C").weight(0.01),
        ]);
        let p = normalize('X', spec, false).unwrap();
        assert!(p.stochastic);
        assert!((p.weight_sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn partially_weighted_list_is_ordered() {
        let spec = ProductionSpec::new().alternatives([
            ProductionSpec::from("A").weight(1.0),
            ProductionSpec::from("B"),
        ]);
        let p = normalize('X', spec, false).unwrap();
        assert!(!p.stochastic);
        assert_eq!(p.weight_sum, 0.0);
    }

    #[test]
    fn nested_alternatives_flatten_with_guard_push_down() {
        let spec = ProductionSpec::new().alternatives([
            ProductionSpec::new()
                .alternatives([ProductionSpec::from("A"), ProductionSpec::from("B")])
                .left_context("L"),
            ProductionSpec::from("C"),
        ]);
        let p = normalize('X', spec, false).unwrap();
        let Successor::Alternatives(list) = &p.successor else {
            panic!("expected alternatives");
        };
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].left_ctx.as_deref(), Some(&['L'][..]));
        assert_eq!(list[1].left_ctx.as_deref(), Some(&['L'][..]));
        assert!(list[2].left_ctx.is_none());
    }

    #[test]
    fn merge_promotes_single_successor_to_list() {
        let mut reg = Registry::default();
        reg.set('F', normalize('F', ProductionSpec::from("A"), false).unwrap());
        reg.merge('F', normalize('F', ProductionSpec::from("B"), false).unwrap());

        let p = reg.get('F').unwrap();
        let Successor::Alternatives(list) = &p.successor else {
            panic!("expected alternatives after merge");
        };
        assert_eq!(list.len(), 2);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn merge_onto_list_appends() {
        let mut reg = Registry::default();
        let spec = ProductionSpec::new()
            .alternatives([ProductionSpec::from("A").weight(1.0), ProductionSpec::from("B").weight(2.0)]);
        reg.set('F', normalize('F', spec, false).unwrap());
        reg.merge(
            'F',
            normalize('F', ProductionSpec::from("C").weight(3.0), false).unwrap(),
        );

        let p = reg.get('F').unwrap();
        assert!(p.stochastic);
        assert!((p.weight_sum - 6.0).abs() < 1e-12);
    }

    #[test]
    fn force_objects_coerces_literal_successors() {
        let p = normalize('F', ProductionSpec::from("FG"), true).unwrap();
        match p.successor {
            Successor::Literal(Sequence::Entries(v)) => assert_eq!(v.len(), 2),
            _ => panic!("expected entries literal"),
        }
    }
}
