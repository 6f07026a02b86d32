//! [`LSystem`] — the rewriting engine.
//!
//! ## Generation protocol
//!
//! 1. **Tokenize** — snapshot the bare symbols of the current word (the
//!    context matcher works on this snapshot).
//! 2. **Resolve** — per position, look up the registered production and
//!    resolve it: condition → contexts → alternative selection → successor.
//!    No production, or no match, keeps the original entry.
//! 3. **Accumulate** — append each result to a fresh word of the same
//!    representation, splicing sequence-valued results flat.
//! 4. **Swap** — replace the engine's word with the accumulator. A pass is
//!    atomic: the pre-rewrite word stays intact until the pass finishes.
//!
//! One pass is one generation; [`LSystem::iterate`] runs several. The
//! engine is single-threaded and fully synchronous — user callbacks run
//! inline during the pass and see the pre-rewrite word read-only.

use std::any::Any;
use std::collections::{HashMap, HashSet};

use rand::RngCore;

use crate::classic;
use crate::matcher::{match_pattern, MatchOptions, MatchResult};
use crate::production::{normalize, ProductionSpec, Registry};
use crate::resolver::{resolve, ResolveEnv};
use crate::symbol::{Sequence, SymbolEntry};
use crate::LSystemError;

// ─────────────────────────────────────────────
// Finals
// ─────────────────────────────────────────────

/// Arguments handed to a final function: the position and entry it fires on.
pub struct FinalArgs<'a> {
    pub index: usize,
    pub part: &'a SymbolEntry,
}

/// Per-symbol interpretation callback, invoked by [`LSystem::finalize`]
/// after rewriting is done. The second argument is the external render
/// target passed to [`LSystem::finalize_with`], if any.
pub type FinalFn = Box<dyn FnMut(&FinalArgs<'_>, Option<&mut dyn Any>)>;

// ─────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────

/// An L-System: a current word plus a registry of productions.
///
/// ```
/// use lindenmayer::LSystem;
///
/// let mut koch = LSystem::builder()
///     .axiom("F++F++F")
///     .production("F", "F-F++F-F")
///     .build()
///     .unwrap();
///
/// koch.iterate(1);
/// assert_eq!(koch.string(), "F-F++F-F++F-F++F-F++F-F++F-F");
/// ```
pub struct LSystem {
    axiom: Sequence,
    productions: Registry,
    finals: HashMap<char, FinalFn>,
    branch_symbols: Option<(char, char)>,
    ignored_symbols: HashSet<char>,
    allow_classic_syntax: bool,
    force_objects: bool,
    rng: Box<dyn RngCore>,
    generation: usize,
}

impl LSystem {
    /// An engine with the given axiom and default configuration: classic
    /// syntax enabled, no branch or ignored symbols, thread-local RNG.
    pub fn new(axiom: impl Into<Sequence>) -> Self {
        let mut system = LSystem {
            axiom: Sequence::default(),
            productions: Registry::default(),
            finals: HashMap::new(),
            branch_symbols: None,
            ignored_symbols: HashSet::new(),
            allow_classic_syntax: true,
            force_objects: false,
            rng: Box::new(rand::thread_rng()),
            generation: 0,
        };
        system.set_axiom(axiom);
        system
    }

    pub fn builder() -> LSystemBuilder {
        LSystemBuilder::default()
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Replace the current word. Applies the `force_objects` coercion.
    pub fn set_axiom(&mut self, axiom: impl Into<Sequence>) {
        let axiom = axiom.into();
        self.axiom = if self.force_objects { axiom.into_entries() } else { axiom };
    }

    /// The current word.
    pub fn raw(&self) -> &Sequence {
        &self.axiom
    }

    /// The current word's symbol string (params elided).
    pub fn string(&self) -> String {
        self.axiom.to_string()
    }

    /// The current word in raw JSON form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        self.axiom.to_json()
    }

    /// Number of generations run so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    // ── Production registry ──────────────────────────────────────────

    /// Register a production, replacing any existing one for the same
    /// predecessor. With classic syntax enabled the key may be a context
    /// pattern like `"A<B>C"`; otherwise it must be a single symbol.
    pub fn set_production(
        &mut self,
        key: &str,
        spec: impl Into<ProductionSpec>,
    ) -> Result<(), LSystemError> {
        self.register(key, spec.into(), false)
    }

    /// Register a production, merging with an existing one for the same
    /// predecessor into an alternatives list.
    pub fn add_production(
        &mut self,
        key: &str,
        spec: impl Into<ProductionSpec>,
    ) -> Result<(), LSystemError> {
        self.register(key, spec.into(), true)
    }

    /// Clear the registry, then register every pair in order with merge
    /// semantics — repeated keys accumulate as alternatives.
    pub fn set_productions<K, P>(
        &mut self,
        pairs: impl IntoIterator<Item = (K, P)>,
    ) -> Result<(), LSystemError>
    where
        K: AsRef<str>,
        P: Into<ProductionSpec>,
    {
        self.clear_productions();
        for (key, spec) in pairs {
            self.add_production(key.as_ref(), spec)?;
        }
        Ok(())
    }

    pub fn clear_productions(&mut self) {
        self.productions.clear();
    }

    fn register(
        &mut self,
        key: &str,
        mut spec: ProductionSpec,
        merge: bool,
    ) -> Result<(), LSystemError> {
        let predecessor = if self.allow_classic_syntax {
            let ck = classic::parse_context_key(key)?;
            // Contexts from the key take precedence over spec-level ones.
            if ck.left_ctx.is_some() {
                spec.left_ctx = ck.left_ctx;
            }
            if ck.right_ctx.is_some() {
                spec.right_ctx = ck.right_ctx;
            }
            ck.predecessor
        } else {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(symbol), None) => symbol,
                _ => return Err(LSystemError::InvalidKey(key.to_owned())),
            }
        };

        let production = normalize(predecessor, spec, self.force_objects)?;
        if merge {
            self.productions.merge(predecessor, production);
        } else {
            self.productions.set(predecessor, production);
        }
        Ok(())
    }

    // ── Finals ───────────────────────────────────────────────────────

    /// Register an interpretation callback for `symbol`.
    pub fn set_final(
        &mut self,
        symbol: char,
        f: impl FnMut(&FinalArgs<'_>, Option<&mut dyn Any>) + 'static,
    ) {
        self.finals.insert(symbol, Box::new(f));
    }

    /// Replace the whole final table.
    pub fn set_finals(&mut self, pairs: impl IntoIterator<Item = (char, FinalFn)>) {
        self.finals = pairs.into_iter().collect();
    }

    /// Invoke the registered final for each symbol of the current word, in
    /// word order. Symbols without a final are skipped.
    pub fn finalize(&mut self) {
        self.finalize_inner(None);
    }

    /// Like [`finalize`](Self::finalize), but threads an external argument
    /// (a canvas, a turtle state, …) through every callback.
    pub fn finalize_with(&mut self, external: &mut dyn Any) {
        self.finalize_inner(Some(external));
    }

    fn finalize_inner(&mut self, mut external: Option<&mut dyn Any>) {
        let finals = &mut self.finals;
        match &self.axiom {
            Sequence::Text(s) => {
                for (index, symbol) in s.chars().enumerate() {
                    if let Some(f) = finals.get_mut(&symbol) {
                        let part = SymbolEntry::new(symbol);
                        f(&FinalArgs { index, part: &part }, external.as_deref_mut());
                    }
                }
            }
            Sequence::Entries(entries) => {
                for (index, part) in entries.iter().enumerate() {
                    if let Some(f) = finals.get_mut(&part.symbol) {
                        f(&FinalArgs { index, part }, external.as_deref_mut());
                    }
                }
            }
        }
    }

    // ── Rewriting ────────────────────────────────────────────────────

    /// Run one rewrite pass and swap in the new word. The swap happens only
    /// after the whole pass succeeded; a panicking successor closure leaves
    /// the pre-pass word in place.
    pub fn apply_productions(&mut self) -> &Sequence {
        let current = &self.axiom;
        let tokens = current.tokens();
        let mut next = match current {
            Sequence::Text(_) => Sequence::Text(String::new()),
            Sequence::Entries(_) => Sequence::Entries(Vec::new()),
        };

        let registry = &self.productions;
        let mut env = ResolveEnv {
            tokens: &tokens,
            sequence: current,
            branch_symbols: self.branch_symbols,
            ignored: &self.ignored_symbols,
            rng: self.rng.as_mut(),
        };

        for index in 0..tokens.len() {
            let part = match current {
                Sequence::Text(_) => SymbolEntry::new(tokens[index]),
                Sequence::Entries(entries) => entries[index].clone(),
            };

            let result = registry
                .get(part.symbol)
                .and_then(|p| resolve(p, index, &part, &part.params, &mut env));

            match result {
                Some(replacement) => next.append(&replacement),
                None => next.push_entry(part),
            }
        }

        self.axiom = next;
        &self.axiom
    }

    /// Run `n` generations, feeding each pass's output into the next.
    pub fn iterate(&mut self, n: usize) -> &Sequence {
        for _ in 0..n {
            self.apply_productions();
            self.generation += 1;
        }
        &self.axiom
    }

    // ── Context matching ─────────────────────────────────────────────

    /// The public neighbor matcher, for hand-written context-sensitive
    /// production functions. Options left `None` fall back to the engine's
    /// branch/ignore configuration and current word.
    pub fn match_context(&self, opts: MatchOptions<'_>) -> MatchResult {
        let sequence = opts.sequence.unwrap_or(&self.axiom);
        let tokens = sequence.tokens();
        let pattern: Vec<char> = opts.pattern.chars().collect();
        let branch_symbols = opts.branch_symbols.or(self.branch_symbols);
        let ignored: HashSet<char> = match opts.ignored_symbols {
            Some(s) => s.chars().collect(),
            None => self.ignored_symbols.clone(),
        };
        match_pattern(&tokens, &pattern, opts.index, opts.direction, branch_symbols, &ignored)
    }
}

impl std::fmt::Debug for LSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LSystem")
            .field("axiom", &self.axiom)
            .field("branch_symbols", &self.branch_symbols)
            .field("ignored_symbols", &self.ignored_symbols)
            .field("allow_classic_syntax", &self.allow_classic_syntax)
            .field("force_objects", &self.force_objects)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────

/// Configuration for [`LSystem`]. Productions and finals registered here
/// are applied in order by [`build`](Self::build), with merge semantics for
/// repeated production keys.
#[derive(Default)]
pub struct LSystemBuilder {
    axiom: Sequence,
    productions: Vec<(String, ProductionSpec)>,
    finals: Vec<(char, FinalFn)>,
    branch_symbols: Option<(char, char)>,
    ignored_symbols: String,
    disallow_classic_syntax: bool,
    force_objects: bool,
    rng: Option<Box<dyn RngCore>>,
}

impl LSystemBuilder {
    pub fn axiom(mut self, axiom: impl Into<Sequence>) -> Self {
        self.axiom = axiom.into();
        self
    }

    pub fn production(mut self, key: &str, spec: impl Into<ProductionSpec>) -> Self {
        self.productions.push((key.to_owned(), spec.into()));
        self
    }

    pub fn on_final(
        mut self,
        symbol: char,
        f: impl FnMut(&FinalArgs<'_>, Option<&mut dyn Any>) + 'static,
    ) -> Self {
        self.finals.push((symbol, Box::new(f)));
        self
    }

    /// The open/close pair marking sub-branches, e.g. `('[', ']')`.
    pub fn branch_symbols(mut self, open: char, close: char) -> Self {
        self.branch_symbols = Some((open, close));
        self
    }

    /// Symbols transparent to context matching, classically `"+-&^/|\\"`.
    pub fn ignored_symbols(mut self, symbols: &str) -> Self {
        self.ignored_symbols = symbols.to_owned();
        self
    }

    /// Disable classic key parsing; keys must then be single symbols.
    pub fn allow_classic_syntax(mut self, allow: bool) -> Self {
        self.disallow_classic_syntax = !allow;
        self
    }

    /// Coerce string axioms and literal successors into structured entries.
    pub fn force_objects(mut self, force: bool) -> Self {
        self.force_objects = force;
        self
    }

    /// Use a caller-supplied random source for stochastic selection,
    /// e.g. a seeded `StdRng` for reproducible runs.
    pub fn rng(mut self, rng: impl RngCore + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    pub fn build(self) -> Result<LSystem, LSystemError> {
        let LSystemBuilder {
            axiom,
            productions,
            finals,
            branch_symbols,
            ignored_symbols,
            disallow_classic_syntax,
            force_objects,
            rng,
        } = self;

        let mut system = LSystem {
            axiom: Sequence::default(),
            productions: Registry::default(),
            finals: HashMap::new(),
            branch_symbols,
            ignored_symbols: ignored_symbols.chars().collect(),
            allow_classic_syntax: !disallow_classic_syntax,
            force_objects,
            rng: rng.unwrap_or_else(|| Box::new(rand::thread_rng())),
            generation: 0,
        };

        system.set_axiom(axiom);
        for (key, spec) in productions {
            system.add_production(&key, spec)?;
        }
        for (symbol, f) in finals {
            system.finals.insert(symbol, f);
        }
        Ok(system)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
