//! Production resolution: condition → context checks → successor.
//!
//! Resolution never fails with an error. `None` is the no-match signal:
//! at the top level the generation driver falls back to the original
//! symbol; inside an alternatives list it moves on to the next element.

use std::collections::HashSet;

use rand::{Rng, RngCore};

use crate::matcher::{match_pattern, Direction};
use crate::production::{Alternative, ConditionFn, Leaf, Production, ProductionArgs, Successor};
use crate::symbol::{Sequence, SymbolEntry};

/// Everything a resolution step needs from the engine: the tokenized
/// pre-rewrite word, the branch/ignore configuration and the random source
/// for stochastic lists.
pub(crate) struct ResolveEnv<'a> {
    pub tokens: &'a [char],
    pub sequence: &'a Sequence,
    pub branch_symbols: Option<(char, char)>,
    pub ignored: &'a HashSet<char>,
    pub rng: &'a mut dyn RngCore,
}

/// Resolve `production` at `index`. `None` means the production did not
/// match; the caller keeps the original entry.
pub(crate) fn resolve(
    production: &Production,
    index: usize,
    part: &SymbolEntry,
    params: &[f64],
    env: &mut ResolveEnv<'_>,
) -> Option<Sequence> {
    if !precheck(
        production.condition.as_ref(),
        production.left_ctx.as_deref(),
        production.right_ctx.as_deref(),
        index,
        part,
        params,
        env,
    ) {
        return None;
    }

    match &production.successor {
        Successor::Literal(seq) => Some(seq.clone()),
        Successor::Computed(f) => f(&ProductionArgs {
            index,
            sequence: env.sequence,
            part,
            params,
        }),
        Successor::Alternatives(list) => {
            if production.stochastic {
                resolve_stochastic(production.weight_sum, list, index, part, params, env)
            } else {
                resolve_ordered(list, index, part, params, env)
            }
        }
    }
}

/// Condition first, then the context sides that are present. All present
/// guards must pass.
fn precheck(
    condition: Option<&ConditionFn>,
    left_ctx: Option<&[char]>,
    right_ctx: Option<&[char]>,
    index: usize,
    part: &SymbolEntry,
    params: &[f64],
    env: &ResolveEnv<'_>,
) -> bool {
    if let Some(cond) = condition {
        let args = ProductionArgs { index, sequence: env.sequence, part, params };
        if !cond(&args) {
            return false;
        }
    }
    if let Some(pattern) = left_ctx {
        let m = match_pattern(
            env.tokens,
            pattern,
            index,
            Direction::Left,
            env.branch_symbols,
            env.ignored,
        );
        if !m.matched {
            return false;
        }
    }
    if let Some(pattern) = right_ctx {
        let m = match_pattern(
            env.tokens,
            pattern,
            index,
            Direction::Right,
            env.branch_symbols,
            env.ignored,
        );
        if !m.matched {
            return false;
        }
    }
    true
}

/// Weighted selection: draw once in `[0, weight_sum)`, walk the cumulative
/// weights and try the first alternative at or past the draw. If its own
/// guards fail, the walk keeps going through the rest of the list.
fn resolve_stochastic(
    weight_sum: f64,
    list: &[Alternative],
    index: usize,
    part: &SymbolEntry,
    params: &[f64],
    env: &mut ResolveEnv<'_>,
) -> Option<Sequence> {
    let draw = env.rng.gen::<f64>() * weight_sum;
    let mut cumulative = 0.0;
    let mut tried = false;

    for alt in list {
        cumulative += alt.weight.unwrap_or(0.0);
        if cumulative < draw {
            continue;
        }
        tried = true;
        if let Some(result) = resolve_alternative(alt, index, part, params, env) {
            return Some(result);
        }
    }

    // The draw is strictly below weight_sum and the cumulative walk reaches
    // weight_sum, so at least one alternative must have been tried.
    debug_assert!(
        tried,
        "stochastic draw {draw} missed the weight partition of sum {weight_sum}"
    );
    None
}

/// Ordered selection: the first alternative that resolves wins; later
/// alternatives are never evaluated.
fn resolve_ordered(
    list: &[Alternative],
    index: usize,
    part: &SymbolEntry,
    params: &[f64],
    env: &mut ResolveEnv<'_>,
) -> Option<Sequence> {
    for alt in list {
        if let Some(result) = resolve_alternative(alt, index, part, params, env) {
            return Some(result);
        }
    }
    None
}

fn resolve_alternative(
    alt: &Alternative,
    index: usize,
    part: &SymbolEntry,
    params: &[f64],
    env: &mut ResolveEnv<'_>,
) -> Option<Sequence> {
    if !precheck(
        alt.condition.as_ref(),
        alt.left_ctx.as_deref(),
        alt.right_ctx.as_deref(),
        index,
        part,
        params,
        env,
    ) {
        return None;
    }
    match &alt.leaf {
        Leaf::Literal(seq) => Some(seq.clone()),
        Leaf::Computed(f) => f(&ProductionArgs {
            index,
            sequence: env.sequence,
            part,
            params,
        }),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::production::{normalize, ProductionSpec};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn env<'a>(
        tokens: &'a [char],
        sequence: &'a Sequence,
        ignored: &'a HashSet<char>,
        rng: &'a mut dyn RngCore,
    ) -> ResolveEnv<'a> {
        ResolveEnv { tokens, sequence, branch_symbols: None, ignored, rng }
    }

    fn resolve_at(p: &Production, word: &str, index: usize, rng: &mut dyn RngCore) -> Option<Sequence> {
        let sequence = Sequence::from(word);
        let tokens = sequence.tokens();
        let ignored = HashSet::new();
        let part = SymbolEntry::new(tokens[index]);
        let mut env = env(&tokens, &sequence, &ignored, rng);
        resolve(p, index, &part, &[], &mut env)
    }

    #[test]
    fn literal_successor_resolves_directly() {
        let p = normalize('F', ProductionSpec::from("F-F"), false).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(resolve_at(&p, "F", 0, &mut rng), Some(Sequence::from("F-F")));
    }

    #[test]
    fn failing_condition_signals_no_match() {
        let p = normalize(
            'F',
            ProductionSpec::from("X").condition(|_| false),
            false,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(resolve_at(&p, "F", 0, &mut rng), None);
    }

    #[test]
    fn condition_sees_index_and_params() {
        let p = normalize(
            'F',
            ProductionSpec::from("X").condition(|args| args.index == 1 && args.params.is_empty()),
            false,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(resolve_at(&p, "FF", 1, &mut rng), Some(Sequence::from("X")));
        assert_eq!(resolve_at(&p, "FF", 0, &mut rng), None);
    }

    #[test]
    fn both_context_sides_must_match() {
        let p = normalize(
            'B',
            ProductionSpec::from("Z").left_context("A").right_context("C"),
            false,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(resolve_at(&p, "ABC", 1, &mut rng), Some(Sequence::from("Z")));
        assert_eq!(resolve_at(&p, "XBC", 1, &mut rng), None);
        assert_eq!(resolve_at(&p, "ABX", 1, &mut rng), None);
    }

    #[test]
    fn ordered_list_takes_first_success_and_short_circuits() {
        let spec = ProductionSpec::new().alternatives([
            ProductionSpec::computed(|_| None),
            ProductionSpec::computed(|_| None),
            ProductionSpec::computed(|_| Some(Sequence::from("X"))),
            ProductionSpec::computed(|_| panic!("later alternatives must never be evaluated")),
        ]);
        let p = normalize('B', spec, false).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(resolve_at(&p, "B", 0, &mut rng), Some(Sequence::from("X")));
    }

    #[test]
    fn exhausted_ordered_list_signals_no_match() {
        let spec = ProductionSpec::new().alternatives([
            ProductionSpec::computed(|_| None),
            ProductionSpec::computed(|_| None),
        ]);
        let p = normalize('B', spec, false).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(resolve_at(&p, "B", 0, &mut rng), None);
    }

    #[test]
    fn stochastic_selection_always_lands() {
        let spec = ProductionSpec::new().alternatives([
            ProductionSpec::from("A").weight(0.89),
            ProductionSpec::from("B").weight(0.1),
            ProductionSpec::from("C").weight(0.01),
        ]);
        let p = normalize('X', spec, false).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let result = resolve_at(&p, "X", 0, &mut rng).expect("weighted draw must select");
            let s = result.to_string();
            assert!(s == "A" || s == "B" || s == "C");
        }
    }

    #[test]
    fn stochastic_alternative_guards_fall_through() {
        // The heavy alternative never matches, so every draw falls through
        // to the rest of the list.
        let spec = ProductionSpec::new().alternatives([
            ProductionSpec::from("A").weight(1000.0).condition(|_| false),
            ProductionSpec::from("B").weight(1.0),
        ]);
        let p = normalize('X', spec, false).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let result = resolve_at(&p, "X", 0, &mut rng);
            assert_eq!(result, Some(Sequence::from("B")));
        }
    }
}
