//! Classic ABOP syntax preprocessing.
//!
//! The engine core only consumes tokenized context patterns; this module
//! translates the legacy textual forms ahead of registration:
//!
//! - context keys like `A<B>C` (left context `A`, predecessor `B`, right
//!   context `C`) via [`parse_context_key`];
//! - bare successor lists with equal selection probability via
//!   [`stochastic_list`];
//! - parametric axiom strings like `A(1,2,5)B(2.5)` via
//!   [`parse_parametric_axiom`].
//!
//! All are pure functions; nothing here touches engine state.

use crate::production::ProductionSpec;
use crate::symbol::SymbolEntry;
use crate::LSystemError;

// ─────────────────────────────────────────────
// Context keys
// ─────────────────────────────────────────────

/// A production key split into predecessor and optional context patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextKey {
    pub predecessor: char,
    pub left_ctx: Option<String>,
    pub right_ctx: Option<String>,
}

/// Parse a classic production key.
///
/// Plain single-symbol keys pass through with no contexts. For `A<B>C` the
/// left context is everything before the last `<`, the right context
/// everything after the first `>`, and the predecessor is the symbol they
/// enclose. A key whose two sides disagree on the predecessor is rejected,
/// as is a multi-symbol key without context markers.
pub fn parse_context_key(key: &str) -> Result<ContextKey, LSystemError> {
    // Left side: the symbol right after the last '<' with a non-empty prefix.
    let left = key
        .char_indices()
        .filter(|&(_, c)| c == '<')
        .last()
        .and_then(|(i, c)| {
            let prefix = &key[..i];
            let predecessor = key[i + c.len_utf8()..].chars().next();
            match (prefix.is_empty(), predecessor) {
                (false, Some(p)) => Some((prefix.to_owned(), p)),
                _ => None,
            }
        });

    // Right side: the symbol right before the first '>' with a non-empty suffix.
    let right = key
        .char_indices()
        .find(|&(_, c)| c == '>')
        .and_then(|(i, c)| {
            let suffix = &key[i + c.len_utf8()..];
            let predecessor = key[..i].chars().last();
            match (predecessor, suffix.is_empty()) {
                (Some(p), false) => Some((p, suffix.to_owned())),
                _ => None,
            }
        });

    match (left, right) {
        (None, None) => {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(predecessor), None) => Ok(ContextKey {
                    predecessor,
                    left_ctx: None,
                    right_ctx: None,
                }),
                _ => Err(LSystemError::InvalidKey(key.to_owned())),
            }
        }
        (Some((left_ctx, predecessor)), None) => Ok(ContextKey {
            predecessor,
            left_ctx: Some(left_ctx),
            right_ctx: None,
        }),
        (None, Some((predecessor, right_ctx))) => Ok(ContextKey {
            predecessor,
            left_ctx: None,
            right_ctx: Some(right_ctx),
        }),
        (Some((left_ctx, left_pred)), Some((right_pred, right_ctx))) => {
            if left_pred != right_pred {
                return Err(LSystemError::PredecessorMismatch {
                    key: key.to_owned(),
                    left: left_pred,
                    right: right_pred,
                });
            }
            Ok(ContextKey {
                predecessor: left_pred,
                left_ctx: Some(left_ctx),
                right_ctx: Some(right_ctx),
            })
        }
    }
}

// ─────────────────────────────────────────────
// Stochastic successor lists
// ─────────────────────────────────────────────

/// Translate a legacy stochastic successor list: every element gets the
/// same selection probability.
///
/// Without this translation a list of unweighted alternatives is ordered
/// and the first one that resolves always wins. Elements keep their own
/// contexts and conditions; any weight already set is overridden.
///
/// ```
/// use lindenmayer::{classic, LSystem};
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let mut sys = LSystem::builder()
///     .axiom("FF")
///     .production("F", classic::stochastic_list(["A", "B"]))
///     .rng(StdRng::seed_from_u64(0))
///     .build()?;
/// sys.iterate(1);
/// # Ok::<(), lindenmayer::LSystemError>(())
/// ```
pub fn stochastic_list<P>(alternatives: impl IntoIterator<Item = P>) -> ProductionSpec
where
    P: Into<ProductionSpec>,
{
    ProductionSpec::new()
        .alternatives(alternatives.into_iter().map(|p| p.into().weight(1.0)))
}

// ─────────────────────────────────────────────
// Parametric axioms
// ─────────────────────────────────────────────

/// True if `axiom` contains a parenthesized parameter group.
pub fn has_parametric_syntax(axiom: &str) -> bool {
    match axiom.find('(') {
        Some(i) => axiom[i + 1..].find(')').is_some_and(|j| j > 0),
        None => false,
    }
}

/// Tokenize a parametric axiom string into structured entries.
///
/// `A(1,2,5)B(2.5)C` becomes entries for `A` (params `[1, 2, 5]`), `B`
/// (params `[2.5]`) and `C` (no params). Whitespace is stripped.
pub fn parse_parametric_axiom(input: &str) -> Result<Vec<SymbolEntry>, LSystemError> {
    let err = |reason: &str| LSystemError::ParametricParse {
        input: input.to_owned(),
        reason: reason.to_owned(),
    };

    let mut entries: Vec<SymbolEntry> = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        if c == '(' || c == ')' || c == ',' {
            return Err(err("parameter group without a preceding symbol"));
        }

        let mut entry = SymbolEntry::new(c);
        if chars.peek() == Some(&'(') {
            chars.next();
            let mut current = String::new();
            loop {
                match chars.next() {
                    Some(')') => {
                        entry.params.push(parse_number(&current, input)?);
                        break;
                    }
                    Some(',') => {
                        entry.params.push(parse_number(&current, input)?);
                        current.clear();
                    }
                    Some(d) if d.is_whitespace() => {}
                    Some(d) => current.push(d),
                    None => return Err(err("unbalanced parentheses")),
                }
            }
        }
        entries.push(entry);
    }

    Ok(entries)
}

fn parse_number(text: &str, input: &str) -> Result<f64, LSystemError> {
    text.parse::<f64>().map_err(|_| LSystemError::ParametricParse {
        input: input.to_owned(),
        reason: format!("invalid parameter {text:?}"),
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_key_passes_through() {
        let k = parse_context_key("F").unwrap();
        assert_eq!(k, ContextKey { predecessor: 'F', left_ctx: None, right_ctx: None });
    }

    #[test]
    fn two_sided_key_splits_into_contexts() {
        let k = parse_context_key("A<B>C").unwrap();
        assert_eq!(k.predecessor, 'B');
        assert_eq!(k.left_ctx.as_deref(), Some("A"));
        assert_eq!(k.right_ctx.as_deref(), Some("C"));
    }

    #[test]
    fn multi_symbol_contexts_are_kept_whole() {
        let k = parse_context_key("AB<C>DE").unwrap();
        assert_eq!(k.predecessor, 'C');
        assert_eq!(k.left_ctx.as_deref(), Some("AB"));
        assert_eq!(k.right_ctx.as_deref(), Some("DE"));
    }

    #[test]
    fn one_sided_keys() {
        let k = parse_context_key("A<B").unwrap();
        assert_eq!(k.predecessor, 'B');
        assert_eq!(k.left_ctx.as_deref(), Some("A"));
        assert!(k.right_ctx.is_none());

        let k = parse_context_key("B>C").unwrap();
        assert_eq!(k.predecessor, 'B');
        assert!(k.left_ctx.is_none());
        assert_eq!(k.right_ctx.as_deref(), Some("C"));
    }

    #[test]
    fn disagreeing_predecessor_is_rejected() {
        let err = parse_context_key("A<BC>D").unwrap_err();
        assert!(matches!(
            err,
            LSystemError::PredecessorMismatch { left: 'B', right: 'C', .. }
        ));
    }

    #[test]
    fn multi_symbol_plain_key_is_rejected() {
        assert!(matches!(
            parse_context_key("FG").unwrap_err(),
            LSystemError::InvalidKey(_)
        ));
        assert!(matches!(
            parse_context_key("").unwrap_err(),
            LSystemError::InvalidKey(_)
        ));
    }

    #[test]
    fn stochastic_list_weights_elements_equally() {
        let spec = stochastic_list(["A", "B", "C"]);
        let p = crate::production::normalize('F', spec, false).unwrap();
        assert!(p.stochastic);
        assert!((p.weight_sum - 3.0).abs() < 1e-12);
    }

    #[test]
    fn detects_parametric_syntax() {
        assert!(has_parametric_syntax("A(1,2)B"));
        assert!(!has_parametric_syntax("AB+C"));
        assert!(!has_parametric_syntax("A()B"));
    }

    #[test]
    fn parses_parametric_axiom() {
        let entries = parse_parametric_axiom("A(1,2,5) B(2.5)C").unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].symbol, 'A');
        assert_eq!(entries[0].params, vec![1.0, 2.0, 5.0]);
        assert_eq!(entries[1].symbol, 'B');
        assert_eq!(entries[1].params, vec![2.5]);
        assert_eq!(entries[2].symbol, 'C');
        assert!(entries[2].params.is_empty());
    }

    #[test]
    fn rejects_malformed_parameter_groups() {
        assert!(parse_parametric_axiom("A(1,").is_err());
        assert!(parse_parametric_axiom("(1)A").is_err());
        assert!(parse_parametric_axiom("A(x)").is_err());
    }
}
