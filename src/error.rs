use thiserror::Error;

/// Errors raised while configuring an [`crate::LSystem`].
///
/// All variants are registration-time errors: a rewrite pass itself never
/// fails. A production that does not match simply leaves the original
/// symbol in place.
#[derive(Debug, Error)]
pub enum LSystemError {
    /// A production spec carried both a single successor and an
    /// alternatives list.
    #[error("production for '{0}': a spec cannot define both a successor and an alternatives list")]
    BothSuccessorForms(char),

    /// A production spec carried neither a successor nor alternatives.
    #[error("production for '{0}': spec defines neither a successor nor alternatives")]
    MissingSuccessor(char),

    /// A classic context key like `A<B>C` named a different predecessor on
    /// the left side of `<` than before `>`.
    #[error("context key {key:?}: predecessor '{left}' after '<' does not match '{right}' before '>'")]
    PredecessorMismatch { key: String, left: char, right: char },

    /// A production key that is neither a single symbol nor a valid classic
    /// context pattern.
    #[error("production key {0:?} must be a single symbol or a classic context pattern")]
    InvalidKey(String),

    /// A parametric axiom string like `A(1,2)B(3)` could not be tokenized.
    #[error("parametric axiom {input:?}: {reason}")]
    ParametricParse { input: String, reason: String },
}
