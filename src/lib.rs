//! # lindenmayer
//!
//! An L-System rewriting engine: start from an axiom, repeatedly rewrite
//! every symbol through its production, and interpret the grown word with
//! per-symbol finals.
//!
//! | Module       | Responsibility                                            |
//! |--------------|-----------------------------------------------------------|
//! | `symbol`     | The word under rewrite: plain text or structured entries  |
//! | `production` | Rule specs, normalization and the predecessor registry    |
//! | `matcher`    | Bracket-aware neighbor matching for sensitive contexts    |
//! | `resolver`   | Condition/context checks and alternative selection        |
//! | `classic`    | Legacy forms: `A<B>C` keys, stochastic lists, `A(1,2)`    |
//! | `engine`     | [`LSystem`]: generation driver, finals, public match API  |
//! | `error`      | Registration-time error taxonomy                          |
//!
//! ## Quick start
//!
//! ```
//! use lindenmayer::{LSystem, ProductionSpec};
//!
//! // Koch curve, with a stochastic twist on 'X'.
//! let mut sys = LSystem::builder()
//!     .axiom("F++F++F")
//!     .production("F", "F-F++F-F")
//!     .production(
//!         "X",
//!         ProductionSpec::new().alternatives([
//!             ProductionSpec::from("F").weight(0.9),
//!             ProductionSpec::from("FF").weight(0.1),
//!         ]),
//!     )
//!     .build()?;
//!
//! sys.iterate(2);
//! assert_eq!(sys.string().len(), 112);
//! # Ok::<(), lindenmayer::LSystemError>(())
//! ```
//!
//! Context-sensitive productions are registered with classic keys, and
//! branches in the word are skipped transparently:
//!
//! ```
//! use lindenmayer::LSystem;
//!
//! let mut sys = LSystem::builder()
//!     .axiom("A[X]BC")
//!     .production("A<B>C", "Z")
//!     .branch_symbols('[', ']')
//!     .build()?;
//!
//! assert_eq!(sys.iterate(1).to_string(), "A[X]ZC");
//! # Ok::<(), lindenmayer::LSystemError>(())
//! ```

pub mod classic;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod production;
mod resolver;
pub mod symbol;

pub use engine::{FinalArgs, FinalFn, LSystem, LSystemBuilder};
pub use error::LSystemError;
pub use matcher::{Direction, MatchOptions, MatchResult};
pub use production::{ConditionFn, ProductionArgs, ProductionSpec, SuccessorFn};
pub use symbol::{Sequence, SymbolEntry};
