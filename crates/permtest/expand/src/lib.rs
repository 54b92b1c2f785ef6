#![deny(unsafe_code)]
//! # permtest-expand
//!
//! Turns authored parameter definitions into concrete permutations.
//!
//! Pipeline per case:
//! 1. [`merge`] the four layered sources (invocation overrides, suite
//!    defaults, case overrides, global defaults), first binding wins,
//!    string values evaluated by [`eval`] against names already bound.
//! 2. [`expand`] every merged assignment into the depth-first
//!    cross-product of its sequence-valued keys, in sorted key order.
//! 3. Promote keys that never vary to case and suite constants.
//!
//! [`Expander`] runs the whole pipeline for a [`Suite`](permtest_types::Suite).

pub mod error;
pub mod eval;
pub mod expand;
pub mod merge;

pub use error::{EvalError, EvalResult, ExpandError, ExpandResult};
pub use eval::evaluate;
pub use expand::{common_constants, expand, Expander};
pub use merge::merge;
