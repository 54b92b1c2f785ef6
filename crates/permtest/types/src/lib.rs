#![deny(unsafe_code)]
//! # permtest-types
//!
//! Shared data model for the permtest pipeline.
//!
//! - [`ParamValue`], [`ParamMap`] and [`ParamSource`] describe parameter
//!   definitions as authored, before merging.
//! - [`Suite`] and [`Case`] are the loaded test definitions.
//! - [`ExpandedSuite`], [`ExpandedCase`] and [`Permutation`] are the
//!   result of merging and expanding parameters.
//! - [`Outcome`] and [`PermutationResult`] record what happened when a
//!   permutation was executed.

pub mod outcome;
pub mod param;
pub mod suite;

pub use outcome::{AssertionRecord, Failure, Outcome, PermutationResult};
pub use param::{Assignment, ParamMap, ParamSource, ParamValue};
pub use suite::{Case, ExpandedCase, ExpandedSuite, Permutation, Selector, Suite};
