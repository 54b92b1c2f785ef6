#![deny(unsafe_code)]
//! # permtest-codegen
//!
//! Materializes an expanded suite as one C translation unit plus a make
//! fragment that knows how to build it.
//!
//! The unit holds one `test_caseN` function per case, taking as arguments
//! only the parameters that vary between that case's permutations, and a
//! `main` that dispatches on `(case, permutation)`. Parameters constant
//! across the whole suite become `-D` definitions in the make fragment.

pub mod artifact;
pub mod error;
pub mod harness;
pub mod rules;
pub mod unit;

pub use artifact::{ArtifactGenerator, ArtifactPaths, GeneratedArtifact, WriteOutcome};
pub use error::{CodegenError, CodegenResult};
pub use harness::HarnessConfig;
