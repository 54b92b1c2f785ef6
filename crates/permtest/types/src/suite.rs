//! Suites, cases and their expanded permutations.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::param::{Assignment, ParamSource};

/// One authored test scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Case {
    /// Position of the case in its suite file, starting at 0.
    pub index: usize,
    /// Line of the suite file on which the code fragment starts.
    pub line: usize,
    /// Code fragment, inserted verbatim into the generated unit.
    pub code: String,
    /// Case-level parameter overrides.
    pub defines: ParamSource,
    /// Opts the case out of memory checking.
    pub leaky: bool,
}

impl Case {
    pub fn new(index: usize, line: usize, code: impl Into<String>) -> Self {
        Self {
            index,
            line,
            code: code.into(),
            defines: ParamSource::default(),
            leaky: false,
        }
    }

    pub fn with_defines(mut self, defines: impl Into<ParamSource>) -> Self {
        self.defines = defines.into();
        self
    }

    pub fn with_leaky(mut self, leaky: bool) -> Self {
        self.leaky = leaky;
        self
    }
}

/// A named collection of cases loaded from one definition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suite {
    pub name: String,
    pub path: PathBuf,
    /// Suite-level parameter defaults.
    pub defines: ParamSource,
    pub cases: Vec<Case>,
}

impl Suite {
    /// Create a suite whose name is the file stem of `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = suite_name(&path);
        Self {
            name,
            path,
            defines: ParamSource::default(),
            cases: Vec::new(),
        }
    }

    pub fn with_defines(mut self, defines: impl Into<ParamSource>) -> Self {
        self.defines = defines.into();
        self
    }

    /// Append a case; its index must equal its position.
    pub fn with_case(mut self, case: Case) -> Self {
        debug_assert_eq!(case.index, self.cases.len());
        self.cases.push(case);
        self
    }
}

fn suite_name(path: &std::path::Path) -> String {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match base.strip_suffix(".toml") {
        Some(stem) => stem.to_string(),
        None => base,
    }
}

/// One fully scalar instantiation of a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permutation {
    pub case: usize,
    pub index: usize,
    pub params: Assignment,
}

/// A case together with its permutations and case-level constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedCase {
    pub case: Case,
    pub permutations: Vec<Permutation>,
    /// Parameters bound to the same value in every permutation.
    pub constants: Assignment,
}

impl ExpandedCase {
    /// Sorted names of parameters that vary between permutations.
    pub fn varying_keys(&self) -> Vec<&str> {
        self.permutations
            .first()
            .map(|p| {
                p.params
                    .keys()
                    .filter(|k| !self.constants.contains_key(*k))
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A suite after parameter merging and expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedSuite {
    pub suite: Suite,
    pub cases: Vec<ExpandedCase>,
    /// Parameters bound to the same value in every permutation of every case.
    pub constants: Assignment,
}

impl ExpandedSuite {
    pub fn name(&self) -> &str {
        &self.suite.name
    }

    /// All permutations in case-then-permutation order.
    pub fn permutations(&self) -> impl Iterator<Item = (&ExpandedCase, &Permutation)> {
        self.cases
            .iter()
            .flat_map(|case| case.permutations.iter().map(move |perm| (case, perm)))
    }

    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    pub fn permutation_count(&self) -> usize {
        self.cases.iter().map(|c| c.permutations.len()).sum()
    }
}

/// Restricts execution to one case, or one permutation of one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selector {
    pub case: usize,
    pub permutation: Option<usize>,
}

impl Selector {
    pub fn case(case: usize) -> Self {
        Self {
            case,
            permutation: None,
        }
    }

    pub fn permutation(case: usize, permutation: usize) -> Self {
        Self {
            case,
            permutation: Some(permutation),
        }
    }

    pub fn matches(&self, case: usize, permutation: usize) -> bool {
        self.case == case && self.permutation.map_or(true, |p| p == permutation)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.permutation {
            Some(p) => write!(f, "[{},{}]", self.case, p),
            None => write!(f, "[{}]", self.case),
        }
    }
}
