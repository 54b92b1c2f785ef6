//! Permutation expansion and constant promotion.

use permtest_types::{
    Assignment, ExpandedCase, ExpandedSuite, ParamSource, ParamValue, Permutation, Suite,
};

use crate::error::{ExpandError, ExpandResult};
use crate::merge::merge;

/// Expand a merged assignment into fully scalar assignments.
///
/// The first key in sorted order holding a sequence is replaced by each of
/// its candidates in turn, and every child is expanded depth-first before
/// the next candidate. Candidates that are sequences themselves are
/// expanded again. An assignment without sequences yields itself.
///
/// On an empty sequence the name of the offending key is returned.
pub fn expand(merged: Assignment) -> Result<Vec<Assignment>, String> {
    let mut out = Vec::new();
    // Stack holds pending assignments in reverse order of emission.
    let mut stack = vec![merged];

    while let Some(assignment) = stack.pop() {
        let axis = assignment
            .iter()
            .find_map(|(k, v)| match v {
                ParamValue::List(candidates) => Some((k.clone(), candidates.clone())),
                _ => None,
            });

        match axis {
            None => out.push(assignment),
            Some((key, candidates)) if candidates.is_empty() => return Err(key),
            Some((key, candidates)) => {
                for candidate in candidates.into_iter().rev() {
                    let mut child = assignment.clone();
                    child.insert(key.clone(), candidate);
                    stack.push(child);
                }
            }
        }
    }

    Ok(out)
}

/// Keys bound to the same value in every assignment.
///
/// A key missing from any assignment is not constant. The result does not
/// depend on the order of `assignments`; an empty input has no constants.
pub fn common_constants<'a, I>(assignments: I) -> Assignment
where
    I: IntoIterator<Item = &'a Assignment>,
{
    let mut iter = assignments.into_iter();
    let Some(first) = iter.next() else {
        return Assignment::new();
    };
    let mut constants = first.clone();
    for assignment in iter {
        constants.retain(|k, v| assignment.get(k) == Some(v));
        if constants.is_empty() {
            break;
        }
    }
    constants
}

/// Merges and expands the cases of a suite.
///
/// Holds the two sources that are the same for every suite of a run: the
/// invocation overrides (highest precedence) and the global defaults
/// (lowest precedence).
#[derive(Debug, Clone, Default)]
pub struct Expander {
    overrides: ParamSource,
    globals: ParamSource,
}

impl Expander {
    pub fn new(globals: impl Into<ParamSource>) -> Self {
        Self {
            overrides: ParamSource::default(),
            globals: globals.into(),
        }
    }

    pub fn with_overrides(mut self, overrides: impl Into<ParamSource>) -> Self {
        self.overrides = overrides.into();
        self
    }

    /// Expand every case of `suite` and promote constants.
    pub fn expand_suite(&self, suite: Suite) -> ExpandResult<ExpandedSuite> {
        let mut cases = Vec::with_capacity(suite.cases.len());

        for case in &suite.cases {
            let combinations = merge(&[&self.overrides, &suite.defines, &case.defines, &self.globals]);
            if combinations.is_empty() {
                return Err(ExpandError::NoCombinations {
                    suite: suite.name.clone(),
                    case: case.index,
                });
            }

            let mut assignments = Vec::new();
            for merged in combinations {
                let expanded = expand(merged).map_err(|key| ExpandError::EmptyCandidates {
                    suite: suite.name.clone(),
                    case: case.index,
                    key,
                })?;
                assignments.extend(expanded);
            }
            check_consistent_keys(&suite.name, case.index, &assignments)?;

            let constants = common_constants(&assignments);
            let permutations = assignments
                .into_iter()
                .enumerate()
                .map(|(index, params)| Permutation {
                    case: case.index,
                    index,
                    params,
                })
                .collect::<Vec<_>>();

            tracing::debug!(
                suite = %suite.name,
                case = case.index,
                permutations = permutations.len(),
                constants = constants.len(),
                "expanded case"
            );

            cases.push(ExpandedCase {
                case: case.clone(),
                permutations,
                constants,
            });
        }

        let constants = common_constants(
            cases
                .iter()
                .flat_map(|c| c.permutations.iter().map(|p| &p.params)),
        );

        Ok(ExpandedSuite {
            suite,
            cases,
            constants,
        })
    }
}

fn check_consistent_keys(suite: &str, case: usize, assignments: &[Assignment]) -> ExpandResult<()> {
    let Some(first) = assignments.first() else {
        return Ok(());
    };
    for assignment in &assignments[1..] {
        let stray = assignment
            .keys()
            .find(|k| !first.contains_key(*k))
            .or_else(|| first.keys().find(|k| !assignment.contains_key(*k)));
        if let Some(key) = stray {
            return Err(ExpandError::InconsistentKeys {
                suite: suite.to_string(),
                case,
                key: key.clone(),
            });
        }
    }
    Ok(())
}
