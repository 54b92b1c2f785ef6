//! Layered parameter merging.

use permtest_types::{Assignment, ParamSource, ParamValue};

use crate::eval::evaluate;

/// Merge parameter sources given in precedence order.
///
/// Every alternative of every source is cross-multiplied; within one
/// combination the first source that binds a key wins. The combinations
/// built so far form the inner loop and the alternatives of the source
/// being applied the outer loop, so alternatives of lower-precedence
/// sources vary slowest.
///
/// String values are evaluated against the keys already bound in the
/// combination; a string that does not evaluate is kept verbatim.
pub fn merge(sources: &[&ParamSource]) -> Vec<Assignment> {
    let mut pending = vec![Assignment::new()];

    for source in sources {
        let mut next = Vec::with_capacity(pending.len() * source.alternatives().len());
        for alternative in source.alternatives() {
            for base in &pending {
                let mut merged = base.clone();
                for (name, value) in alternative.iter() {
                    if merged.contains_key(name) {
                        continue;
                    }
                    let resolved = resolve(name, value, &merged);
                    merged.insert(name.to_string(), resolved);
                }
                next.push(merged);
            }
        }
        pending = next;
    }

    pending
}

fn resolve(name: &str, value: &ParamValue, env: &Assignment) -> ParamValue {
    let ParamValue::Str(text) = value else {
        return value.clone();
    };
    match evaluate(text, env) {
        Ok(evaluated) => evaluated,
        Err(err) => {
            tracing::trace!(name, value = %text, error = %err, "keeping raw parameter value");
            value.clone()
        }
    }
}
