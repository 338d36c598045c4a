//! Input-map and policy-level equality

use std::collections::BTreeMap;

use ipr_defaults::merge_input;
use ipr_model::{Diagnostics, FieldPath, Input, Inputs, IntegrationPolicy};

use crate::error::EqualityError;
use crate::input::{input_effectively_enabled, merged_inputs_equal};

/// Whether two input maps are equal after defaults and disablement erasure
///
/// Each input is merged with its own defaults, or the counterpart's when it
/// has none attached. Inputs that are not functionally enabled are dropped
/// from both sides; the rest must match key for key. An unset map is the
/// same as an empty one.
///
/// # Errors
/// Returns every field that could not be merged or parsed, from both sides
pub fn inputs_equal(a: Option<&Inputs>, b: Option<&Inputs>) -> Result<bool, EqualityError> {
    let empty = Inputs::new();
    let a = a.unwrap_or(&empty);
    let b = b.unwrap_or(&empty);

    let mut diags = Diagnostics::new();
    let a_view = erased_view(a, b, &mut diags);
    let b_view = erased_view(b, a, &mut diags);

    let mut equal = a_view.len() == b_view.len();
    for (id, a_input) in &a_view {
        let Some(b_input) = b_view.get(id) else {
            tracing::trace!(input = %id, "input present on one side only");
            equal = false;
            continue;
        };
        let path = FieldPath::attr("inputs").key(*id);
        if let Some(same) = diags.absorb(merged_inputs_equal(a_input, b_input, &path)) {
            if !same {
                tracing::trace!(input = %id, "input differs");
            }
            equal &= same;
        }
    }

    diags.finish(equal).map_err(EqualityError::Malformed)
}

/// Whether two policies carry the same vars and inputs
///
/// Only the drift-prone content is compared here; plain attributes such as
/// name or namespace are left to ordinary equality.
///
/// # Errors
/// Returns every field that could not be merged or parsed
pub fn policies_equal(a: &IntegrationPolicy, b: &IntegrationPolicy) -> Result<bool, EqualityError> {
    let mut diags = Diagnostics::new();
    let vars_equal = match a
        .vars_json
        .semantically_equal_at(&b.vars_json, &FieldPath::attr("vars_json"))
    {
        Ok(equal) => equal,
        Err(e) => {
            diags.push(e);
            false
        }
    };
    let inputs_equal = match inputs_equal(a.inputs.as_ref(), b.inputs.as_ref()) {
        Ok(equal) => equal,
        Err(EqualityError::Malformed(errors)) => {
            diags.append(errors);
            false
        }
    };
    diags
        .finish(vars_equal && inputs_equal)
        .map_err(EqualityError::Malformed)
}

/// Defaults-merged inputs of `side` that are functionally enabled
fn erased_view<'a>(
    side: &'a Inputs,
    counterpart: &Inputs,
    diags: &mut Diagnostics,
) -> BTreeMap<&'a str, Input> {
    let mut view = BTreeMap::new();
    let mut erased = 0usize;
    for (id, input) in side {
        let defaults = input
            .defaults
            .as_ref()
            .or_else(|| counterpart.get(id).and_then(|other| other.defaults.as_ref()));
        let path = FieldPath::attr("inputs").key(id.as_str());
        let Some(merged) = diags.absorb(merge_input(input, defaults, &path)) else {
            continue;
        };
        if input_effectively_enabled(&merged) {
            view.insert(id.as_str(), merged);
        } else {
            erased += 1;
        }
    }
    if erased > 0 {
        tracing::debug!(erased, "disabled inputs erased from comparison");
    }
    view
}
