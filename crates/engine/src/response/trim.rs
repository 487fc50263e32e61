use error::{ErrorPathSegment, GraphqlError};
use serde_json::Value;

use super::path::{ResponsePath, ResponseValueId};

/// Error of a non-null field, its null propagates to the nearest nullable ancestor.
#[derive(Debug)]
pub(crate) struct BubblingError {
    pub error: GraphqlError,
    pub path: ResponsePath,
}

/// Nulls the nearest nullable ancestor of every bubbling error and returns the errors worth
/// reporting.
///
/// Errors whose null lands below a value already nulled by another error are dropped, one
/// failure is reported once however deep it bubbles. Kept errors retain their original order.
pub(crate) fn trim(data: &mut Value, errors: Vec<BubblingError>) -> Vec<GraphqlError> {
    let targets: Vec<Option<Vec<ErrorPathSegment>>> = errors.iter().map(|error| null_target(&error.path)).collect();

    let mut order: Vec<usize> = (0..errors.len()).collect();
    order.sort_by_key(|&i| targets[i].as_ref().map(Vec::len).unwrap_or_default());

    let mut nulled: Vec<&[ErrorPathSegment]> = Vec::new();
    let mut kept = vec![false; errors.len()];
    for i in order {
        let target: &[ErrorPathSegment] = targets[i].as_deref().unwrap_or_default();
        let under_nulled = nulled
            .iter()
            .any(|ancestor| ancestor.len() < target.len() && target.starts_with(ancestor));
        if under_nulled {
            continue;
        }
        kept[i] = true;
        if targets[i].is_none() {
            *data = Value::Null;
        } else {
            set_null(data, target);
        }
        nulled.push(target);
    }

    errors
        .into_iter()
        .zip(kept)
        .filter_map(|(error, kept)| kept.then_some(error.error))
        .collect()
}

/// Path of the nearest nullable value at or above the failing one, `None` for the root.
fn null_target(path: &ResponsePath) -> Option<Vec<ErrorPathSegment>> {
    let ids = path.to_vec();
    let position = ids.iter().rposition(ResponseValueId::is_nullable)?;
    Some(ids[..=position].iter().map(ErrorPathSegment::from).collect())
}

fn set_null(data: &mut Value, target: &[ErrorPathSegment]) {
    let mut current = data;
    for segment in target {
        let next = match (segment, current) {
            (ErrorPathSegment::Field(key), Value::Object(object)) => object.get_mut(key.as_ref()),
            (ErrorPathSegment::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        };
        match next {
            Some(next) => current = next,
            None => return,
        }
    }
    *current = Value::Null;
}
