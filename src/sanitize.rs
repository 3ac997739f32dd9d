//! Normalization and validation of reviewer-assignment input.
//!
//! Clients send the reviewer field in wildly different shapes: JSON arrays,
//! single scalars, stringified arrays, widget objects, and assorted
//! placeholder junk meaning "nobody". Normalization is total: every shape
//! maps to a list of candidate id strings, and anything unrecognizable maps
//! to the empty list rather than an error.

use itertools::Itertools;
use serde_json::Value;

use crate::db::UserId;
use crate::AppState;

/// Placeholder values that mean "no reviewer selected".
fn is_placeholder(s: &str) -> bool {
    let s = s.trim();
    s.is_empty()
        || s == "0"
        || s.eq_ignore_ascii_case("null")
        || s.eq_ignore_ascii_case("undefined")
        || s == "NaN"
        || s.parse::<f64>().is_ok_and(|n| n == 0.0)
}

/// Extracts a candidate id string from one entry of a reviewer collection.
/// Widget objects carry the id under `id` or `value`.
fn entry_id(entry: &Value) -> Option<String> {
    match entry {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(map) => map.get("id").or_else(|| map.get("value")).and_then(entry_id),
        Value::Null | Value::Bool(_) | Value::Array(_) => None,
    }
}

/// Normalizes a raw reviewer field to a list of candidate id strings.
///
/// Placeholders are dropped both at the collection level (a lone `0` or
/// `"null"` means an empty assignment) and per entry.
pub fn normalize_reviewer_field(raw: &Value) -> Vec<String> {
    let candidates = match raw {
        Value::Null | Value::Bool(_) => vec![],
        Value::Number(n) => vec![n.to_string()],
        Value::String(s) => {
            let s = s.trim();
            // A bracketed string is a stringified JSON array; anything that
            // fails to parse is junk, not a single id.
            if s.starts_with('[') && s.ends_with(']') {
                match serde_json::from_str::<Value>(s) {
                    Ok(parsed) => return normalize_reviewer_field(&parsed),
                    Err(_) => vec![],
                }
            } else {
                vec![s.to_string()]
            }
        }
        Value::Array(entries) => entries.iter().filter_map(entry_id).collect(),
        Value::Object(_) => entry_id(raw).into_iter().collect(),
    };

    candidates
        .into_iter()
        .filter(|s| !is_placeholder(s))
        .collect()
}

/// Re-applies the placeholder and shape rules to an already-validated
/// assignment, immediately before it is persisted. Normalization is
/// idempotent, so for anything produced by
/// [`AppState::sanitize_reviewer_assignment`] this returns its input.
pub fn guard_assignment(ids: &[UserId]) -> Vec<UserId> {
    let raw = Value::Array(ids.iter().map(|id| Value::from(id.0)).collect());
    normalize_reviewer_field(&raw)
        .into_iter()
        .filter_map(|s| s.parse::<i32>().ok())
        .map(UserId)
        .collect()
}

impl AppState {
    /// Validates a proposed reviewer assignment against the authoritative
    /// set of reviewer-eligible accounts.
    ///
    /// Order of first appearance is preserved and duplicates are dropped.
    /// Candidates that are not integers, or that name an ineligible or
    /// nonexistent account, are removed with a log line. If the eligibility
    /// scan itself fails the assignment degrades to empty, so a transient
    /// database error can never persist an unvalidated set.
    pub async fn sanitize_reviewer_assignment(&self, raw: &Value) -> Vec<UserId> {
        let candidates = normalize_reviewer_field(raw);
        if candidates.is_empty() {
            return vec![];
        }

        let eligible = match self.eligible_reviewer_ids().await {
            Ok(ids) => ids,
            Err(error) => {
                tracing::warn!(?error, "Reviewer eligibility scan failed; clearing assignment");
                return vec![];
            }
        };

        let (parsed, unparsable): (Vec<i32>, Vec<String>) =
            candidates.into_iter().partition_map(|s| match s.parse::<i32>() {
                Ok(id) => itertools::Either::Left(id),
                Err(_) => itertools::Either::Right(s),
            });
        if !unparsable.is_empty() {
            tracing::warn!(?unparsable, "Dropping non-integer reviewer ids");
        }

        let mut removed = vec![];
        let kept: Vec<UserId> = parsed
            .into_iter()
            .map(UserId)
            .unique()
            .filter(|id| {
                let ok = eligible.contains(id);
                if !ok {
                    removed.push(id.0);
                }
                ok
            })
            .collect();
        if !removed.is_empty() {
            tracing::warn!(?removed, "Dropping ineligible reviewer ids");
        }

        kept
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn scalars_normalize_to_single_candidates() {
        assert_eq!(normalize_reviewer_field(&json!(7)), vec!["7"]);
        assert_eq!(normalize_reviewer_field(&json!("42")), vec!["42"]);
        assert_eq!(normalize_reviewer_field(&json!(" 13 ")), vec!["13"]);
    }

    #[test]
    fn placeholders_normalize_to_empty() {
        for raw in [
            json!(null),
            json!(0),
            json!(0.0),
            json!(""),
            json!("0"),
            json!("null"),
            json!("NULL"),
            json!("undefined"),
            json!("NaN"),
            json!(false),
            json!(true),
        ] {
            assert_eq!(normalize_reviewer_field(&raw), Vec::<String>::new(), "{raw}");
        }
    }

    #[test]
    fn arrays_keep_order_and_drop_junk_entries() {
        let raw = json!([3, "5", null, "", "0", {"id": 9}, {"value": "11"}, [2], true]);
        assert_eq!(normalize_reviewer_field(&raw), vec!["3", "5", "9", "11"]);
    }

    #[test]
    fn stringified_arrays_are_parsed() {
        assert_eq!(normalize_reviewer_field(&json!("[1, 2, 3]")), vec!["1", "2", "3"]);
        assert_eq!(normalize_reviewer_field(&json!("[\"4\", null, 6]")), vec!["4", "6"]);
        // Junk that merely looks bracketed is not a single id.
        assert_eq!(normalize_reviewer_field(&json!("[not json")), vec!["[not json"]);
        assert_eq!(normalize_reviewer_field(&json!("[broken]")), Vec::<String>::new());
    }

    #[test]
    fn widget_objects_yield_their_id() {
        assert_eq!(normalize_reviewer_field(&json!({"id": 8})), vec!["8"]);
        assert_eq!(normalize_reviewer_field(&json!({"value": "12"})), vec!["12"]);
        assert_eq!(
            normalize_reviewer_field(&json!({"id": {"value": 15}})),
            vec!["15"]
        );
        assert_eq!(
            normalize_reviewer_field(&json!({"label": "no id here"})),
            Vec::<String>::new()
        );
    }

    #[test]
    fn pre_persistence_guard_passes_sanitized_ids_through() {
        let ids = vec![UserId(3), UserId(5), UserId(9)];
        assert_eq!(guard_assignment(&ids), ids);
        assert_eq!(guard_assignment(&[]), vec![]);
        // A zero id is a placeholder and can never be persisted.
        assert_eq!(guard_assignment(&[UserId(0), UserId(7)]), vec![UserId(7)]);
    }

    #[test]
    fn normalization_is_idempotent_on_its_output() {
        let raw = json!([3, "5", "0", {"id": 9}]);
        let once = normalize_reviewer_field(&raw);
        let again = normalize_reviewer_field(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, again);
    }
}
