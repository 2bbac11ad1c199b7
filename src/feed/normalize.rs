//! Shape-sniffing normalization of raw feed payloads
//!
//! Extraction strategies are tried in a fixed order: the payload itself as an
//! array, then conventional nested locations, then a scan of top-level keys
//! for the first array value. Items that yield no parseable digit or period
//! id are dropped.

use crate::types::ResultEntry;
use serde_json::Value;

/// Conventional dotted paths checked before falling back to a key scan
const ARRAY_PATHS: &[&[&str]] = &[
    &["data", "list"],
    &["data"],
    &["list"],
    &["result"],
    &["results"],
    &["items"],
    &["records"],
];

/// Field names that may carry the winning digit
const NUMBER_FIELDS: &[&str] = &[
    "number",
    "num",
    "result",
    "value",
    "winningNumber",
    "lotteryNumber",
    "openNumber",
];

/// Field names that may carry the round identifier
const PERIOD_FIELDS: &[&str] = &["issueNumber", "issue", "period", "periodId", "id", "round"];

/// Normalize an arbitrary payload into at most `limit` entries, preserving
/// feed order (assumed newest-first). Returns empty when no array is found
/// or nothing parses; that is a "feed unavailable" signal, not an error.
pub fn normalize(payload: &Value, limit: usize) -> Vec<ResultEntry> {
    let Some(items) = find_entries(payload) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(parse_entry)
        .take(limit)
        .collect()
}

fn find_entries(payload: &Value) -> Option<&Vec<Value>> {
    if let Some(arr) = payload.as_array() {
        return Some(arr);
    }
    for path in ARRAY_PATHS {
        let mut node = payload;
        let mut found = true;
        for key in *path {
            match node.get(key) {
                Some(next) => node = next,
                None => {
                    found = false;
                    break;
                }
            }
        }
        if found {
            if let Some(arr) = node.as_array() {
                return Some(arr);
            }
        }
    }
    // Last resort: first array-valued top-level key
    payload
        .as_object()
        .and_then(|obj| obj.values().find_map(|v| v.as_array()))
}

fn parse_entry(item: &Value) -> Option<ResultEntry> {
    let obj = item.as_object()?;

    let number = NUMBER_FIELDS
        .iter()
        .find_map(|f| obj.get(*f).and_then(parse_digit))?;

    let period_id = PERIOD_FIELDS
        .iter()
        .find_map(|f| obj.get(*f).and_then(value_to_string))?;

    let color = obj
        .get("color")
        .or_else(|| obj.get("colour"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Some(ResultEntry {
        period_id,
        number,
        color,
    })
}

/// Accepts JSON numbers and numeric strings; only digits 0-9 are valid
fn parse_digit(v: &Value) -> Option<u8> {
    let n = match v {
        Value::Number(n) => {
            let f = n.as_f64()?;
            if f.fract() != 0.0 || f < 0.0 {
                return None;
            }
            f as i64
        }
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    u8::try_from(n).ok().filter(|d| *d <= 9)
}

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_data_list() {
        let payload = json!({
            "code": 0,
            "data": {
                "list": [
                    { "issueNumber": "20240101010", "number": 7 },
                    { "issueNumber": "20240101009", "number": 2 }
                ]
            }
        });
        let entries = normalize(&payload, 10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].period_id, "20240101010");
        assert_eq!(entries[0].number, 7);
    }

    #[test]
    fn test_payload_itself_is_array() {
        let payload = json!([
            { "period": "101", "result": "5" },
            { "period": "100", "result": "0" }
        ]);
        let entries = normalize(&payload, 10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].number, 5);
        assert_eq!(entries[1].number, 0);
    }

    #[test]
    fn test_unknown_key_scan_fallback() {
        let payload = json!({
            "status": "ok",
            "rounds": [
                { "round": 42, "num": 9, "color": "violet" }
            ]
        });
        let entries = normalize(&payload, 10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].period_id, "42");
        assert_eq!(entries[0].number, 9);
        assert_eq!(entries[0].color.as_deref(), Some("violet"));
    }

    #[test]
    fn test_numeric_string_digit() {
        let payload = json!({ "list": [ { "issue": "77", "number": "3" } ] });
        let entries = normalize(&payload, 10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].number, 3);
    }

    #[test]
    fn test_unparseable_entries_dropped() {
        let payload = json!({
            "list": [
                { "issue": "3", "number": 7 },
                { "issue": "2", "number": "ten" },
                { "issue": "1", "number": 42 },
                { "number": 1 }
            ]
        });
        let entries = normalize(&payload, 10);
        // Only the first item has both a valid digit and a period id
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].period_id, "3");
    }

    #[test]
    fn test_limit_truncation_preserves_order() {
        let items: Vec<_> = (0..20)
            .map(|i| json!({ "issue": format!("{}", 100 - i), "number": i % 10 }))
            .collect();
        let payload = json!({ "data": { "list": items } });
        let entries = normalize(&payload, 10);
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0].period_id, "100");
        assert_eq!(entries[9].period_id, "91");
    }

    #[test]
    fn test_no_array_is_empty_not_error() {
        let payload = json!({ "message": "maintenance" });
        assert!(normalize(&payload, 10).is_empty());
    }

    #[test]
    fn test_all_unparseable_is_empty() {
        let payload = json!({ "list": [ { "foo": 1 }, { "bar": 2 } ] });
        assert!(normalize(&payload, 10).is_empty());
    }
}
