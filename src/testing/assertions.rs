//! Assertions over captured pipeline output.
//!
//! Output order follows completion order, so these helpers check structure
//! and content, never position.

use serde_json::Value;

/// Assert `output` is line-framed with `expected` JSON records and return them.
///
/// # Panics
///
/// Panics if the record count differs, a line is not valid JSON, or the output
/// does not end with a newline.
///
/// # Example
///
/// ```
/// use rewrite_stream::testing::assert_json_lines;
///
/// let records = assert_json_lines("{\"a\":1}\n{\"a\":2}\n", 2);
/// assert_eq!(records[1]["a"], 2);
/// ```
pub fn assert_json_lines(output: &str, expected: usize) -> Vec<Value> {
    if expected == 0 {
        assert!(output.is_empty(), "Expected no output, got: {output:?}");
        return Vec::new();
    }
    assert!(
        output.ends_with('\n'),
        "Output does not end with a newline: {output:?}"
    );
    let records: Vec<Value> = output
        .lines()
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line)
                .unwrap_or_else(|e| panic!("Line {} is not JSON ({e}): {line:?}", i + 1))
        })
        .collect();
    assert_eq!(
        records.len(),
        expected,
        "Record count mismatch:\n  Expected: {expected}\n  Actual: {}\n  Output: {output:?}",
        records.len()
    );
    records
}

/// Assert `output` is one JSON array of `expected` elements framed the way
/// the pipeline frames it, and return the elements.
///
/// Checks that there are exactly `expected - 1` separators, none before the
/// first element, and a single closing bracket at the very end.
///
/// # Panics
///
/// Panics on any framing violation or if the output is not a JSON array.
///
/// # Example
///
/// ```
/// use rewrite_stream::testing::assert_json_array;
///
/// let records = assert_json_array("[{\"a\":1}\n,{\"a\":2}\n]", 2);
/// assert_eq!(records.len(), 2);
/// assert!(assert_json_array("[]", 0).is_empty());
/// ```
pub fn assert_json_array(output: &str, expected: usize) -> Vec<Value> {
    assert!(
        output.starts_with('['),
        "Output does not open the array: {output:?}"
    );
    assert!(
        output.ends_with(']'),
        "Output does not end with the closing bracket: {output:?}"
    );
    assert!(
        !output.starts_with("[,"),
        "First element has a leading separator: {output:?}"
    );

    let separators = output.matches("\n,").count();
    assert_eq!(
        separators,
        expected.saturating_sub(1),
        "Separator count mismatch for {expected} records: {output:?}"
    );

    let value: Value = serde_json::from_str(output)
        .unwrap_or_else(|e| panic!("Output is not valid JSON ({e}): {output:?}"));
    let Value::Array(records) = value else {
        panic!("Output is not a JSON array: {output:?}");
    };
    assert_eq!(
        records.len(),
        expected,
        "Element count mismatch:\n  Expected: {expected}\n  Actual: {}",
        records.len()
    );
    records
}

/// Assert two record sets are equal, ignoring order.
///
/// # Panics
///
/// Panics if the sets differ in length or content.
pub fn assert_records_unordered_equal(actual: &[Value], expected: &[Value]) {
    let mut actual_keys: Vec<String> = actual.iter().map(Value::to_string).collect();
    let mut expected_keys: Vec<String> = expected.iter().map(Value::to_string).collect();
    actual_keys.sort();
    expected_keys.sort();
    assert_eq!(
        actual_keys, expected_keys,
        "Record sets differ (order ignored)"
    );
}

/// Values of the string field `field` across `records`, sorted.
///
/// # Panics
///
/// Panics if a record lacks the field or it is not a string.
#[must_use]
pub fn sorted_field(records: &[Value], field: &str) -> Vec<String> {
    let mut values: Vec<String> = records
        .iter()
        .map(|r| {
            r[field]
                .as_str()
                .unwrap_or_else(|| panic!("Record has no string field {field:?}: {r}"))
                .to_string()
        })
        .collect();
    values.sort();
    values
}
