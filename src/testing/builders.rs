//! Fluent builder for JSONL test input.

use serde::Serialize;

/// Assemble newline-delimited input bytes.
///
/// # Example
///
/// ```
/// use rewrite_stream::testing::InputBuilder;
/// use serde_json::json;
///
/// let input = InputBuilder::new()
///     .add_json(&json!({"n": 1}))
///     .add_blank()
///     .add_raw("{not json")
///     .build();
/// assert_eq!(input, b"{\"n\":1}\n\n{not json\n");
/// ```
#[derive(Clone, Debug)]
pub struct InputBuilder {
    buf: Vec<u8>,
    terminate_last: bool,
}

impl InputBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            terminate_last: true,
        }
    }

    /// Append one serialized value as a line.
    ///
    /// # Panics
    ///
    /// Panics if `value` cannot be serialized to JSON.
    #[must_use]
    pub fn add_json<T: Serialize>(mut self, value: &T) -> Self {
        let line = serde_json::to_vec(value)
            .unwrap_or_else(|e| panic!("serialize test input line: {e}"));
        self.buf.extend_from_slice(&line);
        self.buf.push(b'\n');
        self
    }

    #[must_use]
    pub fn add_all<T: Serialize>(self, values: &[T]) -> Self {
        values.iter().fold(self, |b, v| b.add_json(v))
    }

    /// Append a line verbatim (a newline is added).
    #[must_use]
    pub fn add_raw(mut self, line: &str) -> Self {
        self.buf.extend_from_slice(line.as_bytes());
        self.buf.push(b'\n');
        self
    }

    #[must_use]
    pub fn add_blank(self) -> Self {
        self.add_raw("")
    }

    /// Drop the newline after the final line.
    #[must_use]
    pub fn without_trailing_newline(mut self) -> Self {
        self.terminate_last = false;
        self
    }

    #[must_use]
    pub fn build(mut self) -> Vec<u8> {
        if !self.terminate_last && self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        self.buf
    }
}

impl Default for InputBuilder {
    fn default() -> Self {
        Self::new()
    }
}
