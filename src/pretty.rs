//! Readable re-formatting of encoded JSON records.

use anyhow::{Context, Result};
use serde_json::Value;

/// Re-indent one encoded JSON document.
///
/// Key order is kept as encoded.
pub fn reformat(encoded: &[u8]) -> Result<Vec<u8>> {
    let value: Value = serde_json::from_slice(encoded).context("parse encoded record")?;
    serde_json::to_vec_pretty(&value).context("pretty-print record")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_key_order() -> Result<()> {
        let out = reformat(br#"{"z":1,"a":[true,null]}"#)?;
        let text = String::from_utf8(out)?;
        assert_eq!(
            text,
            "{\n  \"z\": 1,\n  \"a\": [\n    true,\n    null\n  ]\n}"
        );
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        assert!(reformat(b"{not json").is_err());
    }
}
