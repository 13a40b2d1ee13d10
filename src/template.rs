//! URI templates and identifier extraction from URI paths.
//!
//! [`UriTemplate`] implements RFC 6570 level 1: `{var}` expressions with simple
//! string expansion. Values are percent-encoded except for unreserved
//! characters; undefined variables expand to the empty string.

use std::collections::HashMap;
use std::sync::LazyLock;

use anyhow::{Result, anyhow, bail};
use regex::Regex;

static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([^{}]*)\}").unwrap_or_else(|e| panic!("invalid expression pattern: {e}"))
});

static VARNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9_]|%[0-9A-Fa-f]{2})(?:\.?(?:[A-Za-z0-9_]|%[0-9A-Fa-f]{2}))*$")
        .unwrap_or_else(|e| panic!("invalid varname pattern: {e}"))
});

#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Literal(String),
    Var(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UriTemplate {
    source: String,
    parts: Vec<Part>,
}

impl UriTemplate {
    /// Parse a template such as `sfom://id/{id}`.
    ///
    /// # Errors
    /// Unbalanced braces, empty expressions, operators beyond level 1 and
    /// invalid variable names are rejected.
    pub fn parse(source: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut last = 0;
        for caps in EXPRESSION.captures_iter(source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_literal(&mut parts, &source[last..whole.start()])?;
            let name = name.as_str();
            if !VARNAME.is_match(name) {
                bail!("invalid template expression {{{name}}} in {source:?}");
            }
            parts.push(Part::Var(name.to_string()));
            last = whole.end();
        }
        push_literal(&mut parts, &source[last..])?;
        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of the variables referenced by the template, in order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            Part::Var(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }

    #[must_use]
    pub fn expand(&self, values: &HashMap<&str, &str>) -> String {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                Part::Literal(lit) => out.push_str(lit),
                Part::Var(name) => {
                    if let Some(value) = values.get(name.as_str()) {
                        percent_encode_into(&mut out, value);
                    }
                }
            }
        }
        out
    }
}

fn push_literal(parts: &mut Vec<Part>, lit: &str) -> Result<()> {
    if lit.contains(['{', '}']) {
        bail!("unbalanced braces in template literal {lit:?}");
    }
    if !lit.is_empty() {
        parts.push(Part::Literal(lit.to_string()));
    }
    Ok(())
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn percent_encode_into(out: &mut String, value: &str) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    for &b in value.as_bytes() {
        if is_unreserved(b) {
            out.push(char::from(b));
        } else {
            out.push('%');
            out.push(char::from(HEX[usize::from(b >> 4)]));
            out.push(char::from(HEX[usize::from(b & 0x0f)]));
        }
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn percent_decode(s: &str) -> Result<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = bytes.get(i + 1).copied().and_then(hex_value);
            let lo = bytes.get(i + 2).copied().and_then(hex_value);
            let (Some(hi), Some(lo)) = (hi, lo) else {
                let end = (i + 3).min(bytes.len());
                bail!(
                    "invalid URL escape {:?}",
                    String::from_utf8_lossy(&bytes[i..end])
                );
            };
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|e| anyhow!("path is not UTF-8 after unescaping: {e}"))
}

/// Decoded path component of a URI reference.
///
/// A URI with a scheme whose remainder does not start with `/` is opaque and
/// has an empty path.
///
/// # Errors
/// Control characters, malformed percent escapes and a colon in the first
/// segment of a scheme-less relative reference are rejected.
pub fn uri_path(uri: &str) -> Result<String> {
    if let Some(c) = uri.chars().find(|c| c.is_ascii_control()) {
        bail!("parse {uri:?}: invalid control character {c:?} in URL");
    }

    let rest = uri.split_once('#').map_or(uri, |(head, _)| head);
    let rest = rest.split_once('?').map_or(rest, |(head, _)| head);

    let rest = match scheme_len(rest) {
        // Opaque reference such as `urn:x:1` or `mailto:a/b`: it has no path.
        Some(n) if !rest[n + 1..].starts_with('/') => return Ok(String::new()),
        Some(n) => &rest[n + 1..],
        None => {
            let first_segment = rest.split('/').next().unwrap_or_default();
            if first_segment.contains(':') {
                bail!("parse {uri:?}: first path segment in URL cannot contain colon");
            }
            rest
        }
    };

    let path = match rest.strip_prefix("//") {
        Some(authority_and_path) => authority_and_path
            .find('/')
            .map_or("", |slash| &authority_and_path[slash..]),
        None => rest,
    };

    percent_decode(path).map_err(|e| anyhow!("parse {uri:?}: {e}"))
}

fn scheme_len(s: &str) -> Option<usize> {
    let colon = s.find(':')?;
    let scheme = &s[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        Some(colon)
    } else {
        None
    }
}

/// Last element of a slash-separated path.
///
/// Trailing slashes are ignored; an empty path yields `.` and a path of only
/// slashes yields `/`.
#[must_use]
pub fn base_name(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Identifier of the object a URI points at: the base name of its path.
///
/// # Errors
/// Fails when `uri` cannot be parsed, see [`uri_path`].
pub fn object_id(uri: &str) -> Result<String> {
    let path = uri_path(uri)?;
    Ok(base_name(&path).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_matches_path_semantics() {
        assert_eq!(base_name(""), ".");
        assert_eq!(base_name("/"), "/");
        assert_eq!(base_name("///"), "/");
        assert_eq!(base_name("/a/b/"), "b");
        assert_eq!(base_name("abc"), "abc");
        assert_eq!(base_name("/objects/1511908311"), "1511908311");
    }

    #[test]
    fn scheme_detection() {
        assert_eq!(scheme_len("https://x"), Some(5));
        assert_eq!(scheme_len("sfom+id:1"), Some(7));
        assert_eq!(scheme_len("1http://x"), None);
        assert_eq!(scheme_len("/no/scheme"), None);
    }

    #[test]
    fn opaque_uris_have_no_path() -> Result<()> {
        assert_eq!(uri_path("urn:sfom:1511908311")?, "");
        assert_eq!(uri_path("mailto:obj/42")?, "");
        assert_eq!(uri_path("sfom:/id/7")?, "/id/7");
        Ok(())
    }
}
