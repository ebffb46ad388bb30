//! Ordered, case-insensitive header collection and the raw header normalizer.
//!
//! Transports report response headers the way `XMLHttpRequest::getAllResponseHeaders()`
//! does: one big blob of `name: value` lines separated by CRLF (or bare LF). [`Headers::parse`]
//! turns that blob into a [`Headers`] value.
//!
//! ## Parsing behavior
//! - Folded lines (RFC 7230 §3.2, a line break followed by spaces or tabs) are joined to the
//!   previous line with a single space.
//! - Each line is split on its first `:`. Name and value are trimmed, extra colons stay in the value.
//! - Lines with an empty name are skipped. Nothing is ever rejected.
//! - Repeated names are combined into one comma-separated value.
//!
use http::HeaderMap;

/// Ordered header list with case-insensitive names.
///
/// Every name appears at most once. The spelling of the first occurrence is kept for
/// iteration, lookups ignore ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes a raw header blob. `None` is treated as an empty blob.
    pub fn parse(raw: Option<&str>) -> Self {
        let unfolded = unfold(raw.unwrap_or_default());

        let mut headers = Headers::new();
        for line in unfolded.split('\n') {
            let (name, value) = line.split_once(':').unwrap_or((line, ""));
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            headers.append(name, value.trim());
        }
        headers
    }

    /// Adds a value, joining it to an existing value of the same name with `", "`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.position(&name) {
            Some(idx) => {
                let existing = &mut self.entries[idx].1;
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    #[inline]
    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Renders a header map as a raw blob, one `name: value` line per entry separated by CRLF.
///
/// This is the shape `getAllResponseHeaders()` reports, so it is what transports built on
/// `http` types hand back to [`Headers::parse`].
pub fn raw_header_blob(map: &HeaderMap) -> String {
    let mut out = String::new();
    for (name, value) in map {
        out.push_str(name.as_str());
        out.push_str(": ");
        out.push_str(&String::from_utf8_lossy(value.as_bytes()));
        out.push_str("\r\n");
    }
    out
}

/// Replaces every line break that is followed by spaces/tabs with one single space.
fn unfold(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let brk = match bytes[i] {
            b'\n' => 1,
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => 2,
            _ => {
                i += 1;
                continue;
            }
        };

        let mut end = i + brk;
        while matches!(bytes.get(end), Some(b' ' | b'\t')) {
            end += 1;
        }

        if end > i + brk {
            out.push_str(&raw[start..i]);
            out.push(' ');
            start = end;
        }
        i = end;
    }

    out.push_str(&raw[start..]);
    out
}
