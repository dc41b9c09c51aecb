use regex::Regex;
use std::sync::LazyLock;

/// Compiled regex patterns that are reused across the codebase
pub struct RegexPatterns;

impl RegexPatterns {
    /// Regex for sentinel references (`[KIND:value]`).
    ///
    /// Group 1 is the kind (upper-case, underscores allowed), group 2 the value
    /// with surrounding whitespace excluded. Values never span lines.
    pub fn sentinel() -> &'static Regex {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"\[([A-Z][A-Z0-9_]*):[ \t]*([^\]\r\n]*?)[ \t]*\]")
                .expect("Failed to compile sentinel regex")
        });
        &RE
    }

    /// Regex for URL schemes (`javascript:`, `https:`) at the start of a link target
    pub fn url_scheme() -> &'static Regex {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^\s*([A-Za-z][A-Za-z0-9+.\-]*):").expect("Failed to compile URL scheme regex")
        });
        &RE
    }
}
