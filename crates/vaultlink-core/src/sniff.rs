//! Plaintext classification for display.
//!
//! Best-effort only. It decides whether recovered bytes can be shown inline
//! as text; it is not a content-safety check.

use serde::{Deserialize, Serialize};

/// Text at or above this many characters is treated as binary.
pub const DEFAULT_TEXT_LIMIT: usize = 10_000;

/// Coarse classification of recovered bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Text,
    Binary,
}

/// Result of sniffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sniffed {
    /// Printable text, already decoded.
    Text { decoded: String },
    /// Anything else; the caller keeps the raw bytes for download.
    Binary,
}

impl Sniffed {
    pub fn classification(&self) -> Classification {
        match self {
            Sniffed::Text { .. } => Classification::Text,
            Sniffed::Binary => Classification::Binary,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Sniffed::Text { decoded } => Some(decoded),
            Sniffed::Binary => None,
        }
    }
}

/// Classifies bytes as printable ASCII text or binary.
#[derive(Debug, Clone, Copy)]
pub struct ContentSniffer {
    limit: usize,
}

impl Default for ContentSniffer {
    fn default() -> Self {
        Self {
            limit: DEFAULT_TEXT_LIMIT,
        }
    }
}

impl ContentSniffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different character limit.
    pub fn with_limit(limit: usize) -> Self {
        Self { limit }
    }

    /// Text iff non-empty, every char is printable ASCII or `\r` `\n` `\t`,
    /// and the decoded length is under the limit.
    pub fn classify(&self, bytes: &[u8]) -> Sniffed {
        // Anything non-ASCII fails the printable check, so the lossy
        // replacement character never makes it through.
        let decoded = String::from_utf8_lossy(bytes);

        if decoded.is_empty() || decoded.chars().count() >= self.limit {
            return Sniffed::Binary;
        }
        if !decoded.chars().all(is_displayable) {
            return Sniffed::Binary;
        }

        Sniffed::Text {
            decoded: decoded.into_owned(),
        }
    }
}

fn is_displayable(c: char) -> bool {
    matches!(c, '\x20'..='\x7e' | '\r' | '\n' | '\t')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_text() {
        let sniffed = ContentSniffer::new().classify(b"Hello, world!\n");
        assert_eq!(sniffed.as_text(), Some("Hello, world!\n"));
        assert_eq!(sniffed.classification(), Classification::Text);
    }

    #[test]
    fn test_control_bytes_are_binary() {
        let sniffer = ContentSniffer::new();
        for b in 0x00u8..=0x08 {
            assert_eq!(sniffer.classify(&[b'a', b, b'b']), Sniffed::Binary);
        }
        assert_eq!(sniffer.classify(b"ab\x7f"), Sniffed::Binary);
    }

    #[test]
    fn test_length_boundary() {
        let sniffer = ContentSniffer::new();
        let under = vec![b'a'; 9_999];
        let at = vec![b'a'; 10_000];
        let over = vec![b'a'; 10_001];
        assert!(matches!(sniffer.classify(&under), Sniffed::Text { .. }));
        assert_eq!(sniffer.classify(&at), Sniffed::Binary);
        assert_eq!(sniffer.classify(&over), Sniffed::Binary);
    }

    #[test]
    fn test_empty_is_binary() {
        assert_eq!(ContentSniffer::new().classify(b""), Sniffed::Binary);
    }

    #[test]
    fn test_non_ascii_is_binary() {
        let sniffer = ContentSniffer::new();
        assert_eq!(sniffer.classify("café".as_bytes()), Sniffed::Binary);
        assert_eq!(sniffer.classify(&[0xff, 0xfe, b'a']), Sniffed::Binary);
    }

    #[test]
    fn test_custom_limit() {
        let sniffer = ContentSniffer::with_limit(4);
        assert!(matches!(sniffer.classify(b"abc"), Sniffed::Text { .. }));
        assert_eq!(sniffer.classify(b"abcd"), Sniffed::Binary);
    }

    proptest! {
        #[test]
        fn prop_printable_ascii_is_text(s in "[ -~\r\n\t]{1,500}") {
            let sniffed = ContentSniffer::new().classify(s.as_bytes());
            prop_assert_eq!(sniffed.as_text(), Some(s.as_str()));
        }

        #[test]
        fn prop_nul_forces_binary(prefix in "[ -~]{0,50}", suffix in "[ -~]{0,50}") {
            let input = format!("{}\0{}", prefix, suffix);
            prop_assert_eq!(ContentSniffer::new().classify(input.as_bytes()), Sniffed::Binary);
        }
    }
}
