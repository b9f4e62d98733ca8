//! Client character set resolution.
//!
//! The Oracle client picks its character set from `NLS_LANG`
//! (`LANGUAGE_TERRITORY.CHARSET`). Statement bytes are encoded and output
//! bytes decoded with the matching codec. A wrong guess garbles text but
//! never fails: unmappable characters are replaced.

use std::borrow::Cow;

use encoding_rs::{EUC_JP, Encoding, SHIFT_JIS, UTF_8};

/// Codec families the driver understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// UTF-8 (`AL32UTF8`, `UTF8`)
    #[default]
    Utf8,
    /// Shift-JIS (`JA16SJIS`, `JA16SJISTILDE`)
    ShiftJis,
    /// EUC-JP (`JA16EUC`, `JA16EUCTILDE`)
    EucJp,
}

impl Codec {
    /// Resolve a codec from an `NLS_LANG`-style string.
    ///
    /// Takes the part after the last `.`, uppercases it and looks for `UTF8`,
    /// `SJIS` and `EUC` in that order. Anything else is UTF-8.
    pub fn resolve(locale: Option<&str>) -> Self {
        let Some(locale) = locale else {
            return Codec::Utf8;
        };
        let charset = locale.rsplit('.').next().unwrap_or_default().to_ascii_uppercase();

        if charset.contains("UTF8") || charset.contains("UTF-8") {
            Codec::Utf8
        } else if charset.contains("SJIS") {
            Codec::ShiftJis
        } else if charset.contains("EUC") {
            Codec::EucJp
        } else {
            Codec::Utf8
        }
    }

    /// The WHATWG label of this codec.
    pub fn name(self) -> &'static str {
        self.encoding().name()
    }

    fn encoding(self) -> &'static Encoding {
        match self {
            Codec::Utf8 => UTF_8,
            Codec::ShiftJis => SHIFT_JIS,
            Codec::EucJp => EUC_JP,
        }
    }

    /// Encode text for the shell's stdin.
    pub fn encode(self, text: &str) -> Cow<'_, [u8]> {
        let (bytes, _, had_errors) = self.encoding().encode(text);
        if had_errors {
            tracing::debug!(codec = self.name(), "unmappable characters replaced on encode");
        }
        bytes
    }

    /// Decode shell output.
    pub fn decode(self, bytes: &[u8]) -> Cow<'_, str> {
        let (text, _, had_errors) = self.encoding().decode(bytes);
        if had_errors {
            tracing::debug!(codec = self.name(), "malformed input replaced on decode");
        }
        text
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
