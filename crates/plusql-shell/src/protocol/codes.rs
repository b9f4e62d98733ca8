//! Native error-code recognition.
//!
//! SQL*Plus and the Oracle client report failures as `PREFIX-NNNNN`, e.g.
//! `ORA-00942`, `SP2-0734` or `TNS-12541`. The set of recognized prefixes is
//! configurable; matching is plain substring search with no word boundary.

use regex::Regex;

/// Prefixes recognized by default.
pub const DEFAULT_PREFIXES: [&str; 3] = ["ORA", "SP2", "TNS"];

/// Finds native error codes in shell output.
#[derive(Debug, Clone)]
pub struct ErrorCodeMatcher {
    prefixes: Vec<String>,
    pattern: Regex,
}

impl ErrorCodeMatcher {
    /// Create a matcher for the given prefixes.
    ///
    /// Prefixes are matched literally and in the order given, so when one
    /// prefix is a suffix of another, list the longer one first.
    pub fn new<I, S>(prefixes: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        let pattern = Self::compile(&prefixes)?;
        Ok(Self { prefixes, pattern })
    }

    /// Extend the matcher with one more prefix, e.g. `"PLS"`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Result<Self, regex::Error> {
        let prefix = prefix.into();
        if !self.prefixes.contains(&prefix) {
            self.prefixes.push(prefix);
            self.pattern = Self::compile(&self.prefixes)?;
        }
        Ok(self)
    }

    fn compile(prefixes: &[String]) -> Result<Regex, regex::Error> {
        let alternation = prefixes
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");
        // An empty prefix list must match nothing.
        let alternation = if alternation.is_empty() {
            "\\b\\B".to_string()
        } else {
            alternation
        };
        Regex::new(&format!("({alternation})-([0-9]+)"))
    }

    /// The recognized prefixes.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// All codes in `text`, in order of appearance, as `PREFIX-NNNNN`.
    pub fn find_codes(&self, text: &str) -> Vec<String> {
        self.pattern
            .captures_iter(text)
            .map(|caps| format!("{}-{}", &caps[1], &caps[2]))
            .collect()
    }
}

impl Default for ErrorCodeMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIXES).expect("default error prefixes are literal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_codes() {
        let matcher = ErrorCodeMatcher::default();
        assert_eq!(
            matcher.find_codes("ORA-00904: \"X\": invalid identifier"),
            ["ORA-00904"]
        );
        assert_eq!(
            matcher.find_codes("SP2-0734: unknown command ... ORA-01756: quoted string"),
            ["SP2-0734", "ORA-01756"]
        );
        assert_eq!(
            matcher.find_codes("TNS-12541: TNS:no listener"),
            ["TNS-12541"]
        );
    }

    #[test]
    fn test_no_word_boundary() {
        let matcher = ErrorCodeMatcher::default();
        assert_eq!(matcher.find_codes("xORA-1"), ["ORA-1"]);
    }

    #[test]
    fn test_unknown_prefix_ignored() {
        let matcher = ErrorCodeMatcher::default();
        assert!(matcher.find_codes("PLS-00201: identifier must be declared").is_empty());
        assert!(matcher.find_codes("ORA-: truncated").is_empty());
    }

    #[test]
    fn test_extend_prefixes() {
        let matcher = ErrorCodeMatcher::default().with_prefix("PLS").unwrap();
        assert_eq!(matcher.prefixes(), ["ORA", "SP2", "TNS", "PLS"]);
        assert_eq!(
            matcher.find_codes("ORA-06550: line 1 PLS-00201: identifier"),
            ["ORA-06550", "PLS-00201"]
        );

        let same = matcher.clone().with_prefix("ORA").unwrap();
        assert_eq!(same.prefixes().len(), 4);
    }

    #[test]
    fn test_empty_prefix_list_matches_nothing() {
        let matcher = ErrorCodeMatcher::new(Vec::<String>::new()).unwrap();
        assert!(matcher.find_codes("ORA-00001").is_empty());
    }
}
