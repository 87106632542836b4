// Text cleanup module
// Sanitises metadata read from the player and applies the configured regex patterns

use crate::config::CleanupConfig;
use regex::Regex;

#[derive(Debug, Clone)]
pub struct TextCleaner {
    enabled: bool,
    patterns: Vec<Regex>,
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new(&CleanupConfig::default())
    }
}

impl TextCleaner {
    /// Create a new text cleaner from config
    pub fn new(config: &CleanupConfig) -> Self {
        let patterns = if config.enabled {
            config
                .patterns
                .iter()
                .filter_map(|pattern| match Regex::new(pattern) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        log::warn!("Invalid regex pattern '{}': {}", pattern, e);
                        None
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            enabled: config.enabled,
            patterns,
        }
    }

    /// A cleaner that only strips control characters and surrounding whitespace
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            patterns: Vec::new(),
        }
    }

    /// Clean a text string by applying all patterns
    pub fn clean(&self, text: &str) -> String {
        // Control characters never belong in tag values and break line-oriented logs
        let filtered: String = text.chars().filter(|c| !c.is_control()).collect();
        // The default patterns are anchored at the end, so trailing whitespace goes first
        let mut result = filtered.trim().to_string();

        if self.enabled {
            for pattern in &self.patterns {
                result = pattern.replace_all(&result, "").into_owned();
            }
        }

        result.trim().to_string()
    }

    /// Clean an optional metadata field; empty results count as missing
    pub fn clean_field(&self, text: Option<&str>) -> Option<String> {
        text.map(|s| self.clean(s)).filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_default_explicit_markers() {
        let cleaner = TextCleaner::default();
        assert_eq!(cleaner.clean("Song [Explicit]"), "Song");
        assert_eq!(cleaner.clean("Album (Clean)"), "Album");
        assert_eq!(cleaner.clean("Track - Explicit"), "Track");
        assert_eq!(cleaner.clean("Song [Explicit]  "), "Song");
    }

    #[test]
    fn leaves_markers_inside_titles_alone() {
        let cleaner = TextCleaner::default();
        assert_eq!(cleaner.clean("Tears - Clean Bandit VIP"), "Tears - Clean Bandit VIP");
        assert_eq!(cleaner.clean("[Explicit] Content"), "[Explicit] Content");
    }

    #[test]
    fn strips_control_characters_even_when_disabled() {
        let cleaner = TextCleaner::disabled();
        assert_eq!(cleaner.clean("Line\nBreak\u{0}"), "LineBreak");
        assert_eq!(cleaner.clean("Song [Explicit]"), "Song [Explicit]");
    }

    #[test]
    fn empty_fields_are_missing() {
        let cleaner = TextCleaner::default();
        assert_eq!(cleaner.clean_field(None), None);
        assert_eq!(cleaner.clean_field(Some("   ")), None);
        assert_eq!(cleaner.clean_field(Some("[Explicit]")), None);
        assert_eq!(cleaner.clean_field(Some(" Björk ")), Some("Björk".to_string()));
    }

    #[test]
    fn skips_invalid_patterns() {
        let config = CleanupConfig {
            enabled: true,
            patterns: vec!["(".to_string(), r"\s*\(Live\)".to_string()],
        };
        let cleaner = TextCleaner::new(&config);
        assert_eq!(cleaner.clean("Song (Live)"), "Song");
    }
}
