//! Key decomposition and rename templates

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Counter placeholder in rename templates.
pub const COUNTER_PLACEHOLDER: &str = "{n}";

/// Base-name placeholder in rename templates. Optional: a template without
/// it is appended to the base name.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// A key split into `(parent, base, extension)`.
///
/// `parent` keeps its trailing separator and `extension` keeps its dot, so
/// joining the three pieces gives back the original key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParts {
    pub parent: String,
    pub base: String,
    pub extension: String,
    pub is_directory: bool,
}

impl KeyParts {
    /// Decompose a key. Folder keys lose their trailing separator before
    /// splitting and never have an extension.
    pub fn split(key: &str, is_directory: bool) -> Self {
        let trimmed = if is_directory {
            key.trim_end_matches('/')
        } else {
            key
        };

        let (parent, name) = match trimmed.rfind('/') {
            Some(idx) => (&trimmed[..=idx], &trimmed[idx + 1..]),
            None => ("", trimmed),
        };

        // A leading dot (".env") is part of the name, not an extension.
        let (base, extension) = match name.rfind('.') {
            Some(idx) if !is_directory && idx > 0 => (&name[..idx], &name[idx..]),
            _ => (name, ""),
        };

        Self {
            parent: parent.to_string(),
            base: base.to_string(),
            extension: extension.to_string(),
            is_directory,
        }
    }

    /// Recombine with a replacement base name.
    pub fn with_base(&self, base: &str) -> String {
        let mut key = format!("{}{}{}", self.parent, base, self.extension);
        if self.is_directory {
            key.push('/');
        }
        key
    }

    /// Recombine unchanged.
    pub fn join(&self) -> String {
        self.with_base(&self.base)
    }
}

/// Built-in and custom rename templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenamePattern {
    /// `report (1).txt`
    #[default]
    Parentheses,
    /// `report(1).txt`
    CompactParentheses,
    /// `report_1.txt`
    Underscore,
    /// `report-1.txt`
    Dash,
    /// `report copy 1.txt`
    Copy,
    /// User-supplied template from the settings.
    Custom,
}

impl RenamePattern {
    pub const BUILT_IN: [RenamePattern; 5] = [
        RenamePattern::Parentheses,
        RenamePattern::CompactParentheses,
        RenamePattern::Underscore,
        RenamePattern::Dash,
        RenamePattern::Copy,
    ];

    /// Template of a built-in pattern; `None` for `Custom`.
    pub fn built_in_template(&self) -> Option<&'static str> {
        match self {
            RenamePattern::Parentheses => Some("{name} ({n})"),
            RenamePattern::CompactParentheses => Some("{name}({n})"),
            RenamePattern::Underscore => Some("{name}_{n}"),
            RenamePattern::Dash => Some("{name}-{n}"),
            RenamePattern::Copy => Some("{name} copy {n}"),
            RenamePattern::Custom => None,
        }
    }

    /// Get string representation for display
    pub fn as_str(&self) -> &'static str {
        match self {
            RenamePattern::Parentheses => "name (1)",
            RenamePattern::CompactParentheses => "name(1)",
            RenamePattern::Underscore => "name_1",
            RenamePattern::Dash => "name-1",
            RenamePattern::Copy => "name copy 1",
            RenamePattern::Custom => "Custom",
        }
    }
}

impl fmt::Display for RenamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated template ready to generate candidate names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameTemplate(String);

impl RenameTemplate {
    /// Parse a template string. It must contain the counter placeholder.
    pub fn parse(template: &str) -> Option<Self> {
        if template.trim().is_empty() || !template.contains(COUNTER_PLACEHOLDER) {
            return None;
        }
        Some(Self(template.to_string()))
    }

    /// Template for a pattern. An unusable custom template falls back to
    /// the default built-in.
    pub fn for_pattern(pattern: RenamePattern, custom: Option<&str>) -> Self {
        if let Some(template) = pattern.built_in_template() {
            return Self(template.to_string());
        }

        match custom.and_then(Self::parse) {
            Some(template) => template,
            None => {
                warn!(
                    "Custom rename template {:?} is missing {}; using default pattern",
                    custom, COUNTER_PLACEHOLDER
                );
                Self::default()
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Candidate base name for counter `n`.
    pub fn apply(&self, base: &str, n: u32) -> String {
        let with_counter = self.0.replace(COUNTER_PLACEHOLDER, &n.to_string());
        if with_counter.contains(NAME_PLACEHOLDER) {
            with_counter.replace(NAME_PLACEHOLDER, base)
        } else {
            format!("{}{}", base, with_counter)
        }
    }
}

impl Default for RenameTemplate {
    fn default() -> Self {
        Self::for_pattern(RenamePattern::default(), None)
    }
}
