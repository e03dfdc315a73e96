//! Data-driven extraction rules.
//!
//! The cover-image denylist, the boilerplate patterns and the length
//! thresholds live here as plain data so they can be tuned from a YAML file
//! without a rebuild:
//!
//! ```yaml
//! min_content_chars: 300
//! summary_max_chars: 250
//! cover_denylist: [logo, icon, avatar]
//! boilerplate:
//!   - name: attribution
//!     scope: any
//!     pattern: '(?i)^[(（]?\s*(责编|责任编辑|来源)\s*[:：].*[)）]?$'
//! ```
//!
//! Fields left out of the file keep their built-in defaults.

use crate::errors::{CrawlError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Editor/source attribution lines such as `（责任编辑：张三）`.
pub const ATTRIBUTION_PATTERN: &str = r"(?i)^[(（]?\s*(责编|责任编辑|来源)\s*[:：].*[)）]?$";

/// A bare date stamp, optionally with a time and trailing text.
pub const TRAILING_TIMESTAMP_PATTERN: &str =
    r"^(\d{4}年\d{1,2}月\d{1,2}日|\d{4}-\d{1,2}-\d{1,2})\s*(\d{1,2}:\d{2})?.*$";

const DEFAULT_COVER_DENYLIST: &[&str] = &[
    "logo",
    "icon",
    "avatar",
    "blank",
    "spacer",
    "gif",
    "share",
    "arrow",
    "button",
    "ad",
    "peopleindex",
    "dyz",
    "common",
    "footer",
    "header",
    "1x1",
    "transparent",
    "u719p4t47d50049f24533dt20220420152844",
];

/// Which paragraphs a boilerplate rule is tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    /// Every paragraph; matches are dropped wherever they occur.
    Any,
    /// Only the last paragraph of the content.
    Trailing,
}

/// One boilerplate pattern as written in the rules file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoilerplateSpec {
    pub name: String,
    pub scope: RuleScope,
    pub pattern: String,
}

/// Extraction rules in their serializable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    /// Minimum plain-text length (chars) for an article to be emitted.
    pub min_content_chars: usize,
    /// Hard cap on the summary length in chars, ellipsis included.
    pub summary_max_chars: usize,
    /// Lowercase substrings that disqualify a cover image URL.
    pub cover_denylist: Vec<String>,
    /// Ordered paragraph filters.
    pub boilerplate: Vec<BoilerplateSpec>,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            min_content_chars: 300,
            summary_max_chars: 250,
            cover_denylist: DEFAULT_COVER_DENYLIST.iter().map(|s| s.to_string()).collect(),
            boilerplate: vec![
                BoilerplateSpec {
                    name: "attribution".to_string(),
                    scope: RuleScope::Any,
                    pattern: ATTRIBUTION_PATTERN.to_string(),
                },
                BoilerplateSpec {
                    name: "trailing_timestamp".to_string(),
                    scope: RuleScope::Trailing,
                    pattern: TRAILING_TIMESTAMP_PATTERN.to_string(),
                },
            ],
        }
    }
}

impl ExtractionRules {
    /// Parse rules from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| CrawlError::Rules(e.to_string()))
    }

    /// Load rules from a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let rules = Self::from_yaml(&text)?;
        info!(
            denylist = rules.cover_denylist.len(),
            boilerplate = rules.boilerplate.len(),
            "Loaded extraction rules"
        );
        Ok(rules)
    }

    /// Compile the patterns. An invalid regex is reported with its rule name.
    pub fn compile(&self) -> Result<CompiledRules> {
        let boilerplate = self
            .boilerplate
            .iter()
            .map(BoilerplateRule::new)
            .collect::<Result<Vec<_>>>()?;
        Ok(CompiledRules {
            min_content_chars: self.min_content_chars,
            summary_max_chars: self.summary_max_chars,
            cover_denylist: self
                .cover_denylist
                .iter()
                .map(|s| s.to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            boilerplate,
        })
    }
}

/// A compiled paragraph filter.
#[derive(Debug, Clone)]
pub struct BoilerplateRule {
    pub name: String,
    pub scope: RuleScope,
    pattern: Regex,
}

impl BoilerplateRule {
    pub fn new(spec: &BoilerplateSpec) -> Result<Self> {
        let pattern = Regex::new(&spec.pattern)
            .map_err(|e| CrawlError::Rules(format!("{}: {}", spec.name, e)))?;
        Ok(Self {
            name: spec.name.clone(),
            scope: spec.scope,
            pattern,
        })
    }

    /// Whether `paragraph` is boilerplate under this rule.
    pub fn matches(&self, paragraph: &str) -> bool {
        self.pattern.is_match(paragraph)
    }

    /// Drop the paragraphs this rule matches. Trailing rules only look at
    /// the last paragraph.
    pub fn apply(&self, paragraphs: &mut Vec<String>) {
        let before = paragraphs.len();
        match self.scope {
            RuleScope::Any => paragraphs.retain(|p| !self.matches(p)),
            RuleScope::Trailing => {
                if paragraphs.last().is_some_and(|p| self.matches(p)) {
                    paragraphs.pop();
                }
            }
        }
        if paragraphs.len() < before {
            debug!(rule = %self.name, removed = before - paragraphs.len(), "Stripped boilerplate");
        }
    }
}

/// Rules ready for use by the pipeline.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub min_content_chars: usize,
    pub summary_max_chars: usize,
    pub cover_denylist: Vec<String>,
    pub boilerplate: Vec<BoilerplateRule>,
}

impl CompiledRules {
    /// Apply every boilerplate rule in order.
    pub fn strip_boilerplate(&self, paragraphs: &mut Vec<String>) {
        for rule in &self.boilerplate {
            rule.apply(paragraphs);
        }
    }

    /// Whether a lowercased URL hits the denylist.
    pub fn is_denied_image(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.cover_denylist.iter().any(|token| lower.contains(token.as_str()))
    }
}

impl Default for CompiledRules {
    // The built-in patterns are constants known to compile.
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        ExtractionRules::default()
            .compile()
            .expect("built-in extraction rules compile")
    }
}
