use serde::Deserialize;

use logscope_types::{Color, HighlightStyle, LogEntry};

use crate::filter::{FilterSet, RuleError};

/// Style section of a highlight rule as written in a settings file
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HighlightStyleConfig {
    #[serde(alias = "background_color", alias = "background")]
    pub background_color: Option<String>,

    #[serde(alias = "text_color", alias = "foreground")]
    pub text_color: Option<String>,

    pub bold: bool,
}

impl HighlightStyleConfig {
    pub fn build(&self) -> Result<HighlightStyle, RuleError> {
        Ok(HighlightStyle {
            background: self.background_color.as_deref().map(parse_color).transpose()?,
            foreground: self.text_color.as_deref().map(parse_color).transpose()?,
            bold: self.bold,
        })
    }
}

/// Parse a color name, index or `#rrggbb`
pub fn parse_color(s: &str) -> Result<Color, RuleError> {
    s.trim()
        .parse::<Color>()
        .map_err(|_| RuleError::InvalidColor(s.to_string()))
}

/// Unvalidated highlight rule as written in a settings file
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HighlightRuleConfig {
    pub id: u64,
    pub enabled: bool,
    pub name: String,
    pub priority: i32,
    pub filter: FilterSet,
    pub style: HighlightStyleConfig,
}

impl Default for HighlightRuleConfig {
    fn default() -> Self {
        Self {
            id: 0,
            enabled: true,
            name: String::new(),
            priority: 0,
            filter: FilterSet::default(),
            style: HighlightStyleConfig::default(),
        }
    }
}

/// A prioritized multi-field match that paints matching rows
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "HighlightRuleConfig")]
pub struct HighlightRule {
    pub id: u64,
    pub enabled: bool,
    pub name: String,
    pub priority: i32,
    pub filter: FilterSet,
    pub style: HighlightStyle,
}

impl HighlightRule {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        priority: i32,
        filter: FilterSet,
        style: HighlightStyle,
    ) -> Self {
        Self {
            id,
            enabled: true,
            name: name.into(),
            priority,
            filter,
            style,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// A rule with no active constraint matches nothing
    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.enabled && self.filter.has_constraints() && self.filter.is_visible(entry)
    }

    /// True when this rule wins over `other`
    fn outranks(&self, other: &HighlightRule) -> bool {
        self.priority > other.priority || (self.priority == other.priority && self.id < other.id)
    }
}

impl TryFrom<HighlightRuleConfig> for HighlightRule {
    type Error = RuleError;

    fn try_from(config: HighlightRuleConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            id: config.id,
            enabled: config.enabled,
            name: config.name,
            priority: config.priority,
            filter: config.filter,
            style: config.style.build()?,
        })
    }
}

/// Winning rule for an entry: highest priority, then lowest id, then earliest
pub fn pick_rule<'a>(entry: &LogEntry, rules: &'a [HighlightRule]) -> Option<&'a HighlightRule> {
    rules
        .iter()
        .filter(|rule| rule.matches(entry))
        .fold(None, |best: Option<&HighlightRule>, rule| match best {
            Some(current) if !rule.outranks(current) => Some(current),
            _ => Some(rule),
        })
}

pub fn pick_style(entry: &LogEntry, rules: &[HighlightRule]) -> Option<HighlightStyle> {
    pick_rule(entry, rules).map(|rule| rule.style)
}
