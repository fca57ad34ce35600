use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use logscope_types::{Level, LogEntry};

/// Rejected rule construction
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid color '{0}'")]
    InvalidColor(String),
}

/// How a rule compares against a field value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    #[default]
    List,
    Contains,
    Starts,
    Ends,
    Regex,
    Equals,
}

impl FilterOperator {
    pub fn name(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Contains => "contains",
            Self::Starts => "starts",
            Self::Ends => "ends",
            Self::Regex => "regex",
            Self::Equals => "equals",
        }
    }
}

/// Unvalidated rule as written in a settings file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterRuleConfig {
    pub id: u64,
    pub enabled: bool,
    pub include: bool,
    pub operator: FilterOperator,
    pub values: Vec<String>,
    pub value: String,
    #[serde(alias = "case_sensitive")]
    pub case_sensitive: bool,
}

impl Default for FilterRuleConfig {
    fn default() -> Self {
        Self {
            id: 0,
            enabled: true,
            include: true,
            operator: FilterOperator::List,
            values: Vec::new(),
            value: String::new(),
            case_sensitive: false,
        }
    }
}

#[derive(Clone, Debug)]
enum Matcher {
    /// Nothing to compare against; behaves like a disabled rule
    Inactive,
    List(Vec<String>),
    Text {
        operator: FilterOperator,
        needle: String,
        case_sensitive: bool,
        /// Escaped needle anchored like the operator, for match positions
        finder: Regex,
    },
    Regex(Regex),
}

impl Matcher {
    fn compile(config: &FilterRuleConfig) -> Result<Self, RuleError> {
        if config.operator == FilterOperator::List {
            if config.values.is_empty() {
                return Ok(Self::Inactive);
            }
            return Ok(Self::List(config.values.clone()));
        }

        if config.value.trim().is_empty() {
            return Ok(Self::Inactive);
        }

        if config.operator == FilterOperator::Regex {
            let pattern = if config.case_sensitive {
                config.value.clone()
            } else {
                // Prepend (?i) for case insensitive matching
                format!("(?i){}", config.value)
            };
            return Regex::new(&pattern)
                .map(Self::Regex)
                .map_err(|source| RuleError::InvalidRegex {
                    pattern: config.value.clone(),
                    source,
                });
        }

        let needle = if config.case_sensitive {
            config.value.clone()
        } else {
            config.value.to_lowercase()
        };
        Ok(Self::Text {
            operator: config.operator,
            needle,
            case_sensitive: config.case_sensitive,
            finder: Self::finder(config)?,
        })
    }

    fn finder(config: &FilterRuleConfig) -> Result<Regex, RuleError> {
        let escaped = regex::escape(&config.value);
        let pattern = match config.operator {
            FilterOperator::Starts => format!("^{escaped}"),
            FilterOperator::Ends => format!("{escaped}$"),
            FilterOperator::Equals => format!("^{escaped}$"),
            _ => escaped,
        };
        RegexBuilder::new(&pattern)
            .case_insensitive(!config.case_sensitive)
            .build()
            .map_err(|source| RuleError::InvalidRegex {
                pattern: config.value.clone(),
                source,
            })
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Self::Inactive => false,
            Self::List(values) => values.iter().any(|v| v == value),
            Self::Regex(re) => re.is_match(value),
            Self::Text {
                operator,
                needle,
                case_sensitive,
                ..
            } => {
                let folded;
                let haystack = if *case_sensitive {
                    value
                } else {
                    folded = value.to_lowercase();
                    folded.as_str()
                };
                match operator {
                    FilterOperator::Contains => haystack.contains(needle.as_str()),
                    FilterOperator::Starts => haystack.starts_with(needle.as_str()),
                    FilterOperator::Ends => haystack.ends_with(needle.as_str()),
                    FilterOperator::Equals => haystack == needle.as_str(),
                    FilterOperator::List | FilterOperator::Regex => false,
                }
            }
        }
    }
}

/// A validated include or exclude constraint on one field
///
/// Regex rules are compiled when the rule is built, so an invalid pattern
/// can never reach evaluation.
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "FilterRuleConfig")]
pub struct FilterRule {
    config: FilterRuleConfig,
    matcher: Matcher,
}

impl FilterRule {
    pub fn new(config: FilterRuleConfig) -> Result<Self, RuleError> {
        let matcher = Matcher::compile(&config)?;
        Ok(Self { config, matcher })
    }

    /// Include rule matching any of `values` exactly
    pub fn list<I, S>(id: u64, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = FilterRuleConfig {
            id,
            values: values.into_iter().map(Into::into).collect(),
            ..FilterRuleConfig::default()
        };
        let matcher = if config.values.is_empty() {
            Matcher::Inactive
        } else {
            Matcher::List(config.values.clone())
        };
        Self { config, matcher }
    }

    /// Include rule comparing against a single text value
    pub fn text(
        id: u64,
        operator: FilterOperator,
        value: impl Into<String>,
        case_sensitive: bool,
    ) -> Result<Self, RuleError> {
        Self::new(FilterRuleConfig {
            id,
            operator,
            value: value.into(),
            case_sensitive,
            ..FilterRuleConfig::default()
        })
    }

    /// Turn this rule into an exclude rule
    pub fn excluding(mut self) -> Self {
        self.config.include = false;
        self
    }

    /// Start the rule disabled
    pub fn disabled(mut self) -> Self {
        self.config.enabled = false;
        self
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn id(&self) -> u64 {
        self.config.id
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn is_include(&self) -> bool {
        self.config.include
    }

    pub fn operator(&self) -> FilterOperator {
        self.config.operator
    }

    pub fn value(&self) -> &str {
        &self.config.value
    }

    pub fn values(&self) -> &[String] {
        &self.config.values
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.config.case_sensitive
    }

    pub fn config(&self) -> &FilterRuleConfig {
        &self.config
    }

    /// Enabled and carrying something to compare against
    pub fn is_active(&self) -> bool {
        self.config.enabled && !matches!(self.matcher, Matcher::Inactive)
    }

    /// Raw comparison, ignoring include/exclude and enabled state
    pub fn matches(&self, value: &str) -> bool {
        self.matcher.matches(value)
    }

    /// Find all match positions in a string (for highlighting)
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        match &self.matcher {
            Matcher::Regex(re) | Matcher::Text { finder: re, .. } => {
                re.find_iter(text).map(|m| (m.start(), m.end())).collect()
            }
            Matcher::Inactive | Matcher::List(_) => Vec::new(),
        }
    }
}

impl TryFrom<FilterRuleConfig> for FilterRule {
    type Error = RuleError;

    fn try_from(config: FilterRuleConfig) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

/// Ordered rules for one field
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct FilterRules {
    rules: Vec<FilterRule>,
}

impl FilterRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: FilterRule) {
        self.rules.push(rule);
    }

    /// Remove a rule by id, returning it
    pub fn remove(&mut self, id: u64) -> Option<FilterRule> {
        let idx = self.rules.iter().position(|r| r.id() == id)?;
        Some(self.rules.remove(idx))
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut FilterRule> {
        self.rules.iter_mut().find(|r| r.id() == id)
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Active (include, exclude) counts
    pub fn active_counts(&self) -> (usize, usize) {
        self.rules
            .iter()
            .filter(|r| r.is_active())
            .fold((0, 0), |(inc, exc), r| {
                if r.is_include() {
                    (inc + 1, exc)
                } else {
                    (inc, exc + 1)
                }
            })
    }

    pub fn has_active(&self) -> bool {
        self.rules.iter().any(FilterRule::is_active)
    }

    /// Any matching exclude fails the value. Otherwise the value passes when
    /// there are no includes or at least one include matches.
    pub fn passes(&self, value: &str) -> bool {
        let mut has_include = false;
        let mut include_hit = false;

        for rule in self.rules.iter().filter(|r| r.is_active()) {
            if rule.is_include() {
                has_include = true;
                if !include_hit && rule.matches(value) {
                    include_hit = true;
                }
            } else if rule.matches(value) {
                return false;
            }
        }

        !has_include || include_hit
    }
}

impl FromIterator<FilterRule> for FilterRules {
    fn from_iter<T: IntoIterator<Item = FilterRule>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// Entry field a rule list applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterField {
    Sessions,
    Levels,
    AppNames,
    HostNames,
    Titles,
    EntryTypes,
    Messages,
}

impl FilterField {
    pub const ALL: [FilterField; 7] = [
        Self::Sessions,
        Self::Levels,
        Self::AppNames,
        Self::HostNames,
        Self::Titles,
        Self::EntryTypes,
        Self::Messages,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sessions => "session",
            Self::Levels => "level",
            Self::AppNames => "app",
            Self::HostNames => "host",
            Self::Titles => "title",
            Self::EntryTypes => "type",
            Self::Messages => "message",
        }
    }

    /// The entry value this field's rules compare against
    pub fn value_of<'a>(&self, entry: &'a LogEntry) -> &'a str {
        match self {
            Self::Sessions => &entry.session_name,
            Self::Levels => entry.level.name(),
            Self::AppNames => &entry.app_name,
            Self::HostNames => &entry.host_name,
            Self::Titles => &entry.title,
            Self::EntryTypes => entry.entry_type.name(),
            Self::Messages => &entry.message,
        }
    }
}

/// Per-field rule lists; an entry is visible when every field passes
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSet {
    pub sessions: FilterRules,
    pub levels: FilterRules,
    #[serde(alias = "app_names")]
    pub app_names: FilterRules,
    #[serde(alias = "host_names")]
    pub host_names: FilterRules,
    pub titles: FilterRules,
    #[serde(alias = "entry_types")]
    pub entry_types: FilterRules,
    pub messages: FilterRules,
}

impl FilterSet {
    pub fn field(&self, field: FilterField) -> &FilterRules {
        match field {
            FilterField::Sessions => &self.sessions,
            FilterField::Levels => &self.levels,
            FilterField::AppNames => &self.app_names,
            FilterField::HostNames => &self.host_names,
            FilterField::Titles => &self.titles,
            FilterField::EntryTypes => &self.entry_types,
            FilterField::Messages => &self.messages,
        }
    }

    pub fn field_mut(&mut self, field: FilterField) -> &mut FilterRules {
        match field {
            FilterField::Sessions => &mut self.sessions,
            FilterField::Levels => &mut self.levels,
            FilterField::AppNames => &mut self.app_names,
            FilterField::HostNames => &mut self.host_names,
            FilterField::Titles => &mut self.titles,
            FilterField::EntryTypes => &mut self.entry_types,
            FilterField::Messages => &mut self.messages,
        }
    }

    pub fn is_visible(&self, entry: &LogEntry) -> bool {
        FilterField::ALL
            .iter()
            .all(|field| self.field(*field).passes(field.value_of(entry)))
    }

    /// True when at least one rule in any field is active
    pub fn has_constraints(&self) -> bool {
        FilterField::ALL
            .iter()
            .any(|field| self.field(*field).has_active())
    }

    /// Active (include, exclude) counts across all fields
    pub fn active_counts(&self) -> (usize, usize) {
        FilterField::ALL.iter().fold((0, 0), |(inc, exc), field| {
            let (i, e) = self.field(*field).active_counts();
            (inc + i, exc + e)
        })
    }

    /// Next free rule id across all fields
    pub fn next_rule_id(&self) -> u64 {
        FilterField::ALL
            .iter()
            .flat_map(|field| self.field(*field).iter().map(FilterRule::id))
            .max()
            .map_or(1, |id| id + 1)
    }

    pub fn clear(&mut self) {
        for field in FilterField::ALL {
            self.field_mut(field).clear();
        }
    }
}

/// Quick filter presets
pub struct FilterPresets;

impl FilterPresets {
    fn levels(levels: &[Level]) -> FilterSet {
        let mut set = FilterSet::default();
        set.levels.push(FilterRule::list(1, levels.iter().map(Level::name)));
        set
    }

    /// Filter for errors only
    pub fn errors_only() -> FilterSet {
        Self::levels(&[Level::Error, Level::Fatal])
    }

    /// Filter for warnings and above
    pub fn warnings_and_above() -> FilterSet {
        Self::levels(&[Level::Warning, Level::Error, Level::Fatal])
    }

    /// Hide debug and verbose chatter
    pub fn hide_debug() -> FilterSet {
        let mut set = FilterSet::default();
        set.levels.push(
            FilterRule::list(1, [Level::Debug.name(), Level::Verbose.name()]).excluding(),
        );
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logscope_types::EntryType;

    fn equals(id: u64, value: &str) -> FilterRule {
        FilterRule::text(id, FilterOperator::Equals, value, true).unwrap()
    }

    fn session_entry(session: &str) -> LogEntry {
        LogEntry::new(1, "title").with_session(session)
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let mut set = FilterSet::default();
        set.sessions.push(equals(1, "prod").excluding());
        set.sessions.push(equals(2, "staging"));

        assert!(!set.is_visible(&session_entry("prod")));
        assert!(set.is_visible(&session_entry("staging")));
        assert!(!set.is_visible(&session_entry("dev")));
    }

    #[test]
    fn test_exclude_wins_when_both_match_same_value() {
        let mut rules = FilterRules::new();
        rules.push(equals(1, "prod"));
        rules.push(equals(2, "prod").excluding());
        assert!(!rules.passes("prod"));
    }

    #[test]
    fn test_empty_rules_pass_everything() {
        let rules = FilterRules::new();
        assert!(rules.passes(""));
        assert!(rules.passes("anything"));

        let set = FilterSet::default();
        assert!(set.is_visible(&session_entry("x")));
        assert!(!set.has_constraints());
    }

    #[test]
    fn test_disabled_rules_behave_as_absent() {
        let mut set = FilterSet::default();
        set.sessions.push(equals(1, "staging").disabled());
        assert!(set.is_visible(&session_entry("prod")));
        assert!(!set.has_constraints());
    }

    #[test]
    fn test_inactive_rules() {
        let empty_list = FilterRule::list(1, Vec::<String>::new());
        assert!(!empty_list.is_active());

        let blank = FilterRule::text(2, FilterOperator::Contains, "   ", false).unwrap();
        assert!(!blank.is_active());

        let blank_regex = FilterRule::text(3, FilterOperator::Regex, "", false).unwrap();
        assert!(!blank_regex.is_active());

        let mut rules = FilterRules::new();
        rules.push(empty_list);
        rules.push(blank);
        assert!(rules.passes("whatever"));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let result = FilterRule::text(1, FilterOperator::Regex, "(unterminated", true);
        assert!(matches!(
            result,
            Err(RuleError::InvalidRegex { ref pattern, .. }) if pattern == "(unterminated"
        ));
    }

    #[test]
    fn test_invalid_regex_rejected_from_config() {
        let json = r#"{"operator": "regex", "value": "(unterminated"}"#;
        let result: Result<FilterRule, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_text_operators() {
        let contains = FilterRule::text(1, FilterOperator::Contains, "TIME", false).unwrap();
        assert!(contains.matches("request timeout"));

        let contains_cs = FilterRule::text(1, FilterOperator::Contains, "TIME", true).unwrap();
        assert!(!contains_cs.matches("request timeout"));

        let starts = FilterRule::text(1, FilterOperator::Starts, "req", false).unwrap();
        assert!(starts.matches("Request done"));
        assert!(!starts.matches("a request"));

        let ends = FilterRule::text(1, FilterOperator::Ends, "done", true).unwrap();
        assert!(ends.matches("request done"));
        assert!(!ends.matches("done request"));

        let eq = FilterRule::text(1, FilterOperator::Equals, "Prod", false).unwrap();
        assert!(eq.matches("PROD"));
        assert!(!eq.matches("production"));
    }

    #[test]
    fn test_regex_case_sensitivity() {
        let insensitive = FilterRule::text(1, FilterOperator::Regex, "err(or)?", false).unwrap();
        assert!(insensitive.matches("ERROR here"));

        let sensitive = FilterRule::text(1, FilterOperator::Regex, "err(or)?", true).unwrap();
        assert!(!sensitive.matches("ERROR here"));
        assert!(sensitive.matches("an error"));
    }

    #[test]
    fn test_list_is_exact() {
        let rule = FilterRule::list(1, ["Error", "Fatal"]);
        assert!(rule.matches("Error"));
        assert!(!rule.matches("error"));
        assert!(!rule.matches("Err"));
    }

    #[test]
    fn test_and_across_fields() {
        let mut set = FilterSet::default();
        set.levels.push(FilterRule::list(1, ["Error"]));
        set.app_names.push(equals(2, "api"));

        let hit = LogEntry::new(1, "t").with_level(Level::Error).with_app("api");
        let wrong_app = LogEntry::new(2, "t").with_level(Level::Error).with_app("web");
        let wrong_level = LogEntry::new(3, "t").with_level(Level::Message).with_app("api");

        assert!(set.is_visible(&hit));
        assert!(!set.is_visible(&wrong_app));
        assert!(!set.is_visible(&wrong_level));
    }

    #[test]
    fn test_or_within_field() {
        let mut set = FilterSet::default();
        set.sessions.push(equals(1, "a"));
        set.sessions.push(equals(2, "b"));
        assert!(set.is_visible(&session_entry("a")));
        assert!(set.is_visible(&session_entry("b")));
        assert!(!set.is_visible(&session_entry("c")));
    }

    #[test]
    fn test_entry_type_and_message_fields() {
        let mut set = FilterSet::default();
        set.entry_types
            .push(FilterRule::list(1, [EntryType::Separator.name()]).excluding());
        set.messages
            .push(FilterRule::text(2, FilterOperator::Contains, "slow", false).unwrap());

        let sep = LogEntry::new(1, "t")
            .with_entry_type(EntryType::Separator)
            .with_message("slow");
        let msg = LogEntry::new(2, "t").with_message("Slow query");
        assert!(!set.is_visible(&sep));
        assert!(set.is_visible(&msg));
    }

    #[test]
    fn test_is_visible_is_pure() {
        let mut set = FilterSet::default();
        set.titles
            .push(FilterRule::text(1, FilterOperator::Regex, "^load", false).unwrap());
        let entry = LogEntry::new(1, "Loading config");
        let first = set.is_visible(&entry);
        let second = set.is_visible(&entry);
        assert_eq!(first, second);
        assert!(first);
    }

    #[test]
    fn test_presets() {
        let errors = FilterPresets::errors_only();
        assert!(errors.is_visible(&LogEntry::new(1, "t").with_level(Level::Fatal)));
        assert!(!errors.is_visible(&LogEntry::new(2, "t").with_level(Level::Warning)));

        let quiet = FilterPresets::hide_debug();
        assert!(!quiet.is_visible(&LogEntry::new(3, "t").with_level(Level::Verbose)));
        assert!(quiet.is_visible(&LogEntry::new(4, "t").with_level(Level::Message)));

        let warn = FilterPresets::warnings_and_above();
        assert!(warn.is_visible(&LogEntry::new(5, "t").with_level(Level::Warning)));
    }

    #[test]
    fn test_set_deserializes_from_toml_shape() {
        let json = r#"{
            "levels": [{"operator": "list", "values": ["Error"]}],
            "app_names": [{"operator": "equals", "value": "API", "include": false}]
        }"#;
        let set: FilterSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.active_counts(), (1, 1));

        let entry = LogEntry::new(1, "t").with_level(Level::Error).with_app("api");
        assert!(!set.is_visible(&entry));
    }

    #[test]
    fn test_find_matches() {
        let rule = FilterRule::text(1, FilterOperator::Regex, "error", true).unwrap();
        let matches = rule.find_matches("an error occurred, another error here");
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_find_matches_text_operators() {
        let contains = FilterRule::text(1, FilterOperator::Contains, "disk", false).unwrap();
        assert_eq!(
            contains.find_matches("Disk full on DISK 2"),
            vec![(0, 4), (13, 17)]
        );

        let contains_cs = FilterRule::text(1, FilterOperator::Contains, "disk", true).unwrap();
        assert_eq!(contains_cs.find_matches("Disk full on disk 2"), vec![(13, 17)]);

        let starts = FilterRule::text(1, FilterOperator::Starts, "req", false).unwrap();
        assert_eq!(starts.find_matches("Request req"), vec![(0, 3)]);

        let ends = FilterRule::text(1, FilterOperator::Ends, "done", false).unwrap();
        assert_eq!(ends.find_matches("DONE and done"), vec![(9, 13)]);

        let equals = FilterRule::text(1, FilterOperator::Equals, "prod", false).unwrap();
        assert_eq!(equals.find_matches("PROD"), vec![(0, 4)]);
        assert!(equals.find_matches("production").is_empty());

        // Regex metacharacters in a text rule are literal
        let dotted = FilterRule::text(1, FilterOperator::Contains, "a.b", false).unwrap();
        assert_eq!(dotted.find_matches("axb a.b"), vec![(4, 7)]);
    }

    #[test]
    fn test_next_rule_id_and_remove() {
        let mut set = FilterSet::default();
        assert_eq!(set.next_rule_id(), 1);
        set.titles.push(equals(4, "x"));
        set.levels.push(FilterRule::list(9, ["Error"]));
        assert_eq!(set.next_rule_id(), 10);

        assert!(set.levels.remove(9).is_some());
        assert!(set.levels.remove(9).is_none());
        assert_eq!(set.next_rule_id(), 5);
    }
}
