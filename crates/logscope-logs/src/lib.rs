//! Entry storage and row selection for logscope
//!
//! This crate provides the bounded entry/watch store, push message decoding,
//! rule-based filtering, highlighting, and per-view follow state.

mod buffer;
mod filter;
mod highlight;
mod parser;
mod store;
mod view;

pub use buffer::RingBuffer;
pub use filter::{
    FilterField, FilterOperator, FilterPresets, FilterRule, FilterRuleConfig, FilterRules,
    FilterSet, RuleError,
};
pub use highlight::{
    HighlightRule, HighlightRuleConfig, HighlightStyleConfig, parse_color, pick_rule, pick_style,
};
pub use parser::{MessageParser, ParseError};
pub use store::{AppendOutcome, LevelCounts, LogStore, StoreLimits};
pub use view::{FollowState, ViewState};

// Re-export types used in our public API
pub use logscope_types::{ArcLogEntry, HighlightStyle, Level, LogEntry, ServerMessage, WatchValue};
