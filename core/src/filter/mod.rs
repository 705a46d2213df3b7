//! Line filtering for captured task output.
//!
//! A [`FilterSink`] is fed raw byte fragments, rebuilds lines and returns the
//! text that survived the rule set together with any rule faults. It never
//! writes anywhere itself; the caller routes text and faults.

mod rule;
mod sink;

pub use crate::config::RuleAction;
pub use rule::{build_rules, LineRule, RegexRule, RuleError, RuleSet};
pub use sink::{FilterFault, FilterOutput, FilterSink};
