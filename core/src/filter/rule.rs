use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::config::{FilterConfig, RuleAction};

/// Regex rules only look at this many leading bytes of a line.
pub const MATCH_WINDOW_BYTES: usize = 64 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("{0}")]
    Other(String),
}

/// One classification step. `Ok(None)` means the rule does not apply.
pub trait LineRule: Send + Sync {
    fn name(&self) -> &str;
    fn evaluate(&self, line: &str) -> Result<Option<RuleAction>, RuleError>;
}

/// Ordered rules shared by every sink of a worker.
pub type RuleSet = Arc<[Arc<dyn LineRule>]>;

pub struct RegexRule {
    name: String,
    regex: Regex,
    action: RuleAction,
    trim_start: bool,
}

impl RegexRule {
    pub fn new(
        pattern: &str,
        action: RuleAction,
        case_insensitive: bool,
        trim_start: bool,
    ) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(Self {
            name: format!("{action:?}:{pattern}").to_lowercase(),
            regex,
            action,
            trim_start,
        })
    }
}

impl LineRule for RegexRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, line: &str) -> Result<Option<RuleAction>, RuleError> {
        let haystack = if self.trim_start {
            line.trim_start()
        } else {
            line
        };
        Ok(self
            .regex
            .is_match(match_window(haystack))
            .then_some(self.action))
    }
}

fn match_window(s: &str) -> &str {
    if s.len() <= MATCH_WINDOW_BYTES {
        return s;
    }
    let mut end = MATCH_WINDOW_BYTES;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Compile the configured rules. An empty set when filtering is disabled.
pub fn build_rules(cfg: &FilterConfig) -> anyhow::Result<RuleSet> {
    if !cfg.enabled {
        return Ok(Arc::from(Vec::<Arc<dyn LineRule>>::new()));
    }
    let mut rules: Vec<Arc<dyn LineRule>> = Vec::with_capacity(cfg.rules.len());
    for r in &cfg.rules {
        let rule = RegexRule::new(&r.pattern, r.action, r.case_insensitive, r.trim_start)
            .map_err(|e| anyhow::anyhow!("invalid filter pattern {:?}: {e}", r.pattern))?;
        rules.push(Arc::new(rule));
    }
    Ok(Arc::from(rules))
}
