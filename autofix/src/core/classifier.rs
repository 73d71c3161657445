//! Deterministic classification of build/deploy log text.
//!
//! Failure markers veto unconditionally; success requires a positive marker.
//! Text that matches neither set is [`BuildVerdict::Ambiguous`].

use crate::core::types::BuildVerdict;

/// A single substring rule. Markers are matched against lower-cased text, so
/// they must themselves be lower-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerRule {
    pub marker: &'static str,
    pub verdict: BuildVerdict,
}

const fn rule(marker: &'static str, verdict: BuildVerdict) -> MarkerRule {
    MarkerRule { marker, verdict }
}

/// Rules used by the loop for Vercel build output.
pub const DEFAULT_RULES: &[MarkerRule] = &[
    rule("error ", BuildVerdict::Failure),
    rule("failed", BuildVerdict::Failure),
    rule("build failed", BuildVerdict::Failure),
    rule("exit code 1", BuildVerdict::Failure),
    rule("command \"npm run build\" exited with 1", BuildVerdict::Failure),
    rule("deployment completed", BuildVerdict::Success),
    rule("build completed", BuildVerdict::Success),
    rule("ready! deployed to", BuildVerdict::Success),
];

/// Classify log text with [`DEFAULT_RULES`].
pub fn classify(log_text: &str) -> BuildVerdict {
    classify_with(DEFAULT_RULES, log_text)
}

/// Classify log text against an explicit rule table.
///
/// Rules with [`BuildVerdict::Ambiguous`] are ignored; ambiguity is the
/// fallback, not something a marker can assert.
pub fn classify_with(rules: &[MarkerRule], log_text: &str) -> BuildVerdict {
    let text = log_text.to_lowercase();
    let mut saw_success = false;
    for rule in rules {
        if !text.contains(rule.marker) {
            continue;
        }
        match rule.verdict {
            BuildVerdict::Failure => return BuildVerdict::Failure,
            BuildVerdict::Success => saw_success = true,
            BuildVerdict::Ambiguous => {}
        }
    }
    if saw_success {
        BuildVerdict::Success
    } else {
        BuildVerdict::Ambiguous
    }
}
