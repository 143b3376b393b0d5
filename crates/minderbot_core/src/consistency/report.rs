//! Interactive summaries and plain-text batch reports.

use crate::config::DanglingOwnerPolicy;
use crate::consistency::problem::{ProblemRecord, ProblemSet};
use crate::consistency::rules::RuleName;
use serde::Serialize;

const NO_PROBLEMS: &str = "No problems found.";

/// Outcome of one rule as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSummary {
    pub rule: RuleName,
    pub is_success: bool,
    pub headline: &'static str,
    pub action_label: &'static str,
    /// Rendered problem messages; empty on success.
    pub messages: Vec<String>,
}

/// One entry per known rule, in rule key order.
pub fn summarize(problems: &ProblemSet, policy: DanglingOwnerPolicy) -> Vec<RuleSummary> {
    RuleName::ALL
        .into_iter()
        .map(|rule| {
            let records = problems.get(rule);
            let is_success = records.is_empty();
            RuleSummary {
                rule,
                is_success,
                headline: if is_success {
                    rule.success_headline()
                } else {
                    rule.problem_headline()
                },
                action_label: rule.action_label(policy),
                messages: records.iter().map(ProblemRecord::render).collect(),
            }
        })
        .collect()
}

/// Plain-text report for unattended runs.
///
/// Each failing rule becomes a section: its headline without the trailing
/// period plus `:`, one `* message` line per record and a blank line. The
/// `report_url` footer closes the report exactly once.
pub fn batch_report(problems: &ProblemSet, report_url: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    if problems.is_empty() {
        lines.push(NO_PROBLEMS.to_string());
        lines.push(String::new());
    }
    for (rule, records) in problems.iter() {
        let headline = rule.problem_headline();
        lines.push(format!("{}:", headline.strip_suffix('.').unwrap_or(headline)));
        lines.extend(records.iter().map(|record| format!("* {record}")));
        lines.push(String::new());
    }
    lines.push(report_url.to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{batch_report, summarize};
    use crate::config::DanglingOwnerPolicy;
    use crate::consistency::problem::{ProblemRecord, ProblemSet};
    use crate::consistency::rules::RuleName;

    const URL: &str = "http://www.minderbot.com/consistency/";

    #[test]
    fn batch_report_without_problems() {
        assert_eq!(
            batch_report(&ProblemSet::default(), URL),
            format!("No problems found.\n\n{URL}")
        );
    }

    #[test]
    fn batch_report_lists_failing_rules_in_key_order() {
        let mut problems = ProblemSet::default();
        problems.insert(
            RuleName::TagSuggestionMissing,
            vec![ProblemRecord::TagSuggestionMissing {
                tag: "a".into(),
                suggestion: "a-b".into(),
            }],
        );
        problems.insert(
            RuleName::TagCount,
            vec![ProblemRecord::TagCount {
                tag: "a".into(),
                count: 2,
                length: 1,
            }],
        );

        let report = batch_report(&problems, URL);
        assert_eq!(
            report,
            format!(
                "Some tag count fields are incorrect:\n\
                 * Tag a has count 2 but references 1 suggestions.\n\
                 \n\
                 References to missing suggestions:\n\
                 * Tag a references missing suggestion a-b.\n\
                 \n\
                 {URL}"
            )
        );
        assert_eq!(report.matches(URL).count(), 1);
    }

    #[test]
    fn summarize_covers_every_rule() {
        let mut problems = ProblemSet::default();
        problems.insert(
            RuleName::TagEmpty,
            vec![ProblemRecord::TagEmpty { tag: "a".into() }],
        );

        let summaries = summarize(&problems, DanglingOwnerPolicy::Claim);
        assert_eq!(summaries.len(), RuleName::ALL.len());

        let failing: Vec<_> = summaries.iter().filter(|s| !s.is_success).collect();
        assert_eq!(failing.len(), 1);
        assert_eq!(failing[0].rule, RuleName::TagEmpty);
        assert_eq!(failing[0].headline, "Some tags don't reference any suggestions.");
        assert_eq!(failing[0].messages, vec!["Tag a does not reference any suggestions."]);

        let owner = summaries
            .iter()
            .find(|s| s.rule == RuleName::SuggestionOwner)
            .expect("owner summary");
        assert_eq!(owner.headline, "All suggestions have valid owners and authors.");
        assert_eq!(owner.action_label, "Claim ownership");
        assert!(owner.messages.is_empty());
    }

    #[test]
    fn summary_serializes_rule_as_key() {
        let summaries = summarize(&ProblemSet::default(), DanglingOwnerPolicy::Clear);
        let value = serde_json::to_value(&summaries[0]).expect("serialize summary");
        assert_eq!(value["rule"], "feedback_submitter");
        assert_eq!(value["is_success"], true);
        assert_eq!(value["headline"], "All feedback submitters exist.");
        assert_eq!(value["messages"], serde_json::json!([]));
    }
}
