//! Rule evaluation over a loaded snapshot.
//!
//! # Responsibility
//! - Run the tag-direction, suggestion-direction and feedback scans.
//! - Group records by rule and sort each list by subject ids.
//!
//! # Invariants
//! - Evaluation is pure: the same snapshot always yields the same set.
//! - A tag without references is only reported as empty.
//! - An id repeated inside one tag list yields one duplicate record and at
//!   most one record from each of the other tag rules.

use crate::consistency::problem::{OwnerField, ProblemRecord, ProblemSet};
use crate::consistency::rules::RuleName;
use crate::consistency::snapshot::Snapshot;
use crate::model::suggestion::Suggestion;
use crate::model::tag::Tag;
use log::info;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

/// Evaluates every rule.
pub fn evaluate(snapshot: &Snapshot) -> ProblemSet {
    let started_at = Instant::now();

    let mut grouped: BTreeMap<RuleName, Vec<ProblemRecord>> = BTreeMap::new();
    let records = scan_tags(snapshot)
        .into_iter()
        .chain(scan_suggestions(snapshot))
        .chain(scan_feedback(snapshot));
    for record in records {
        grouped.entry(record.rule()).or_default().push(record);
    }

    let mut problems = ProblemSet::default();
    for (rule, mut records) in grouped {
        sort_records(&mut records);
        problems.insert(rule, records);
    }

    info!(
        "event=consistency_evaluate module=consistency status=ok duration_ms={} tags={} suggestions={} problems={} failing_rules={}",
        started_at.elapsed().as_millis(),
        snapshot.tag_count(),
        snapshot.suggestion_count(),
        problems.total(),
        problems.iter().count()
    );
    problems
}

/// Evaluates one rule, scanning only the collection that rule belongs to.
pub fn evaluate_rule(snapshot: &Snapshot, rule: RuleName) -> Vec<ProblemRecord> {
    let records = if rule.is_tag_direction() {
        scan_tags(snapshot)
    } else if rule == RuleName::FeedbackSubmitter {
        scan_feedback(snapshot)
    } else {
        scan_suggestions(snapshot)
    };
    let mut records: Vec<ProblemRecord> = records
        .into_iter()
        .filter(|record| record.rule() == rule)
        .collect();
    sort_records(&mut records);
    records
}

fn sort_records(records: &mut [ProblemRecord]) {
    records.sort_by(|left, right| left.sort_key().cmp(&right.sort_key()));
}

fn scan_tags(snapshot: &Snapshot) -> Vec<ProblemRecord> {
    let mut records = Vec::new();
    for tag in snapshot.tags() {
        scan_tag(snapshot, tag, &mut records);
    }
    records
}

fn scan_tag(snapshot: &Snapshot, tag: &Tag, records: &mut Vec<ProblemRecord>) {
    let length = tag.reference_count();
    if length == 0 {
        records.push(ProblemRecord::TagEmpty {
            tag: tag.id.clone(),
        });
        return;
    }
    if tag.count != length {
        records.push(ProblemRecord::TagCount {
            tag: tag.id.clone(),
            count: tag.count,
            length,
        });
    }

    // Distinct ids in first-occurrence order with their multiplicity.
    let mut distinct: Vec<&str> = Vec::new();
    let mut occurrences: HashMap<&str, i64> = HashMap::with_capacity(tag.suggestions.len());
    for id in &tag.suggestions {
        let times = occurrences.entry(id.as_str()).or_insert(0);
        if *times == 0 {
            distinct.push(id);
        }
        *times += 1;
    }

    let mut oldest: Option<&Suggestion> = None;
    for id in distinct {
        let times = occurrences.get(id).copied().unwrap_or(1);
        if times > 1 {
            records.push(ProblemRecord::TagSuggestionDuplicate {
                tag: tag.id.clone(),
                suggestion: id.to_string(),
                occurrences: times,
            });
        }

        let Some(suggestion) = snapshot.resolve_suggestion(id) else {
            records.push(ProblemRecord::TagSuggestionMissing {
                tag: tag.id.clone(),
                suggestion: id.to_string(),
            });
            continue;
        };
        if !suggestion.has_tag(&tag.id) {
            records.push(ProblemRecord::TagSuggestionReverse {
                tag: tag.id.clone(),
                suggestion: id.to_string(),
            });
        }
        let is_older = oldest.map_or(true, |current| {
            (suggestion.created, &suggestion.id) < (current.created, &current.id)
        });
        if is_older {
            oldest = Some(suggestion);
        }
    }

    let Some(oldest) = oldest else {
        return;
    };
    match tag.created {
        None => records.push(ProblemRecord::TagCreatedMissing {
            tag: tag.id.clone(),
            oldest: oldest.id.clone(),
            created: oldest.created,
        }),
        Some(created) if created > oldest.created => {
            records.push(ProblemRecord::TagCreatedLate {
                tag: tag.id.clone(),
                oldest: oldest.id.clone(),
                created: oldest.created,
            })
        }
        Some(_) => {}
    }
}

fn scan_suggestions(snapshot: &Snapshot) -> Vec<ProblemRecord> {
    let mut records = Vec::new();
    for suggestion in snapshot.suggestions() {
        let mut seen: HashSet<&str> = HashSet::with_capacity(suggestion.tags.len());
        for tag_id in &suggestion.tags {
            if !seen.insert(tag_id) {
                continue;
            }

            match snapshot.resolve_tag(tag_id) {
                None => records.push(ProblemRecord::SuggestionTagMissing {
                    suggestion: suggestion.id.clone(),
                    tag: tag_id.clone(),
                    created: suggestion.created,
                }),
                Some(tag) if !tag.references(&suggestion.id) => {
                    records.push(ProblemRecord::SuggestionTagReverse {
                        suggestion: suggestion.id.clone(),
                        tag: tag_id.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        for (field, user) in [
            (OwnerField::Owner, &suggestion.owner),
            (OwnerField::Author, &suggestion.author),
        ] {
            if let Some(user) = user.as_ref().filter(|id| !snapshot.user_exists(id)) {
                records.push(ProblemRecord::SuggestionOwnerMissing {
                    suggestion: suggestion.id.clone(),
                    field,
                    user: user.clone(),
                });
            }
        }
    }
    records
}

fn scan_feedback(snapshot: &Snapshot) -> Vec<ProblemRecord> {
    snapshot
        .feedback()
        .filter_map(|feedback| {
            let user = feedback.submitter.as_ref()?;
            (!snapshot.user_exists(user)).then(|| ProblemRecord::FeedbackSubmitterMissing {
                feedback: feedback.id.clone(),
                user: user.clone(),
            })
        })
        .collect()
}
