//! Idempotent repairs, one per rule.
//!
//! # Responsibility
//! - Map a rule key to its fix and apply it to the records of that rule.
//! - Run all writes of one repair as a single store batch.
//!
//! # Invariants
//! - Unknown rule keys fail before any write.
//! - Every record re-reads its entity from the store, so several records
//!   against the same entity accumulate instead of overwriting each other.
//! - Entities deleted since evaluation are skipped, not recreated.
//! - Saving a tag recounts it and deletes it when no references remain.
//! - A dangling owner is only ever reassigned; an ownerless record is a
//!   public suggestion.

use crate::config::DanglingOwnerPolicy;
use crate::consistency::problem::{OwnerField, ProblemRecord};
use crate::consistency::rules::RuleName;
use crate::consistency::ConsistencyError;
use crate::model::suggestion::SuggestionId;
use crate::model::tag::{Tag, TagId};
use crate::model::user::UserId;
use crate::repo::{EntityStore, RepoResult};
use log::{error, info, warn};
use serde::Serialize;
use std::time::Instant;

/// Who runs a repair and how dangling owners are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairContext {
    pub policy: DanglingOwnerPolicy,
    /// Administrator running the repair; dangling owners are only fixed
    /// when it is set and the policy is claim.
    pub acting_user: Option<UserId>,
}

/// Counters of one repair run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairSummary {
    pub rule: RuleName,
    /// Records of `rule` that were handed to the repair.
    pub records: usize,
    /// Entities upserted.
    pub writes: usize,
    /// Tags deleted because no references remained.
    pub deletes: usize,
    /// Tags synthesized from dangling suggestion references.
    pub created: usize,
    /// Records whose entity no longer needed or allowed the fix.
    pub skipped: usize,
}

impl RepairSummary {
    fn new(rule: RuleName, records: usize) -> Self {
        Self {
            rule,
            records,
            writes: 0,
            deletes: 0,
            created: 0,
            skipped: 0,
        }
    }
}

/// Applies the repair of `rule_key` to the matching records in `problems`.
///
/// Records of other rules are ignored. An empty selection is a no-op.
///
/// # Errors
/// - `UnknownRule` when `rule_key` names no rule.
/// - `RepairFailed` when a read or write fails; stores with atomic batches
///   roll every write of this call back.
pub fn repair<S: EntityStore>(
    store: &S,
    rule_key: &str,
    problems: &[ProblemRecord],
    context: &RepairContext,
) -> Result<RepairSummary, ConsistencyError> {
    let rule = RuleName::parse(rule_key)
        .ok_or_else(|| ConsistencyError::UnknownRule(rule_key.trim().to_string()))?;
    let records: Vec<&ProblemRecord> = problems
        .iter()
        .filter(|record| record.rule() == rule)
        .collect();
    if records.is_empty() {
        info!("event=consistency_repair module=consistency status=ok rule={rule} records=0");
        return Ok(RepairSummary::new(rule, 0));
    }

    let started_at = Instant::now();
    info!(
        "event=consistency_repair module=consistency status=start rule={} records={}",
        rule,
        records.len()
    );
    let result = store.atomic(|store| {
        let mut summary = RepairSummary::new(rule, records.len());
        apply(store, rule, &records, context, &mut summary)?;
        Ok(summary)
    });

    match result {
        Ok(summary) => {
            info!(
                "event=consistency_repair module=consistency status=ok rule={} duration_ms={} records={} writes={} deletes={} created={} skipped={}",
                rule,
                started_at.elapsed().as_millis(),
                summary.records,
                summary.writes,
                summary.deletes,
                summary.created,
                summary.skipped
            );
            Ok(summary)
        }
        Err(source) => {
            error!(
                "event=consistency_repair module=consistency status=error rule={} duration_ms={} error_code=repair_failed error={}",
                rule,
                started_at.elapsed().as_millis(),
                source
            );
            Err(ConsistencyError::RepairFailed { rule, source })
        }
    }
}

fn apply<S: EntityStore>(
    store: &S,
    rule: RuleName,
    records: &[&ProblemRecord],
    context: &RepairContext,
    summary: &mut RepairSummary,
) -> RepoResult<()> {
    if rule == RuleName::SuggestionTagMissing {
        return synthesize_missing_tags(store, records, summary);
    }
    let claimant = match context.policy {
        DanglingOwnerPolicy::Claim => context.acting_user.as_ref(),
        DanglingOwnerPolicy::Clear => None,
    };

    for record in records {
        match record {
            ProblemRecord::TagCount { tag, .. } | ProblemRecord::TagEmpty { tag } => {
                update_tag(store, tag, summary, |_| {})?;
            }
            ProblemRecord::TagSuggestionMissing { tag, suggestion } => {
                update_tag(store, tag, summary, |tag| {
                    tag.suggestions.retain(|id| id != suggestion);
                })?;
            }
            ProblemRecord::TagSuggestionDuplicate {
                tag, suggestion, ..
            } => {
                update_tag(store, tag, summary, |tag| {
                    let mut kept = false;
                    tag.suggestions.retain(|id| {
                        if id != suggestion {
                            return true;
                        }
                        !std::mem::replace(&mut kept, true)
                    });
                })?;
            }
            ProblemRecord::TagSuggestionReverse { tag, suggestion } => {
                let Some(mut target) = store.get_suggestion(suggestion)? else {
                    summary.skipped += 1;
                    continue;
                };
                if target.has_tag(tag) {
                    summary.skipped += 1;
                    continue;
                }
                target.tags.push(tag.clone());
                store.put_suggestion(&target)?;
                summary.writes += 1;
            }
            ProblemRecord::SuggestionTagReverse { suggestion, tag } => {
                let Some(source) = store.get_suggestion(suggestion)? else {
                    summary.skipped += 1;
                    continue;
                };
                update_tag(store, tag, summary, |tag| {
                    if !tag.references(suggestion) {
                        tag.suggestions.push(suggestion.clone());
                    }
                    tag.lower_created(source.created);
                })?;
            }
            ProblemRecord::TagCreatedMissing { tag, created, .. }
            | ProblemRecord::TagCreatedLate { tag, created, .. } => {
                update_tag(store, tag, summary, |tag| tag.created = Some(*created))?;
            }
            ProblemRecord::SuggestionOwnerMissing {
                suggestion,
                field,
                user,
            } => {
                let Some(mut target) = store.get_suggestion(suggestion)? else {
                    summary.skipped += 1;
                    continue;
                };
                let (slot, replacement) = match field {
                    OwnerField::Owner => (&mut target.owner, claimant),
                    OwnerField::Author => (&mut target.author, None),
                };
                if slot.as_ref() != Some(user) {
                    summary.skipped += 1;
                    continue;
                }
                if *field == OwnerField::Owner && replacement.is_none() {
                    warn!(
                        "event=consistency_repair module=consistency status=skipped rule={} policy={} suggestion={} reason=no_claimant",
                        rule,
                        context.policy.as_str(),
                        suggestion
                    );
                    summary.skipped += 1;
                    continue;
                }
                *slot = replacement.cloned();
                store.put_suggestion(&target)?;
                summary.writes += 1;
            }
            ProblemRecord::FeedbackSubmitterMissing { feedback, user } => {
                let Some(mut target) = store.get_feedback(feedback)? else {
                    summary.skipped += 1;
                    continue;
                };
                if target.submitter.as_ref() != Some(user) {
                    summary.skipped += 1;
                    continue;
                }
                target.submitter = None;
                store.put_feedback(&target)?;
                summary.writes += 1;
            }
            ProblemRecord::SuggestionTagMissing { .. } => {}
        }
    }
    Ok(())
}

/// Creates one tag per distinct missing id, or merges into a tag that
/// appeared since evaluation.
fn synthesize_missing_tags<S: EntityStore>(
    store: &S,
    records: &[&ProblemRecord],
    summary: &mut RepairSummary,
) -> RepoResult<()> {
    let mut references: Vec<(&TagId, &SuggestionId, i64)> = records
        .iter()
        .filter_map(|record| match record {
            ProblemRecord::SuggestionTagMissing {
                suggestion,
                tag,
                created,
            } => Some((tag, suggestion, *created)),
            _ => None,
        })
        .collect();
    references.sort();

    let mut references = references.into_iter().peekable();
    while let Some((tag_id, first, created)) = references.next() {
        let mut suggestions = vec![first.clone()];
        let mut oldest = created;
        while let Some((_, suggestion, created)) =
            references.next_if(|(next_tag, _, _)| *next_tag == tag_id)
        {
            if !suggestions.contains(suggestion) {
                suggestions.push(suggestion.clone());
            }
            oldest = oldest.min(created);
        }

        match store.get_tag(tag_id)? {
            Some(mut tag) => {
                for suggestion in suggestions {
                    if !tag.references(&suggestion) {
                        tag.suggestions.push(suggestion);
                    }
                }
                tag.lower_created(oldest);
                save_tag(store, &mut tag, summary)?;
            }
            None => {
                let mut tag = Tag::new(tag_id.clone());
                tag.suggestions = suggestions;
                tag.created = Some(oldest);
                tag.recount();
                store.put_tag(&tag)?;
                summary.created += 1;
            }
        }
    }
    Ok(())
}

/// Re-reads `tag_id`, applies `change` and saves the result.
fn update_tag<S: EntityStore>(
    store: &S,
    tag_id: &str,
    summary: &mut RepairSummary,
    change: impl FnOnce(&mut Tag),
) -> RepoResult<()> {
    let Some(mut tag) = store.get_tag(tag_id)? else {
        summary.skipped += 1;
        return Ok(());
    };
    change(&mut tag);
    save_tag(store, &mut tag, summary)
}

/// Recounts `tag`, then persists it while references remain and deletes it
/// otherwise.
fn save_tag<S: EntityStore>(
    store: &S,
    tag: &mut Tag,
    summary: &mut RepairSummary,
) -> RepoResult<()> {
    tag.recount();
    if tag.count > 0 {
        store.put_tag(tag)?;
        summary.writes += 1;
    } else {
        store.delete_tag(&tag.id)?;
        summary.deletes += 1;
    }
    Ok(())
}
