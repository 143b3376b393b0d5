//! Immutable in-memory snapshot of every entity collection.
//!
//! # Responsibility
//! - Page through the store until each collection is exhausted.
//! - Offer explicit `Option`/`bool` lookups for reference resolution.
//!
//! # Invariants
//! - A snapshot is either complete or not returned at all.
//! - Iteration order is id order for every collection.

use crate::consistency::ConsistencyError;
use crate::model::feedback::{Feedback, FeedbackId};
use crate::model::suggestion::{Suggestion, SuggestionId};
use crate::model::tag::{Tag, TagId};
use crate::model::user::UserId;
use crate::repo::{EntityStore, PageQuery, RepoResult};
use log::{error, info};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    tags: BTreeMap<TagId, Tag>,
    suggestions: BTreeMap<SuggestionId, Suggestion>,
    feedback: BTreeMap<FeedbackId, Feedback>,
    users: BTreeSet<UserId>,
}

impl Snapshot {
    /// Loads all four collections from `store`, `page_size` rows at a time.
    ///
    /// # Errors
    /// - `StoreUnavailable` when any page fails to load.
    pub fn load<S: EntityStore>(store: &S, page_size: u32) -> Result<Self, ConsistencyError> {
        let started_at = Instant::now();
        info!("event=snapshot_load module=consistency status=start page_size={page_size}");

        match Self::load_pages(store, page_size.max(1)) {
            Ok(snapshot) => {
                info!(
                    "event=snapshot_load module=consistency status=ok duration_ms={} tags={} suggestions={} feedback={} users={}",
                    started_at.elapsed().as_millis(),
                    snapshot.tags.len(),
                    snapshot.suggestions.len(),
                    snapshot.feedback.len(),
                    snapshot.users.len()
                );
                Ok(snapshot)
            }
            Err(err) => {
                error!(
                    "event=snapshot_load module=consistency status=error duration_ms={} error_code=store_unavailable error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(ConsistencyError::StoreUnavailable(err))
            }
        }
    }

    fn load_pages<S: EntityStore>(store: &S, page_size: u32) -> RepoResult<Self> {
        let tags = load_collection(page_size, |page| store.list_tags(page), |tag| &tag.id)?;
        let suggestions = load_collection(
            page_size,
            |page| store.list_suggestions(page),
            |suggestion| &suggestion.id,
        )?;
        let feedback = load_collection(
            page_size,
            |page| store.list_feedback(page),
            |feedback| &feedback.id,
        )?;
        let users = load_collection(page_size, |page| store.list_user_ids(page), |id| id)?;

        Ok(Self::from_parts(tags, suggestions, feedback, users))
    }

    /// Builds a snapshot from already loaded entities. Later duplicates of
    /// an id replace earlier ones.
    pub fn from_parts(
        tags: impl IntoIterator<Item = Tag>,
        suggestions: impl IntoIterator<Item = Suggestion>,
        feedback: impl IntoIterator<Item = Feedback>,
        users: impl IntoIterator<Item = UserId>,
    ) -> Self {
        Self {
            tags: tags.into_iter().map(|tag| (tag.id.clone(), tag)).collect(),
            suggestions: suggestions
                .into_iter()
                .map(|suggestion| (suggestion.id.clone(), suggestion))
                .collect(),
            feedback: feedback
                .into_iter()
                .map(|feedback| (feedback.id.clone(), feedback))
                .collect(),
            users: users.into_iter().collect(),
        }
    }

    pub fn resolve_tag(&self, id: &str) -> Option<&Tag> {
        self.tags.get(id)
    }

    pub fn resolve_suggestion(&self, id: &str) -> Option<&Suggestion> {
        self.suggestions.get(id)
    }

    pub fn resolve_feedback(&self, id: &str) -> Option<&Feedback> {
        self.feedback.get(id)
    }

    pub fn user_exists(&self, id: &str) -> bool {
        self.users.contains(id)
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn suggestions(&self) -> impl Iterator<Item = &Suggestion> {
        self.suggestions.values()
    }

    pub fn feedback(&self) -> impl Iterator<Item = &Feedback> {
        self.feedback.values()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn suggestion_count(&self) -> usize {
        self.suggestions.len()
    }
}

/// Drains one collection through keyset pages. Stops on the first short page.
fn load_collection<T>(
    page_size: u32,
    mut fetch: impl FnMut(&PageQuery) -> RepoResult<Vec<T>>,
    id_of: impl Fn(&T) -> &String,
) -> RepoResult<Vec<T>> {
    let mut items = Vec::new();
    let mut page = PageQuery::first(page_size);
    loop {
        let batch = fetch(&page)?;
        let full_page = batch.len() >= page_size as usize;
        page.after = batch.last().map(|item| id_of(item).clone());
        items.extend(batch);
        if !full_page || page.after.is_none() {
            return Ok(items);
        }
    }
}
