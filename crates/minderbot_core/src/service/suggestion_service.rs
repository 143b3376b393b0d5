//! Suggestion write use-cases that keep both reference sides in sync.
//!
//! # Responsibility
//! - Create, re-tag, personalize and delete suggestions.
//! - Maintain `Tag::suggestions`, `count` and `created` alongside
//!   `Suggestion::tags` in the same store batch.
//!
//! # Invariants
//! - A store only written through this service has no consistency problems.
//! - Tag lists on suggestions are trimmed and deduplicated in entry order.
//! - Owner and author ids must resolve to existing users.

use crate::model::suggestion::{Suggestion, SuggestionId};
use crate::model::tag::{Tag, TagId};
use crate::model::user::UserId;
use crate::repo::{EntityStore, RepoError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum SuggestionServiceError {
    /// Target suggestion does not exist.
    NotFound(SuggestionId),
    /// A suggestion with this id already exists.
    AlreadyExists(SuggestionId),
    /// Owner or author id does not resolve to a user.
    UnknownUser(UserId),
    /// Persistence-layer failure, including validation.
    Repo(RepoError),
}

impl Display for SuggestionServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "suggestion not found: {id}"),
            Self::AlreadyExists(id) => write!(f, "suggestion already exists: {id}"),
            Self::UnknownUser(id) => write!(f, "unknown user: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SuggestionServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SuggestionServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type SuggestionResult<T> = Result<T, SuggestionServiceError>;

pub struct SuggestionService<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> SuggestionService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persists a new suggestion and references it from each of its tags.
    ///
    /// Missing tags are created with `created` set to the suggestion's.
    pub fn create(&self, suggestion: Suggestion) -> SuggestionResult<Suggestion> {
        let mut suggestion = suggestion;
        suggestion.tags = normalize_tags(&suggestion.tags);

        let created = self.store.atomic(|store| {
            if store.get_suggestion(&suggestion.id)?.is_some() {
                return Ok(Err(SuggestionServiceError::AlreadyExists(
                    suggestion.id.clone(),
                )));
            }
            if let Some(user) = first_unknown_user(store, &suggestion)? {
                return Ok(Err(SuggestionServiceError::UnknownUser(user)));
            }
            store.put_suggestion(&suggestion)?;
            for tag_id in &suggestion.tags {
                attach(store, tag_id, &suggestion)?;
            }
            Ok(Ok(()))
        })?;
        created?;

        info!(
            "event=suggestion_create module=service status=ok suggestion_id={} tags={}",
            suggestion.id,
            suggestion.tags.len()
        );
        Ok(suggestion)
    }

    /// Replaces the tag list of a suggestion, detaching removed tags and
    /// attaching new ones.
    pub fn set_tags(&self, id: &str, tags: &[TagId]) -> SuggestionResult<Suggestion> {
        let tags = normalize_tags(tags);
        let updated = self.store.atomic(|store| {
            let Some(mut suggestion) = store.get_suggestion(id)? else {
                return Ok(Err(SuggestionServiceError::NotFound(id.to_string())));
            };
            for removed in suggestion.tags.iter().filter(|tag| !tags.contains(tag)) {
                detach(store, removed, &suggestion.id)?;
            }
            let added: Vec<TagId> = tags
                .iter()
                .filter(|tag| !suggestion.has_tag(tag))
                .cloned()
                .collect();
            suggestion.tags = tags.clone();
            store.put_suggestion(&suggestion)?;
            for tag_id in &added {
                attach(store, tag_id, &suggestion)?;
            }
            Ok(Ok(suggestion))
        })??;

        info!(
            "event=suggestion_set_tags module=service status=ok suggestion_id={} tags={}",
            updated.id,
            updated.tags.len()
        );
        Ok(updated)
    }

    /// Copies a suggestion into a personal reminder for `owner`.
    pub fn personalize(
        &self,
        template_id: &str,
        owner: &str,
        created: i64,
    ) -> SuggestionResult<Suggestion> {
        let template = self
            .store
            .get_suggestion(template_id)?
            .ok_or_else(|| SuggestionServiceError::NotFound(template_id.to_string()))?;
        self.create(template.personalize(owner, created))
    }

    /// Deletes a suggestion and removes it from every tag it references.
    pub fn delete(&self, id: &str) -> SuggestionResult<()> {
        self.store
            .atomic(|store| {
                let Some(suggestion) = store.get_suggestion(id)? else {
                    return Ok(Err(SuggestionServiceError::NotFound(id.to_string())));
                };
                for tag_id in &suggestion.tags {
                    detach(store, tag_id, &suggestion.id)?;
                }
                store.delete_suggestion(id)?;
                Ok(Ok(()))
            })??;

        info!("event=suggestion_delete module=service status=ok suggestion_id={id}");
        Ok(())
    }
}

fn normalize_tags(tags: &[TagId]) -> Vec<TagId> {
    let mut normalized: Vec<TagId> = Vec::with_capacity(tags.len());
    for tag in tags.iter().map(|tag| tag.trim()).filter(|tag| !tag.is_empty()) {
        if !normalized.iter().any(|seen| seen == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

fn first_unknown_user<S: EntityStore>(
    store: &S,
    suggestion: &Suggestion,
) -> Result<Option<UserId>, RepoError> {
    for user in [&suggestion.owner, &suggestion.author].into_iter().flatten() {
        if store.get_user(user)?.is_none() {
            return Ok(Some(user.clone()));
        }
    }
    Ok(None)
}

fn attach<S: EntityStore>(store: &S, tag_id: &str, suggestion: &Suggestion) -> Result<(), RepoError> {
    let mut tag = store.get_tag(tag_id)?.unwrap_or_else(|| Tag::new(tag_id));
    if !tag.references(&suggestion.id) {
        tag.suggestions.push(suggestion.id.clone());
    }
    tag.lower_created(suggestion.created);
    tag.recount();
    store.put_tag(&tag)
}

fn detach<S: EntityStore>(store: &S, tag_id: &str, suggestion_id: &str) -> Result<(), RepoError> {
    let Some(mut tag) = store.get_tag(tag_id)? else {
        return Ok(());
    };
    tag.suggestions.retain(|id| id != suggestion_id);
    tag.recount();
    if tag.count > 0 {
        store.put_tag(&tag)
    } else {
        store.delete_tag(&tag.id)
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_tags;

    #[test]
    fn normalize_tags_trims_and_deduplicates_in_order() {
        let tags = vec![
            " car ".to_string(),
            "home".to_string(),
            "car".to_string(),
            "".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["car", "home"]);
    }
}
