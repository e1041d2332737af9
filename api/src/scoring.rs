//! The scoring and interests collaborators.
//!
//! Dispatch only depends on the [`Scoring`] contract. [`CachedScoring`] is
//! the stock implementation: a weighted sum of the supplied contact fields,
//! memoised in the resilient store, and interests read from cached lists.
use crate::requests::OnlineScoreRequest;
use async_trait::async_trait;
use std::time::Duration;
use store::{ResilientStore, hashed_key};

const SCORE_TTL: Duration = Duration::from_secs(60 * 60);
const BIRTHDAY_KEY_FORMAT: &str = "%Y%m%d";

#[derive(thiserror::Error, Debug)]
pub enum ScoringError {
    #[error("scoring failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Scoring: Send + Sync {
    async fn score(
        &self,
        store: &ResilientStore,
        fields: &OnlineScoreRequest,
    ) -> Result<f64, ScoringError>;

    /// Must read through the store; an unknown client has no interests.
    async fn interests(
        &self,
        store: &ResilientStore,
        client_id: i64,
    ) -> Result<Vec<String>, ScoringError>;
}

#[derive(Clone, Debug, Default)]
pub struct CachedScoring;

/// Cache key for a score: hash of the identifying contact fields.
pub fn score_key(fields: &OnlineScoreRequest) -> String {
    let birthday = fields
        .birthday
        .map(|b| b.format(BIRTHDAY_KEY_FORMAT).to_string())
        .unwrap_or_default();
    let parts = [
        fields.first_name.as_deref().unwrap_or_default(),
        fields.last_name.as_deref().unwrap_or_default(),
        fields.phone.as_deref().unwrap_or_default(),
        birthday.as_str(),
    ];
    hashed_key(&parts.concat())
}

/// Weighted sum of the supplied fields.
pub fn base_score(fields: &OnlineScoreRequest) -> f64 {
    let mut score = 0.0;
    if fields.phone.is_some() {
        score += 1.5;
    }
    if fields.email.is_some() {
        score += 1.5;
    }
    if fields.birthday.is_some() && fields.gender.is_some() {
        score += 1.5;
    }
    if fields.first_name.is_some() && fields.last_name.is_some() {
        score += 0.5;
    }
    score
}

#[async_trait]
impl Scoring for CachedScoring {
    async fn score(
        &self,
        store: &ResilientStore,
        fields: &OnlineScoreRequest,
    ) -> Result<f64, ScoringError> {
        let key = score_key(fields);

        if let Some(cached) = store.get(&key).await {
            match cached.parse::<f64>() {
                Ok(score) => return Ok(score),
                Err(err) => tracing::warn!(key = %key, error = %err, "ignoring unparseable cached score"),
            }
        }

        let score = base_score(fields);
        store.set(&key, score.to_string(), SCORE_TTL).await;
        Ok(score)
    }

    async fn interests(
        &self,
        store: &ResilientStore,
        client_id: i64,
    ) -> Result<Vec<String>, ScoringError> {
        Ok(store.get_list(&format!("i:{client_id}")).await.items)
    }
}
