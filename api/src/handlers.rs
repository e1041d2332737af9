//! Business handlers behind the two supported methods.
use crate::errors::Result;
use crate::requests::OnlineScoreRequest;
use crate::scoring::Scoring;
use serde_json::{Map, Value, json};
use store::ResilientStore;

/// Fixed score returned to the administrator.
pub const ADMIN_SCORE: i64 = 42;

/// The administrator gets [`ADMIN_SCORE`] without touching the store or the
/// scoring collaborator, and nothing is cached for them.
pub async fn online_score(
    store: &ResilientStore,
    scoring: &dyn Scoring,
    fields: &OnlineScoreRequest,
    is_admin: bool,
) -> Result<Value> {
    if fields.is_empty() {
        return Ok(json!({ "score": 0 }));
    }
    if is_admin {
        return Ok(json!({ "score": ADMIN_SCORE }));
    }

    let score = scoring.score(store, fields).await?;
    Ok(json!({ "score": score }))
}

/// Interests for every client, keyed by the client id.
pub async fn clients_interests(
    store: &ResilientStore,
    scoring: &dyn Scoring,
    client_ids: &[i64],
) -> Result<Value> {
    let mut interests = Map::new();
    for client_id in client_ids {
        let list = scoring.interests(store, *client_id).await?;
        interests.insert(client_id.to_string(), json!(list));
    }
    Ok(Value::Object(interests))
}
