use crate::auth::check_auth;
use crate::config::AuthConfig;
use crate::errors::{ApiError, Result};
use crate::handlers;
use crate::requests::{ClientsInterestsRequest, MethodRequest, OnlineScoreRequest, has_score_pair};
use crate::scoring::Scoring;
use http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use store::ResilientStore;

/// Per-call accumulator the transport logs after the call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context(Map<String, Value>);

impl Context {
    pub fn new(request_id: impl Into<String>) -> Self {
        let mut context = Context::default();
        context.insert("request_id", Value::String(request_id.into()));
        context
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    /// Merges every entry of a JSON object. Other values are ignored.
    pub fn extend(&mut self, value: Value) {
        if let Value::Object(entries) = value {
            self.0.extend(entries);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Routes an authenticated method call to its handler.
#[derive(Clone)]
pub struct Dispatcher {
    auth: AuthConfig,
    scoring: Arc<dyn Scoring>,
}

impl Dispatcher {
    pub fn new(auth: AuthConfig, scoring: Arc<dyn Scoring>) -> Self {
        Self { auth, scoring }
    }

    /// Binds, authenticates and routes `body`, strictly in that order.
    pub async fn dispatch(
        &self,
        body: &Value,
        context: &mut Context,
        store: &ResilientStore,
    ) -> Result<Value> {
        let request = MethodRequest::from_body(body)?;

        if !check_auth(&request, &self.auth) {
            tracing::warn!(login = ?request.login, "authentication failed");
            return Err(ApiError::Forbidden);
        }

        match request.method.as_str() {
            "online_score" => {
                if !has_score_pair(&request.arguments) {
                    return Err(ApiError::InvalidRequest(
                        "online_score needs one of the pairs email/phone, first_name/last_name, gender/birthday".into(),
                    ));
                }
                let fields = OnlineScoreRequest::from_arguments(&request.arguments)?;
                let is_admin = request.is_admin(&self.auth.admin_login);
                let response =
                    handlers::online_score(store, self.scoring.as_ref(), &fields, is_admin).await?;
                context.extend(fields.context());
                Ok(response)
            }
            "clients_interests" => {
                let fields = ClientsInterestsRequest::from_arguments(&request.arguments)?;
                let response =
                    handlers::clients_interests(store, self.scoring.as_ref(), &fields.client_ids)
                        .await?;
                context.extend(fields.context());
                Ok(response)
            }
            other => Err(ApiError::InvalidRequest(format!("unknown method {other:?}"))),
        }
    }
}

/// JSON body sent back to the caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Success { response: Value, code: u16 },
    Failure { error: &'static str, code: u16 },
}

impl Envelope {
    pub fn code(&self) -> u16 {
        match self {
            Envelope::Success { code, .. } | Envelope::Failure { code, .. } => *code,
        }
    }
}

/// Wraps a dispatch outcome into the envelope and its status code.
pub fn respond(result: Result<Value>) -> (Envelope, StatusCode) {
    match result {
        Ok(response) => (
            Envelope::Success {
                response,
                code: StatusCode::OK.as_u16(),
            },
            StatusCode::OK,
        ),
        Err(err) => {
            let status = err.status();
            (
                Envelope::Failure {
                    error: err.message(),
                    code: status.as_u16(),
                },
                status,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::digest;
    use crate::scoring::CachedScoring;
    use chrono::Local;
    use serde_json::json;
    use std::time::Duration;
    use store::memory::MemoryBackend;

    fn make_dispatcher() -> Dispatcher {
        Dispatcher::new(AuthConfig::default(), Arc::new(CachedScoring))
    }

    fn make_store() -> ResilientStore {
        ResilientStore::new(Arc::new(MemoryBackend::new()), Duration::ZERO)
    }

    fn user_token(account: &str, login: &str) -> String {
        digest(&format!("{account}{login}{}", AuthConfig::default().salt))
    }

    fn admin_token() -> String {
        let auth = AuthConfig::default();
        digest(&format!("{}{}", Local::now().format("%Y%m%d%H"), auth.admin_salt))
    }

    fn body(method: &str, arguments: Value) -> Value {
        json!({
            "account": "horns&hoofs",
            "login": "h&f",
            "method": method,
            "token": user_token("horns&hoofs", "h&f"),
            "arguments": arguments,
        })
    }

    async fn call(body: &Value) -> (Result<Value>, Context) {
        let mut context = Context::new("test");
        let result = make_dispatcher()
            .dispatch(body, &mut context, &make_store())
            .await;
        (result, context)
    }

    #[tokio::test]
    async fn test_empty_body_is_invalid() {
        let (result, _) = call(&json!({})).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_bad_token_is_forbidden() {
        let mut request = body("online_score", json!({"email": "a@b", "phone": "79175002040"}));
        request["token"] = json!("sdd");
        let (result, _) = call(&request).await;
        assert!(matches!(result, Err(ApiError::Forbidden)));

        request["token"] = json!("");
        let (result, _) = call(&request).await;
        assert!(matches!(result, Err(ApiError::Forbidden)));
    }

    #[tokio::test]
    async fn test_online_score_needs_a_pair() {
        for arguments in [
            json!({"email": "a@b"}),
            json!({"phone": "79175002040", "first_name": "a"}),
            json!({"gender": 1, "first_name": "a"}),
            json!({}),
        ] {
            let (result, _) = call(&body("online_score", arguments.clone())).await;
            assert!(
                matches!(result, Err(ApiError::InvalidRequest(_))),
                "{arguments}"
            );
        }
    }

    #[tokio::test]
    async fn test_online_score_invalid_field() {
        let arguments = json!({"email": "a@b", "phone": "89175002040"});
        let (result, _) = call(&body("online_score", arguments)).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_online_score() {
        let arguments = json!({
            "phone": 79175002040_u64,
            "email": "stupnikov@otus.ru",
            "gender": 1,
            "birthday": "01.01.2000",
        });
        let (result, context) = call(&body("online_score", arguments)).await;
        assert_eq!(result.unwrap(), json!({"score": 4.5}));
        assert_eq!(
            context.get("has"),
            Some(&json!(["email", "phone", "birthday", "gender"]))
        );
        assert_eq!(context.get("request_id"), Some(&json!("test")));
    }

    #[tokio::test]
    async fn test_admin_score() {
        let request = json!({
            "account": "horns&hoofs",
            "login": "admin",
            "method": "online_score",
            "token": admin_token(),
            "arguments": {"first_name": "a", "last_name": "b"},
        });
        let (result, _) = call(&request).await;
        assert_eq!(result.unwrap(), json!({"score": 42}));
    }

    #[tokio::test]
    async fn test_clients_interests() {
        let arguments = json!({"client_ids": [1, 2, 3], "date": "19.07.2017"});
        let (result, context) = call(&body("clients_interests", arguments)).await;
        assert_eq!(result.unwrap(), json!({"1": [], "2": [], "3": []}));
        assert_eq!(context.get("nclients"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_clients_interests_invalid() {
        for arguments in [
            json!({}),
            json!({"client_ids": []}),
            json!({"client_ids": ["1", 2]}),
            json!({"client_ids": [1], "date": "2017.07.19"}),
        ] {
            let (result, _) = call(&body("clients_interests", arguments.clone())).await;
            assert!(
                matches!(result, Err(ApiError::InvalidRequest(_))),
                "{arguments}"
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (result, _) = call(&body("delete_everything", json!({}))).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[test]
    fn test_respond() {
        let (envelope, status) = respond(Ok(json!({"score": 1.5})));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"response": {"score": 1.5}, "code": 200})
        );

        let (envelope, status) = respond(Err(ApiError::Forbidden));
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(envelope.code(), 403);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"error": "Forbidden", "code": 403})
        );
    }

    #[test]
    fn test_context_display() {
        let mut context = Context::new("abc");
        context.extend(json!({"nclients": 2}));
        context.extend(json!([1, 2]));
        let rendered: Value = serde_json::from_str(&context.to_string()).unwrap();
        assert_eq!(rendered, json!({"request_id": "abc", "nclients": 2}));
    }
}
