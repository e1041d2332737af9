//! The request schemas and their typed, bound forms.
use crate::fields::{Field, FieldKind, Gender, is_empty, parse_date, phone_text};
use crate::schema::{BindError, Schema, value_text};
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::sync::LazyLock;

pub static METHOD_REQUEST: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("MethodRequest")
        .with("account", Field::new(FieldKind::Char))
        .with("login", Field::new(FieldKind::Char).required())
        .with("token", Field::new(FieldKind::Char).required())
        .with("arguments", Field::new(FieldKind::Arguments).required())
        .with("method", Field::new(FieldKind::Char).required().not_nullable())
});

pub static ONLINE_SCORE_REQUEST: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("OnlineScoreRequest")
        .with("first_name", Field::new(FieldKind::Char))
        .with("last_name", Field::new(FieldKind::Char))
        .with("email", Field::new(FieldKind::Email))
        .with("phone", Field::new(FieldKind::Phone))
        .with("birthday", Field::new(FieldKind::Birthday))
        .with("gender", Field::new(FieldKind::Gender))
});

pub static CLIENTS_INTERESTS_REQUEST: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("ClientsInterestsRequest")
        .with(
            "client_ids",
            Field::new(FieldKind::ClientIds).required().not_nullable(),
        )
        .with("date", Field::new(FieldKind::Date))
});

/// At least one of these pairs must be fully present for online scoring.
pub const SCORE_FIELD_PAIRS: [(&str, &str); 3] = [
    ("email", "phone"),
    ("first_name", "last_name"),
    ("gender", "birthday"),
];

#[derive(Clone, Debug, PartialEq)]
pub struct MethodRequest {
    pub account: Option<String>,
    /// Taken verbatim from the body, independent of field typing.
    pub login: Option<String>,
    pub token: Option<String>,
    pub arguments: Value,
    pub method: String,
}

impl MethodRequest {
    pub fn from_body(body: &Value) -> Result<Self, BindError> {
        let bound = METHOD_REQUEST.bind(body)?;
        let login = body.get("login").filter(|v| !v.is_null()).map(value_text);

        Ok(MethodRequest {
            account: bound.raw("account").filter(|v| !v.is_null()).map(value_text),
            login,
            token: bound.raw("token").filter(|v| !v.is_null()).map(value_text),
            arguments: bound.raw("arguments").cloned().unwrap_or(Value::Null),
            method: bound.text("method").unwrap_or_default(),
        })
    }

    pub fn is_admin(&self, admin_login: &str) -> bool {
        self.login.as_deref() == Some(admin_login)
    }
}

/// True when `arguments` carries both fields of at least one scoring pair.
pub fn has_score_pair(arguments: &Value) -> bool {
    let present = |name: &str| arguments.get(name).is_some_and(|v| !is_empty(v));
    SCORE_FIELD_PAIRS
        .iter()
        .any(|&(a, b)| present(a) && present(b))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OnlineScoreRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<Gender>,
    has: Vec<&'static str>,
}

impl OnlineScoreRequest {
    pub fn from_arguments(arguments: &Value) -> Result<Self, BindError> {
        let bound = ONLINE_SCORE_REQUEST.bind(arguments)?;

        Ok(OnlineScoreRequest {
            first_name: bound.text("first_name"),
            last_name: bound.text("last_name"),
            email: bound.text("email"),
            phone: bound.get("phone").and_then(phone_text),
            birthday: bound.get("birthday").and_then(parse_date),
            gender: bound
                .get("gender")
                .and_then(Value::as_i64)
                .and_then(|g| Gender::try_from(g).ok()),
            has: bound.present(),
        })
    }

    /// Names of the fields supplied with a value.
    pub fn has(&self) -> &[&'static str] {
        &self.has
    }

    pub fn is_empty(&self) -> bool {
        self.has.is_empty()
    }

    pub fn context(&self) -> Value {
        json!({ "has": self.has })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClientsInterestsRequest {
    pub client_ids: Vec<i64>,
    pub date: Option<NaiveDate>,
}

impl ClientsInterestsRequest {
    pub fn from_arguments(arguments: &Value) -> Result<Self, BindError> {
        let bound = CLIENTS_INTERESTS_REQUEST.bind(arguments)?;

        let client_ids = bound
            .get("client_ids")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default();

        Ok(ClientsInterestsRequest {
            client_ids,
            date: bound.get("date").and_then(parse_date),
        })
    }

    pub fn context(&self) -> Value {
        json!({ "nclients": self.client_ids.len() })
    }
}
