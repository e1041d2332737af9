//! Field descriptors: stateless rules describing how one request attribute
//! is validated.
use chrono::{Local, NaiveDate};
use serde_json::Value;

pub const DATE_FORMAT: &str = "%d.%m.%Y";

const PHONE_LEN: usize = 11;
const PHONE_PREFIX: char = '7';
const MAX_AGE_DAYS: i64 = 365 * 70;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Char,
    Arguments,
    Email,
    Phone,
    Date,
    Birthday,
    Gender,
    ClientIds,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Unknown = 0,
    Male = 1,
    Female = 2,
}

impl TryFrom<i64> for Gender {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Gender::Unknown),
            1 => Ok(Gender::Male),
            2 => Ok(Gender::Female),
            other => Err(other),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
    /// Upper bound on the numeric value, or on the length of strings,
    /// lists and objects.
    pub max: Option<f64>,
}

impl Field {
    /// Optional and nullable, without a bound.
    pub const fn new(kind: FieldKind) -> Self {
        Field {
            kind,
            required: false,
            nullable: true,
            max: None,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn not_nullable(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// `None` stands for an attribute the caller did not supply.
    pub fn validate(&self, value: Option<&Value>) -> bool {
        let value = value.filter(|v| !v.is_null());
        let empty = value.is_none_or(is_empty);

        if (value.is_none() && self.required) || (empty && !self.nullable) {
            return false;
        }
        if let (Some(max), Some(measure)) = (self.max, value.and_then(measure))
            && measure > max
        {
            return false;
        }

        match value {
            None => true,
            // an empty id list is never acceptable
            Some(_) if empty && self.kind != FieldKind::ClientIds => true,
            Some(v) => self.kind.check(v),
        }
    }
}

impl FieldKind {
    fn check(self, value: &Value) -> bool {
        match self {
            FieldKind::Char | FieldKind::Arguments => true,
            FieldKind::Email => value.as_str().is_some_and(|s| s.contains('@')),
            FieldKind::Phone => phone_text(value)
                .is_some_and(|p| p.chars().count() == PHONE_LEN && p.starts_with(PHONE_PREFIX)),
            FieldKind::Date => parse_date(value).is_some(),
            FieldKind::Birthday => parse_date(value).is_some_and(within_age_limit),
            FieldKind::Gender => value
                .as_i64()
                .is_some_and(|g| Gender::try_from(g).is_ok()),
            FieldKind::ClientIds => value
                .as_array()
                .is_some_and(|ids| !ids.is_empty() && ids.iter().all(|id| id.as_i64().is_some())),
        }
    }
}

/// Null, or an empty string, list or object.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn measure(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Array(a) => Some(a.len() as f64),
        Value::Object(o) => Some(o.len() as f64),
        Value::Null | Value::Bool(_) => None,
    }
}

/// Phones arrive either as text or as a bare integer.
pub fn phone_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Parses `DD.MM.YYYY`.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?;
    if text.split('.').count() != 3 {
        return None;
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok()
}

fn within_age_limit(birthday: NaiveDate) -> bool {
    let today = Local::now().date_naive();
    today.signed_duration_since(birthday).num_days() <= MAX_AGE_DAYS
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use serde_json::json;

    const ALL_KINDS: [FieldKind; 8] = [
        FieldKind::Char,
        FieldKind::Arguments,
        FieldKind::Email,
        FieldKind::Phone,
        FieldKind::Date,
        FieldKind::Birthday,
        FieldKind::Gender,
        FieldKind::ClientIds,
    ];

    #[test]
    fn test_null_acceptance() {
        for kind in ALL_KINDS {
            let optional = Field::new(kind);
            assert!(optional.validate(None), "{kind:?}");
            assert!(optional.validate(Some(&Value::Null)), "{kind:?}");

            assert!(!optional.clone().required().validate(Some(&Value::Null)));
            assert!(!optional.clone().not_nullable().validate(None));
            assert!(!optional.required().not_nullable().validate(None));
        }
    }

    #[test]
    fn test_required_but_nullable_accepts_empty_string() {
        let field = Field::new(FieldKind::Char).required();
        assert!(field.validate(Some(&json!(""))));
        assert!(!field.validate(None));

        let field = Field::new(FieldKind::Char).required().not_nullable();
        assert!(!field.validate(Some(&json!(""))));
        assert!(field.validate(Some(&json!("online_score"))));
    }

    #[test]
    fn test_max_bound() {
        let field = Field::new(FieldKind::Char).max(3.0);
        assert!(field.validate(Some(&json!("abc"))));
        assert!(!field.validate(Some(&json!("abcd"))));
        assert!(field.validate(Some(&json!(3))));
        assert!(!field.validate(Some(&json!(4))));
    }

    #[test]
    fn test_email() {
        let field = Field::new(FieldKind::Email);
        assert!(field.validate(Some(&json!("x@y"))));
        assert!(!field.validate(Some(&json!("xy"))));
        assert!(!field.validate(Some(&json!(1))));
        assert!(field.validate(Some(&json!(""))));
    }

    #[test]
    fn test_phone() {
        let field = Field::new(FieldKind::Phone);
        assert!(field.validate(Some(&json!("79123456789"))));
        assert!(field.validate(Some(&json!(79123456789u64))));
        assert!(!field.validate(Some(&json!("89123456789"))));
        assert!(!field.validate(Some(&json!("7912345678"))));
        assert!(!field.validate(Some(&json!(7.9))));
        assert!(!field.validate(Some(&json!(["79123456789"]))));
    }

    #[test]
    fn test_date() {
        let field = Field::new(FieldKind::Date);
        assert!(field.validate(Some(&json!("01.02.2020"))));
        assert!(field.validate(Some(&json!("31.12.1900"))));
        assert!(!field.validate(Some(&json!("2020.02.01"))));
        assert!(!field.validate(Some(&json!("32.01.2020"))));
        assert!(!field.validate(Some(&json!("01.13.2020"))));
        assert!(!field.validate(Some(&json!("01.02"))));
        assert!(!field.validate(Some(&json!(20200201))));
    }

    #[test]
    fn test_birthday() {
        let field = Field::new(FieldKind::Birthday);
        assert!(field.validate(Some(&json!("01.01.2000"))));
        assert!(!field.validate(Some(&json!("01.01.1890"))));

        let year = Local::now().year();
        let just_over = format!("01.01.{}", year - 71);
        assert!(!field.validate(Some(&json!(just_over))));
        let within = format!("01.01.{}", year - 69);
        assert!(field.validate(Some(&json!(within))));
    }

    #[test]
    fn test_gender() {
        let field = Field::new(FieldKind::Gender);
        for g in [0, 1, 2] {
            assert!(field.validate(Some(&json!(g))));
        }
        assert!(!field.validate(Some(&json!(3))));
        assert!(!field.validate(Some(&json!(-1))));
        assert!(!field.validate(Some(&json!("1"))));
        assert!(!field.validate(Some(&json!(1.0))));
    }

    #[test]
    fn test_client_ids() {
        let field = Field::new(FieldKind::ClientIds).required().not_nullable();
        assert!(field.validate(Some(&json!([1, 2, 3]))));
        assert!(!field.validate(Some(&json!([]))));
        assert!(!field.validate(Some(&json!([1, "2"]))));
        assert!(!field.validate(Some(&json!([1.5]))));
        assert!(!field.validate(Some(&json!({"1": 2}))));
        assert!(!field.validate(Some(&json!("1,2"))));

        // even a nullable id list rejects an empty list
        assert!(!Field::new(FieldKind::ClientIds).validate(Some(&json!([]))));
    }
}
