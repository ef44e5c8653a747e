// Request bodies and their field-level validation.
// Fields arrive as raw JSON values so a wrong type is reported against its
// field instead of failing the whole body. Unknown keys (`user`, `id`,
// `image`, ...) are ignored by serde.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

use crate::config::SecurityConfig;
use crate::database::models::{RecipeChanges, RecipeDraft};
use crate::error::{ApiError, FieldErrors};

pub const MAX_NAME_LENGTH: usize = 255;
const MAX_PRICE_DIGITS: u32 = 5;
const PRICE_DECIMAL_PLACES: u32 = 2;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_A_STRING: &str = "Not a valid string.";
const MIN_ZERO: &str = "Ensure this value is greater than or equal to 0.";

fn too_long() -> String {
    format!("Ensure this field has no more than {} characters.", MAX_NAME_LENGTH)
}

/// JSON type as named in "got type" messages
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Text from a JSON string or number
fn text_value(value: &Value) -> Result<String, &'static str> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Err(NOT_NULL),
        _ => Err(NOT_A_STRING),
    }
}

/// Raw text of an optional field; `None` when absent or when a message was recorded
fn field_text(errors: &mut FieldErrors, field: &str, value: Option<Value>, required: bool) -> Option<String> {
    match value {
        None => {
            if required {
                errors.add(field, REQUIRED);
            }
            None
        }
        Some(value) => match text_value(&value) {
            Ok(text) => Some(text),
            Err(message) => {
                errors.add(field, message);
                None
            }
        },
    }
}

/// Trimmed, non-blank, bounded text. `None` when a message was recorded.
fn clean_text(errors: &mut FieldErrors, field: &str, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        errors.add(field, too_long());
        return None;
    }
    Some(value.to_string())
}

/// `local@domain.tld` with the domain lowercased
pub fn normalize_email(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let (local, domain) = raw.rsplit_once('@')?;
    let valid = !local.is_empty()
        && !domain.is_empty()
        && !raw.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@')
        && raw.len() <= MAX_NAME_LENGTH;
    valid.then(|| format!("{}@{}", local, domain.to_lowercase()))
}

/// Non-negative, at most 2 decimal places and 5 digits; accepts a JSON
/// string or number. Returned with scale 2.
pub fn parse_price(value: &Value) -> Result<Decimal, &'static str> {
    const INVALID: &str = "A valid number is required.";
    let parsed = match value {
        Value::String(s) => Decimal::from_str(s.trim()).map_err(|_| INVALID)?,
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map_err(|_| INVALID)?,
        Value::Null => return Err(NOT_NULL),
        _ => return Err(INVALID),
    };
    let normalized = parsed.normalize();
    if normalized.is_sign_negative() && !normalized.is_zero() {
        return Err(MIN_ZERO);
    }
    if normalized.scale() > PRICE_DECIMAL_PLACES {
        return Err("Ensure that there are no more than 2 decimal places.");
    }
    if normalized.abs() >= Decimal::from(10i64.pow(MAX_PRICE_DIGITS - PRICE_DECIMAL_PLACES)) {
        return Err("Ensure that there are no more than 5 digits in total.");
    }
    let mut price = normalized.abs();
    price.rescale(PRICE_DECIMAL_PLACES);
    Ok(price)
}

/// Non-negative whole minutes from a JSON integer, a whole float or an integer string
pub fn parse_minutes(value: &Value) -> Result<i32, &'static str> {
    const INVALID: &str = "A valid integer is required.";
    const TOO_LARGE: &str = "Ensure this value is less than or equal to 2147483647.";
    let minutes = match value {
        Value::Number(n) => match n.as_i64() {
            Some(minutes) => minutes,
            None => {
                let f = n.as_f64().ok_or(INVALID)?;
                if f.fract() != 0.0 {
                    return Err(INVALID);
                }
                if f < 0.0 {
                    return Err(MIN_ZERO);
                }
                if f > f64::from(i32::MAX) {
                    return Err(TOO_LARGE);
                }
                f as i64
            }
        },
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| INVALID)?,
        Value::Null => return Err(NOT_NULL),
        _ => return Err(INVALID),
    };
    if minutes < 0 {
        return Err(MIN_ZERO);
    }
    i32::try_from(minutes).map_err(|_| TOO_LARGE)
}

/// Empty, or an absolute http(s) URL
pub fn clean_link(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(String::new());
    }
    if raw.chars().count() > MAX_NAME_LENGTH {
        return Err(too_long());
    }
    match url::Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(raw.to_string()),
        _ => Err("Enter a valid URL.".to_string()),
    }
}

/// Keeps an explicit `null` as `Some(Value::Null)` so it is reported, not treated as absent
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

// Users

#[derive(Debug, Default, Deserialize)]
pub struct UserPayload {
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub password: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
}

/// Registration input that passed validation; password still plaintext
#[derive(Debug)]
pub struct ValidUser {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Profile update that passed validation
#[derive(Debug, Default)]
pub struct ValidProfile {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl UserPayload {
    pub fn new(email: impl Into<String>, password: impl Into<String>, name: Option<String>) -> Self {
        Self {
            email: Some(Value::String(email.into())),
            password: Some(Value::String(password.into())),
            name: name.map(Value::String),
        }
    }

    /// `required` makes email and password mandatory (registration, PUT)
    pub fn validate(self, security: &SecurityConfig, required: bool) -> Result<ValidProfile, ApiError> {
        let mut errors = FieldErrors::new();

        let email = match field_text(&mut errors, "email", self.email, required) {
            None => None,
            Some(raw) if raw.trim().is_empty() => {
                errors.add("email", BLANK);
                None
            }
            Some(raw) => {
                let email = normalize_email(&raw);
                if email.is_none() {
                    errors.add("email", "Enter a valid email address.");
                }
                email
            }
        };

        let password = match field_text(&mut errors, "password", self.password, required) {
            None => None,
            Some(password) if password.is_empty() => {
                errors.add("password", BLANK);
                None
            }
            Some(password) if password.chars().count() < security.min_password_length => {
                errors.add(
                    "password",
                    format!(
                        "Ensure this field has at least {} characters.",
                        security.min_password_length
                    ),
                );
                None
            }
            Some(password) => Some(password),
        };

        let name = match field_text(&mut errors, "name", self.name, false) {
            Some(name) if name.trim().chars().count() > MAX_NAME_LENGTH => {
                errors.add("name", too_long());
                None
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };

        errors.into_result()?;
        Ok(ValidProfile { email, password, name })
    }

    pub fn validate_new(self, security: &SecurityConfig) -> Result<ValidUser, ApiError> {
        let profile = self.validate(security, true)?;
        Ok(ValidUser {
            email: profile.email.unwrap_or_default(),
            password: profile.password.unwrap_or_default(),
            name: profile.name.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenPayload {
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub password: Option<Value>,
}

impl TokenPayload {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(Value::String(email.into())),
            password: Some(Value::String(password.into())),
        }
    }

    /// Both fields present and non-blank; the email is normalized for lookup
    pub fn validate(self) -> Result<(String, String), ApiError> {
        let mut errors = FieldErrors::new();
        let email = match field_text(&mut errors, "email", self.email, true) {
            None => None,
            Some(raw) if raw.trim().is_empty() => {
                errors.add("email", BLANK);
                None
            }
            Some(raw) => Some(normalize_email(&raw).unwrap_or_else(|| raw.trim().to_string())),
        };
        let password = match field_text(&mut errors, "password", self.password, true) {
            Some(p) if p.is_empty() => {
                errors.add("password", BLANK);
                None
            }
            other => other,
        };
        errors.into_result()?;
        Ok((email.unwrap_or_default(), password.unwrap_or_default()))
    }
}

// Tags and ingredients

#[derive(Debug, Default, Deserialize)]
pub struct AttrPayload {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
}

impl AttrPayload {
    /// `required` is PUT. A PATCH without `name` yields `None`: nothing to change.
    pub fn validate(self, required: bool) -> Result<Option<String>, ApiError> {
        let mut errors = FieldErrors::new();
        let name = field_text(&mut errors, "name", self.name, required);
        let name = name.and_then(|name| clean_text(&mut errors, "name", &name));
        errors.into_result()?;
        Ok(name)
    }
}

// Recipes

#[derive(Debug, Default, Deserialize)]
pub struct RecipePayload {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub time_minutes: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub price: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub link: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub tags: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub ingredients: Option<Value>,
}

/// Names of a nested `[{"name": ...}, ...]` list
fn clean_names(errors: &mut FieldErrors, field: &str, value: Option<Value>) -> Option<Vec<String>> {
    let entries = match value? {
        Value::Array(entries) => entries,
        Value::Null => {
            errors.add(field, NOT_NULL);
            return None;
        }
        other => {
            errors.add(
                field,
                format!("Expected a list of items but got type \"{}\".", type_name(&other)),
            );
            return None;
        }
    };
    let mut names = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.get("name") {
            None | Some(Value::Null) => errors.add(field, "Each entry requires a name."),
            Some(name) => match text_value(name) {
                Ok(name) => {
                    if let Some(name) = clean_text(errors, field, &name) {
                        names.push(name);
                    }
                }
                Err(message) => errors.add(field, message),
            },
        }
    }
    Some(names)
}

impl RecipePayload {
    /// `required` enforces title, time_minutes and price (create, PUT);
    /// absent optional fields are left unchanged
    pub fn validate(self, required: bool) -> Result<RecipeChanges, ApiError> {
        let mut errors = FieldErrors::new();

        let title = field_text(&mut errors, "title", self.title, required);
        let title = title.and_then(|title| clean_text(&mut errors, "title", &title));

        let description = field_text(&mut errors, "description", self.description, false);

        let time_minutes = match self.time_minutes {
            None => {
                if required {
                    errors.add("time_minutes", REQUIRED);
                }
                None
            }
            Some(value) => match parse_minutes(&value) {
                Ok(minutes) => Some(minutes),
                Err(message) => {
                    errors.add("time_minutes", message);
                    None
                }
            },
        };

        let price = match self.price {
            None => {
                if required {
                    errors.add("price", REQUIRED);
                }
                None
            }
            Some(value) => match parse_price(&value) {
                Ok(price) => Some(price),
                Err(message) => {
                    errors.add("price", message);
                    None
                }
            },
        };

        let link = match field_text(&mut errors, "link", self.link, false).as_deref().map(clean_link) {
            None => None,
            Some(Ok(link)) => Some(link),
            Some(Err(message)) => {
                errors.add("link", message);
                None
            }
        };

        let tags = clean_names(&mut errors, "tags", self.tags);
        let ingredients = clean_names(&mut errors, "ingredients", self.ingredients);

        errors.into_result()?;
        Ok(RecipeChanges {
            title,
            description,
            time_minutes,
            price,
            link,
            tags,
            ingredients,
        })
    }

    pub fn into_draft(self) -> Result<RecipeDraft, ApiError> {
        let changes = self.validate(true)?;
        Ok(RecipeDraft {
            title: changes.title.unwrap_or_default(),
            description: changes.description.unwrap_or_default(),
            time_minutes: changes.time_minutes.unwrap_or_default(),
            price: changes.price.unwrap_or_default(),
            link: changes.link.unwrap_or_default(),
            tags: changes.tags.unwrap_or_default(),
            ingredients: changes.ingredients.unwrap_or_default(),
        })
    }
}
