use email_address::EmailAddress;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, AppResult};

/// A stored user record as returned to callers.
///
/// `id` is the backend-assigned key (integer primary key or document id),
/// always rendered as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub age: Option<i64>,
}

/// Payload for creating a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub age: Option<i64>,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>, age: Option<i64>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            age,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_email_field(&self.email)
    }
}

/// Partial update for a user.
///
/// Each field is present-or-absent: `None` means "leave unchanged",
/// `Some(None)` means the field was sent as an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserUpdate {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub age: Option<Option<i64>>,
}

impl UserUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(Some(name.into()));
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(Some(email.into()));
        self
    }

    pub fn age(mut self, age: i64) -> Self {
        self.age = Some(Some(age));
        self
    }

    pub fn clear_age(mut self) -> Self {
        self.age = Some(None);
        self
    }

    /// True when no field was supplied
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.age.is_none()
    }

    /// New email, if one was supplied
    pub fn new_email(&self) -> Option<&str> {
        self.email.as_ref().and_then(|e| e.as_deref())
    }

    /// Name and email are required columns and cannot be cleared.
    pub fn validate(&self) -> AppResult<()> {
        if matches!(self.name, Some(None)) {
            return Err(AppError::Validation("name cannot be null".to_string()));
        }
        match &self.email {
            Some(None) => Err(AppError::Validation("email cannot be null".to_string())),
            Some(Some(email)) => validate_email_field(email),
            None => Ok(()),
        }
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn validate_email_field(email: &str) -> AppResult<()> {
    if EmailAddress::is_valid(email) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "value is not a valid email address: {}",
            email
        )))
    }
}

/// Validate an email taken from a request path
pub fn validate_email_param(email: &str) -> AppResult<()> {
    if EmailAddress::is_valid(email) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid email format".to_string()))
    }
}
