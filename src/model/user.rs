//! User accounts. The password confirmation is checked here and never stored.

use crate::error::AppError;
use crate::model::schema::{ColumnDef, ColumnKind, EntitySchema};
use crate::service::validation::Violations;
use crate::sql::FieldValue;
use serde::Deserialize;

pub static USER_SCHEMA: EntitySchema = EntitySchema {
    table: "users",
    columns: &[
        ColumnDef::new("id", ColumnKind::Uuid),
        ColumnDef::new("username", ColumnKind::Text),
        ColumnDef::new("email", ColumnKind::Text),
        ColumnDef::new("photo", ColumnKind::Text),
        ColumnDef::new("password", ColumnKind::Text).hidden(),
    ],
    visibility: None,
    default_sort: None,
};

pub const PASSWORD_MIN: usize = 8;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

/// A validated signup; `password` is still plaintext and must be hashed before storage.
#[derive(Clone, Debug, PartialEq)]
pub struct UserRecord {
    pub username: Option<String>,
    pub email: String,
    pub photo: Option<String>,
    pub password: String,
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn check_email(v: &mut Violations, email: &str) {
    v.email("email", email, "Please provide a valid email");
}

impl NewUser {
    pub fn validate(self) -> Result<UserRecord, AppError> {
        let mut v = Violations::new();
        let email = v
            .require_text("email", self.email.as_deref(), "A user must have an email")
            .map(|e| normalize_email(&e));
        if let Some(email) = &email {
            check_email(&mut v, email);
        }
        let password = v.require(
            "password",
            self.password.filter(|p| !p.is_empty()),
            "A user must have a password",
        );
        if let Some(password) = &password {
            if password.chars().count() < PASSWORD_MIN {
                v.push("password", "Password must be at least 8 characters");
            }
        }
        match self.password_confirmation.filter(|c| !c.is_empty()) {
            None => v.push("passwordConfirmation", "Please confirm your password"),
            Some(confirmation) => {
                if password.as_deref() != Some(confirmation.as_str()) {
                    v.push("passwordConfirmation", "Passwords are not the same");
                }
            }
        }
        v.finish()?;
        match (email, password) {
            (Some(email), Some(password)) => Ok(UserRecord {
                username: self.username.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
                email,
                photo: self.photo,
                password,
            }),
            _ => Err(AppError::Internal("validated user is incomplete".into())),
        }
    }
}

impl UserRecord {
    /// Column values for insert, with the password replaced by its hash.
    pub fn fields(&self, password_hash: &str) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("username", self.username.clone().into()),
            ("email", FieldValue::Text(self.email.clone())),
            ("photo", self.photo.clone().into()),
            ("password", FieldValue::Text(password_hash.to_string())),
        ]
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

impl UserPatch {
    pub fn validate(mut self) -> Result<Self, AppError> {
        if self.password.is_some() || self.password_confirmation.is_some() {
            return Err(AppError::bad_request("This route is not for password updates."));
        }
        let mut v = Violations::new();
        if let Some(raw) = self.email.take() {
            let email = normalize_email(&raw);
            check_email(&mut v, &email);
            self.email = Some(email);
        }
        v.finish()?;
        Ok(self)
    }

    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut out = Vec::new();
        if let Some(s) = &self.username {
            out.push(("username", FieldValue::Text(s.trim().to_string())));
        }
        if let Some(s) = &self.email {
            out.push(("email", FieldValue::Text(s.clone())));
        }
        if let Some(s) = &self.photo {
            out.push(("photo", FieldValue::Text(s.clone())));
        }
        out
    }
}

/// Login body. Both fields are checked for presence by the handler.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Lowercased email and password, when both are present and non-empty.
    pub fn complete(&self) -> Option<(String, &str)> {
        let email = self.email.as_deref().map(normalize_email).filter(|e| !e.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((email, password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup() -> NewUser {
        NewUser {
            username: Some("ada".into()),
            email: Some("  Ada@Example.COM ".into()),
            photo: None,
            password: Some("correct horse".into()),
            password_confirmation: Some("correct horse".into()),
        }
    }

    #[test]
    fn lowercases_email() {
        let record = signup().validate().unwrap();
        assert_eq!(record.email, "ada@example.com");
    }

    #[test]
    fn confirmation_must_match() {
        let user = NewUser {
            password_confirmation: Some("correct horsE".into()),
            ..signup()
        };
        match user.validate() {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].message, "Passwords are not the same");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn short_password_and_bad_email_reported_together() {
        let user = NewUser {
            email: Some("not-an-email".into()),
            password: Some("short".into()),
            password_confirmation: Some("short".into()),
            ..signup()
        };
        match user.validate() {
            Err(AppError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "password"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn hash_replaces_plaintext_in_fields() {
        let record = signup().validate().unwrap();
        let fields = record.fields("$argon2id$stub");
        assert!(fields.contains(&("password", FieldValue::Text("$argon2id$stub".into()))));
        assert!(!fields.iter().any(|(_, v)| *v == FieldValue::Text("correct horse".into())));
    }

    #[test]
    fn patch_refuses_password_changes() {
        let patch = UserPatch {
            password: Some("new password".into()),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(AppError::Operational { .. })));
    }

    #[test]
    fn credentials_require_both_fields() {
        let missing = Credentials {
            email: Some("ada@example.com".into()),
            password: Some(String::new()),
        };
        assert!(missing.complete().is_none());
        let full = Credentials {
            email: Some("ADA@example.com".into()),
            password: Some("pw".into()),
        };
        assert_eq!(full.complete(), Some(("ada@example.com".to_string(), "pw")));
    }
}
