use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub firstname: String,
    pub surname: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserJson {
    pub id: i32,
    pub firstname: String,
    pub surname: String,
    pub email: String,
}

impl From<User> for UserJson {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            firstname: user.firstname,
            surname: user.surname,
            email: user.email,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub firstname: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        let mut details = Vec::new();

        if self.firstname.trim().len() < 2 {
            details.push("firstname must have at least 2 characters".to_string());
        }
        if self.surname.trim().len() < 2 {
            details.push("surname must have at least 2 characters".to_string());
        }
        if self.email.is_empty() || !self.email.contains('@') {
            details.push("email must be a valid address".to_string());
        }
        if self.password.len() < 6 {
            details.push("password must have at least 6 characters".to_string());
        }
        if self.password != self.confirm_password {
            details.push("passwords do not match".to_string());
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(details))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub firstname: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            firstname: "Ana".to_string(),
            surname: "Souza".to_string(),
            email: "ana@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn mismatched_passwords_rejected() {
        let mut req = request();
        req.confirm_password = "different".to_string();

        match req.validate().unwrap_err() {
            AppError::ValidationError(details) => {
                assert!(details.contains(&"passwords do not match".to_string()));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn short_password_rejected() {
        let mut req = request();
        req.password = "abc".to_string();
        req.confirm_password = "abc".to_string();

        assert!(req.validate().is_err());
    }
}
