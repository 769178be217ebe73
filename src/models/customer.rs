use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub complement: Option<String>,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub complement: Option<String>,
}

impl CreateCustomerRequest {
    pub fn validate(&self) -> Result<()> {
        let mut details = Vec::new();

        if self.name.trim().is_empty() {
            details.push("name is required".to_string());
        }
        if self.email.is_empty() || !self.email.contains('@') {
            details.push("email must be a valid address".to_string());
        }
        if self.password.len() < 6 {
            details.push("password must have at least 6 characters".to_string());
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(details))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub complement: Option<String>,
}
