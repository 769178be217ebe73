use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub use_in_menu: bool,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CategoryJson {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub use_in_menu: bool,
}

impl From<Category> for CategoryJson {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            slug: category.slug,
            use_in_menu: category.use_in_menu,
        }
    }
}

impl CategoryJson {
    /// Applies the `fields` projection for the category listing.
    pub fn project(&self, fields: &[String]) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)
            .map_err(|e| AppError::InternalError(format!("Serialization failed: {}", e)))?;

        if let serde_json::Value::Object(map) = &mut value {
            map.retain(|key, _| fields.iter().any(|f| f == key));
        }

        Ok(value)
    }
}

#[derive(Debug, Serialize)]
pub struct CategorySearchResponse {
    pub data: Vec<serde_json::Value>,
    pub total: i64,
    pub limit: i64,
    pub page: i64,
}

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub use_in_menu: Option<bool>,
}

/// Validated category write request.
#[derive(Debug)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub use_in_menu: bool,
}

impl CategoryPayload {
    pub fn validate(self) -> Result<NewCategory> {
        let mut details = Vec::new();

        let name = match self.name {
            Some(ref n) if !n.trim().is_empty() => Some(n.trim().to_string()),
            Some(_) => {
                details.push("name must not be empty".to_string());
                None
            }
            None => {
                details.push("name is required".to_string());
                None
            }
        };

        let slug = match self.slug {
            Some(ref s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(_) => {
                details.push("slug must not be empty".to_string());
                None
            }
            None => {
                details.push("slug is required".to_string());
                None
            }
        };

        match (name, slug) {
            (Some(name), Some(slug)) => Ok(NewCategory {
                name,
                slug,
                use_in_menu: self.use_in_menu.unwrap_or(false),
            }),
            _ => Err(AppError::ValidationError(details)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_name_and_slug() {
        let payload = CategoryPayload {
            name: None,
            slug: Some("shoes".to_string()),
            use_in_menu: None,
        };

        let err = payload.validate().unwrap_err();
        match err {
            AppError::ValidationError(details) => {
                assert_eq!(details, vec!["name is required".to_string()]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn collects_all_failures() {
        let payload = CategoryPayload {
            name: Some("  ".to_string()),
            slug: None,
            use_in_menu: None,
        };

        match payload.validate().unwrap_err() {
            AppError::ValidationError(details) => assert_eq!(details.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn use_in_menu_defaults_to_false() {
        let payload = CategoryPayload {
            name: Some("Shoes".to_string()),
            slug: Some("shoes".to_string()),
            use_in_menu: None,
        };

        assert!(!payload.validate().unwrap().use_in_menu);
    }
}
