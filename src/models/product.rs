use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub const MAX_IMAGES_PER_PRODUCT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i32,
    pub enabled: bool,
    pub name: String,
    pub slug: String,
    pub stock: i32,
    pub description: String,
    pub price: Decimal,
    pub price_with_discount: Option<Decimal>,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: i32,
    #[serde(skip_serializing)]
    pub product_id: i32,
    pub path: String,
}

/// Raw `options` row; `values` holds the serialized JSON array exactly as
/// stored. It is re-expanded into a list before leaving the API.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OptionRow {
    pub id: i32,
    pub product_id: i32,
    pub title: String,
    pub shape: String,
    pub radius: i32,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub values: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductOption {
    pub id: i32,
    pub title: String,
    pub shape: String,
    pub radius: i32,
    #[serde(rename = "type")]
    pub kind: String,
    pub values: Vec<String>,
}

impl From<OptionRow> for ProductOption {
    fn from(row: OptionRow) -> Self {
        // Stored as a JSON array; a row that predates that encoding is kept
        // as a single literal value rather than failing the whole read.
        let values = serde_json::from_str::<Vec<String>>(&row.values)
            .unwrap_or_else(|_| vec![row.values.clone()]);

        Self {
            id: row.id,
            title: row.title,
            shape: row.shape,
            radius: row.radius,
            kind: row.kind,
            values,
        }
    }
}

/// Flat response contract: base fields plus nested images/options and the
/// bare category id list (nested category rows are discarded).
#[derive(Debug, Serialize)]
pub struct ProductJson {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
    pub options: Vec<ProductOption>,
    pub category_ids: Vec<i32>,
}

impl ProductJson {
    /// Applies the `fields` projection: base attributes not in the allow-list
    /// are dropped; the association keys always survive.
    pub fn project(&self, fields: &[String]) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)
            .map_err(|e| AppError::InternalError(format!("Serialization failed: {}", e)))?;

        if let serde_json::Value::Object(map) = &mut value {
            map.retain(|key, _| {
                matches!(key.as_str(), "images" | "options" | "category_ids")
                    || fields.iter().any(|f| f == key)
            });
        }

        Ok(value)
    }
}

#[derive(Debug, Serialize)]
pub struct ProductSearchResponse {
    pub data: Vec<serde_json::Value>,
    pub total: i64,
    pub limit: i64,
    pub page: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionShape {
    Square,
    Circle,
}

impl OptionShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionShape::Square => "square",
            OptionShape::Circle => "circle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Text,
    Color,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Text => "text",
            OptionKind::Color => "color",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OptionPayload {
    pub title: Option<String>,
    pub shape: Option<OptionShape>,
    pub radius: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<OptionKind>,
    pub values: Option<serde_json::Value>,
}

/// Validated option ready for insertion.
#[derive(Debug, Clone)]
pub struct NewOption {
    pub title: String,
    pub shape: OptionShape,
    pub radius: i32,
    pub kind: OptionKind,
    pub values: Vec<String>,
}

impl NewOption {
    pub fn serialized_values(&self) -> Result<String> {
        serde_json::to_string(&self.values)
            .map_err(|e| AppError::InternalError(format!("Serialization failed: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProductPayload {
    pub enabled: Option<bool>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub stock: Option<i32>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub price_with_discount: Option<Decimal>,
    pub category_ids: Option<serde_json::Value>,
    pub images: Option<serde_json::Value>,
    pub options: Option<serde_json::Value>,
}

/// Fully validated create request; no persistence call happens before a
/// payload has been turned into one of these.
#[derive(Debug)]
pub struct NewProduct {
    pub enabled: bool,
    pub name: String,
    pub slug: Option<String>,
    pub stock: i32,
    pub description: String,
    pub price: Decimal,
    pub price_with_discount: Option<Decimal>,
    pub category_ids: Vec<i32>,
    pub images: Vec<String>,
    pub options: Vec<NewOption>,
}

impl CreateProductPayload {
    pub fn validate(self) -> Result<NewProduct> {
        let name = match self.name {
            Some(ref n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => return Err(AppError::BadRequest("Name is required".to_string())),
        };

        let price = self.price.unwrap_or_default();
        let stock = self.stock.unwrap_or(0);
        check_numeric_invariants(price, self.price_with_discount, stock)?;

        let category_ids = match self.category_ids {
            Some(value) => parse_category_ids(&value)?,
            None => Vec::new(),
        };

        let images = match self.images {
            Some(value) => parse_images(&value)?,
            None => Vec::new(),
        };

        let options = match self.options {
            Some(value) => parse_options(&value)?,
            None => Vec::new(),
        };

        Ok(NewProduct {
            enabled: self.enabled.unwrap_or(true),
            name,
            slug: self.slug.filter(|s| !s.trim().is_empty()),
            stock,
            description: self.description.unwrap_or_default(),
            price,
            price_with_discount: self.price_with_discount,
            category_ids,
            images,
            options,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductPayload {
    pub enabled: Option<bool>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub stock: Option<i32>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub price_with_discount: Option<Decimal>,
    pub category_ids: Option<serde_json::Value>,
    pub images: Option<serde_json::Value>,
    pub options: Option<serde_json::Value>,
}

/// Validated partial update; `None` means "leave unchanged", and `None`
/// association lists leave the existing rows in place.
#[derive(Debug)]
pub struct ProductChanges {
    pub enabled: Option<bool>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub stock: Option<i32>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub price_with_discount: Option<Decimal>,
    pub category_ids: Option<Vec<i32>>,
    pub images: Option<Vec<String>>,
    pub options: Option<Vec<NewOption>>,
}

impl UpdateProductPayload {
    pub fn validate(self) -> Result<ProductChanges> {
        let mut details = Vec::new();

        let name = match self.name {
            Some(ref n) if n.trim().is_empty() => {
                details.push("name must not be empty".to_string());
                None
            }
            Some(n) => Some(n.trim().to_string()),
            None => None,
        };

        if let Some(price) = self.price {
            if price < Decimal::ZERO {
                details.push("price must not be negative".to_string());
            }
        }
        if let Some(stock) = self.stock {
            if stock < 0 {
                details.push("stock must not be negative".to_string());
            }
        }
        if let (Some(price), Some(discount)) = (self.price, self.price_with_discount) {
            if discount >= price {
                details.push("price_with_discount must be lower than price".to_string());
            }
        }

        if !details.is_empty() {
            return Err(AppError::ValidationError(details));
        }

        let category_ids = match self.category_ids {
            Some(value) => Some(parse_category_ids(&value)?),
            None => None,
        };

        let images = match self.images {
            Some(value) => Some(parse_images(&value)?),
            None => None,
        };

        let options = match self.options {
            Some(value) => Some(parse_options(&value)?),
            None => None,
        };

        Ok(ProductChanges {
            enabled: self.enabled,
            name,
            slug: self.slug.filter(|s| !s.trim().is_empty()),
            stock: self.stock,
            description: self.description,
            price: self.price,
            price_with_discount: self.price_with_discount,
            category_ids,
            images,
            options,
        })
    }
}

fn check_numeric_invariants(
    price: Decimal,
    price_with_discount: Option<Decimal>,
    stock: i32,
) -> Result<()> {
    if price < Decimal::ZERO {
        return Err(AppError::BadRequest("Price cannot be negative".to_string()));
    }

    if let Some(discount) = price_with_discount {
        if discount < Decimal::ZERO {
            return Err(AppError::BadRequest(
                "Price with discount cannot be negative".to_string(),
            ));
        }
        if discount >= price {
            return Err(AppError::BadRequest(
                "Price with discount must be lower than regular price".to_string(),
            ));
        }
    }

    if stock < 0 {
        return Err(AppError::BadRequest("Stock cannot be negative".to_string()));
    }

    Ok(())
}

/// Accepts `[1, 2]`, `"[1, 2]"`, `"1,2"` or a single number.
pub fn parse_category_ids(value: &serde_json::Value) -> Result<Vec<i32>> {
    let invalid =
        || AppError::BadRequest("Invalid category_ids: expected a list of numbers".to_string());

    let ids = match value {
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| item.as_i64().map(|id| id as i32).ok_or_else(invalid))
            .collect::<Result<Vec<_>>>()?,
        serde_json::Value::Number(n) => vec![n.as_i64().ok_or_else(invalid)? as i32],
        serde_json::Value::String(s) => {
            if s.trim_start().starts_with('[') {
                serde_json::from_str::<Vec<i32>>(s).map_err(|_| invalid())?
            } else {
                s.split(',')
                    .map(|part| part.trim().parse::<i32>().map_err(|_| invalid()))
                    .collect::<Result<Vec<_>>>()?
            }
        }
        _ => return Err(invalid()),
    };

    Ok(ids.into_iter().filter(|id| *id > 0).collect())
}

/// Accepts a native array of path strings or its serialized JSON form.
pub fn parse_images(value: &serde_json::Value) -> Result<Vec<String>> {
    let invalid =
        || AppError::BadRequest("Invalid images: expected a list of path strings".to_string());

    let paths: Vec<String> = match value {
        serde_json::Value::Array(_) => {
            serde_json::from_value(value.clone()).map_err(|_| invalid())?
        }
        serde_json::Value::String(s) => serde_json::from_str(s).map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    if paths.len() > MAX_IMAGES_PER_PRODUCT {
        return Err(AppError::BadRequest(format!(
            "A maximum of {} images per product is allowed",
            MAX_IMAGES_PER_PRODUCT
        )));
    }

    Ok(paths)
}

/// Accepts a native array of option objects or its serialized JSON form, and
/// checks each option for a title, a type and a non-empty values list.
pub fn parse_options(value: &serde_json::Value) -> Result<Vec<NewOption>> {
    let payloads: Vec<OptionPayload> = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value.clone())
            .map_err(|_| AppError::BadRequest("Invalid options format".to_string()))?,
        serde_json::Value::String(s) => serde_json::from_str(s)
            .map_err(|_| AppError::BadRequest("Invalid options format".to_string()))?,
        serde_json::Value::Object(_) => {
            let single: OptionPayload = serde_json::from_value(value.clone())
                .map_err(|_| AppError::BadRequest("Invalid options format".to_string()))?;
            vec![single]
        }
        _ => return Err(AppError::BadRequest("Invalid options format".to_string())),
    };

    payloads
        .into_iter()
        .map(|payload| {
            let title = payload
                .title
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(invalid_option)?;
            let kind = payload.kind.ok_or_else(invalid_option)?;
            let values = parse_option_values(payload.values.ok_or_else(invalid_option)?)?;

            Ok(NewOption {
                title,
                shape: payload.shape.unwrap_or(OptionShape::Square),
                radius: payload.radius.unwrap_or(0),
                kind,
                values,
            })
        })
        .collect()
}

fn invalid_option() -> AppError {
    AppError::BadRequest(
        "Invalid option: title, type and a non-empty values list are required".to_string(),
    )
}

fn parse_option_values(value: serde_json::Value) -> Result<Vec<String>> {
    let values = match value {
        serde_json::Value::Array(_) => {
            serde_json::from_value::<Vec<String>>(value).map_err(|_| invalid_option())?
        }
        serde_json::Value::String(s) => match serde_json::from_str::<Vec<String>>(&s) {
            Ok(parsed) => parsed,
            Err(_) => vec![s],
        },
        _ => return Err(invalid_option()),
    };

    if values.is_empty() {
        return Err(invalid_option());
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_payload() -> CreateProductPayload {
        CreateProductPayload {
            enabled: None,
            name: Some("Bermuda Cargo".to_string()),
            slug: None,
            stock: Some(5),
            description: Some("Bermuda confortável".to_string()),
            price: Some(Decimal::new(11990, 2)),
            price_with_discount: None,
            category_ids: None,
            images: None,
            options: None,
        }
    }

    #[test]
    fn create_requires_name() {
        let mut payload = base_payload();
        payload.name = Some("   ".to_string());

        let err = payload.validate().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Name is required"));
    }

    #[test]
    fn create_rejects_discount_not_below_price() {
        let mut payload = base_payload();
        payload.price = Some(Decimal::new(10000, 2));
        payload.price_with_discount = Some(Decimal::new(10000, 2));

        assert!(payload.validate().is_err());
    }

    #[test]
    fn create_rejects_negative_price() {
        let mut payload = base_payload();
        payload.price = Some(Decimal::new(-100, 2));

        assert!(payload.validate().is_err());
    }

    #[test]
    fn create_rejects_more_than_ten_images() {
        let mut payload = base_payload();
        let paths: Vec<String> = (0..11).map(|i| format!("/uploads/{}.png", i)).collect();
        payload.images = Some(json!(paths));

        assert!(payload.validate().is_err());
    }

    #[test]
    fn update_rejects_more_than_ten_images() {
        let paths: Vec<String> = (0..11).map(|i| format!("/uploads/{}.png", i)).collect();
        let payload = UpdateProductPayload {
            enabled: None,
            name: None,
            slug: None,
            stock: None,
            description: None,
            price: None,
            price_with_discount: None,
            category_ids: None,
            images: Some(json!(paths)),
            options: None,
        };

        // Rejected at validation, before any transaction is opened, so the
        // existing image rows are never touched.
        assert!(payload.validate().is_err());
    }

    #[test]
    fn create_defaults_enabled_and_stock() {
        let mut payload = base_payload();
        payload.stock = None;

        let product = payload.validate().unwrap();
        assert!(product.enabled);
        assert_eq!(product.stock, 0);
    }

    #[test]
    fn category_ids_accepts_all_encodings() {
        assert_eq!(parse_category_ids(&json!([1, 2])).unwrap(), vec![1, 2]);
        assert_eq!(parse_category_ids(&json!("[1, 2]")).unwrap(), vec![1, 2]);
        assert_eq!(parse_category_ids(&json!("1, 2")).unwrap(), vec![1, 2]);
        assert_eq!(parse_category_ids(&json!(7)).unwrap(), vec![7]);
    }

    #[test]
    fn category_ids_drops_non_positive() {
        assert_eq!(parse_category_ids(&json!([0, -3, 4])).unwrap(), vec![4]);
    }

    #[test]
    fn options_accept_serialized_string_form() {
        let raw = json!(r#"[{"title":"Tamanho","type":"text","values":["P","M","G"]}]"#);
        let options = parse_options(&raw).unwrap();

        assert_eq!(options.len(), 1);
        assert_eq!(options[0].values, vec!["P", "M", "G"]);
        assert_eq!(options[0].shape, OptionShape::Square);
    }

    #[test]
    fn options_reject_empty_values() {
        let raw = json!([{ "title": "Cor", "type": "color", "values": [] }]);
        assert!(parse_options(&raw).is_err());
    }

    #[test]
    fn options_reject_missing_title() {
        let raw = json!([{ "type": "text", "values": ["P"] }]);
        assert!(parse_options(&raw).is_err());
    }

    #[test]
    fn option_values_round_trip_through_storage_form() {
        let option = NewOption {
            title: "Tamanho".to_string(),
            shape: OptionShape::Square,
            radius: 4,
            kind: OptionKind::Text,
            values: vec!["P".to_string(), "M".to_string(), "G".to_string()],
        };

        let row = OptionRow {
            id: 1,
            product_id: 1,
            title: option.title.clone(),
            shape: option.shape.as_str().to_string(),
            radius: option.radius,
            kind: option.kind.as_str().to_string(),
            values: option.serialized_values().unwrap(),
        };

        let expanded = ProductOption::from(row);
        assert_eq!(expanded.values, vec!["P", "M", "G"]);
    }

    #[test]
    fn projection_keeps_associations() {
        let product = Product {
            id: 1,
            enabled: true,
            name: "Bermuda".to_string(),
            slug: "bermuda".to_string(),
            stock: 3,
            description: String::new(),
            price: Decimal::new(9990, 2),
            price_with_discount: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let json = ProductJson {
            product,
            images: Vec::new(),
            options: Vec::new(),
            category_ids: vec![1, 2],
        };

        let projected = json
            .project(&["name".to_string(), "price".to_string()])
            .unwrap();
        let map = projected.as_object().unwrap();

        assert!(map.contains_key("name"));
        assert!(map.contains_key("price"));
        assert!(map.contains_key("category_ids"));
        assert!(!map.contains_key("slug"));
        assert!(!map.contains_key("id"));
    }
}
