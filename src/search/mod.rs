use std::collections::HashMap;

use rust_decimal::Decimal;

const DEFAULT_LIMIT: i64 = 12;
const DEFAULT_PAGE: i64 = 1;

/// Base product attributes a caller may project with `fields`.
pub const PROJECTABLE_FIELDS: [&str; 8] = [
    "id",
    "enabled",
    "name",
    "slug",
    "stock",
    "description",
    "price",
    "price_with_discount",
];

/// One `option[<id>]=v1,v2` query key: the option with this id must carry at
/// least one of the listed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionFilter {
    pub option_id: i32,
    pub values: Vec<String>,
}

/// Typed descriptor compiled from the search query string. Both the count and
/// the page query are driven off the same descriptor so the reported total is
/// always consistent with the pagination window.
#[derive(Debug, Clone)]
pub struct ProductFilter {
    /// `-1` means unbounded: no limit or offset is applied.
    pub limit: i64,
    pub page: i64,
    pub fields: Vec<String>,
    pub match_term: Option<String>,
    pub price_range: Option<(Decimal, Decimal)>,
    pub category_ids: Vec<i32>,
    pub option_filters: Vec<OptionFilter>,
}

impl ProductFilter {
    /// Compiles the raw query params. Malformed numeric inputs degrade to
    /// their defaults; unknown `fields` entries are dropped silently.
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let limit = match params.get("limit") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) if n > 0 => n,
                Ok(_) => -1,
                Err(_) => DEFAULT_LIMIT,
            },
            None => DEFAULT_LIMIT,
        };

        let page = match params.get("page") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) if n >= 1 => n,
                _ => DEFAULT_PAGE,
            },
            None => DEFAULT_PAGE,
        };

        let fields = match params.get("fields") {
            Some(raw) => {
                let selected: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|f| PROJECTABLE_FIELDS.contains(f))
                    .map(str::to_string)
                    .collect();
                if selected.is_empty() {
                    all_fields()
                } else {
                    selected
                }
            }
            None => all_fields(),
        };

        let match_term = params
            .get("match")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let price_range = params.get("price-range").and_then(|raw| {
            let (min, max) = raw.split_once('-')?;
            let min = min.trim().parse::<Decimal>().ok()?;
            let max = max.trim().parse::<Decimal>().ok()?;
            Some((min, max))
        });

        let category_ids = params
            .get("category_ids")
            .map(|raw| {
                raw.split(',')
                    .filter_map(|part| part.trim().parse::<i32>().ok())
                    .collect()
            })
            .unwrap_or_default();

        let mut option_filters: Vec<OptionFilter> = params
            .iter()
            .filter_map(|(key, value)| {
                let option_id = parse_option_key(key)?;
                let values: Vec<String> = value
                    .split(',')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                if values.is_empty() {
                    return None;
                }
                Some(OptionFilter { option_id, values })
            })
            .collect();
        option_filters.sort_by_key(|f| f.option_id);

        Self {
            limit,
            page,
            fields,
            match_term,
            price_range,
            category_ids,
            option_filters,
        }
    }

    /// Row offset for the current page, or `None` when unbounded. Saturates
    /// rather than overflowing for absurdly large page numbers.
    pub fn offset(&self) -> Option<i64> {
        if self.limit > 0 {
            Some((self.page - 1).saturating_mul(self.limit))
        } else {
            None
        }
    }
}

/// Category attributes a caller may project with `fields`.
pub const CATEGORY_FIELDS: [&str; 4] = ["id", "name", "slug", "use_in_menu"];

/// Descriptor for the category listing; same pagination and projection rules
/// as the product filter, with a single boolean predicate.
#[derive(Debug, Clone)]
pub struct CategoryFilter {
    pub limit: i64,
    pub page: i64,
    pub fields: Vec<String>,
    pub use_in_menu: Option<bool>,
}

impl CategoryFilter {
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let limit = match params.get("limit") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) if n > 0 => n,
                Ok(_) => -1,
                Err(_) => DEFAULT_LIMIT,
            },
            None => DEFAULT_LIMIT,
        };

        let page = match params.get("page") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) if n >= 1 => n,
                _ => DEFAULT_PAGE,
            },
            None => DEFAULT_PAGE,
        };

        let fields = match params.get("fields") {
            Some(raw) => {
                let selected: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|f| CATEGORY_FIELDS.contains(f))
                    .map(str::to_string)
                    .collect();
                if selected.is_empty() {
                    CATEGORY_FIELDS.iter().map(|f| f.to_string()).collect()
                } else {
                    selected
                }
            }
            None => CATEGORY_FIELDS.iter().map(|f| f.to_string()).collect(),
        };

        let use_in_menu = params.get("use_in_menu").map(|raw| raw.trim() == "true");

        Self {
            limit,
            page,
            fields,
            use_in_menu,
        }
    }

    pub fn offset(&self) -> Option<i64> {
        if self.limit > 0 {
            Some((self.page - 1).saturating_mul(self.limit))
        } else {
            None
        }
    }
}

fn all_fields() -> Vec<String> {
    PROJECTABLE_FIELDS.iter().map(|f| f.to_string()).collect()
}

fn parse_option_key(key: &str) -> Option<i32> {
    let id = key.strip_prefix("option[")?.strip_suffix(']')?;

    // Digits only: rejects sign prefixes like `option[-5]`.
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    id.parse::<i32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_applied_when_absent() {
        let filter = ProductFilter::from_query(&query(&[]));

        assert_eq!(filter.limit, 12);
        assert_eq!(filter.page, 1);
        assert_eq!(filter.fields.len(), PROJECTABLE_FIELDS.len());
        assert_eq!(filter.offset(), Some(0));
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let filter = ProductFilter::from_query(&query(&[("limit", "abc"), ("page", "zero")]));

        assert_eq!(filter.limit, 12);
        assert_eq!(filter.page, 1);
    }

    #[test]
    fn negative_limit_means_unbounded() {
        let filter = ProductFilter::from_query(&query(&[("limit", "-1"), ("page", "3")]));

        assert_eq!(filter.limit, -1);
        assert_eq!(filter.offset(), None);
    }

    #[test]
    fn offset_follows_pagination_math() {
        let filter = ProductFilter::from_query(&query(&[("limit", "12"), ("page", "3")]));

        assert_eq!(filter.offset(), Some(24));
    }

    #[test]
    fn huge_page_number_saturates_instead_of_overflowing() {
        let filter = ProductFilter::from_query(&query(&[
            ("page", &i64::MAX.to_string()),
            ("limit", "12"),
        ]));

        assert_eq!(filter.offset(), Some(i64::MAX));

        let filter = CategoryFilter::from_query(&query(&[
            ("page", &i64::MAX.to_string()),
            ("limit", "12"),
        ]));

        assert_eq!(filter.offset(), Some(i64::MAX));
    }

    #[test]
    fn unknown_fields_dropped_silently() {
        let filter = ProductFilter::from_query(&query(&[("fields", "name,price,nonsense")]));

        assert_eq!(filter.fields, vec!["name".to_string(), "price".to_string()]);
    }

    #[test]
    fn price_range_parses_min_and_max() {
        let filter = ProductFilter::from_query(&query(&[("price-range", "50-200.5")]));

        let (min, max) = filter.price_range.unwrap();
        assert_eq!(min, Decimal::new(50, 0));
        assert_eq!(max, Decimal::new(2005, 1));
    }

    #[test]
    fn malformed_price_range_ignored() {
        let filter = ProductFilter::from_query(&query(&[("price-range", "cheap-expensive")]));

        assert!(filter.price_range.is_none());
    }

    #[test]
    fn category_ids_parse_comma_list() {
        let filter = ProductFilter::from_query(&query(&[("category_ids", "1, 2, x, 4")]));

        assert_eq!(filter.category_ids, vec![1, 2, 4]);
    }

    #[test]
    fn option_keys_compile_to_filters() {
        let filter = ProductFilter::from_query(&query(&[
            ("option[45]", "P,M"),
            ("option[60]", "Azul"),
            ("option]bad[", "x"),
            ("option[notanum]", "x"),
            ("option[-5]", "x"),
            ("option[+5]", "x"),
            ("option[]", "x"),
        ]));

        assert_eq!(
            filter.option_filters,
            vec![
                OptionFilter {
                    option_id: 45,
                    values: vec!["P".to_string(), "M".to_string()],
                },
                OptionFilter {
                    option_id: 60,
                    values: vec!["Azul".to_string()],
                },
            ]
        );
    }

    #[test]
    fn category_filter_parses_use_in_menu() {
        let filter = CategoryFilter::from_query(&query(&[("use_in_menu", "true")]));
        assert_eq!(filter.use_in_menu, Some(true));

        let filter = CategoryFilter::from_query(&query(&[("use_in_menu", "false")]));
        assert_eq!(filter.use_in_menu, Some(false));

        let filter = CategoryFilter::from_query(&query(&[]));
        assert_eq!(filter.use_in_menu, None);
    }

    #[test]
    fn category_fields_intersected_with_allow_list() {
        let filter = CategoryFilter::from_query(&query(&[("fields", "name,bogus")]));
        assert_eq!(filter.fields, vec!["name".to_string()]);
    }

    #[test]
    fn match_term_trimmed_and_empty_dropped() {
        let filter = ProductFilter::from_query(&query(&[("match", "  bermuda ")]));
        assert_eq!(filter.match_term.as_deref(), Some("bermuda"));

        let filter = ProductFilter::from_query(&query(&[("match", "   ")]));
        assert!(filter.match_term.is_none());
    }
}
