use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::{AppError, Result},
    models::{NewProduct, OptionRow, Product, ProductChanges, ProductImage, ProductJson},
    search::ProductFilter,
    utils::slug::slugify,
};

/// Appends the filter's WHERE predicates. Shared by the count and the page
/// query so both always run against the same logical predicate.
fn push_predicates(query: &mut QueryBuilder<Postgres>, filter: &ProductFilter) {
    if let Some(ref term) = filter.match_term {
        let pattern = format!("%{}%", term);
        query.push(" AND (p.name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR p.description ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    if let Some((min, max)) = filter.price_range {
        query.push(" AND p.price BETWEEN ");
        query.push_bind(min);
        query.push(" AND ");
        query.push_bind(max);
    }

    if !filter.category_ids.is_empty() {
        query.push(
            " AND EXISTS (SELECT 1 FROM product_categories pc \
             WHERE pc.product_id = p.id AND pc.category_id = ANY(",
        );
        query.push_bind(filter.category_ids.clone());
        query.push("))");
    }

    // Option filters OR together: a product matches when any one of the
    // requested options carries one of the requested values.
    if !filter.option_filters.is_empty() {
        query.push(" AND EXISTS (SELECT 1 FROM options o WHERE o.product_id = p.id AND (");
        for (i, option_filter) in filter.option_filters.iter().enumerate() {
            if i > 0 {
                query.push(" OR ");
            }
            query.push("(o.id = ");
            query.push_bind(option_filter.option_id);
            query.push(" AND o.\"values\"::jsonb ?| ");
            query.push_bind(option_filter.values.clone());
            query.push(")");
        }
        query.push("))");
    }
}

/// Distinct total of products matching the filter.
pub async fn count_products(pool: &PgPool, filter: &ProductFilter) -> Result<i64> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(DISTINCT p.id) FROM products p WHERE 1=1");
    push_predicates(&mut query, filter);

    let total = query.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok(total)
}

/// One page of products matching the filter, ordered by id ascending, with
/// images, options and category ids loaded and reshaped.
pub async fn page_products(pool: &PgPool, filter: &ProductFilter) -> Result<Vec<ProductJson>> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT p.* FROM products p WHERE 1=1");
    push_predicates(&mut query, filter);

    query.push(" ORDER BY p.id ASC");

    if filter.limit > 0 {
        query.push(" LIMIT ");
        query.push_bind(filter.limit);
        if let Some(offset) = filter.offset() {
            query.push(" OFFSET ");
            query.push_bind(offset);
        }
    }

    let products = query.build_query_as::<Product>().fetch_all(pool).await?;

    load_associations(pool, products).await
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<ProductJson>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let product = match product {
        Some(p) => p,
        None => return Ok(None),
    };

    let mut reshaped = load_associations(pool, vec![product]).await?;
    Ok(reshaped.pop())
}

/// Batch-fetches images, options and category links for the given products
/// and reshapes each row into the flat response contract.
async fn load_associations(pool: &PgPool, products: Vec<Product>) -> Result<Vec<ProductJson>> {
    if products.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<i32> = products.iter().map(|p| p.id).collect();

    let images = sqlx::query_as::<_, ProductImage>(
        "SELECT id, product_id, path FROM images WHERE product_id = ANY($1) ORDER BY id ASC",
    )
    .bind(&product_ids)
    .fetch_all(pool)
    .await?;

    let options = sqlx::query_as::<_, OptionRow>(
        "SELECT id, product_id, title, shape, radius, type, \"values\" \
         FROM options WHERE product_id = ANY($1) ORDER BY id ASC",
    )
    .bind(&product_ids)
    .fetch_all(pool)
    .await?;

    let links = sqlx::query_as::<_, (i32, i32)>(
        "SELECT product_id, category_id FROM product_categories \
         WHERE product_id = ANY($1) ORDER BY category_id ASC",
    )
    .bind(&product_ids)
    .fetch_all(pool)
    .await?;

    let mut images_map: HashMap<i32, Vec<ProductImage>> = HashMap::new();
    for image in images {
        images_map.entry(image.product_id).or_default().push(image);
    }

    let mut options_map: HashMap<i32, Vec<OptionRow>> = HashMap::new();
    for option in options {
        options_map.entry(option.product_id).or_default().push(option);
    }

    let mut category_map: HashMap<i32, Vec<i32>> = HashMap::new();
    for (product_id, category_id) in links {
        category_map.entry(product_id).or_default().push(category_id);
    }

    let result = products
        .into_iter()
        .map(|product| {
            let id = product.id;
            ProductJson {
                product,
                images: images_map.remove(&id).unwrap_or_default(),
                options: options_map
                    .remove(&id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect(),
                category_ids: category_map.remove(&id).unwrap_or_default(),
            }
        })
        .collect();

    Ok(result)
}

/// Creates a product with its images, options and category links in one
/// transaction. Any failure before the final commit rolls the whole unit
/// back (the transaction rolls back on drop).
pub async fn create_product(pool: &PgPool, new: NewProduct) -> Result<Product> {
    let mut tx = pool.begin().await?;

    if name_taken(&mut tx, &new.name, None).await? {
        return Err(AppError::Conflict(
            "A product with this name already exists".to_string(),
        ));
    }

    // An explicitly supplied slug must be free; a derived one that collides
    // is disambiguated with a timestamp suffix instead.
    let slug = match new.slug {
        Some(slug) => {
            if slug_taken(&mut tx, &slug, None).await? {
                return Err(AppError::Conflict(
                    "A product with this slug already exists".to_string(),
                ));
            }
            slug
        }
        None => {
            let derived = slugify(&new.name);
            if slug_taken(&mut tx, &derived, None).await? {
                format!("{}-{}", derived, chrono::Utc::now().timestamp_millis())
            } else {
                derived
            }
        }
    };

    resolve_categories(&mut tx, &new.category_ids).await?;

    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (enabled, name, slug, stock, description, price, price_with_discount)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(new.enabled)
    .bind(&new.name)
    .bind(&slug)
    .bind(new.stock)
    .bind(&new.description)
    .bind(new.price)
    .bind(new.price_with_discount)
    .fetch_one(&mut *tx)
    .await?;

    insert_images(&mut tx, product.id, &new.images).await?;
    insert_options(&mut tx, product.id, &new.options).await?;
    link_categories(&mut tx, product.id, &new.category_ids).await?;

    tx.commit().await?;
    Ok(product)
}

/// Applies a partial update plus the wholesale replacement of any supplied
/// association list, all inside one transaction. Returns `None` when the
/// product does not exist.
pub async fn update_product(
    pool: &PgPool,
    id: i32,
    changes: ProductChanges,
) -> Result<Option<Product>> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

    let existing = match existing {
        Some(p) => p,
        None => return Ok(None),
    };

    if let Some(ref name) = changes.name {
        if *name != existing.name && name_taken(&mut tx, name, Some(id)).await? {
            return Err(AppError::Conflict(
                "Another product with this name already exists".to_string(),
            ));
        }
    }

    if let Some(ref slug) = changes.slug {
        if *slug != existing.slug && slug_taken(&mut tx, slug, Some(id)).await? {
            return Err(AppError::Conflict(
                "Another product with this slug already exists".to_string(),
            ));
        }
    }

    // The discount ordering invariant must hold against the row as it will
    // be after the update, not just against the payload.
    let effective_price = changes.price.unwrap_or(existing.price);
    let effective_discount = changes
        .price_with_discount
        .or(existing.price_with_discount);
    if let Some(discount) = effective_discount {
        if discount >= effective_price {
            return Err(AppError::BadRequest(
                "Price with discount must be lower than regular price".to_string(),
            ));
        }
    }

    if let Some(ref category_ids) = changes.category_ids {
        resolve_categories(&mut tx, category_ids).await?;
    }

    let product = apply_field_changes(&mut tx, id, &changes).await?.unwrap_or(existing);

    if let Some(ref images) = changes.images {
        sqlx::query("DELETE FROM images WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_images(&mut tx, id, images).await?;
    }

    if let Some(ref options) = changes.options {
        sqlx::query("DELETE FROM options WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_options(&mut tx, id, options).await?;
    }

    if let Some(ref category_ids) = changes.category_ids {
        sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_categories(&mut tx, id, category_ids).await?;
    }

    tx.commit().await?;
    Ok(Some(product))
}

pub async fn delete_product(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

async fn name_taken(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    exclude_id: Option<i32>,
) -> Result<bool> {
    let existing: Option<(i32,)> =
        sqlx::query_as("SELECT id FROM products WHERE name = $1 AND id != COALESCE($2, -1)")
            .bind(name)
            .bind(exclude_id)
            .fetch_optional(&mut **tx)
            .await?;

    Ok(existing.is_some())
}

async fn slug_taken(
    tx: &mut Transaction<'_, Postgres>,
    slug: &str,
    exclude_id: Option<i32>,
) -> Result<bool> {
    let existing: Option<(i32,)> =
        sqlx::query_as("SELECT id FROM products WHERE slug = $1 AND id != COALESCE($2, -1)")
            .bind(slug)
            .bind(exclude_id)
            .fetch_optional(&mut **tx)
            .await?;

    Ok(existing.is_some())
}

/// Checks that every requested category exists; reports the missing ids.
async fn resolve_categories(tx: &mut Transaction<'_, Postgres>, ids: &[i32]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let found: Vec<(i32,)> = sqlx::query_as("SELECT id FROM categories WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?;

    if found.len() != ids.len() {
        let found_ids: Vec<i32> = found.into_iter().map(|(id,)| id).collect();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !found_ids.contains(id))
            .map(|id| id.to_string())
            .collect();
        return Err(AppError::BadRequest(format!(
            "Categories not found: {}",
            missing.join(", ")
        )));
    }

    Ok(())
}

/// Dynamic UPDATE over the supplied base fields. Returns `None` when nothing
/// changed (associations may still be replaced by the caller).
async fn apply_field_changes(
    tx: &mut Transaction<'_, Postgres>,
    id: i32,
    changes: &ProductChanges,
) -> Result<Option<Product>> {
    let mut query = QueryBuilder::<Postgres>::new("UPDATE products SET ");
    let mut has_fields = false;

    macro_rules! push_field {
        ($column:literal, $value:expr) => {
            if let Some(ref value) = $value {
                if has_fields {
                    query.push(", ");
                }
                query.push(concat!($column, " = "));
                query.push_bind(value.clone());
                has_fields = true;
            }
        };
    }

    push_field!("enabled", changes.enabled);
    push_field!("name", changes.name);
    push_field!("slug", changes.slug);
    push_field!("stock", changes.stock);
    push_field!("description", changes.description);
    push_field!("price", changes.price);
    push_field!("price_with_discount", changes.price_with_discount);

    if !has_fields {
        return Ok(None);
    }

    query.push(", updated_at = NOW() WHERE id = ");
    query.push_bind(id);
    query.push(" RETURNING *");

    let product = query
        .build_query_as::<Product>()
        .fetch_one(&mut **tx)
        .await?;

    Ok(Some(product))
}

async fn insert_images(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i32,
    paths: &[String],
) -> Result<()> {
    if paths.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO images (product_id, path, enabled)
         SELECT $1, unnest($2::varchar[]), true",
    )
    .bind(product_id)
    .bind(paths)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_options(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i32,
    options: &[crate::models::NewOption],
) -> Result<()> {
    if options.is_empty() {
        return Ok(());
    }

    let titles: Vec<&str> = options.iter().map(|o| o.title.as_str()).collect();
    let shapes: Vec<&str> = options.iter().map(|o| o.shape.as_str()).collect();
    let radii: Vec<i32> = options.iter().map(|o| o.radius).collect();
    let kinds: Vec<&str> = options.iter().map(|o| o.kind.as_str()).collect();
    let values: Vec<String> = options
        .iter()
        .map(|o| o.serialized_values())
        .collect::<Result<Vec<_>>>()?;

    sqlx::query(
        "INSERT INTO options (product_id, title, shape, radius, type, \"values\")
         SELECT $1, unnest($2::varchar[]), unnest($3::varchar[]), unnest($4::int[]),
                unnest($5::varchar[]), unnest($6::text[])",
    )
    .bind(product_id)
    .bind(&titles)
    .bind(&shapes)
    .bind(&radii)
    .bind(&kinds)
    .bind(&values)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn link_categories(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i32,
    category_ids: &[i32],
) -> Result<()> {
    if category_ids.is_empty() {
        return Ok(());
    }

    let mut query =
        QueryBuilder::new("INSERT INTO product_categories (product_id, category_id) ");

    query.push_values(category_ids, |mut b, category_id| {
        b.push_bind(product_id).push_bind(category_id);
    });

    query.build().execute(&mut **tx).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::OptionFilter;
    use rust_decimal::Decimal;

    fn filter() -> ProductFilter {
        ProductFilter {
            limit: 12,
            page: 1,
            fields: Vec::new(),
            match_term: Some("bermuda".to_string()),
            price_range: Some((Decimal::new(50, 0), Decimal::new(200, 0))),
            category_ids: vec![1, 2],
            option_filters: vec![OptionFilter {
                option_id: 45,
                values: vec!["P".to_string(), "M".to_string()],
            }],
        }
    }

    #[test]
    fn predicates_cover_every_filter_dimension() {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT 1 FROM products p WHERE 1=1");
        push_predicates(&mut query, &filter());
        let sql = query.sql();

        assert!(sql.contains("p.name ILIKE"));
        assert!(sql.contains("p.description ILIKE"));
        assert!(sql.contains("p.price BETWEEN"));
        assert!(sql.contains("pc.category_id = ANY"));
        assert!(sql.contains("o.\"values\"::jsonb ?|"));
    }

    #[test]
    fn count_and_page_share_the_same_predicate() {
        let filter = filter();

        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(DISTINCT p.id) FROM products p WHERE 1=1");
        push_predicates(&mut count_query, &filter);

        let mut page_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT p.* FROM products p WHERE 1=1");
        push_predicates(&mut page_query, &filter);

        let count_where = count_query.sql().split("WHERE 1=1").nth(1).map(str::to_string);
        let page_where = page_query.sql().split("WHERE 1=1").nth(1).map(str::to_string);
        assert_eq!(count_where, page_where);
    }

    #[test]
    fn empty_filter_adds_no_predicates() {
        let empty = ProductFilter {
            limit: 12,
            page: 1,
            fields: Vec::new(),
            match_term: None,
            price_range: None,
            category_ids: Vec::new(),
            option_filters: Vec::new(),
        };

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT 1 FROM products p WHERE 1=1");
        push_predicates(&mut query, &empty);

        assert_eq!(query.sql(), "SELECT 1 FROM products p WHERE 1=1");
    }
}
