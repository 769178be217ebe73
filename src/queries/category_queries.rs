use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, Result},
    models::{Category, NewCategory},
    search::CategoryFilter,
};

fn push_predicates(query: &mut QueryBuilder<Postgres>, filter: &CategoryFilter) {
    if let Some(use_in_menu) = filter.use_in_menu {
        query.push(" AND use_in_menu = ");
        query.push_bind(use_in_menu);
    }
}

pub async fn count_categories(pool: &PgPool, filter: &CategoryFilter) -> Result<i64> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM categories WHERE 1=1");
    push_predicates(&mut query, filter);

    let total = query.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok(total)
}

pub async fn page_categories(pool: &PgPool, filter: &CategoryFilter) -> Result<Vec<Category>> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT * FROM categories WHERE 1=1");
    push_predicates(&mut query, filter);

    query.push(" ORDER BY id ASC");

    if filter.limit > 0 {
        query.push(" LIMIT ");
        query.push_bind(filter.limit);
        if let Some(offset) = filter.offset() {
            query.push(" OFFSET ");
            query.push_bind(offset);
        }
    }

    let categories = query.build_query_as::<Category>().fetch_all(pool).await?;

    Ok(categories)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(category)
}

pub async fn create_category(pool: &PgPool, new: NewCategory) -> Result<Category> {
    let existing: Option<(i32,)> = sqlx::query_as("SELECT id FROM categories WHERE name = $1")
        .bind(&new.name)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "A category with this name already exists".to_string(),
        ));
    }

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name, slug, use_in_menu)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(&new.name)
    .bind(&new.slug)
    .bind(new.use_in_menu)
    .fetch_one(pool)
    .await?;

    Ok(category)
}

pub async fn update_category(
    pool: &PgPool,
    id: i32,
    new: NewCategory,
) -> Result<Option<Category>> {
    let existing: Option<(i32,)> =
        sqlx::query_as("SELECT id FROM categories WHERE name = $1 AND id != $2")
            .bind(&new.name)
            .bind(id)
            .fetch_optional(pool)
            .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "Another category with this name already exists".to_string(),
        ));
    }

    let category = sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = $1, slug = $2, use_in_menu = $3, updated_at = NOW()
         WHERE id = $4
         RETURNING *",
    )
    .bind(&new.name)
    .bind(&new.slug)
    .bind(new.use_in_menu)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(category)
}

pub async fn delete_category(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
