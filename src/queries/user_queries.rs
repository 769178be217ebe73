use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{UpdateUserRequest, User},
};

pub async fn create_user(
    pool: &PgPool,
    firstname: &str,
    surname: &str,
    email: &str,
    password_hash: &str,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (firstname, surname, email, password)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(firstname)
    .bind(surname)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id ASC")
        .fetch_all(pool)
        .await?;

    Ok(users)
}

pub async fn update_user(
    pool: &PgPool,
    id: i32,
    req: UpdateUserRequest,
) -> Result<Option<User>> {
    let mut query = QueryBuilder::<Postgres>::new("UPDATE users SET ");
    let mut has_fields = false;

    if let Some(firstname) = req.firstname {
        query.push("firstname = ");
        query.push_bind(firstname);
        has_fields = true;
    }

    if let Some(surname) = req.surname {
        if has_fields {
            query.push(", ");
        }
        query.push("surname = ");
        query.push_bind(surname);
        has_fields = true;
    }

    if let Some(email) = req.email {
        if has_fields {
            query.push(", ");
        }
        query.push("email = ");
        query.push_bind(email);
        has_fields = true;
    }

    if !has_fields {
        return find_by_id(pool, id).await;
    }

    query.push(", updated_at = NOW() WHERE id = ");
    query.push_bind(id);
    query.push(" RETURNING *");

    let user = query
        .build_query_as::<User>()
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn delete_user(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
