use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{CreateCustomerRequest, Customer, UpdateCustomerRequest},
};

pub async fn create_customer(
    pool: &PgPool,
    req: &CreateCustomerRequest,
    password_hash: &str,
) -> Result<Customer> {
    let customer = sqlx::query_as::<_, Customer>(
        "INSERT INTO customers (name, email, password, cpf, phone, address, district, city, zip, complement)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING *",
    )
    .bind(&req.name)
    .bind(&req.email)
    .bind(password_hash)
    .bind(&req.cpf)
    .bind(&req.phone)
    .bind(&req.address)
    .bind(&req.district)
    .bind(&req.city)
    .bind(&req.zip)
    .bind(&req.complement)
    .fetch_one(pool)
    .await?;

    Ok(customer)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(customer)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(customer)
}

pub async fn list_customers(pool: &PgPool) -> Result<Vec<Customer>> {
    let customers = sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY id ASC")
        .fetch_all(pool)
        .await?;

    Ok(customers)
}

pub async fn update_customer(
    pool: &PgPool,
    id: i32,
    req: UpdateCustomerRequest,
) -> Result<Option<Customer>> {
    let mut query = QueryBuilder::<Postgres>::new("UPDATE customers SET ");
    let mut has_fields = false;

    macro_rules! push_field {
        ($column:literal, $value:expr) => {
            if let Some(value) = $value {
                if has_fields {
                    query.push(", ");
                }
                query.push(concat!($column, " = "));
                query.push_bind(value);
                has_fields = true;
            }
        };
    }

    push_field!("name", req.name);
    push_field!("email", req.email);
    push_field!("cpf", req.cpf);
    push_field!("phone", req.phone);
    push_field!("address", req.address);
    push_field!("district", req.district);
    push_field!("city", req.city);
    push_field!("zip", req.zip);
    push_field!("complement", req.complement);

    if !has_fields {
        return find_by_id(pool, id).await;
    }

    query.push(", updated_at = NOW() WHERE id = ");
    query.push_bind(id);
    query.push(" RETURNING *");

    let customer = query
        .build_query_as::<Customer>()
        .fetch_optional(pool)
        .await?;

    Ok(customer)
}

pub async fn delete_customer(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
