//! # Customer Repository
//!
//! Plain CRUD for customer records. Invoices reference customers optionally.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use lazordy_core::validation::validate_name;
use lazordy_core::{Customer, NewCustomer};

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn insert(&self, new: &NewCustomer) -> DbResult<Customer> {
        validate_name("customer name", &new.name)?;

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            phone: new.phone.clone(),
            email: new.email.clone(),
            address: new.address.clone(),
            notes: new.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, email, address, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(&customer.notes)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    pub async fn list(&self, limit: u32) -> DbResult<Vec<Customer>> {
        let customers =
            sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY name LIMIT ?1")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
        Ok(customers)
    }

    /// Replaces a customer's details.
    pub async fn update(&self, id: &str, details: &NewCustomer) -> DbResult<Customer> {
        validate_name("customer name", &details.name)?;

        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                name = ?2, phone = ?3, email = ?4, address = ?5, notes = ?6, updated_at = ?7
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(details.name.trim())
        .bind(&details.phone)
        .bind(&details.email)
        .bind(&details.address)
        .bind(&details.notes)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Customer", id))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::memory_db;
    use lazordy_core::NewCustomer;

    #[tokio::test]
    async fn test_customer_crud() {
        let db = memory_db().await;
        let repo = db.customers();

        let created = repo
            .insert(&NewCustomer {
                name: "  Mona Adel ".to_string(),
                phone: Some("+20 100 000 0000".to_string()),
                ..NewCustomer::default()
            })
            .await
            .unwrap();
        assert_eq!(created.name, "Mona Adel");

        let updated = repo
            .update(
                &created.id,
                &NewCustomer {
                    name: "Mona Adel".to_string(),
                    email: Some("mona@example.com".to_string()),
                    ..NewCustomer::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email.as_deref(), Some("mona@example.com"));
        assert!(updated.phone.is_none());

        assert_eq!(repo.list(10).await.unwrap().len(), 1);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
        assert!(repo.insert(&NewCustomer::default()).await.is_err());
        assert!(repo.update("missing", &updated_details()).await.is_err());
    }

    fn updated_details() -> NewCustomer {
        NewCustomer {
            name: "Nobody".to_string(),
            ..NewCustomer::default()
        }
    }
}
