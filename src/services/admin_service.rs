use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::api::{Page, Paginated};
use crate::auth::hash_password;
use crate::auth::validation::{normalize_email, validate_email, validate_name, validate_password};
use crate::database::is_unique_violation;
use crate::database::models::{User, USER_COLUMNS};
use crate::services::auth_service::revoke_all_refresh_tokens;
use crate::services::{check, like_pattern, ServiceError};
use crate::types::Role;

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl UserFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(role) = self.role {
            qb.push(" AND role = ").push_bind(role.as_str());
        }
        if let Some(active) = self.is_active {
            qb.push(" AND is_active = ").push_bind(active);
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub is_active: Option<bool>,
    pub role: Option<Role>,
}

/// What happened to a user on delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    /// The user owns orders or products, so the row was kept
    Deactivated,
}

/// Admins cannot lock themselves out
fn guard_self_update(admin_id: Uuid, target: &User, update: &UserUpdate) -> Result<(), ServiceError> {
    if admin_id != target.id {
        return Ok(());
    }
    if update.is_active == Some(false) {
        return Err(ServiceError::BadRequest("You cannot deactivate your own account".to_string()));
    }
    if matches!(update.role, Some(role) if role != Role::Admin) {
        return Err(ServiceError::BadRequest("You cannot change your own role".to_string()));
    }
    Ok(())
}

pub struct AdminService {
    pool: PgPool,
}

impl AdminService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_users(&self, filter: &UserFilter, page: Page) -> Result<Paginated<User>, ServiceError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        filter.push_conditions(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        filter.push_conditions(&mut select);
        select
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let users = select.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(users, page, total))
    }

    pub async fn export_users(&self, filter: &UserFilter) -> Result<Vec<User>, ServiceError> {
        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        filter.push_conditions(&mut select);
        select.push(" ORDER BY created_at DESC, id");
        let users = select.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, ServiceError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    pub async fn update_user(&self, admin_id: Uuid, id: Uuid, update: UserUpdate) -> Result<User, ServiceError> {
        if update.is_active.is_none() && update.role.is_none() {
            return Err(ServiceError::BadRequest("Nothing to update".to_string()));
        }

        let target = self.get_user(id).await?;
        guard_self_update(admin_id, &target, &update)?;

        let mut tx = self.pool.begin().await?;
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET is_active = COALESCE($2, is_active), role = COALESCE($3, role), updated_at = now()
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(update.is_active)
        .bind(update.role.map(|r| r.as_str()))
        .fetch_one(&mut *tx)
        .await?;

        if update.is_active == Some(false) {
            let revoked = revoke_all_refresh_tokens(&mut *tx, id).await?;
            tracing::info!("Admin {} deactivated user {} ({} sessions revoked)", admin_id, id, revoked);
        }
        if let Some(role) = update.role.filter(|r| *r != target.role) {
            tracing::info!("Admin {} changed role of user {} from {} to {}", admin_id, id, target.role, role);
        }
        tx.commit().await?;

        Ok(user)
    }

    /// Bootstraps an admin account; admins cannot be created over HTTP
    pub async fn create_admin(&self, name: &str, email: &str, password: &str) -> Result<User, ServiceError> {
        check("name", validate_name(name))?;
        check("email", validate_email(email))?;
        check("password", validate_password(password))?;

        let email = normalize_email(email);
        let password_hash = hash_password(password)?;
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash, role, email_verified)
             VALUES ($1, $2, $3, 'admin', TRUE)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(name.trim())
        .bind(&email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::Conflict(format!("Email {} is already registered", email))
            } else {
                e.into()
            }
        })?;

        tracing::info!("Created admin account {} ({})", user.id, user.email);
        Ok(user)
    }

    pub async fn delete_user(&self, admin_id: Uuid, id: Uuid) -> Result<Removal, ServiceError> {
        if admin_id == id {
            return Err(ServiceError::BadRequest("You cannot delete your own account".to_string()));
        }
        self.get_user(id).await?;

        let mut tx = self.pool.begin().await?;
        let has_history: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE customer_id = $1)
                 OR EXISTS (SELECT 1 FROM products WHERE seller_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let removal = if has_history {
            sqlx::query("UPDATE users SET is_active = FALSE, updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            revoke_all_refresh_tokens(&mut *tx, id).await?;
            Removal::Deactivated
        } else {
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Removal::Deleted
        };
        tx.commit().await?;

        tracing::info!("Admin {} removed user {}: {:?}", admin_id, id, removal);
        Ok(removal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: Uuid, role: Role) -> User {
        User {
            id,
            name: "Admin".to_string(),
            email: "admin@example.com".to_string(),
            phone: None,
            password_hash: String::new(),
            role,
            is_active: true,
            email_verified: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn admin_cannot_deactivate_or_demote_self() {
        let me = Uuid::new_v4();
        let target = user(me, Role::Admin);

        let deactivate = UserUpdate {
            is_active: Some(false),
            role: None,
        };
        assert!(matches!(guard_self_update(me, &target, &deactivate), Err(ServiceError::BadRequest(_))));

        let demote = UserUpdate {
            is_active: None,
            role: Some(Role::Customer),
        };
        assert!(matches!(guard_self_update(me, &target, &demote), Err(ServiceError::BadRequest(_))));

        let harmless = UserUpdate {
            is_active: Some(true),
            role: Some(Role::Admin),
        };
        assert!(guard_self_update(me, &target, &harmless).is_ok());
    }

    #[test]
    fn other_users_can_be_changed() {
        let target = user(Uuid::new_v4(), Role::Seller);
        let update = UserUpdate {
            is_active: Some(false),
            role: Some(Role::Customer),
        };
        assert!(guard_self_update(Uuid::new_v4(), &target, &update).is_ok());
    }

    #[test]
    fn filter_builds_search() {
        let filter = UserFilter {
            role: Some(Role::Seller),
            is_active: Some(true),
            search: Some("ann".to_string()),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        filter.push_conditions(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM users WHERE TRUE AND role = $1 AND is_active = $2 AND (name ILIKE $3 OR email ILIKE $4)"
        );
    }
}
