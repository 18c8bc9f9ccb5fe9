use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::validation::validate_name;
use crate::database::is_unique_violation;
use crate::database::models::Category;
use crate::services::{check, ServiceError};

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Lowercase ASCII slug with single dashes between words
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Validated name and its slug
fn name_and_slug(name: &str) -> Result<(String, String), ServiceError> {
    check("name", validate_name(name))?;
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(ServiceError::validation("name", "must contain letters or digits"));
    }
    Ok((name.trim().to_string(), slug))
}

pub struct CategoryService {
    pool: PgPool,
}

impl CategoryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Category>, ServiceError> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    pub async fn create(&self, input: CategoryInput) -> Result<Category, ServiceError> {
        let (name, slug) = name_and_slug(&input.name)?;

        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, slug, description) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&name)
        .bind(&slug)
        .bind(input.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, &name))
    }

    pub async fn update(&self, id: Uuid, update: CategoryUpdate) -> Result<Category, ServiceError> {
        let (name, slug) = match update.name.as_deref().map(name_and_slug).transpose()? {
            Some((name, slug)) => (Some(name), Some(slug)),
            None => (None, None),
        };

        sqlx::query_as::<_, Category>(
            "UPDATE categories
             SET name = COALESCE($2, name), slug = COALESCE($3, slug), description = COALESCE($4, description)
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(&name)
        .bind(&slug)
        .bind(update.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, name.as_deref().unwrap_or_default()))?
        .ok_or_else(|| ServiceError::not_found("Category"))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category is used by {} product(s)",
                in_use
            )));
        }

        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(ServiceError::not_found("Category"));
        }
        Ok(())
    }
}

fn duplicate_or(err: sqlx::Error, name: &str) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::Conflict(format!("Category '{}' already exists", name.trim()))
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(slugify("Home & Garden"), "home-garden");
        assert_eq!(slugify("  Books  "), "books");
        assert_eq!(slugify("4K TVs!!"), "4k-tvs");
        assert_eq!(slugify("Café"), "caf");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn names_need_a_usable_slug() {
        let (name, slug) = name_and_slug("  Home & Garden ").unwrap();
        assert_eq!(name, "Home & Garden");
        assert_eq!(slug, "home-garden");
        assert!(matches!(name_and_slug("***"), Err(ServiceError::Validation { .. })));
    }
}
