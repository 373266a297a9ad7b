use crate::orm::categories;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};

/// Unpublished categories are treated as missing.
pub async fn get_published_category(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<Option<categories::Model>, DbErr> {
    categories::Entity::find()
        .filter(categories::Column::Slug.eq(slug))
        .filter(categories::Column::IsPublished.eq(true))
        .one(db)
        .await
}
