use crate::form::{clean_text, FormErrors};
use crate::orm::{comments, users};
use chrono::NaiveDateTime;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};
use serde::Deserialize;

/// Comment with its author's name adjoined.
#[derive(Clone, Debug, FromQueryResult)]
pub struct CommentForTemplate {
    pub id: i32,
    pub text: String,
    pub post_id: i32,
    pub author_id: i32,
    pub created_at: NaiveDateTime,
    // join users
    pub author_username: String,
}

impl CommentForTemplate {
    pub fn get_edit_url(&self) -> String {
        format!("/posts/{}/edit_comment/{}/", self.post_id, self.id)
    }

    pub fn get_delete_url(&self) -> String {
        format!("/posts/{}/delete_comment/{}/", self.post_id, self.id)
    }
}

/// Comments on a post, oldest first.
pub async fn get_comments_for_post(
    db: &DatabaseConnection,
    post_id: i32,
) -> Result<Vec<CommentForTemplate>, DbErr> {
    comments::Entity::find()
        .left_join(users::Entity)
        .column_as(users::Column::Username, "author_username")
        .filter(comments::Column::PostId.eq(post_id))
        .order_by_asc(comments::Column::CreatedAt)
        .order_by_asc(comments::Column::Id)
        .into_model::<CommentForTemplate>()
        .all(db)
        .await
}

/// A comment is only addressable through the post it belongs to.
pub async fn get_comment_in_post(
    db: &DatabaseConnection,
    post_id: i32,
    comment_id: i32,
) -> Result<Option<comments::Model>, DbErr> {
    comments::Entity::find_by_id(comment_id)
        .filter(comments::Column::PostId.eq(post_id))
        .one(db)
        .await
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommentFormData {
    #[serde(default)]
    pub text: String,
}

impl CommentFormData {
    pub fn from_model(comment: &comments::Model) -> Self {
        Self {
            text: comment.text.to_owned(),
        }
    }

    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        let text = clean_text(&mut errors, "text", &self.text, true, None);
        errors.into_result(text)
    }
}

pub async fn insert_comment(
    db: &DatabaseConnection,
    post_id: i32,
    author_id: i32,
    text: String,
    now: NaiveDateTime,
) -> Result<comments::Model, DbErr> {
    comments::ActiveModel {
        text: Set(text),
        post_id: Set(post_id),
        author_id: Set(author_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn update_comment(
    db: &DatabaseConnection,
    comment: comments::Model,
    text: String,
) -> Result<comments::Model, DbErr> {
    let mut active: comments::ActiveModel = comment.into();
    active.text = Set(text);
    active.update(db).await
}

pub async fn delete_comment(db: &DatabaseConnection, comment: comments::Model) -> Result<(), DbErr> {
    comment.delete(db).await.map(|_| ())
}
