use crate::form::{clean_choice, clean_text, select_options, FormErrors, SelectOption, REQUIRED};
use crate::orm::{categories, comments, locations, posts, users};
use crate::template::{resolve_page, Paginator};
use chrono::NaiveDateTime;
use sea_orm::{entity::*, query::*, sea_query::Expr};
use sea_orm::{
    DatabaseConnection, DbErr, FromQueryResult, PaginatorTrait, Select, TransactionTrait,
};
use serde::Deserialize;

pub const POSTS_PER_PAGE: usize = 10;
pub const TITLE_MAX_CHARS: usize = 256;
pub const IMAGE_MAX_CHARS: usize = 255;

/// `datetime-local` inputs submit minutes; seconds and a space separator are accepted too.
const PUB_DATE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];
const PUB_DATE_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A fully joined struct representing the post model and its relational data.
#[derive(Clone, Debug, FromQueryResult)]
pub struct PostForTemplate {
    pub id: i32,
    pub title: String,
    pub text: String,
    pub pub_date: NaiveDateTime,
    pub author_id: i32,
    pub category_id: Option<i32>,
    pub location_id: Option<i32>,
    pub is_published: bool,
    pub image: Option<String>,
    pub created_at: NaiveDateTime,
    // join users
    pub author_username: String,
    // join categories
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    pub category_is_published: Option<bool>,
    // join locations
    pub location_name: Option<String>,
    // correlated count
    pub comment_count: i64,
}

impl PostForTemplate {
    pub fn get_url(&self) -> String {
        format!("/posts/{}/", self.id)
    }

    /// Whether anyone, signed in or not, may read this post at `now`.
    pub fn is_public(&self, now: NaiveDateTime) -> bool {
        is_public(
            self.is_published,
            self.category_is_published,
            self.pub_date,
            now,
        )
    }

    /// Authors can always read their own posts.
    pub fn is_visible_to(&self, viewer: Option<i32>, now: NaiveDateTime) -> bool {
        viewer == Some(self.author_id) || self.is_public(now)
    }

    /// Set when the post would not show up for other readers.
    pub fn is_hidden(&self, now: &NaiveDateTime) -> bool {
        !self.is_public(*now)
    }

    pub fn get_category_url(&self) -> String {
        match &self.category_slug {
            Some(slug) => format!("/category/{}/", slug),
            None => String::new(),
        }
    }

    pub fn category_label(&self) -> &str {
        self.category_title.as_deref().unwrap_or_default()
    }

    pub fn location_label(&self) -> &str {
        self.location_name.as_deref().unwrap_or_default()
    }

    pub fn image_url(&self) -> &str {
        self.image.as_deref().unwrap_or_default()
    }

    /// First lines of the text for list views.
    pub fn excerpt(&self) -> String {
        const EXCERPT_CHARS: usize = 300;
        if self.text.chars().count() <= EXCERPT_CHARS {
            return self.text.to_owned();
        }
        let mut excerpt: String = self.text.chars().take(EXCERPT_CHARS).collect();
        excerpt.push('…');
        excerpt
    }
}

/// The three-clause publication rule. A post without a category is never public.
pub fn is_public(
    is_published: bool,
    category_is_published: Option<bool>,
    pub_date: NaiveDateTime,
    now: NaiveDateTime,
) -> bool {
    is_published && category_is_published == Some(true) && pub_date <= now
}

/// Query form of `is_public`. Requires `categories` to be joined.
pub fn publicly_visible(now: NaiveDateTime) -> Condition {
    Condition::all()
        .add(posts::Column::IsPublished.eq(true))
        .add(categories::Column::IsPublished.eq(true))
        .add(posts::Column::PubDate.lte(now))
}

/// Selects posts with author, category, location and comment count adjoined.
pub fn select_for_template() -> Select<posts::Entity> {
    posts::Entity::find()
        .left_join(users::Entity)
        .column_as(users::Column::Username, "author_username")
        .left_join(categories::Entity)
        .column_as(categories::Column::Title, "category_title")
        .column_as(categories::Column::Slug, "category_slug")
        .column_as(categories::Column::IsPublished, "category_is_published")
        .left_join(locations::Entity)
        .column_as(locations::Column::Name, "location_name")
        .column_as(
            Expr::cust("(SELECT COUNT(*) FROM comments WHERE comments.post_id = posts.id)"),
            "comment_count",
        )
}

pub async fn get_post_for_template(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<PostForTemplate>, DbErr> {
    select_for_template()
        .filter(posts::Column::Id.eq(id))
        .into_model::<PostForTemplate>()
        .one(db)
        .await
}

/// One page of a post listing.
#[derive(Debug)]
pub struct PostPage {
    pub posts: Vec<PostForTemplate>,
    pub paginator: Paginator,
}

/// Orders newest first and fetches the requested page.
///
/// Returns `Ok(None)` when the requested page does not exist.
pub async fn paginate_posts(
    db: &DatabaseConnection,
    select: Select<posts::Entity>,
    base_url: &str,
    page: Option<&str>,
) -> Result<Option<PostPage>, DbErr> {
    let paginator = select
        .order_by_desc(posts::Column::PubDate)
        .order_by_desc(posts::Column::Id)
        .into_model::<PostForTemplate>()
        .paginate(db, POSTS_PER_PAGE);

    let page_count = paginator.num_pages().await?;
    let this_page = match resolve_page(page, page_count) {
        Some(page) => page,
        None => return Ok(None),
    };
    let posts = paginator.fetch_page(this_page - 1).await?;

    Ok(Some(PostPage {
        posts,
        paginator: Paginator {
            base_url: base_url.to_owned(),
            this_page: this_page as i32,
            page_count: page_count as i32,
        },
    }))
}

/// Deletes a post and its comments atomically.
pub async fn delete_post(db: &DatabaseConnection, id: i32) -> Result<(), DbErr> {
    let txn = db.begin().await?;

    comments::Entity::delete_many()
        .filter(comments::Column::PostId.eq(id))
        .exec(&txn)
        .await?;
    posts::Entity::delete_many()
        .filter(posts::Column::Id.eq(id))
        .exec(&txn)
        .await?;

    txn.commit().await
}

/// Choices offered by the post form.
#[derive(Debug, Default)]
pub struct PostChoices {
    pub categories: Vec<categories::Model>,
    pub locations: Vec<locations::Model>,
}

impl PostChoices {
    pub async fn load(db: &DatabaseConnection) -> Result<Self, DbErr> {
        Ok(Self {
            categories: categories::Entity::find()
                .order_by_asc(categories::Column::Title)
                .all(db)
                .await?,
            locations: locations::Entity::find()
                .order_by_asc(locations::Column::Name)
                .all(db)
                .await?,
        })
    }
}

/// Raw post form submission. Every field defaults so that missing inputs become
/// validation errors rather than a rejected request.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PostFormData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pub_date: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image: String,
}

/// Validated post fields ready to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CleanPost {
    pub title: String,
    pub text: String,
    pub pub_date: NaiveDateTime,
    pub category_id: Option<i32>,
    pub location_id: Option<i32>,
    pub image: Option<String>,
}

impl PostFormData {
    /// Prefills the form with a post's current values.
    pub fn from_model(post: &posts::Model) -> Self {
        Self {
            title: post.title.to_owned(),
            text: post.text.to_owned(),
            pub_date: post.pub_date.format(PUB_DATE_INPUT_FORMAT).to_string(),
            category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
            location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            image: post.image.to_owned().unwrap_or_default(),
        }
    }

    /// An empty form with the publication date preset to `now`.
    pub fn new_at(now: NaiveDateTime) -> Self {
        Self {
            pub_date: now.format(PUB_DATE_INPUT_FORMAT).to_string(),
            ..Default::default()
        }
    }

    pub fn clean(&self, choices: &PostChoices) -> Result<CleanPost, FormErrors> {
        let mut errors = FormErrors::default();

        let title = clean_text(&mut errors, "title", &self.title, true, Some(TITLE_MAX_CHARS));
        let text = clean_text(&mut errors, "text", &self.text, true, None);

        let pub_date = match parse_pub_date(&self.pub_date) {
            Ok(date) => Some(date),
            Err(message) => {
                errors.add("pub_date", message);
                None
            }
        };

        let category_id = clean_choice(&self.category, |id| {
            choices.categories.iter().any(|c| c.id == id)
        })
        .unwrap_or_else(|message| {
            errors.add("category", message);
            None
        });

        let location_id = clean_choice(&self.location, |id| {
            choices.locations.iter().any(|l| l.id == id)
        })
        .unwrap_or_else(|message| {
            errors.add("location", message);
            None
        });

        let image = clean_text(&mut errors, "image", &self.image, false, Some(IMAGE_MAX_CHARS));

        match pub_date {
            Some(pub_date) => errors.into_result(CleanPost {
                title,
                text,
                pub_date,
                category_id,
                location_id,
                image: Some(image).filter(|i| !i.is_empty()),
            }),
            None => Err(errors),
        }
    }

    pub fn category_options(&self, choices: &PostChoices) -> Vec<SelectOption> {
        select_options(&choices.categories, &self.category, |c| {
            (c.id, c.title.to_owned())
        })
    }

    pub fn location_options(&self, choices: &PostChoices) -> Vec<SelectOption> {
        select_options(&choices.locations, &self.location, |l| {
            (l.id, l.name.to_owned())
        })
    }
}

fn parse_pub_date(raw: &str) -> Result<NaiveDateTime, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(REQUIRED);
    }

    PUB_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or("Enter a valid date/time.")
}

pub async fn insert_post(
    db: &DatabaseConnection,
    author_id: i32,
    post: CleanPost,
    now: NaiveDateTime,
) -> Result<posts::Model, DbErr> {
    posts::ActiveModel {
        title: Set(post.title),
        text: Set(post.text),
        pub_date: Set(post.pub_date),
        author_id: Set(author_id),
        category_id: Set(post.category_id),
        location_id: Set(post.location_id),
        is_published: Set(true),
        image: Set(post.image),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn update_post(
    db: &DatabaseConnection,
    post: posts::Model,
    form: CleanPost,
) -> Result<posts::Model, DbErr> {
    let mut active: posts::ActiveModel = post.into();
    active.title = Set(form.title);
    active.text = Set(form.text);
    active.pub_date = Set(form.pub_date);
    active.category_id = Set(form.category_id);
    active.location_id = Set(form.location_id);
    active.image = Set(form.image);
    active.update(db).await
}
