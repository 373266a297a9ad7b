mod common;

use actix_web::http::StatusCode;
use common::*;
use rublog::orm::{comments, posts};
use sea_orm::{EntityTrait, PaginatorTrait};

#[actix_rt::test]
async fn test_index_lists_only_public_posts() {
    let db = setup_db().await;
    let alice = create_user(&db, "alice").await;
    let travel = create_category(&db, "travel", true).await;
    let secret = create_category(&db, "secret", false).await;

    create_post(&db, &alice, Some(&travel), "Alpha public", yesterday(), true).await;
    create_post(&db, &alice, Some(&travel), "Bravo draft", yesterday(), false).await;
    create_post(&db, &alice, Some(&travel), "Charlie scheduled", tomorrow(), true).await;
    create_post(&db, &alice, Some(&secret), "Delta hidden category", yesterday(), true).await;
    create_post(&db, &alice, None, "Echo uncategorized", yesterday(), true).await;
    // Published exactly now counts as public.
    create_post(&db, &alice, Some(&travel), "Foxtrot on time", now(), true).await;

    let app = init_app(&db).await;
    let res = get(&app, "/", &[]).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_of(res).await;
    assert!(body.contains("Alpha public"));
    assert!(body.contains("Foxtrot on time"));
    assert!(!body.contains("Bravo draft"));
    assert!(!body.contains("Charlie scheduled"));
    assert!(!body.contains("Delta hidden category"));
    assert!(!body.contains("Echo uncategorized"));
}

#[actix_rt::test]
async fn test_index_is_newest_first_with_comment_counts() {
    let db = setup_db().await;
    let alice = create_user(&db, "alice").await;
    let travel = create_category(&db, "travel", true).await;
    let older = create_post(&db, &alice, Some(&travel), "Older post", yesterday(), true).await;
    create_post(&db, &alice, Some(&travel), "Newer post", now(), true).await;
    create_comment(&db, &older, &alice, "first").await;
    create_comment(&db, &older, &alice, "second").await;

    let app = init_app(&db).await;
    let body = body_of(get(&app, "/", &[]).await).await;

    let newer_at = body.find("Newer post").unwrap();
    let older_at = body.find("Older post").unwrap();
    assert!(newer_at < older_at);
    assert!(body.contains("Comments (2)"));
    assert!(body.contains("Comments (0)"));
}

#[actix_rt::test]
async fn test_index_pagination() {
    let db = setup_db().await;
    let alice = create_user(&db, "alice").await;
    let travel = create_category(&db, "travel", true).await;
    for i in 0..12 {
        create_post(&db, &alice, Some(&travel), &format!("Numbered {:02}", i), yesterday(), true)
            .await;
    }

    let app = init_app(&db).await;

    let first = body_of(get(&app, "/", &[]).await).await;
    assert_eq!(first.matches("<article").count(), 10);
    assert!(first.contains("?page=2"));

    let second = get(&app, "/?page=2", &[]).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_of(second).await.matches("<article").count(), 2);

    let last = get(&app, "/?page=last", &[]).await;
    assert_eq!(last.status(), StatusCode::OK);
    assert_eq!(body_of(last).await.matches("<article").count(), 2);

    assert_eq!(get(&app, "/?page=3", &[]).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/?page=0", &[]).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/?page=two", &[]).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_empty_index_renders() {
    let db = setup_db().await;
    let app = init_app(&db).await;

    let res = get(&app, "/", &[]).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_of(res).await.contains("No posts yet."));
}

#[actix_rt::test]
async fn test_category_page() {
    let db = setup_db().await;
    let alice = create_user(&db, "alice").await;
    let travel = create_category(&db, "travel", true).await;
    let food = create_category(&db, "food", true).await;
    let secret = create_category(&db, "secret", false).await;
    create_post(&db, &alice, Some(&travel), "Alpha trip", yesterday(), true).await;
    create_post(&db, &alice, Some(&food), "Bravo soup", yesterday(), true).await;
    create_post(&db, &alice, Some(&travel), "Charlie later", tomorrow(), true).await;
    create_post(&db, &alice, Some(&secret), "Delta secret", yesterday(), true).await;

    let app = init_app(&db).await;

    let res = get(&app, "/category/travel/", &[]).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_of(res).await;
    assert!(body.contains("Alpha trip"));
    assert!(!body.contains("Bravo soup"));
    assert!(!body.contains("Charlie later"));

    // Unpublished and unknown categories do not exist for readers.
    assert_eq!(
        get(&app, "/category/secret/", &[]).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(&app, "/category/nowhere/", &[]).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_rt::test]
async fn test_unpublished_post_detail_visibility() {
    let db = setup_db().await;
    let alice = create_user(&db, "alice").await;
    create_user(&db, "bob").await;
    let travel = create_category(&db, "travel", true).await;
    let draft = create_post(&db, &alice, Some(&travel), "Alpha draft", yesterday(), false).await;
    let uri = format!("/posts/{}/", draft.id);

    let app = init_app(&db).await;

    // Anonymous readers and other users get a 404.
    assert_eq!(get(&app, &uri, &[]).await.status(), StatusCode::NOT_FOUND);
    let bob = login(&app, "bob").await;
    assert_eq!(get(&app, &uri, &bob).await.status(), StatusCode::NOT_FOUND);

    // The author sees it anyway.
    let alice = login(&app, "alice").await;
    let res = get(&app, &uri, &alice).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_of(res).await;
    assert!(body.contains("Alpha draft"));
    assert!(body.contains("not visible to other readers"));

    assert_eq!(get(&app, "/posts/999/", &[]).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_post_detail_shows_comments_in_order() {
    let db = setup_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let travel = create_category(&db, "travel", true).await;
    let post = create_post(&db, &alice, Some(&travel), "Alpha", yesterday(), true).await;
    create_comment(&db, &post, &bob, "First comment").await;
    create_comment(&db, &post, &alice, "Second comment").await;

    let app = init_app(&db).await;
    let res = get(&app, &format!("/posts/{}/", post.id), &[]).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_of(res).await;
    let first = body.find("First comment").unwrap();
    let second = body.find("Second comment").unwrap();
    assert!(first < second);
    assert!(body.contains("@bob"));
}

#[actix_rt::test]
async fn test_edit_post_only_by_author() {
    let db = setup_db().await;
    let alice = create_user(&db, "alice").await;
    create_user(&db, "bob").await;
    let travel = create_category(&db, "travel", true).await;
    let post = create_post(&db, &alice, Some(&travel), "Alpha", yesterday(), true).await;
    let uri = format!("/posts/{}/edit/", post.id);

    let app = init_app(&db).await;

    let res = get(&app, &uri, &[]).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert!(location_of(&res).starts_with("/auth/login/?next="));

    let bob = login(&app, "bob").await;
    assert_eq!(get(&app, &uri, &bob).await.status(), StatusCode::FORBIDDEN);
    let res = post_form(&app, &uri, &bob, &[("title", "Hijacked"), ("text", "x")]).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let alice = login(&app, "alice").await;
    let res = get(&app, &uri, &alice).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_of(res).await.contains("value=\"Alpha\""));

    assert_eq!(
        get(&app, "/posts/999/edit/", &alice).await.status(),
        StatusCode::NOT_FOUND
    );

    let stored = posts::Entity::find_by_id(post.id).one(&db).await.unwrap().unwrap();
    assert_eq!(stored.title, "Alpha");
}

#[actix_rt::test]
async fn test_update_post() {
    let db = setup_db().await;
    let alice = create_user(&db, "alice").await;
    let travel = create_category(&db, "travel", true).await;
    let harbour = create_location(&db, "Harbour").await;
    let post = create_post(&db, &alice, Some(&travel), "Alpha", yesterday(), true).await;
    let uri = format!("/posts/{}/edit/", post.id);

    let app = init_app(&db).await;
    let alice_cookies = login(&app, "alice").await;

    let category = travel.id.to_string();
    let location = harbour.id.to_string();
    let res = post_form(
        &app,
        &uri,
        &alice_cookies,
        &[
            ("title", "Alpha revised"),
            ("text", "New text"),
            ("pub_date", "2022-05-02T08:30"),
            ("category", &category),
            ("location", &location),
            ("image", ""),
        ],
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location_of(&res), format!("/posts/{}/", post.id));

    let stored = posts::Entity::find_by_id(post.id).one(&db).await.unwrap().unwrap();
    assert_eq!(stored.title, "Alpha revised");
    assert_eq!(stored.text, "New text");
    assert_eq!(stored.location_id, Some(harbour.id));
    assert_eq!(stored.pub_date.format("%Y-%m-%d %H:%M").to_string(), "2022-05-02 08:30");
    assert_eq!(stored.author_id, alice.id);
}

#[actix_rt::test]
async fn test_create_post() {
    let db = setup_db().await;
    create_user(&db, "alice").await;
    let travel = create_category(&db, "travel", true).await;

    let app = init_app(&db).await;

    let res = get(&app, "/posts/create/", &[]).await;
    assert_eq!(res.status(), StatusCode::FOUND);

    let alice = login(&app, "alice").await;
    let res = get(&app, "/posts/create/", &alice).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_of(res).await.contains("2022-05-01T12:00"));

    let category = travel.id.to_string();
    let res = post_form(
        &app,
        "/posts/create/",
        &alice,
        &[
            ("title", "Fresh post"),
            ("text", "Hello"),
            ("pub_date", "2022-04-30T10:00"),
            ("category", &category),
            ("location", ""),
            ("image", "https://example.com/cat.png"),
        ],
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location_of(&res), "/profile/alice/");

    // The flash message rides on the new session cookie.
    let flashed = cookies_of(&res);
    let body = body_of(get(&app, "/profile/alice/", &flashed).await).await;
    assert!(body.contains("Post created!"));
    assert!(body.contains("Fresh post"));

    let stored = posts::Entity::find().one(&db).await.unwrap().unwrap();
    assert!(stored.is_published);
    assert_eq!(stored.image.as_deref(), Some("https://example.com/cat.png"));
    assert_eq!(stored.created_at, now());
}

#[actix_rt::test]
async fn test_invalid_post_form_writes_nothing() {
    let db = setup_db().await;
    create_user(&db, "alice").await;

    let app = init_app(&db).await;
    let alice = login(&app, "alice").await;

    let res = post_form(
        &app,
        "/posts/create/",
        &alice,
        &[
            ("title", ""),
            ("text", "Body without a title"),
            ("pub_date", "2022-04-30T10:00"),
            ("category", "42"),
        ],
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_of(res).await;
    assert!(body.contains("This field is required."));
    assert!(body.contains("Select a valid choice."));
    // The submitted text is kept.
    assert!(body.contains("Body without a title"));

    assert_eq!(posts::Entity::find().count(&db).await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_delete_post_removes_comments() {
    let db = setup_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let travel = create_category(&db, "travel", true).await;
    let post = create_post(&db, &alice, Some(&travel), "Alpha", yesterday(), true).await;
    let other = create_post(&db, &alice, Some(&travel), "Bravo", yesterday(), true).await;
    create_comment(&db, &post, &bob, "one").await;
    create_comment(&db, &post, &alice, "two").await;
    create_comment(&db, &other, &bob, "kept").await;
    let uri = format!("/posts/{}/delete/", post.id);

    let app = init_app(&db).await;

    let bob_cookies = login(&app, "bob").await;
    assert_eq!(get(&app, &uri, &bob_cookies).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        post_form(&app, &uri, &bob_cookies, &[]).await.status(),
        StatusCode::FORBIDDEN
    );

    let alice_cookies = login(&app, "alice").await;
    let res = get(&app, &uri, &alice_cookies).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_of(res).await.contains("Alpha"));

    let res = post_form(&app, &uri, &alice_cookies, &[]).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location_of(&res), "/profile/alice/");

    assert!(posts::Entity::find_by_id(post.id).one(&db).await.unwrap().is_none());
    let remaining = comments::Entity::find().all(&db).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].post_id, other.id);

    assert_eq!(
        post_form(&app, &uri, &alice_cookies, &[]).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_rt::test]
async fn test_profile_redirect_encodes_unicode_username() {
    let db = setup_db().await;
    create_user(&db, "Алиса").await;
    let travel = create_category(&db, "travel", true).await;

    let app = init_app(&db).await;
    let cookies = login(&app, "Алиса").await;

    let category = travel.id.to_string();
    let res = post_form(
        &app,
        "/posts/create/",
        &cookies,
        &[
            ("title", "Привет"),
            ("text", "Hello"),
            ("pub_date", "2022-04-30T10:00"),
            ("category", &category),
        ],
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    let location = location_of(&res);
    assert_eq!(location, "/profile/%D0%90%D0%BB%D0%B8%D1%81%D0%B0/");

    let res = get(&app, &location, &cookies).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_of(res).await.contains("Привет"));
}
