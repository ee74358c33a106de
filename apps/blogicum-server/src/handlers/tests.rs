use std::sync::{Arc, Mutex};

use actix_web::dev::ServiceResponse;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use blogicum_core::domain::{Category, Comment, Post, User};
use blogicum_core::error::RepoError;
use blogicum_core::ports::{BaseRepository, Clock, CommentRepository, UserRepository};
use blogicum_infra::{Argon2PasswordService, InMemoryStore, JwtConfig, JwtTokenService};

use super::{configure_routes, not_found};
use crate::middleware::auth::SESSION_COOKIE;
use crate::state::AppState;

/// A clock tests move by hand.
struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Users whose name lookups always come back empty, as when another request
/// claims a username between the check and the save.
struct StaleLookupUsers(Arc<dyn UserRepository>);

#[async_trait]
impl BaseRepository<User, i64> for StaleLookupUsers {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        self.0.find_by_id(id).await
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        self.0.save(user).await
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        self.0.delete(id).await
    }
}

#[async_trait]
impl UserRepository for StaleLookupUsers {
    async fn find_by_username(&self, _username: &str) -> Result<Option<User>, RepoError> {
        Ok(None)
    }
}

struct TestApp {
    state: AppState,
    clock: Arc<ManualClock>,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn setup() -> TestApp {
    let clock = Arc::new(ManualClock(Mutex::new(start())));
    let tokens = Arc::new(JwtTokenService::new(JwtConfig {
        secret: "test-secret".to_string(),
        expiration_hours: 1,
        issuer: "blogicum".to_string(),
    }));
    let state = AppState::in_memory(
        &InMemoryStore::new(),
        tokens,
        Arc::new(Argon2PasswordService::new()),
        clock.clone(),
    );

    TestApp { state, clock }
}

macro_rules! app {
    ($t:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($t.state.clone()))
                .configure(configure_routes)
                .default_service(web::to(not_found)),
        )
        .await
    };
}

impl TestApp {
    async fn user(&self, username: &str) -> User {
        self.state
            .users
            .save(User::new(username.into(), None, "unusable".into()))
            .await
            .unwrap()
    }

    async fn category(&self, slug: &str, is_published: bool) -> Category {
        self.state
            .categories
            .save(Category::new(
                slug.to_uppercase(),
                slug.into(),
                String::new(),
                is_published,
            ))
            .await
            .unwrap()
    }

    /// A post published `offset` after the start of the test clock.
    async fn post(
        &self,
        author: &User,
        category: &Category,
        title: &str,
        offset: Duration,
    ) -> Post {
        let post = Post::new(
            author.id,
            category.id,
            title.into(),
            "Some text".into(),
            start() + offset,
        );
        self.state.posts.save(post).await.unwrap()
    }

    async fn comment(&self, post: &Post, author: &User, text: &str) -> Comment {
        self.state
            .comments
            .save(Comment::new(post.id, author.id, text.into()))
            .await
            .unwrap()
    }

    fn bearer(&self, user: &User) -> (header::HeaderName, String) {
        let token = self
            .state
            .tokens
            .generate_token(user.id, &user.username)
            .unwrap();
        (header::AUTHORIZATION, format!("Bearer {token}"))
    }
}

fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

fn titles(body: &Value) -> Vec<String> {
    body["context"]["page_obj"]["object_list"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap().to_string())
        .collect()
}

#[actix_rt::test]
async fn test_hidden_post_detail_is_404_except_for_author() {
    let t = setup();
    let author = t.user("author").await;
    let reader = t.user("reader").await;
    let category = t.category("travel", true).await;
    let mut post = t.post(&author, &category, "Draft", -Duration::hours(1)).await;
    post.is_published = false;
    t.state.posts.save(post.clone()).await.unwrap();
    let app = app!(t);

    let uri = format!("/posts/{}/", post.id);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["template"], "pages/404.html");

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(t.bearer(&reader))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(t.bearer(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["template"], "blog/detail.html");
    assert_eq!(body["context"]["post"]["title"], "Draft");
}

#[actix_rt::test]
async fn test_detail_lists_comments_oldest_first() {
    let t = setup();
    let author = t.user("author").await;
    let category = t.category("travel", true).await;
    let post = t.post(&author, &category, "Trip", -Duration::hours(1)).await;
    t.comment(&post, &author, "first").await;
    t.comment(&post, &author, "second").await;
    let app = app!(t);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/", post.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let texts: Vec<_> = body["context"]["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["first", "second"]);
    assert_eq!(body["context"]["post"]["comment_count"], 2);
    assert_eq!(body["context"]["form"]["data"]["text"], "");
}

#[actix_rt::test]
async fn test_index_shows_only_public_posts_newest_first() {
    let t = setup();
    let author = t.user("author").await;
    let open = t.category("travel", true).await;
    let closed = t.category("secret", false).await;

    let older = t.post(&author, &open, "older", -Duration::days(2)).await;
    t.post(&author, &open, "newer", -Duration::days(1)).await;
    t.post(&author, &open, "scheduled", Duration::days(1)).await;
    t.post(&author, &closed, "hidden category", -Duration::days(1)).await;
    let mut unpublished = t.post(&author, &open, "unpublished", -Duration::days(1)).await;
    unpublished.is_published = false;
    t.state.posts.save(unpublished).await.unwrap();
    t.comment(&older, &author, "nice").await;
    let app = app!(t);

    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;

    assert_eq!(body["template"], "blog/index.html");
    assert_eq!(titles(&body), vec!["newer", "older"]);
    assert_eq!(body["context"]["page_obj"]["object_list"][1]["comment_count"], 1);
    assert_eq!(body["context"]["page_obj"]["object_list"][0]["comment_count"], 0);
}

#[actix_rt::test]
async fn test_index_paginates_by_ten_and_clamps() {
    let t = setup();
    let author = t.user("author").await;
    let category = t.category("travel", true).await;
    for i in 0..15 {
        t.post(&author, &category, &format!("post {i}"), -Duration::hours(i + 1))
            .await;
    }
    let app = app!(t);

    let get = |uri: &str| test::TestRequest::get().uri(uri).to_request();

    let first: Value = test::call_and_read_body_json(&app, get("/")).await;
    assert_eq!(titles(&first).len(), 10);
    assert_eq!(first["context"]["page_obj"]["num_pages"], 2);
    assert_eq!(first["context"]["page_obj"]["has_next"], true);

    let second: Value = test::call_and_read_body_json(&app, get("/?page=2")).await;
    assert_eq!(titles(&second).len(), 5);
    assert_eq!(second["context"]["page_obj"]["number"], 2);

    let beyond: Value = test::call_and_read_body_json(&app, get("/?page=99")).await;
    assert_eq!(beyond["context"]["page_obj"]["number"], 2);

    let garbage: Value = test::call_and_read_body_json(&app, get("/?page=abc")).await;
    assert_eq!(garbage["context"]["page_obj"]["number"], 1);
}

#[actix_rt::test]
async fn test_category_page() {
    let t = setup();
    let author = t.user("author").await;
    let travel = t.category("travel", true).await;
    let food = t.category("food", true).await;
    t.category("secret", false).await;
    t.post(&author, &travel, "trip", -Duration::hours(1)).await;
    t.post(&author, &food, "soup", -Duration::hours(1)).await;
    let app = app!(t);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/travel/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["template"], "blog/category.html");
    assert_eq!(body["context"]["category"]["slug"], "travel");
    assert_eq!(titles(&body), vec!["trip"]);

    for uri in ["/secret/", "/nowhere/"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[actix_rt::test]
async fn test_owner_profile_includes_hidden_posts() {
    let t = setup();
    let author = t.user("author").await;
    let reader = t.user("reader").await;
    let category = t.category("travel", true).await;
    t.post(&author, &category, "public", -Duration::hours(1)).await;
    t.post(&author, &category, "scheduled", Duration::days(3)).await;
    let app = app!(t);

    let anonymous: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/profile/author/").to_request(),
    )
    .await;
    assert_eq!(anonymous["template"], "blog/profile.html");
    assert_eq!(anonymous["context"]["profile"]["username"], "author");
    assert_eq!(titles(&anonymous), vec!["public"]);

    let req = test::TestRequest::get()
        .uri("/profile/author/")
        .insert_header(t.bearer(&reader))
        .to_request();
    let other: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(titles(&other), vec!["public"]);

    let req = test::TestRequest::get()
        .uri("/profile/author/")
        .insert_header(t.bearer(&author))
        .to_request();
    let own: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(titles(&own), vec!["scheduled", "public"]);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/profile/nobody/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_anonymous_user_is_sent_to_login() {
    let t = setup();
    let app = app!(t);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/create/").to_request()).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=%2Fcreate%2F");
}

#[actix_rt::test]
async fn test_scheduled_post_appears_when_its_time_comes() {
    let t = setup();
    let author = t.user("author").await;
    let category = t.category("travel", true).await;
    let app = app!(t);

    let form = vec![
        ("title", "Tomorrow".to_string()),
        ("text", "Soon".to_string()),
        ("pub_date", "2024-05-02T12:00".to_string()),
        ("category", category.id.to_string()),
        ("location", String::new()),
    ];
    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(t.bearer(&author))
        .set_form(&form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/author/");

    let get = |uri: &str| test::TestRequest::get().uri(uri).to_request();

    let index: Value = test::call_and_read_body_json(&app, get("/")).await;
    assert!(titles(&index).is_empty());
    let feed: Value = test::call_and_read_body_json(&app, get("/travel/")).await;
    assert!(titles(&feed).is_empty());

    let req = test::TestRequest::get()
        .uri("/profile/author/")
        .insert_header(t.bearer(&author))
        .to_request();
    let own: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(titles(&own), vec!["Tomorrow"]);

    t.clock.advance(Duration::days(1));

    let index: Value = test::call_and_read_body_json(&app, get("/")).await;
    assert_eq!(titles(&index), vec!["Tomorrow"]);
    let feed: Value = test::call_and_read_body_json(&app, get("/travel/")).await;
    assert_eq!(titles(&feed), vec!["Tomorrow"]);
}

#[actix_rt::test]
async fn test_invalid_post_form_is_rerendered() {
    let t = setup();
    let author = t.user("author").await;
    t.category("travel", true).await;
    let app = app!(t);

    let form = vec![
        ("title", "   ".to_string()),
        ("text", "Body".to_string()),
        ("pub_date", "yesterday".to_string()),
        ("category", "999".to_string()),
    ];
    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(t.bearer(&author))
        .set_form(&form)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["template"], "blog/create.html");
    let errors = &body["context"]["form"]["errors"];
    assert!(errors.get("title").is_some());
    assert!(errors.get("pub_date").is_some());
    assert_eq!(body["context"]["form"]["data"]["text"], "Body");
    assert_eq!(body["context"]["categories"][0]["slug"], "travel");

    let form = vec![
        ("title", "Trip".to_string()),
        ("text", "Body".to_string()),
        ("pub_date", "2024-04-01".to_string()),
        ("category", "999".to_string()),
    ];
    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(t.bearer(&author))
        .set_form(&form)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["context"]["form"]["errors"].get("category").is_some());
}

#[actix_rt::test]
async fn test_author_edits_and_deletes_post() {
    let t = setup();
    let author = t.user("author").await;
    let category = t.category("travel", true).await;
    let post = t.post(&author, &category, "Before", -Duration::hours(1)).await;
    let comment = t.comment(&post, &author, "hello").await;
    let app = app!(t);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(t.bearer(&author))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["context"]["form"]["data"]["title"], "Before");

    let form = vec![
        ("title", "After".to_string()),
        ("text", "Edited".to_string()),
        ("pub_date", "2024-04-30 08:30".to_string()),
        ("category", category.id.to_string()),
    ];
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(t.bearer(&author))
        .set_form(&form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let stored = t.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "After");
    assert_eq!(
        stored.pub_date,
        Utc.with_ymd_and_hms(2024, 4, 30, 8, 30, 0).unwrap()
    );

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/delete/", post.id))
        .insert_header(t.bearer(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");

    assert!(t.state.posts.find_by_id(post.id).await.unwrap().is_none());
    assert!(t.state.comments.find_by_id(comment.id).await.unwrap().is_none());
}

#[actix_rt::test]
async fn test_non_author_cannot_change_post() {
    let t = setup();
    let author = t.user("author").await;
    let intruder = t.user("intruder").await;
    let category = t.category("travel", true).await;
    let post = t.post(&author, &category, "Mine", -Duration::hours(1)).await;
    let app = app!(t);
    let detail = format!("/posts/{}/", post.id);

    let form = vec![
        ("title", "Hacked".to_string()),
        ("text", "Hacked".to_string()),
        ("pub_date", "2024-04-01".to_string()),
        ("category", category.id.to_string()),
    ];
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(t.bearer(&intruder))
        .set_form(&form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), detail);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/delete/", post.id))
        .insert_header(t.bearer(&intruder))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), detail);

    let stored = t.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Mine");
}

#[actix_rt::test]
async fn test_comment_lifecycle() {
    let t = setup();
    let author = t.user("author").await;
    let reader = t.user("reader").await;
    let category = t.category("travel", true).await;
    let post = t.post(&author, &category, "Trip", -Duration::hours(1)).await;
    let app = app!(t);
    let detail = format!("/posts/{}/", post.id);

    let req = test::TestRequest::post()
        .uri(&format!("/{}/comment/", post.id))
        .insert_header(t.bearer(&reader))
        .set_form([("text", "Great trip")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), detail);

    let comments = t.state.comments.list_for_post(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    let comment = &comments[0].comment;
    assert_eq!(comment.author_id, reader.id);

    // The post author may not touch the reader's comment.
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit_comment/{}/", post.id, comment.id))
        .insert_header(t.bearer(&author))
        .set_form([("text", "Rewritten")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), detail);
    let stored = t.state.comments.find_by_id(comment.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Great trip");

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit_comment/{}/", post.id, comment.id))
        .insert_header(t.bearer(&reader))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["template"], "blog/comment.html");
    assert_eq!(body["context"]["form"]["data"]["text"], "Great trip");

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit_comment/{}/", post.id, comment.id))
        .insert_header(t.bearer(&reader))
        .set_form([("text", "Really great trip")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), detail);
    let stored = t.state.comments.find_by_id(comment.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Really great trip");

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/delete_comment/{}/", post.id, comment.id))
        .insert_header(t.bearer(&reader))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["context"].get("form").is_none());
    assert_eq!(body["context"]["comment"]["text"], "Really great trip");

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/delete_comment/{}/", post.id, comment.id))
        .insert_header(t.bearer(&reader))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), detail);
    assert!(t.state.comments.find_by_id(comment.id).await.unwrap().is_none());
}

#[actix_rt::test]
async fn test_empty_comment_rerenders_detail() {
    let t = setup();
    let author = t.user("author").await;
    let category = t.category("travel", true).await;
    let post = t.post(&author, &category, "Trip", -Duration::hours(1)).await;
    let app = app!(t);

    let req = test::TestRequest::post()
        .uri(&format!("/{}/comment/", post.id))
        .insert_header(t.bearer(&author))
        .set_form([("text", "  ")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["template"], "blog/detail.html");
    assert!(body["context"]["form"]["errors"].get("text").is_some());
}

#[actix_rt::test]
async fn test_comment_on_hidden_post_is_404() {
    let t = setup();
    let author = t.user("author").await;
    let reader = t.user("reader").await;
    let category = t.category("travel", true).await;
    let post = t.post(&author, &category, "Later", Duration::days(1)).await;
    let app = app!(t);

    let req = test::TestRequest::post()
        .uri(&format!("/{}/comment/", post.id))
        .insert_header(t.bearer(&reader))
        .set_form([("text", "First!")])
        .to_request();

    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_comment_under_wrong_post_is_404() {
    let t = setup();
    let author = t.user("author").await;
    let category = t.category("travel", true).await;
    let post = t.post(&author, &category, "One", -Duration::hours(2)).await;
    let other = t.post(&author, &category, "Two", -Duration::hours(1)).await;
    let comment = t.comment(&post, &author, "on one").await;
    let app = app!(t);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit_comment/{}/", other.id, comment.id))
        .insert_header(t.bearer(&author))
        .to_request();

    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_get_comment_url_redirects_to_post() {
    let t = setup();
    let author = t.user("author").await;
    let app = app!(t);

    let req = test::TestRequest::get()
        .uri("/7/comment/")
        .insert_header(t.bearer(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/posts/7/");
}

#[actix_rt::test]
async fn test_edit_profile() {
    let t = setup();
    let author = t.user("author").await;
    t.user("taken").await;
    let app = app!(t);

    let req = test::TestRequest::post()
        .uri("/profile/edit/")
        .insert_header(t.bearer(&author))
        .set_form([
            ("username", "taken"),
            ("first_name", "Leo"),
            ("last_name", ""),
            ("email", ""),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["template"], "blog/user.html");
    assert!(body["context"]["form"]["errors"].get("username").is_some());

    let req = test::TestRequest::post()
        .uri("/profile/edit/")
        .insert_header(t.bearer(&author))
        .set_form([
            ("username", "leo"),
            ("first_name", "Leo"),
            ("last_name", "Tolstoy"),
            ("email", "leo@example.com"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/leo/");

    let stored = t.state.users.find_by_id(author.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "leo");
    assert_eq!(stored.display_name(), "Leo Tolstoy");
    assert_eq!(stored.email.as_deref(), Some("leo@example.com"));
}

#[actix_rt::test]
async fn test_username_claimed_during_save_rerenders_form() {
    let mut t = setup();
    let author = t.user("author").await;
    t.user("taken").await;
    t.state.users = Arc::new(StaleLookupUsers(t.state.users.clone()));
    let app = app!(t);

    let req = test::TestRequest::post()
        .uri("/profile/edit/")
        .insert_header(t.bearer(&author))
        .set_form([("username", "taken")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["template"], "blog/user.html");
    assert!(body["context"]["form"]["errors"].get("username").is_some());

    let req = test::TestRequest::post()
        .uri("/auth/registration/")
        .set_form([
            ("username", "taken"),
            ("password1", "s3cret-pass"),
            ("password2", "s3cret-pass"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["template"], "registration/registration_form.html");
    assert!(body["context"]["form"]["errors"].get("username").is_some());

    let stored = t.state.users.find_by_id(author.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "author");
}

#[actix_rt::test]
async fn test_non_ascii_username_profile_redirect() {
    let t = setup();
    let author = t.user("author").await;
    let app = app!(t);

    let req = test::TestRequest::post()
        .uri("/profile/edit/")
        .insert_header(t.bearer(&author))
        .set_form([("username", "лев")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let target = location(&resp);
    assert_eq!(target, "/profile/%D0%BB%D0%B5%D0%B2/");

    let resp = test::call_service(&app, test::TestRequest::get().uri(&target).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["context"]["profile"]["username"], "лев");
}

#[actix_rt::test]
async fn test_register_login_and_logout() {
    let t = setup();
    let app = app!(t);

    let req = test::TestRequest::post()
        .uri("/auth/registration/")
        .set_form([
            ("username", "newbie"),
            ("email", ""),
            ("password1", "s3cret-pass"),
            ("password2", "s3cret-pass"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap()
        .into_owned();

    let req = test::TestRequest::get()
        .uri("/create/")
        .cookie(cookie)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/auth/login/?next=%2Fprofile%2Fnewbie%2F")
        .set_form([("username", "newbie"), ("password", "wrong-password")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["context"]["form"]["errors"].get("__all__").is_some());
    assert_eq!(body["context"]["next"], "/profile/newbie/");

    let req = test::TestRequest::post()
        .uri("/auth/login/?next=%2Fprofile%2Fnewbie%2F")
        .set_form([("username", "newbie"), ("password", "s3cret-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/newbie/");

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/auth/logout/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let removal = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap()
        .into_owned();
    assert_eq!(removal.value(), "");
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["template"], "registration/logged_out.html");
}

#[actix_rt::test]
async fn test_registration_rejects_taken_username() {
    let t = setup();
    t.user("author").await;
    let app = app!(t);

    let req = test::TestRequest::post()
        .uri("/auth/registration/")
        .set_form([
            ("username", "author"),
            ("password1", "s3cret-pass"),
            ("password2", "different"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    let errors = &body["context"]["form"]["errors"];
    assert!(errors.get("username").is_some());
    assert!(errors.get("password2").is_some());
}

#[actix_rt::test]
async fn test_deleted_user_session_is_rejected() {
    let t = setup();
    let ghost = t.user("ghost").await;
    let header = t.bearer(&ghost);
    t.state.users.delete(ghost.id).await.unwrap();
    let app = app!(t);

    let req = test::TestRequest::get()
        .uri("/profile/edit/")
        .insert_header(header)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(location(&resp).starts_with("/auth/login/"));
}

#[actix_rt::test]
async fn test_unknown_paths_are_404() {
    let t = setup();
    let app = app!(t);

    for uri in ["/posts/abc/", "/posts/1/", "/a/b/c/"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[actix_rt::test]
async fn test_health_check_reports_storage() {
    let t = setup();
    let app = app!(t);

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/health/").to_request(),
    )
    .await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}
