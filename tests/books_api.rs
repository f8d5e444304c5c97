use atlas_db::{fixtures, BookRepository, ROLE_ADMIN, ROLE_USER};
use atlas_kernel::{InitCtx, Settings};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use bookshelf_api::{build_registry, Services};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    services: Services,
    admin_token: String,
    user_token: String,
}

impl TestApp {
    /// Full router over a store holding the fixture catalog. Users are not
    /// seeded; tokens are issued directly.
    async fn spawn() -> Self {
        let mut settings = Settings::default();
        settings.database.seed_fixtures = false;

        let services = Services::from_settings(&settings).unwrap();
        fixtures::load_catalog(services.store.as_ref()).await.unwrap();
        Self::boot(settings, services).await
    }

    /// Same router, with the catalog and user accounts seeded by the
    /// modules themselves at boot.
    async fn spawn_seeded() -> Self {
        let settings = Settings::default();
        let services = Services::from_settings(&settings).unwrap();
        Self::boot(settings, services).await
    }

    async fn boot(settings: Settings, services: Services) -> Self {
        let registry = build_registry(&settings, &services);
        registry
            .boot(&InitCtx {
                settings: &settings,
            })
            .await
            .unwrap();
        let router = atlas_http::build_router(&registry, &settings);

        let admin_token = services
            .tokens
            .issue_for("admin@bookapi.com", vec![ROLE_ADMIN.into(), ROLE_USER.into()])
            .unwrap();
        let user_token = services
            .tokens
            .issue_for("user@bookapi.com", vec![ROLE_USER.into()])
            .unwrap();

        Self {
            router,
            services,
            admin_token,
            user_token,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn get_versioned(&self, uri: &str, version: &str) -> Response {
        self.send(
            Request::get(uri)
                .header(header::ACCEPT, format!("application/json; version={version}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn send_json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: impl Into<Body>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "localhost:8080")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(body.into()).unwrap()).await
    }

    async fn admin(&self, method: &str, uri: &str, body: Value) -> Response {
        self.send_json(method, uri, Some(&self.admin_token), body.to_string())
            .await
    }

    async fn book_count(&self) -> u64 {
        self.services.store.count_books().await.unwrap()
    }
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn ids(list: &Value) -> Vec<u64> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|book| book["id"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn list_defaults_to_first_page_of_three() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/books").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let list = body_json(response).await;
    assert_eq!(ids(&list), vec![1, 2, 3]);
    assert_eq!(list[0]["title"], "Title-0");
    assert_eq!(list[0]["coverText"], "CoverText-0");
    assert!(list[0]["author"]["firstName"].is_string());
}

#[tokio::test]
async fn list_pages_in_insertion_order() {
    let app = TestApp::spawn().await;

    let list = body_json(app.get("/api/books?page=2&limit=5").await).await;
    assert_eq!(ids(&list), vec![6, 7, 8, 9, 10]);

    let list = body_json(app.get("/api/books?page=0&limit=2").await).await;
    assert_eq!(ids(&list), vec![1, 2]);

    let list = body_json(app.get("/api/books?page=1&limit=1000").await).await;
    assert_eq!(ids(&list).len(), fixtures::FIXTURE_BOOKS);

    let list = body_json(app.get("/api/books?page=9").await).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn list_rejects_non_numeric_paging() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/books?limit=three").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn repeated_listing_is_served_from_cache() {
    let app = TestApp::spawn().await;

    let first = body_bytes(app.get("/api/books?page=1&limit=3").await).await;
    let second = body_bytes(app.get("/api/books?page=1&limit=3").await).await;
    assert_eq!(first, second);
    assert_eq!(
        app.services.cache.tagged_keys("booksCache"),
        vec!["getAllBooks-1-3".to_string()]
    );
}

#[tokio::test]
async fn listing_uses_version_one_regardless_of_accept() {
    let app = TestApp::spawn().await;
    let created = app
        .admin(
            "POST",
            "/api/books",
            json!({"title": "Dune", "coverText": "Spice", "comment": "classic"}),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);

    let list = body_json(app.get_versioned("/api/books?page=21&limit=1", "2.0").await).await;
    assert_eq!(list[0]["title"], "Dune");
    assert!(list[0].get("comment").is_none());
}

#[tokio::test]
async fn detail_returns_book_or_404() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/books/4").await;
    assert_eq!(response.status(), StatusCode::OK);
    let book = body_json(response).await;
    assert_eq!(book["id"], 4);
    assert_eq!(book["title"], "Title-3");

    let response = app.get("/api/books/999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "not_found");

    assert_eq!(app.get("/api/books/abc").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn detail_comment_depends_on_requested_version() {
    let app = TestApp::spawn().await;
    let created = body_json(
        app.admin(
            "POST",
            "/api/books",
            json!({"title": "Dune", "coverText": "Spice", "comment": "classic"}),
        )
        .await,
    )
    .await;
    let uri = format!("/api/books/{}", created["id"]);

    let default = body_json(app.get(&uri).await).await;
    assert!(default.get("comment").is_none());

    let v1 = body_json(app.get_versioned(&uri, "1.0").await).await;
    assert!(v1.get("comment").is_none());

    let v2 = body_json(app.get_versioned(&uri, "2.0").await).await;
    assert_eq!(v2["comment"], "classic");
}

#[tokio::test]
async fn create_returns_201_with_location_and_every_field() {
    let app = TestApp::spawn().await;

    let response = app
        .admin(
            "POST",
            "/api/books",
            json!({"title": "Dune", "coverText": "Spice", "comment": "classic", "idAuthor": 3}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let location = response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(location, "http://localhost:8080/api/books/21");

    let created = body_json(response).await;
    assert_eq!(created["id"], 21);
    assert_eq!(created["comment"], "classic");
    assert_eq!(created["author"]["id"], 3);
    assert_eq!(created["author"]["firstName"], "FirstName-2");

    let path = location.trim_start_matches("http://localhost:8080");
    let fetched = body_json(app.get(path).await).await;
    assert_eq!(fetched["title"], "Dune");
    assert_eq!(fetched["coverText"], "Spice");
    assert_eq!(app.book_count().await, 21);
}

#[tokio::test]
async fn create_without_usable_author_stores_no_author() {
    let app = TestApp::spawn().await;

    for id_author in [json!(999), json!("nope"), json!(-1), json!(null)] {
        let response = app
            .admin(
                "POST",
                "/api/books",
                json!({"title": "Orphan", "coverText": "Alone", "idAuthor": id_author}),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert!(created.get("author").is_none());

        let id = created["id"].as_u64().unwrap();
        let stored = app.services.store.find_book(id).await.unwrap().unwrap();
        assert_eq!(stored.author_id, None);
    }

    let response = app
        .admin(
            "POST",
            "/api/books",
            json!({"title": "Stringly", "coverText": "Typed", "idAuthor": "3"}),
        )
        .await;
    assert_eq!(body_json(response).await["author"]["id"], 3);
}

#[tokio::test]
async fn create_with_missing_fields_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .admin("POST", "/api/books", json!({"comment": "no title"}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
    let paths: Vec<&str> = body["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|violation| violation["propertyPath"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["coverText", "title"]);

    let long_title = "x".repeat(256);
    let response = app
        .admin(
            "POST",
            "/api/books",
            json!({"title": long_title, "coverText": "Spice"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.book_count().await, fixtures::FIXTURE_BOOKS as u64);
}

#[tokio::test]
async fn create_with_malformed_json_is_a_bad_request() {
    let app = TestApp::spawn().await;

    let response = app
        .send_json("POST", "/api/books", Some(&app.admin_token), "{\"title\": ")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "bad_request");
    assert_eq!(app.book_count().await, fixtures::FIXTURE_BOOKS as u64);
}

#[tokio::test]
async fn mutations_require_an_admin_token() {
    let app = TestApp::spawn().await;
    let payload = json!({"title": "Dune", "coverText": "Spice"}).to_string();

    let response = app
        .send_json("POST", "/api/books", None, payload.clone())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send_json("POST", "/api/books", Some("not-a-token"), payload.clone())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send_json("POST", "/api/books", Some(&app.user_token), payload.clone())
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"]["message"],
        "You are not authorized to create a book."
    );

    let response = app
        .send_json("PUT", "/api/books/1", Some(&app.user_token), payload)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send_json("DELETE", "/api/books/1", None, Body::empty())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(app.book_count().await, fixtures::FIXTURE_BOOKS as u64);
}

#[tokio::test]
async fn update_copies_title_and_cover_text_only() {
    let app = TestApp::spawn().await;
    let created = body_json(
        app.admin(
            "POST",
            "/api/books",
            json!({"title": "Dune", "coverText": "Spice", "comment": "classic", "idAuthor": 1}),
        )
        .await,
    )
    .await;
    let uri = format!("/api/books/{}", created["id"]);

    let response = app
        .admin(
            "PUT",
            &uri,
            json!({"title": "Dune Messiah", "coverText": "More spice", "comment": "ignored", "idAuthor": 2}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(response).await.is_empty());

    let updated = body_json(app.get_versioned(&uri, "2.0").await).await;
    assert_eq!(updated["title"], "Dune Messiah");
    assert_eq!(updated["coverText"], "More spice");
    assert_eq!(updated["comment"], "classic");
    assert_eq!(updated["author"]["id"], 2);
}

#[tokio::test]
async fn update_without_a_known_author_clears_it() {
    let app = TestApp::spawn().await;
    let created = body_json(
        app.admin(
            "POST",
            "/api/books",
            json!({"title": "Dune", "coverText": "Spice", "idAuthor": 1}),
        )
        .await,
    )
    .await;
    let id = created["id"].as_u64().unwrap();
    let uri = format!("/api/books/{id}");

    let response = app
        .admin("PUT", &uri, json!({"title": "Dune", "coverText": "Spice", "idAuthor": 999}))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let stored = app.services.store.find_book(id).await.unwrap().unwrap();
    assert_eq!(stored.author_id, None);

    let response = app
        .admin("PUT", &uri, json!({"title": "Dune", "coverText": "Spice", "idAuthor": 2}))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app
        .admin("PUT", &uri, json!({"title": "Dune", "coverText": "Spice"}))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let stored = app.services.store.find_book(id).await.unwrap().unwrap();
    assert_eq!(stored.author_id, None);
    assert!(body_json(app.get(&uri).await).await.get("author").is_none());
}

#[tokio::test]
async fn empty_cover_text_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .admin("POST", "/api/books", json!({"title": "Dune", "coverText": ""}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["details"][0]["propertyPath"], "coverText");
    assert_eq!(body["error"]["details"][0]["code"], "length");
    assert_eq!(app.book_count().await, fixtures::FIXTURE_BOOKS as u64);
}

#[tokio::test]
async fn invalid_update_leaves_book_untouched() {
    let app = TestApp::spawn().await;

    let response = app
        .admin("PUT", "/api/books/1", json!({"title": ""}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let book = body_json(app.get("/api/books/1").await).await;
    assert_eq!(book["title"], "Title-0");
    assert_eq!(book["coverText"], "CoverText-0");

    let response = app
        .admin("PUT", "/api/books/999", json!({"title": "x", "coverText": "y"}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_book_and_refreshes_listing() {
    let app = TestApp::spawn().await;

    let before = body_json(app.get("/api/books").await).await;
    assert_eq!(ids(&before), vec![1, 2, 3]);

    let response = app.admin("DELETE", "/api/books/1", Value::Null).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(response).await.is_empty());

    assert_eq!(app.get("/api/books/1").await.status(), StatusCode::NOT_FOUND);
    let after = body_json(app.get("/api/books").await).await;
    assert_eq!(ids(&after), vec![2, 3, 4]);

    let response = app.admin("DELETE", "/api/books/1", Value::Null).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_and_update_refresh_cached_listing() {
    let app = TestApp::spawn().await;

    let before = body_json(app.get("/api/books?page=1&limit=1").await).await;
    assert_eq!(before[0]["title"], "Title-0");

    let response = app
        .admin("PUT", "/api/books/1", json!({"title": "Renamed", "coverText": "New"}))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let after = body_json(app.get("/api/books?page=1&limit=1").await).await;
    assert_eq!(after[0]["title"], "Renamed");

    let last_page = body_json(app.get("/api/books?page=21&limit=1").await).await;
    assert_eq!(last_page, json!([]));
    let response = app
        .admin("POST", "/api/books", json!({"title": "New", "coverText": "Book"}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let last_page = body_json(app.get("/api/books?page=21&limit=1").await).await;
    assert_eq!(last_page[0]["title"], "New");
}

#[tokio::test]
async fn login_token_authorizes_admin_writes() {
    let app = TestApp::spawn_seeded().await;
    assert_eq!(app.book_count().await, fixtures::FIXTURE_BOOKS as u64);

    let response = app
        .send_json(
            "POST",
            "/api/auth/login",
            None,
            json!({"username": "admin@bookapi.com", "password": "pass1234"}).to_string(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .send_json(
            "POST",
            "/api/books",
            Some(&token),
            json!({"title": "Dune", "coverText": "Spice"}).to_string(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send_json(
            "POST",
            "/api/auth/login",
            None,
            json!({"username": "user@bookapi.com", "password": "pass1234"}).to_string(),
        )
        .await;
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();
    let response = app
        .send_json(
            "DELETE",
            "/api/books/1",
            Some(&token),
            Body::empty(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn platform_endpoints_are_served() {
    let app = TestApp::spawn().await;

    let response = app.get("/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    assert_eq!(app.get("/api/books/health").await.status(), StatusCode::OK);

    let spec = body_json(app.get("/docs/openapi.json").await).await;
    assert!(spec["paths"]["/api/books"]["post"].is_object());
    assert!(spec["paths"]["/api/books/{id}"]["delete"].is_object());
    assert!(spec["paths"]["/api/auth/login"]["post"].is_object());
    assert!(spec["components"]["schemas"]["BookPayload"].is_object());
}
