pub mod handlers;
pub mod models;

use async_trait::async_trait;
use atlas_authz::{require_role, RoleGuard, TokenService};
use atlas_db::ROLE_ADMIN;
use atlas_kernel::{InitCtx, Module};
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::json;

use handlers::BooksState;

const CREATE_DENIED: &str = "You are not authorized to create a book.";
const UPDATE_DENIED: &str = "You are not authorized to update a book.";
const DELETE_DENIED: &str = "You are not authorized to delete a book.";

/// The book catalog: listing, detail and admin-only mutations.
pub struct BooksModule {
    state: BooksState,
    tokens: TokenService,
}

impl BooksModule {
    pub fn new(state: BooksState, tokens: TokenService) -> Self {
        Self { state, tokens }
    }

    fn admin_only(&self, message: &'static str) -> RoleGuard {
        RoleGuard::new(self.tokens.clone(), ROLE_ADMIN, message)
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            default_version = %self.state.versioning.default_version(),
            max_page_size = self.state.max_page_size,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        let create_guard = self.admin_only(CREATE_DENIED);
        let update_guard = self.admin_only(UPDATE_DENIED);
        let delete_guard = self.admin_only(DELETE_DENIED);

        Router::new()
            .route("/", get(handlers::list_books))
            .route(
                "/",
                post(handlers::create_book)
                    .layer(middleware::from_fn_with_state(create_guard, require_role)),
            )
            .route("/health", get(handlers::health))
            .route("/{id}", get(handlers::get_book))
            .route(
                "/{id}",
                put(handlers::update_book)
                    .layer(middleware::from_fn_with_state(update_guard, require_role)),
            )
            .route(
                "/{id}",
                delete(handlers::delete_book)
                    .layer(middleware::from_fn_with_state(delete_guard, require_role)),
            )
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64" }
        });
        let payload_body = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/BookPayload" }
                }
            }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books, one page at a time",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "page", "in": "query", "schema": { "type": "integer", "default": 1 } },
                            { "name": "limit", "in": "query", "schema": { "type": "integer", "default": 3 } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Books of the requested page (schema version 1.0)",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "400": error("Non-numeric page or limit")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "security": [{ "bearerAuth": [] }],
                        "requestBody": payload_body.clone(),
                        "responses": {
                            "201": {
                                "description": "Book created; Location points at its detail endpoint",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "400": error("Malformed body or validation failure"),
                            "401": error("Missing or invalid bearer token"),
                            "403": error("Caller is not an administrator")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Book detail; send `Accept: application/json; version=2.0` for newer fields",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "responses": {
                            "200": {
                                "description": "The book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "404": error("Unknown book")
                        }
                    },
                    "put": {
                        "summary": "Replace a book's title and cover text",
                        "tags": ["Books"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": [id_param.clone()],
                        "requestBody": payload_body,
                        "responses": {
                            "204": { "description": "Book updated" },
                            "400": error("Malformed body or validation failure"),
                            "401": error("Missing or invalid bearer token"),
                            "403": error("Caller is not an administrator"),
                            "404": error("Unknown book")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": [id_param],
                        "responses": {
                            "204": { "description": "Book deleted" },
                            "401": error("Missing or invalid bearer token"),
                            "403": error("Caller is not an administrator"),
                            "404": error("Unknown book")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Author": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "firstName": { "type": "string" },
                            "lastName": { "type": "string" }
                        }
                    },
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "title": { "type": "string" },
                            "coverText": { "type": "string" },
                            "comment": {
                                "type": "string",
                                "description": "Only present from schema version 2.0"
                            },
                            "author": { "$ref": "#/components/schemas/Author" }
                        },
                        "required": ["id", "title", "coverText"]
                    },
                    "BookPayload": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "minLength": 1, "maxLength": 255 },
                            "coverText": { "type": "string", "minLength": 1 },
                            "comment": { "type": "string" },
                            "idAuthor": { "type": "integer", "format": "int64" }
                        },
                        "required": ["title", "coverText"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let dropped = self.state.cache.invalidate_tags(&[handlers::BOOKS_CACHE_TAG]).await;
        tracing::info!(module = self.name(), cached_pages = dropped, "books module stopped");
        Ok(())
    }
}
