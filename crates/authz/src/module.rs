use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use atlas_db::{NewUser, UserRepository, ROLE_ADMIN, ROLE_USER};
use atlas_http::{AppError, AppResult};
use atlas_kernel::{InitCtx, Module};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AuthzError;
use crate::password::{hash_password, verify_password};
use crate::token::TokenService;

/// Accounts seeded when fixtures are enabled: (email, roles).
const FIXTURE_USERS: &[(&str, &str)] = &[
    ("user@bookapi.com", ROLE_USER),
    ("admin@bookapi.com", ROLE_ADMIN),
];

/// Core module providing the login endpoint and user fixtures.
pub struct AuthModule {
    state: AuthState,
}

#[derive(Clone)]
struct AuthState {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
}

impl AuthModule {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenService) -> Self {
        Self {
            state: AuthState { users, tokens },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if !ctx.settings.database.seed_fixtures || self.state.users.count_users().await? > 0 {
            return Ok(());
        }

        for (email, role) in FIXTURE_USERS {
            let password_hash = hash_password(&ctx.settings.database.fixture_password)
                .with_context(|| format!("failed to hash password for {email}"))?;
            self.state
                .users
                .insert_user(NewUser {
                    email: (*email).to_string(),
                    password_hash,
                    roles: vec![(*role).to_string()],
                })
                .await?;
        }

        tracing::info!(
            module = self.name(),
            users = FIXTURE_USERS.len(),
            "user fixtures loaded"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/login", post(login))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/login": {
                    "post": {
                        "summary": "Exchange credentials for a bearer token",
                        "tags": ["Auth"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/LoginRequest" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Token issued",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/LoginResponse" }
                                    }
                                }
                            },
                            "401": {
                                "description": "Invalid credentials",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "LoginRequest": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string", "format": "email" },
                            "password": { "type": "string" }
                        },
                        "required": ["username", "password"]
                    },
                    "LoginResponse": {
                        "type": "object",
                        "properties": {
                            "token": { "type": "string" }
                        },
                        "required": ["token"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let users = self.state.users.count_users().await?;
        tracing::info!(
            module = self.name(),
            users = users,
            token_ttl_secs = self.state.tokens.ttl_secs(),
            "auth module started"
        );
        Ok(())
    }
}

/// Verify credentials and issue a bearer token.
async fn login(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = state
        .users
        .find_user_by_email(&request.username)
        .await?
        .ok_or(AuthzError::InvalidCredentials)?;

    let hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&request.password, &hash))
        .await
        .map_err(|err| AppError::Internal(err.into()))??;

    if !verified {
        tracing::debug!(email = %user.email, "login rejected: wrong password");
        return Err(AuthzError::InvalidCredentials.into());
    }

    let token = state.tokens.issue(&user)?;
    tracing::info!(email = %user.email, "token issued");
    Ok(Json(LoginResponse { token }))
}
