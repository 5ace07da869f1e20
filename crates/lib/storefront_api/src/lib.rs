//! # storefront_api
//!
//! HTTP API library for the storefront's authentication and admin surface.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{MethodRouter, delete, get, patch, post, put};
use storefront_core::auth::AuthError;
use storefront_core::auth::admin::AdminService;
use storefront_core::auth::reset::PasswordResetService;
use storefront_core::auth::session::SessionService;
use storefront_core::clock::Clock;
use storefront_core::models::permissions::{Action, Resource};
use storefront_core::notify::ResetNotifier;
use storefront_core::store::AuthStore;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{admin, auth, health, password_reset};
use crate::middleware::auth::{PermissionGate, require_admin, require_auth, require_permission};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    pub sessions: Arc<SessionService>,
    pub resets: Arc<PasswordResetService>,
    pub admins: Arc<AdminService>,
}

impl AppState {
    /// Wire the core services over one store, notifier and clock.
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn AuthStore>,
        notifier: Arc<dyn ResetNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let settings = config.auth_settings();
        let sessions = SessionService::new(store.clone(), clock.clone(), &settings)?;
        let resets = PasswordResetService::new(store.clone(), notifier, clock.clone(), &settings);
        let admins = AdminService::new(store, clock, &settings);
        Ok(Self {
            config,
            sessions: Arc::new(sessions),
            resets: Arc::new(resets),
            admins: Arc::new(admins),
        })
    }
}

/// Attach a permission gate to a single method route.
fn gated(
    route: MethodRouter<AppState>,
    resource: Resource,
    action: Action,
) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(
        PermissionGate::new(resource, action),
        require_permission,
    ))
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_API_HEALTH, get(health::health_handler))
        .route(routes::POST_AUTH_SIGNUP, post(auth::signup_handler))
        .route(routes::POST_AUTH_SIGNIN, post(auth::signin_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(
            routes::POST_AUTH_FORGOT_PASSWORD,
            post(password_reset::forgot_password_handler),
        )
        .route(
            routes::AUTH_RESET_PASSWORD,
            get(password_reset::verify_reset_handler)
                .post(password_reset::reset_password_handler),
        )
        .route(
            routes::POST_AUTH_VERIFY_PASSWORD_RESET,
            post(password_reset::reset_password_handler),
        )
        .route(
            routes::POST_ADMIN_AUTH_SIGNIN,
            post(admin::admin_signin_handler),
        );

    // Customer routes (require a valid access token)
    let protected = Router::new()
        .route(routes::GET_AUTH_ME, get(auth::me_handler))
        .route(
            routes::POST_AUTH_CHANGE_PASSWORD,
            post(auth::change_password_handler),
        )
        .layer(from_fn_with_state(state.clone(), require_auth));

    // Admin routes (require an administrative caller, then per-route permission)
    let admin_routes = Router::new()
        .route(routes::GET_ADMIN_ME, get(admin::admin_me_handler))
        .route(routes::GET_ADMIN_ACCESS, get(admin::route_access_handler))
        .route(
            routes::ADMIN_ADMINS,
            gated(
                get(admin::list_admins_handler),
                Resource::Admins,
                Action::View,
            )
            .merge(gated(
                post(admin::create_admin_handler),
                Resource::Admins,
                Action::Create,
            )),
        )
        .route(
            routes::DELETE_ADMIN_ADMINS_ID,
            gated(
                delete(admin::delete_admin_handler),
                Resource::Admins,
                Action::Delete,
            ),
        )
        .route(
            routes::PUT_ADMIN_ADMINS_ID_PERMISSIONS,
            gated(
                put(admin::update_admin_permissions_handler),
                Resource::Admins,
                Action::Update,
            ),
        )
        .route(
            routes::PATCH_ADMIN_USERS_ID_STATUS,
            gated(
                patch(admin::update_user_status_handler),
                Resource::Users,
                Action::Update,
            ),
        )
        .route(
            routes::DELETE_ADMIN_USERS_ID,
            gated(
                delete(admin::delete_user_handler),
                Resource::Users,
                Action::Delete,
            ),
        )
        .layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(admin_routes)
        .layer(cors)
        .with_state(state)
}
