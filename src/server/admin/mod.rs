mod limits;
mod tenants;
mod tokens;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Tenant routes
        .route("/tenants", post(tenants::create_tenant))
        .route("/tenants", get(tenants::list_tenants))
        .route("/tenants/{id}", get(tenants::get_tenant))
        .route("/tenants/{id}", patch(tenants::update_tenant))
        .route("/tenants/{id}", delete(tenants::delete_tenant))
        .route("/tenants/{id}/users", get(users::list_tenant_users))
        // User routes
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", delete(users::delete_user))
        // Token routes
        .route("/tokens", post(tokens::create_token))
        .route("/tokens/{id}", delete(tokens::delete_token))
        // Tier limit routes
        .route("/limits/{tier}", get(limits::get_limits))
        .route("/limits/{tier}", put(limits::set_limits))
}
