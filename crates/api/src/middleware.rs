use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use storefront_core::{Actor, Role, UserId};

use crate::app::errors;
use crate::context::ActorContext;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Resolve the acting user from headers set by the upstream gateway.
///
/// A missing or malformed identity is rejected with 401. A missing role means
/// a customer.
pub async fn actor_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let actor = extract_actor(req.headers())
        .map_err(|msg| errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", msg))?;

    req.extensions_mut().insert(ActorContext::new(actor));

    Ok(next.run(req).await)
}

fn extract_actor(headers: &HeaderMap) -> Result<Actor, &'static str> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .ok_or("missing x-user-id header")?
        .to_str()
        .map_err(|_| "malformed x-user-id header")?
        .trim();
    let user_id: UserId = user_id.parse().map_err(|_| "malformed x-user-id header")?;

    let role = match headers.get(USER_ROLE_HEADER) {
        None => Role::Customer,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.parse::<Role>().ok())
            .ok_or("unknown x-user-role")?,
    };

    Ok(Actor::new(user_id, role))
}
