//! Standard engine wiring shared by every [`Service`].

use axum::{http::Uri, routing::get, Json};
use serde::{Deserialize, Serialize};

use crate::{
    config::EngineConfig,
    error::{ApiError, EngineError},
    middleware::auth::TokenValidator,
    service::Service,
};

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Apply the engine's security and built-in routes to `service`.
///
/// Registers bearer-token security keyed with the configured `JWT.secret`,
/// the open `GET /health` readiness route, and a JSON 404 fallback. Callers
/// add their own routes afterwards; registering `/health` again panics.
pub fn configure_service(service: &mut Service, config: &EngineConfig) -> Result<(), EngineError> {
    let validator = TokenValidator::new(config.jwt_secret()?);
    service.register_security(validator);
    service.route("/health", get(health));
    service.fallback(not_found);
    Ok(())
}

/// `GET /health`
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::JWT_SECRET, error::ErrorResponse};
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, Request, StatusCode},
    };
    use chrono::Duration;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn configured() -> (Service, TokenValidator) {
        let mut config = EngineConfig::default();
        config.set(JWT_SECRET, "router-test-secret");
        let mut service = Service::ignite(&config).unwrap();
        configure_service(&mut service, &config).unwrap();
        service.route("/graph", get(|| async { "graph" }));
        (service, TokenValidator::new("router-test-secret"))
    }

    async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let (mut service, _) = configured();
        let resp = service
            .assemble()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: HealthResponse = body_json(resp).await;
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn protected_route_requires_token() {
        let (mut service, _) = configured();
        let resp = service
            .assemble()
            .oneshot(Request::get("/graph").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = body_json(resp).await;
        assert_eq!(body.code, "unauthorized");
    }

    #[tokio::test]
    async fn protected_route_accepts_valid_token() {
        let (mut service, validator) = configured();
        let token = validator.issue("tester", Duration::minutes(1));
        let resp = service
            .assemble()
            .oneshot(
                Request::get("/graph")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (mut service, validator) = configured();
        let token = validator.issue("tester", Duration::minutes(1));
        let resp = service
            .assemble()
            .oneshot(
                Request::get("/nope")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = body_json(resp).await;
        assert_eq!(body.code, "not_found");
    }
}
