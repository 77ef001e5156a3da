use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, savings, state::AppState, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(savings::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use regex::Regex;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::users::memory::MemoryUserRepo;

    fn test_app() -> Router {
        build_app(AppState::fake(Arc::new(MemoryUserRepo::new())))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn register_body(email: &str) -> Value {
        json!({
            "firstName": "Jane",
            "middleName": "A.",
            "lastName": "Doe",
            "email": email,
            "password": "Passw0rd!",
            "dateOfBirth": "1990-01-01",
            "phoneNumber": "1234567890"
        })
    }

    async fn register(app: &Router, email: &str) -> Value {
        let (status, body) = send(app, "POST", "/auth/register", None, Some(register_body(email))).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    fn token<'a>(body: &'a Value, key: &str) -> &'a str {
        body[key].as_str().expect("token present")
    }

    #[tokio::test]
    async fn health_is_ok() {
        let res = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_ignores_client_role_and_hides_secrets() {
        let app = test_app();
        let mut body = register_body("a@x.com");
        body["role"] = json!("ADMIN");

        let (status, out) = send(&app, "POST", "/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(out["message"], "User registered");
        assert_eq!(out["role"], "CUSTOMER");
        assert_eq!(out["user"]["role"], "CUSTOMER");
        assert_eq!(out["user"]["email"], "a@x.com");
        assert_eq!(out["user"]["dateOfBirth"], "1990-01-01");

        let account = out["user"]["accountNumber"].as_str().unwrap();
        assert!(Regex::new(r"^\d{12}$").unwrap().is_match(account));

        assert!(out["access_token"].is_string());
        assert!(out["refresh_token"].is_string());
        assert!(out["user"].get("password").is_none());
        assert!(out["user"].get("passwordHash").is_none());
        assert!(out["user"].get("refreshTokenHash").is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = test_app();
        register(&app, "dup@x.com").await;

        let (status, out) =
            send(&app, "POST", "/auth/register", None, Some(register_body("dup@x.com"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(out["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn invalid_registration_is_bad_request() {
        let app = test_app();
        let mut body = register_body("not-an-email");
        let (status, _) = send(&app, "POST", "/auth/register", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        body["email"] = json!("ok@x.com");
        body["password"] = json!("short");
        let (status, out) = send(&app, "POST", "/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(out["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn unreadable_bodies_use_the_error_envelope() {
        let app = test_app();

        let mut missing_name = register_body("a@x.com");
        missing_name.as_object_mut().unwrap().remove("firstName");
        let (status, out) = send(&app, "POST", "/auth/register", None, Some(missing_name)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(out["error"]["code"], "BAD_REQUEST");
        assert!(out["error"]["message"].as_str().unwrap().contains("firstName"));

        let req = Request::post("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let out: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(out["error"]["code"], "BAD_REQUEST");

        let reg = register(&app, "saver@x.com").await;
        let (status, out) = send(
            &app,
            "POST",
            "/savings/deposit",
            Some(token(&reg, "access_token")),
            Some(json!({ "amount": "lots" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(out["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn bad_logins_look_the_same() {
        let app = test_app();
        register(&app, "a@x.com").await;

        let (s1, wrong) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "a@x.com", "password": "wrong"})),
        )
        .await;
        let (s2, unknown) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "nouser@x.com", "password": "whatever"})),
        )
        .await;

        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s2, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);
    }

    #[tokio::test]
    async fn login_returns_pair_and_role() {
        let app = test_app();
        register(&app, "a@x.com").await;

        let (status, out) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "a@x.com", "password": "Passw0rd!"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out["role"], "CUSTOMER");
        assert!(out["access_token"].is_string());
        assert!(out["refresh_token"].is_string());
    }

    #[tokio::test]
    async fn refresh_rotates_tokens() {
        let app = test_app();
        let reg = register(&app, "a@x.com").await;
        let old = token(&reg, "refresh_token").to_owned();

        let (status, rotated) = send(
            &app,
            "POST",
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": old })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(token(&rotated, "refresh_token"), old);

        let (status, _) = send(
            &app,
            "POST",
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": old })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Bearer form works too.
        let (status, _) = send(
            &app,
            "POST",
            "/auth/refresh",
            Some(token(&rotated, "refresh_token")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn token_kinds_are_not_interchangeable() {
        let app = test_app();
        let reg = register(&app, "a@x.com").await;

        let (status, _) = send(
            &app,
            "POST",
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": token(&reg, "access_token") })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            "GET",
            "/users/profile",
            Some(token(&reg, "refresh_token")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_revokes_session() {
        let app = test_app();
        let reg = register(&app, "a@x.com").await;
        let access = token(&reg, "access_token");

        for _ in 0..2 {
            let (status, out) = send(&app, "POST", "/auth/logout", Some(access), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(out["message"], "Successfully logged out and session revoked.");
        }

        let (status, out) = send(
            &app,
            "POST",
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": token(&reg, "refresh_token") })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(out["error"]["message"], "Session revoked or user not found.");
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let app = test_app();
        for (method, uri) in [
            ("GET", "/users/profile"),
            ("POST", "/auth/logout"),
            ("GET", "/savings/balance"),
        ] {
            let (status, _) = send(&app, method, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn profile_returns_public_fields() {
        let app = test_app();
        let reg = register(&app, "a@x.com").await;

        let (status, out) = send(
            &app,
            "GET",
            "/users/profile",
            Some(token(&reg, "access_token")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out["name"], "Jane A. Doe");
        assert_eq!(out["email"], "a@x.com");
        assert_eq!(out["role"], "CUSTOMER");
        assert_eq!(out["balance"], "0");
        assert!(out["createdAt"].is_string());
        assert!(out.get("passwordHash").is_none());
        assert!(out.get("refreshTokenHash").is_none());
    }

    #[tokio::test]
    async fn savings_flow() {
        let app = test_app();
        let reg = register(&app, "saver@x.com").await;
        let access = token(&reg, "access_token");

        let (status, out) = send(
            &app,
            "POST",
            "/savings/deposit",
            Some(access),
            Some(json!({ "amount": "150.25" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out["balance"], "150.25");

        let (status, out) = send(
            &app,
            "POST",
            "/savings/withdraw",
            Some(access),
            Some(json!({ "amount": 50 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out["balance"], "100.25");

        let (status, out) = send(
            &app,
            "POST",
            "/savings/withdraw",
            Some(access),
            Some(json!({ "amount": "1000" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(out["error"]["code"], "UNPROCESSABLE_ENTITY");

        let (status, _) = send(
            &app,
            "POST",
            "/savings/deposit",
            Some(access),
            Some(json!({ "amount": "-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, out) = send(&app, "GET", "/savings/balance", Some(access), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out["balance"], "100.25");
    }
}
