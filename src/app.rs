use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{nutrition, progress};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(nutrition::router())
                .merge(progress::router())
                .route("/health", get(|| async { "ok" })),
        )
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
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
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
mod app_tests {
    use super::*;
    use crate::auth::{claims::Role, jwt::test_tokens};
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    const BOUNDARY: &str = "memberfit-test-boundary";

    fn bearer(state: &AppState, member: Uuid, role: Role) -> String {
        format!("Bearer {}", test_tokens::sign(&state.config.jwt, member, role))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.oneshot(req).await.expect("request");
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn json_req(method: Method, uri: &str, auth: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str, auth: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, auth)
            .body(Body::empty())
            .unwrap()
    }

    fn meal_form(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((ct, bytes)) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"meal\"\r\nContent-Type: {ct}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_req(uri: &str, auth: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, auth)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized_and_trainers_are_forbidden() {
        let state = AppState::fake();
        let app = build_app(state.clone());

        let res = app
            .clone()
            .oneshot(
                Request::get("/api/v1/nutrition/targets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let auth = bearer(&state, Uuid::new_v4(), Role::Trainer);
        let (status, _) = send(app, get_req("/api/v1/nutrition/targets", &auth)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn logging_a_meal_updates_the_day() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let auth = bearer(&state, Uuid::new_v4(), Role::Member);

        let form = meal_form(
            &[
                ("name", "Porridge"),
                ("meal_type", "Breakfast"),
                ("calories", "350"),
                ("protein_g", "10"),
                ("carbs_g", "60"),
                ("fat_g", "7"),
            ],
            Some(("image/jpeg", b"\xff\xd8\xff\xe0")),
        );
        let (status, meal) = send(
            app.clone(),
            multipart_req("/api/v1/nutrition/days/2024-03-01/meals", &auth, form),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(meal["name"], "Porridge");
        assert!(meal["image_url"].as_str().unwrap().starts_with("https://fake.local/meals/"));

        let (status, _) = send(
            app.clone(),
            json_req(
                Method::PUT,
                "/api/v1/nutrition/days/2024-03-01/water",
                &auth,
                json!({ "amount_ml": 1000 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, day) = send(app, get_req("/api/v1/nutrition/days/2024-03-01", &auth)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(day["meals"]["breakfast"].as_array().unwrap().len(), 1);
        assert_eq!(day["aggregate"]["totals"]["calories"], 350);
        assert_eq!(day["aggregate"]["percentages"]["calories"], 18);
        assert_eq!(day["aggregate"]["percentages"]["water"], 40);
        assert_eq!(day["aggregate"]["macro_ratios"]["carbs"], 70);
        assert_eq!(day["targets"]["daily_calories"], 2000);
    }

    #[tokio::test]
    async fn disallowed_image_type_is_rejected() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let auth = bearer(&state, Uuid::new_v4(), Role::Member);

        let form = meal_form(
            &[("name", "Toast"), ("meal_type", "Breakfast")],
            Some(("application/pdf", b"%PDF")),
        );
        let (status, _) = send(
            app,
            multipart_req("/api/v1/nutrition/days/2024-03-01/meals", &auth, form),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deleting_someone_elses_meal_is_a_silent_no_op() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let owner = bearer(&state, Uuid::new_v4(), Role::Member);
        let intruder = bearer(&state, Uuid::new_v4(), Role::Member);

        let form = meal_form(&[("name", "Soup"), ("meal_type", "Lunch"), ("calories", "250")], None);
        let (_, meal) = send(
            app.clone(),
            multipart_req("/api/v1/nutrition/days/2024-03-01/meals", &owner, form),
        )
        .await;
        let id = meal["id"].as_str().unwrap().to_string();

        let res = app
            .clone()
            .oneshot(
                Request::delete(format!("/api/v1/nutrition/meals/{id}"))
                    .header(header::AUTHORIZATION, &intruder)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let (_, agg) = send(
            app,
            get_req("/api/v1/nutrition/days/2024-03-01/aggregate", &owner),
        )
        .await;
        assert_eq!(agg["totals"]["calories"], 250);
    }

    #[tokio::test]
    async fn history_returns_raw_logs_and_zero_filled_chart() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let auth = bearer(&state, Uuid::new_v4(), Role::Member);

        let (status, log) = send(
            app.clone(),
            json_req(
                Method::POST,
                "/api/v1/nutrition/days/2024-03-02/log",
                &auth,
                json!({ "weight": 78.5 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(log["weight"], 78.5);

        let (status, hist) = send(
            app,
            get_req("/api/v1/nutrition/history?from=2024-03-01&to=2024-03-03", &auth),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hist["logs"].as_array().unwrap().len(), 1);
        assert_eq!(hist["chart"].as_array().unwrap().len(), 3);
        assert_eq!(hist["chart"][1]["date"], "2024-03-02");
    }

    #[tokio::test]
    async fn partial_target_update_over_http() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let auth = bearer(&state, Uuid::new_v4(), Role::Member);

        let (status, t) = send(
            app,
            json_req(
                Method::PUT,
                "/api/v1/nutrition/targets",
                &auth,
                json!({ "daily_calories": 2400 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(t["daily_calories"], 2400);
        assert_eq!(t["water_target_ml"], 2500);
    }

    #[tokio::test]
    async fn loose_numbers_in_json_bodies_are_coerced() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let auth = bearer(&state, Uuid::new_v4(), Role::Member);

        let (status, t) = send(
            app.clone(),
            json_req(
                Method::PUT,
                "/api/v1/nutrition/targets",
                &auth,
                json!({ "daily_calories": "", "protein_target_g": "abc", "fat_target_g": "70.5" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(t["daily_calories"], 2000);
        assert_eq!(t["protein_target_g"], 0.0);
        assert_eq!(t["fat_target_g"], 70.5);

        let (status, t) = send(
            app.clone(),
            json_req(
                Method::PUT,
                "/api/v1/nutrition/targets",
                &auth,
                json!({ "daily_calories": 1800.5 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(t["daily_calories"], 1800);

        let (status, w) = send(
            app,
            json_req(
                Method::PUT,
                "/api/v1/nutrition/days/2024-03-01/water",
                &auth,
                json!({ "amount_ml": "" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(w["amount_ml"], 0);
    }

    #[tokio::test]
    async fn unknown_roles_are_forbidden() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let auth = bearer(&state, Uuid::new_v4(), Role::Other);
        let (status, _) = send(app, get_req("/api/v1/nutrition/targets", &auth)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn progress_measurement_round_trip() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let auth = bearer(&state, Uuid::new_v4(), Role::Member);

        for (day, kg) in [("2024-05-01", 82.0), ("2024-05-08", 81.0)] {
            let (status, _) = send(
                app.clone(),
                json_req(
                    Method::PUT,
                    &format!("/api/v1/progress/measurements/{day}"),
                    &auth,
                    json!({ "weight_kg": kg }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, summary) = send(
            app,
            get_req("/api/v1/progress/summary?from=2024-05-01&to=2024-05-31", &auth),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["check_ins"], 2);
        assert_eq!(summary["deltas"][0]["change"], -1.0);
    }
}
