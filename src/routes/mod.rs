// Route definitions

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{AppState, config::Settings};

// Declare submodules for different route groups
mod auth;
mod users;
mod vehicles;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// Only origins listed in settings may call the API from a browser
fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub fn create_router(app_state: AppState) -> Router {
    let auth_router = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let users_router = Router::new()
        .route(
            "/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/password", put(users::change_password))
        .route("/account", axum::routing::delete(users::delete_account));

    let vehicles_router = Router::new()
        .route("/search", get(vehicles::search_vehicles))
        .route("/filters", get(vehicles::get_filters))
        .route("/suggestions", get(vehicles::get_suggestions))
        .route("/:id", get(vehicles::get_vehicle));

    let api_router = Router::new()
        .nest("/auth", auth_router)
        .nest("/users", users_router)
        .nest("/vehicles", vehicles_router);

    let cors = cors_layer(&app_state.settings);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_router)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;

    fn server() -> TestServer {
        let state = AppState::in_memory(Settings::for_tests());
        TestServer::new(create_router(state)).expect("Failed to create test server")
    }

    async fn register(server: &TestServer, email: &str) -> Value {
        let response = server
            .post("/api/auth/register")
            .json(&json!({
                "email": email,
                "password": "s3cure-passw0rd",
                "firstName": "Jane",
                "lastName": "Doe",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()
    }

    fn bearer(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }

    fn access_token(body: &Value) -> String {
        body["tokens"]["accessToken"].as_str().unwrap().to_string()
    }

    mod health_tests {
        use super::*;

        #[tokio::test]
        async fn test_health_endpoint() {
            let response = server().get("/health").await;
            response.assert_status_ok();
            assert_eq!(response.json::<Value>()["status"], "ok");
        }
    }

    mod auth_tests {
        use super::*;

        #[tokio::test]
        async fn register_returns_user_and_tokens() {
            let server = server();
            let body = register(&server, "Jane@Example.com").await;
            assert_eq!(body["success"], true);
            assert_eq!(body["user"]["email"], "jane@example.com");
            assert!(body["user"].get("passwordHash").is_none());
            assert_eq!(body["tokens"]["tokenType"], "Bearer");
            assert!(body["tokens"]["refreshToken"].is_string());
        }

        #[tokio::test]
        async fn duplicate_email_conflicts() {
            let server = server();
            register(&server, "dup@example.com").await;
            let response = server
                .post("/api/auth/register")
                .json(&json!({
                    "email": "DUP@example.com",
                    "password": "another-passw0rd",
                    "firstName": "J",
                    "lastName": "D",
                }))
                .await;
            response.assert_status(StatusCode::CONFLICT);
        }

        #[tokio::test]
        async fn invalid_registration_lists_fields() {
            let response = server()
                .post("/api/auth/register")
                .json(&json!({
                    "email": "nope",
                    "password": "short",
                    "firstName": "",
                    "lastName": "Doe",
                }))
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
            let body = response.json::<Value>();
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
            let fields = &body["error"]["details"];
            assert!(fields.get("email").is_some());
            assert!(fields.get("password").is_some());
            assert!(fields.get("first_name").is_some());
        }

        #[tokio::test]
        async fn login_checks_password() {
            let server = server();
            register(&server, "login@example.com").await;

            let ok = server
                .post("/api/auth/login")
                .json(&json!({ "email": "login@example.com", "password": "s3cure-passw0rd" }))
                .await;
            ok.assert_status_ok();
            assert!(ok.json::<Value>()["tokens"]["accessToken"].is_string());

            let wrong = server
                .post("/api/auth/login")
                .json(&json!({ "email": "login@example.com", "password": "wrong-password" }))
                .await;
            wrong.assert_status(StatusCode::UNAUTHORIZED);

            let unknown = server
                .post("/api/auth/login")
                .json(&json!({ "email": "ghost@example.com", "password": "s3cure-passw0rd" }))
                .await;
            unknown.assert_status(StatusCode::UNAUTHORIZED);
            assert_eq!(
                wrong.json::<Value>()["error"]["message"],
                unknown.json::<Value>()["error"]["message"]
            );
        }

        #[tokio::test]
        async fn me_requires_a_bearer_token() {
            let server = server();
            server.get("/api/auth/me").await.assert_status(StatusCode::UNAUTHORIZED);
            server
                .get("/api/auth/me")
                .add_header(header::AUTHORIZATION, bearer("garbage"))
                .await
                .assert_status(StatusCode::UNAUTHORIZED);

            let body = register(&server, "me@example.com").await;
            let response = server
                .get("/api/auth/me")
                .add_header(header::AUTHORIZATION, bearer(&access_token(&body)))
                .await;
            response.assert_status_ok();
            assert_eq!(response.json::<Value>()["user"]["email"], "me@example.com");
        }

        #[tokio::test]
        async fn logout_blacklists_the_access_token() {
            let server = server();
            let body = register(&server, "bye@example.com").await;
            let token = access_token(&body);
            let refresh = body["tokens"]["refreshToken"].as_str().unwrap().to_string();

            server
                .post("/api/auth/logout")
                .add_header(header::AUTHORIZATION, bearer(&token))
                .await
                .assert_status_ok();

            server
                .get("/api/auth/me")
                .add_header(header::AUTHORIZATION, bearer(&token))
                .await
                .assert_status(StatusCode::UNAUTHORIZED);
            server
                .post("/api/auth/refresh")
                .json(&json!({ "refreshToken": refresh }))
                .await
                .assert_status(StatusCode::UNAUTHORIZED);
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn concurrent_registrations_conflict_cleanly() {
            let server = server();
            for round in 0..10 {
                let body = json!({
                    "email": format!("race{}@example.com", round),
                    "password": "s3cure-passw0rd",
                    "firstName": "Jane",
                    "lastName": "Doe",
                });
                let (a, b) = tokio::join!(
                    async { server.post("/api/auth/register").json(&body).await },
                    async { server.post("/api/auth/register").json(&body).await },
                );
                let mut statuses = [a.status_code().as_u16(), b.status_code().as_u16()];
                statuses.sort();
                assert_eq!(statuses, [201, 409], "round {}", round);
            }
        }

        #[tokio::test]
        async fn malformed_bodies_use_the_error_envelope() {
            let server = server();

            let missing_field = server
                .post("/api/auth/register")
                .json(&json!({ "email": "x@example.com", "firstName": "J", "lastName": "D" }))
                .await;
            missing_field.assert_status(StatusCode::BAD_REQUEST);
            let body = missing_field.json::<Value>();
            assert_eq!(body["success"], false);
            assert_eq!(body["error"]["code"], "BAD_REQUEST");

            let not_json = server.post("/api/auth/login").text("email=x").await;
            not_json.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(not_json.json::<Value>()["error"]["code"], "BAD_REQUEST");
        }

        #[tokio::test]
        async fn refresh_rotates_the_refresh_token() {
            let server = server();
            let body = register(&server, "rotate@example.com").await;
            let original = body["tokens"]["refreshToken"].as_str().unwrap().to_string();

            let rotated = server
                .post("/api/auth/refresh")
                .json(&json!({ "refreshToken": original }))
                .await;
            rotated.assert_status_ok();
            let new_refresh = rotated.json::<Value>()["tokens"]["refreshToken"]
                .as_str()
                .unwrap()
                .to_string();
            assert_ne!(new_refresh, original);

            // The old one is spent
            server
                .post("/api/auth/refresh")
                .json(&json!({ "refreshToken": original }))
                .await
                .assert_status(StatusCode::UNAUTHORIZED);
            server
                .post("/api/auth/refresh")
                .json(&json!({ "refreshToken": new_refresh }))
                .await
                .assert_status_ok();
        }
    }

    mod user_tests {
        use super::*;

        #[tokio::test]
        async fn profile_update_is_partial() {
            let server = server();
            let token = access_token(&register(&server, "profile@example.com").await);

            let response = server
                .put("/api/users/profile")
                .add_header(header::AUTHORIZATION, bearer(&token))
                .json(&json!({
                    "lastName": "Smith",
                    "location": { "city": "Austin", "state": "TX" },
                }))
                .await;
            response.assert_status_ok();
            let user = &response.json::<Value>()["user"];
            assert_eq!(user["firstName"], "Jane");
            assert_eq!(user["lastName"], "Smith");
            assert_eq!(user["location"]["city"], "Austin");

            let profile = server
                .get("/api/users/profile")
                .add_header(header::AUTHORIZATION, bearer(&token))
                .await;
            assert_eq!(profile.json::<Value>()["user"]["lastName"], "Smith");
        }

        #[tokio::test]
        async fn change_password_requires_current_password() {
            let server = server();
            let token = access_token(&register(&server, "pw@example.com").await);

            server
                .put("/api/users/password")
                .add_header(header::AUTHORIZATION, bearer(&token))
                .json(&json!({ "currentPassword": "wrong", "newPassword": "brand-new-passw0rd" }))
                .await
                .assert_status(StatusCode::UNAUTHORIZED);

            server
                .put("/api/users/password")
                .add_header(header::AUTHORIZATION, bearer(&token))
                .json(&json!({
                    "currentPassword": "s3cure-passw0rd",
                    "newPassword": "brand-new-passw0rd",
                }))
                .await
                .assert_status_ok();

            server
                .post("/api/auth/login")
                .json(&json!({ "email": "pw@example.com", "password": "brand-new-passw0rd" }))
                .await
                .assert_status_ok();
        }

        #[tokio::test]
        async fn deleted_account_cannot_be_used() {
            let server = server();
            let token = access_token(&register(&server, "gone@example.com").await);

            server
                .delete("/api/users/account")
                .add_header(header::AUTHORIZATION, bearer(&token))
                .await
                .assert_status_ok();

            server
                .get("/api/users/profile")
                .add_header(header::AUTHORIZATION, bearer(&token))
                .await
                .assert_status(StatusCode::UNAUTHORIZED);
            server
                .post("/api/auth/login")
                .json(&json!({ "email": "gone@example.com", "password": "s3cure-passw0rd" }))
                .await
                .assert_status(StatusCode::UNAUTHORIZED);
        }
    }

    mod vehicle_tests {
        use super::*;

        #[tokio::test]
        async fn search_returns_the_documented_shape() {
            let response = server()
                .get("/api/vehicles/search")
                .add_query_param("make", "TOYOTA")
                .add_query_param("sortBy", "price")
                .add_query_param("sortOrder", "asc")
                .await;
            response.assert_status_ok();
            let body = response.json::<Value>();

            let vehicles = body["vehicles"].as_array().unwrap();
            assert!(!vehicles.is_empty());
            assert!(vehicles.iter().all(|v| v["make"] == "Toyota"));
            let prices: Vec<u64> = vehicles.iter().map(|v| v["price"].as_u64().unwrap()).collect();
            assert!(prices.windows(2).all(|w| w[0] <= w[1]));

            assert_eq!(body["total"].as_u64().unwrap() as usize, vehicles.len());
            assert_eq!(body["page"], 1);
            assert_eq!(body["limit"], 12);
            assert_eq!(body["totalPages"], 1);
            assert_eq!(body["filters"]["makes"].as_array().unwrap().len(), 1);
            assert!(body["filters"]["priceRange"]["min"].is_u64());
        }

        #[tokio::test]
        async fn search_rejects_bad_parameters() {
            let server = server();
            for (key, value) in [("page", "0"), ("limit", "500"), ("priceMin", "cheap"), ("sortOrder", "up")] {
                let response = server
                    .get("/api/vehicles/search")
                    .add_query_param(key, value)
                    .await;
                response.assert_status(StatusCode::BAD_REQUEST);
                assert_eq!(response.json::<Value>()["error"]["code"], "BAD_REQUEST");
            }
        }

        #[tokio::test]
        async fn unknown_sort_key_sorts_by_score() {
            let response = server()
                .get("/api/vehicles/search")
                .add_query_param("sortBy", "vin")
                .await;
            response.assert_status_ok();
            let scores: Vec<f64> = response.json::<Value>()["vehicles"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v["arbitrageScore"].as_f64().unwrap())
                .collect();
            assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        }

        #[tokio::test]
        async fn malformed_query_string_uses_the_error_envelope() {
            let response = server()
                .get("/api/vehicles/suggestions")
                .add_query_param("q", "toy")
                .add_query_param("limit", "abc")
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
            let body = response.json::<Value>();
            assert_eq!(body["success"], false);
            assert_eq!(body["error"]["code"], "BAD_REQUEST");
            assert!(body["error"]["message"].is_string());
        }

        #[tokio::test]
        async fn search_page_past_the_end_is_empty() {
            let response = server()
                .get("/api/vehicles/search")
                .add_query_param("page", "99")
                .await;
            response.assert_status_ok();
            let body = response.json::<Value>();
            assert!(body["vehicles"].as_array().unwrap().is_empty());
            assert_eq!(body["hasNextPage"], false);
        }

        #[tokio::test]
        async fn filters_cover_the_whole_inventory() {
            let response = server().get("/api/vehicles/filters").await;
            response.assert_status_ok();
            let body = response.json::<Value>();
            let total = body["total"].as_u64().unwrap();
            let make_total: u64 = body["filters"]["makes"]
                .as_array()
                .unwrap()
                .iter()
                .map(|m| m["count"].as_u64().unwrap())
                .sum();
            assert_eq!(make_total, total);
            assert_eq!(total as usize, crate::store::seed::demo_listings().len());
        }

        #[tokio::test]
        async fn suggestions_match_makes_and_models() {
            let server = server();
            let response = server
                .get("/api/vehicles/suggestions")
                .add_query_param("q", "toy")
                .await;
            response.assert_status_ok();
            let suggestions = response.json::<Value>()["suggestions"].as_array().unwrap().clone();
            assert!(!suggestions.is_empty());
            assert!(suggestions.len() <= 8);
            assert_eq!(suggestions[0]["label"], "Toyota");

            let short = server
                .get("/api/vehicles/suggestions")
                .add_query_param("q", "t")
                .await;
            assert!(short.json::<Value>()["suggestions"].as_array().unwrap().is_empty());
        }

        #[tokio::test]
        async fn vehicle_by_id() {
            let server = server();
            let response = server.get("/api/vehicles/veh-001").await;
            response.assert_status_ok();
            assert_eq!(response.json::<Value>()["id"], "veh-001");

            server
                .get("/api/vehicles/missing")
                .await
                .assert_status(StatusCode::NOT_FOUND);
        }
    }
}
