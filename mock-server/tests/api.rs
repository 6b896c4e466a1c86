use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, Achievement, FoodLog, Token, User};
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(String::new()).unwrap()
}

async fn call(app: &mut Router, req: Request<String>) -> axum::response::Response {
    ServiceExt::<Request<String>>::ready(app)
        .await
        .unwrap()
        .call(req)
        .await
        .unwrap()
}

/// Register `alice` and return a fresh token.
async fn login_alice(app: &mut Router) -> String {
    let resp = call(
        app,
        json_request(
            "POST",
            "/auth/register",
            None,
            r#"{"username":"alice","email":"alice@example.com","password":"Passw0rd!"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(
        app,
        json_request(
            "POST",
            "/auth/login",
            None,
            r#"{"username":"alice","password":"Passw0rd!"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let token: Token = body_json(resp).await;
    assert_eq!(token.token_type, "bearer");
    token.access_token
}

// --- auth ---

#[tokio::test]
async fn login_with_wrong_password_returns_401_detail() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            r#"{"username":"nobody","password":"x"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["detail"], "Incorrect username or password");
}

#[tokio::test]
async fn me_without_token_returns_401() {
    let resp = app().oneshot(get_request("/auth/me", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_with_unknown_token_returns_401() {
    let resp = app().oneshot(get_request("/auth/me", Some("bogus"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["detail"], "Could not validate credentials");
}

#[tokio::test]
async fn register_short_password_returns_422() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/auth/register",
            None,
            r#"{"username":"bob","email":"bob@example.com","password":"short"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn duplicate_registration_returns_400() {
    let mut app = app();
    let _ = login_alice(&mut app).await;
    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/auth/register",
            None,
            r#"{"username":"Alice","email":"other@example.com","password":"Passw0rd!"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["detail"], "Username already registered");
}

#[tokio::test]
async fn me_returns_registered_user() {
    let mut app = app();
    let token = login_alice(&mut app).await;
    let resp = call(&mut app, get_request("/auth/me", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let user: User = body_json(resp).await;
    assert_eq!(user.username, "alice");
    assert!(user.is_active);
}

// --- meal analysis ---

#[tokio::test]
async fn analyze_meal_splits_items() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/ai/analyze-meal",
            None,
            r#"{"user_input":"rice, chicken ,  broccoli"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["foods"].as_array().unwrap().len(), 3);
    assert_eq!(body["foods"][1]["name"], "chicken");
    assert_eq!(body["total_calories"], 300);
    assert_eq!(body["analysis_method"], "text");
}

#[tokio::test]
async fn analyze_meal_empty_input_falls_back() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/ai/analyze-meal",
            None,
            r#"{"user_input":" , ","image_url":"https://example.com/a.jpg"}"#,
        ))
        .await
        .unwrap();
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["analysis_method"], "error_fallback");
    assert_eq!(body["total_calories"], 0);
}

// --- food logs, achievements, profile ---

#[tokio::test]
async fn food_log_lifecycle() {
    let mut app = app();
    let token = login_alice(&mut app).await;

    // empty to begin with
    let resp = call(
        &mut app,
        get_request("/users/alice/food-logs?date_filter=2024-01-01&limit=50", Some(&token)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let logs: Vec<FoodLog> = body_json(resp).await;
    assert!(logs.is_empty());

    // first save awards an achievement
    let save = r#"{"user_id":"alice","date_string":"2024-01-01","meal_time":"lunch",
        "foods":[{"name":"salad","calories":250,"protein_g":8,"carbs_g":20,"fat_g":12}],
        "total_calories":250}"#;
    let resp = call(&mut app, json_request("POST", "/food-logs", Some(&token), save)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let saved: serde_json::Value = body_json(resp).await;
    assert_eq!(saved["message"], "Food log saved");
    assert_eq!(saved["achievements"][0]["name"], "First Log");

    // second save awards nothing
    let resp = call(&mut app, json_request("POST", "/food-logs", Some(&token), save)).await;
    let saved: serde_json::Value = body_json(resp).await;
    assert!(saved["achievements"].as_array().unwrap().is_empty());

    // date filter and limit
    let resp = call(
        &mut app,
        get_request("/users/alice/food-logs?date_filter=2024-01-01&limit=1", Some(&token)),
    )
    .await;
    let logs: Vec<FoodLog> = body_json(resp).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].meal_time, "lunch");

    let resp = call(
        &mut app,
        get_request("/users/alice/food-logs?date_filter=2023-12-31", Some(&token)),
    )
    .await;
    let logs: Vec<FoodLog> = body_json(resp).await;
    assert!(logs.is_empty());

    let resp = call(&mut app, get_request("/users/alice/achievements", Some(&token))).await;
    let achievements: Vec<Achievement> = body_json(resp).await;
    assert_eq!(achievements.len(), 1);
    assert_eq!(achievements[0].points, 10);
}

#[tokio::test]
async fn other_users_data_is_forbidden() {
    let mut app = app();
    let token = login_alice(&mut app).await;
    let resp = call(&mut app, get_request("/users/bob/food-logs", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["detail"], "Access denied");
}

#[tokio::test]
async fn profile_missing_then_saved() {
    let mut app = app();
    let token = login_alice(&mut app).await;

    let resp = call(&mut app, get_request("/users/alice/profile", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/users/profile",
            Some(&token),
            r#"{"user_id":"alice","allergies":["peanuts"]}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&mut app, get_request("/users/alice/profile", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile: serde_json::Value = body_json(resp).await;
    assert_eq!(profile["allergies"][0], "peanuts");
    assert!(profile["updated_at"].is_string());
}

// --- uploads ---

#[tokio::test]
async fn upload_rejects_non_images() {
    let mut app = app();
    let token = login_alice(&mut app).await;
    let body = "--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\nContent-Type: text/plain\r\n\r\nhello\r\n--B--\r\n";
    let req = Request::builder()
        .method("POST")
        .uri("/upload-user-image")
        .header(http::header::CONTENT_TYPE, "multipart/form-data; boundary=B")
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .body(body.to_string())
        .unwrap();
    let resp = call(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["detail"], "File must be an image");
}

#[tokio::test]
async fn upload_stores_image() {
    let mut app = app();
    let token = login_alice(&mut app).await;
    let body = "--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"plate.jpg\"\r\nContent-Type: image/jpeg\r\n\r\nJPEGBYTES\r\n--B\r\nContent-Disposition: form-data; name=\"image_type\"\r\n\r\nprofile\r\n--B--\r\n";
    let req = Request::builder()
        .method("POST")
        .uri("/upload-user-image")
        .header(http::header::CONTENT_TYPE, "multipart/form-data; boundary=B")
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .body(body.to_string())
        .unwrap();
    let resp = call(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let uploaded: serde_json::Value = body_json(resp).await;
    assert_eq!(uploaded["success"], true);
    assert_eq!(uploaded["image_type"], "profile");

    let resp = call(&mut app, get_request("/users/alice/images", Some(&token))).await;
    let images: serde_json::Value = body_json(resp).await;
    assert_eq!(images[0]["file_size"], 9);
    assert_eq!(images[0]["original_filename"], "plate.jpg");
}
