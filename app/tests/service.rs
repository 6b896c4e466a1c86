//! `NutritionService` and screen state against a scripted transport.

use std::sync::Mutex;

use async_trait::async_trait;
use nutai_app::{Dashboard, FoodDiary, NutritionService, Transport};
use nutai_core::{
    ApiError, FoodLogItem, FoodLogQuery, HttpRequest, HttpResponse, LoginRequest, MealTime, NutritionClient,
    SaveFoodLogRequest,
};

type Reply = Result<HttpResponse, ApiError>;

/// Answers each request with the first scripted reply whose URL fragment
/// matches, and records what was sent.
struct FakeTransport {
    script: Mutex<Vec<(&'static str, Reply)>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    fn new(script: Vec<(&'static str, Reply)>) -> Self {
        Self {
            script: Mutex::new(script),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, fragment: &'static str, reply: Reply) {
        self.script.lock().unwrap().push((fragment, reply));
    }

    fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut script = self.script.lock().unwrap();
        let pos = script
            .iter()
            .position(|(fragment, _)| request.url.contains(fragment))
            .unwrap_or_else(|| panic!("unexpected request to {}", request.url));
        let (_, reply) = script.remove(pos);
        self.sent.lock().unwrap().push(request);
        reply
    }
}

fn service(script: Vec<(&'static str, Reply)>) -> NutritionService<FakeTransport> {
    let client = NutritionClient::new("http://api.test").unwrap();
    NutritionService::new(client, FakeTransport::new(script))
}

fn logged_in(script: Vec<(&'static str, Reply)>) -> NutritionService<FakeTransport> {
    let service = service(script);
    service.client().token_store().save("t1").unwrap();
    service
}

fn reply(status: u16, body: &str) -> Reply {
    Ok(HttpResponse::new(status, body))
}

const ONE_LOG: &str = r#"[{"log_id":"1","meal_time":"breakfast","total_calories":300,
    "foods":[{"name":"oats","calories":300,"protein_g":10,"carbs_g":54,"fat_g":6}],
    "created_at":"2024-01-01T08:00:00","date_string":"2024-01-01"}]"#;

fn lunch() -> SaveFoodLogRequest {
    SaveFoodLogRequest {
        user_id: "alice".into(),
        date_string: "2024-01-01".into(),
        meal_time: MealTime::Lunch,
        foods: vec![FoodLogItem {
            name: "salad".into(),
            calories: 250.0,
            protein_g: 8.0,
            ..Default::default()
        }],
        total_calories: 250.0,
    }
}

// --- session ---

#[tokio::test]
async fn login_stores_token() {
    let service = service(vec![(
        "/auth/login",
        reply(200, r#"{"access_token":"t1","token_type":"bearer"}"#),
    )]);
    assert!(!service.is_authenticated().unwrap());

    service
        .login(&LoginRequest {
            username: "alice".into(),
            password: "pw".into(),
        })
        .await
        .unwrap();

    assert!(service.is_authenticated().unwrap());
    assert_eq!(service.client().token_store().load().unwrap().as_deref(), Some("t1"));
    let sent = service.transport().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].header("authorization"), None);
}

#[tokio::test]
async fn failed_login_keeps_previous_state() {
    let service = service(vec![(
        "/auth/login",
        reply(401, r#"{"detail":"Incorrect username or password"}"#),
    )]);
    let err = service
        .login(&LoginRequest {
            username: "alice".into(),
            password: "nope".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Incorrect username or password");
    assert!(!service.is_authenticated().unwrap());
}

#[tokio::test]
async fn unauthenticated_calls_never_reach_the_transport() {
    let service = service(Vec::new());
    let err = service
        .list_food_logs("alice", &FoodLogQuery::for_date("2024-01-01"))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotAuthenticated);
    assert_eq!(service.save_food_log(&lunch()).await.unwrap_err(), ApiError::NotAuthenticated);
    assert!(service.transport().sent().is_empty());
}

#[tokio::test]
async fn rejected_session_check_logs_out() {
    let service = logged_in(vec![("/auth/me", reply(401, r#"{"detail":"Token expired"}"#))]);
    let err = service.current_user().await.unwrap_err();
    assert_eq!(err.to_string(), "Token expired");
    assert!(!service.is_authenticated().unwrap());
}

#[tokio::test]
async fn server_error_on_session_check_also_logs_out() {
    let service = logged_in(vec![("/auth/me", reply(500, "<html>oops</html>"))]);
    let err = service.current_user().await.unwrap_err();
    assert_eq!(err, ApiError::Server { status: 500 });
    assert!(!service.is_authenticated().unwrap());
}

#[tokio::test]
async fn lost_connection_on_session_check_keeps_token() {
    let service = logged_in(vec![(
        "/auth/me",
        Err(ApiError::Transport("connection refused".into())),
    )]);
    let err = service.current_user().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert!(service.is_authenticated().unwrap());
}

#[tokio::test]
async fn bearer_token_is_attached() {
    let service = logged_in(vec![(
        "/auth/me",
        reply(
            200,
            r#"{"id":1,"username":"alice","email":"a@example.com","is_active":true,"created_at":"2024-01-01T00:00:00"}"#,
        ),
    )]);
    let user = service.current_user().await.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(service.transport().sent()[0].header("Authorization"), Some("Bearer t1"));
}

// --- food diary ---

#[tokio::test]
async fn empty_day_has_zero_summary() {
    let service = logged_in(vec![("/users/alice/food-logs", reply(200, "[]"))]);
    let mut diary = FoodDiary::new("alice", "2024-01-01");
    diary.refresh(&service).await.unwrap();

    assert!(diary.entries().is_empty());
    assert_eq!(diary.summary().total_calories, 0.0);
    assert!(diary.summary().is_empty());
    assert!(service.transport().sent()[0].url.contains("date_filter=2024-01-01"));
}

#[tokio::test]
async fn refresh_replaces_entries_and_totals() {
    let service = logged_in(vec![("/users/alice/food-logs", reply(200, ONE_LOG))]);
    let mut diary = FoodDiary::new("alice", "2024-01-01");
    diary.refresh(&service).await.unwrap();

    assert_eq!(diary.entries().len(), 1);
    assert_eq!(diary.summary().total_calories, 300.0);
    assert_eq!(diary.summary().carbs_g, 54.0);
    assert_eq!(diary.summary().meals.get(&MealTime::Breakfast), Some(&1));
}

#[tokio::test]
async fn diary_limit_is_sent_to_the_server() {
    let service = logged_in(vec![("/users/alice/food-logs", reply(200, ONE_LOG))]);
    let mut diary = FoodDiary::new("alice", "2024-01-01").with_limit(100);
    diary.refresh(&service).await.unwrap();

    assert_eq!(diary.limit(), Some(100));
    assert_eq!(
        service.transport().sent()[0].url,
        "http://api.test/users/alice/food-logs?date_filter=2024-01-01&limit=100"
    );
}

#[tokio::test]
async fn record_respects_diary_limit() {
    let service = logged_in(vec![
        ("/users/alice/food-logs", reply(200, ONE_LOG)),
        ("/food-logs", reply(200, r#"{"message":"Food log saved","log_id":"8","achievements":[]}"#)),
    ]);
    let mut diary = FoodDiary::new("alice", "2024-01-01").with_limit(1);
    diary.refresh(&service).await.unwrap();
    diary.record(&service, &lunch()).await.unwrap();

    assert_eq!(diary.entries().len(), 1);
    assert_eq!(diary.entries()[0].log_id, "8");
    assert_eq!(diary.summary().total_calories, 250.0);
}

#[tokio::test]
async fn expired_token_leaves_diary_untouched() {
    let service = logged_in(vec![("/users/alice/food-logs", reply(200, ONE_LOG))]);
    let mut diary = FoodDiary::new("alice", "2024-01-01");
    diary.refresh(&service).await.unwrap();
    let before = diary.clone();

    service
        .transport()
        .push("/users/alice/food-logs", reply(401, r#"{"detail":"Token expired"}"#));
    let err = diary.refresh(&service).await.unwrap_err();

    assert_eq!(
        err,
        ApiError::Api {
            status: 401,
            message: "Token expired".into()
        }
    );
    assert_eq!(diary, before);
}

#[tokio::test]
async fn record_appends_on_success() {
    let service = logged_in(vec![(
        "/food-logs",
        reply(
            200,
            r#"{"message":"Food log saved","log_id":42,
                "achievements":[{"name":"First Log","description":"d","points":10,"badge":"🏆"}]}"#,
        ),
    )]);
    let mut diary = FoodDiary::new("alice", "2024-01-01");
    let saved = diary.record(&service, &lunch()).await.unwrap();

    assert_eq!(saved.log_id, "42");
    assert_eq!(saved.achievements[0].badge.as_deref(), Some("🏆"));
    assert_eq!(diary.entries().len(), 1);
    assert_eq!(diary.entries()[0].log_id, "42");
    assert_eq!(diary.summary().total_calories, 250.0);
    assert_eq!(diary.summary().protein_g, 8.0);
}

#[tokio::test]
async fn record_for_another_day_is_not_shown() {
    let service = logged_in(vec![(
        "/food-logs",
        reply(200, r#"{"message":"Food log saved","log_id":"7","achievements":[]}"#),
    )]);
    let mut diary = FoodDiary::new("alice", "2024-01-02");
    diary.record(&service, &lunch()).await.unwrap();
    assert!(diary.entries().is_empty());
}

#[tokio::test]
async fn failed_record_leaves_diary_untouched() {
    let service = logged_in(vec![
        ("/users/alice/food-logs", reply(200, ONE_LOG)),
        ("/food-logs", reply(403, r#"{"detail":"Access denied"}"#)),
    ]);
    let mut diary = FoodDiary::new("alice", "2024-01-01");
    diary.refresh(&service).await.unwrap();
    let before = diary.clone();

    let err = diary.record(&service, &lunch()).await.unwrap_err();
    assert_eq!(err.to_string(), "Access denied");
    assert_eq!(diary, before);
}

// --- dashboard ---

#[tokio::test]
async fn dashboard_results_are_independent() {
    let service = logged_in(vec![
        ("/users/alice/achievements", reply(500, "")),
        ("/users/alice/profile", reply(404, r#"{"detail":"Profile not found"}"#)),
    ]);
    let dashboard = Dashboard::load(&service, "alice").await;

    assert_eq!(dashboard.profile.unwrap(), None);
    assert_eq!(dashboard.achievements.unwrap_err(), ApiError::Server { status: 500 });
    assert_eq!(service.transport().sent().len(), 2);
}

#[tokio::test]
async fn dashboard_sums_points() {
    let service = logged_in(vec![
        (
            "/users/alice/profile",
            reply(200, r#"{"user_id":"alice","allergies":["peanuts"]}"#),
        ),
        (
            "/users/alice/achievements",
            reply(
                200,
                r#"[{"id":1,"achievement_name":"First Log","description":"d","points":10,"badge_icon":"🏆","earned_date":"2024-01-01T08:00:00"},
                    {"id":2,"achievement_name":"Streak","description":"d","points":25,"badge_icon":"🔥","earned_date":"2024-01-03T08:00:00"}]"#,
            ),
        ),
    ]);
    let dashboard = Dashboard::load(&service, "alice").await;

    assert_eq!(dashboard.total_points(), 35);
    let profile = dashboard.profile.unwrap().unwrap();
    assert_eq!(profile.allergies, vec!["peanuts"]);
}
