//! In-memory stand-in for the nutrition backend.
//!
//! Implements the endpoints the clients consume with the same status codes
//! and `{"detail": ...}` error bodies as the real server. AI features are
//! deterministic so tests can assert on them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Deserialize)]
pub struct MealInput {
    pub image_url: Option<String>,
    pub user_input: String,
    pub corrections: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Food {
    pub name: String,
    pub calories: u32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MealAnalysis {
    pub meal_name: String,
    pub meal_type: String,
    pub foods: Vec<Food>,
    pub total_calories: u32,
    pub analysis_method: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
}

#[derive(Deserialize)]
pub struct SaveFoodLogInput {
    pub user_id: String,
    pub date_string: String,
    pub meal_time: String,
    pub foods: Vec<FoodItem>,
    pub total_calories: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FoodLog {
    pub log_id: String,
    pub meal_time: String,
    pub foods: Vec<FoodItem>,
    pub total_calories: f64,
    pub created_at: NaiveDateTime,
    pub date_string: String,
}

#[derive(Deserialize)]
pub struct FoodLogFilter {
    pub date_filter: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct AdviceInput {
    pub food_log: Vec<FoodItem>,
    pub daily_targets: BTreeMap<String, f64>,
}

#[derive(Deserialize)]
pub struct PersonalizedAdviceInput {
    pub user_id: String,
    pub food_log: Vec<FoodItem>,
    pub daily_targets: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Achievement {
    pub id: i64,
    pub achievement_name: String,
    pub description: String,
    pub points: i64,
    pub badge_icon: String,
    pub earned_date: NaiveDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Image {
    pub image_id: String,
    pub public_id: String,
    pub url: String,
    pub original_filename: Option<String>,
    pub file_size: u64,
    pub image_type: String,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct SearchInput {
    pub query: String,
}

#[derive(Deserialize)]
pub struct SubstituteInput {
    pub food_name: String,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    pub nutrition_goals: String,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
pub struct Store {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, String>,
    food_logs: HashMap<String, Vec<FoodLog>>,
    profiles: HashMap<String, serde_json::Value>,
    achievements: HashMap<String, Vec<Achievement>>,
    images: HashMap<String, Vec<Image>>,
    next_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_token(&mut self, username: &str) -> Token {
        let access_token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(access_token.clone(), username.to_string());
        Token {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Error response in the backend's `{"detail": "..."}` shape.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    detail: String,
}

impl ApiFailure {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn access_denied() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Access denied")
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiFailure>;

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/refresh", post(refresh))
        .route("/ai/analyze-meal", post(analyze_meal))
        .route("/ai/nutrition-advice", post(nutrition_advice))
        .route("/ai/personalized-nutrition-advice", post(personalized_advice))
        .route("/ai/search", post(search_food))
        .route("/ai/find-substitutes", post(find_substitutes))
        .route("/upload-user-image", post(upload_user_image))
        .route("/food-logs", post(save_food_log))
        .route("/users/profile", post(save_profile))
        .route("/users/{user_id}/profile", get(get_profile))
        .route("/users/{user_id}/food-logs", get(list_food_logs))
        .route("/users/{user_id}/achievements", get(list_achievements))
        .route("/users/{user_id}/images", get(list_images))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock nutrition API listening");
    }
    axum::serve(listener, app()).await
}

/// Resolve the bearer token to a username.
async fn authenticate(db: &Db, headers: &HeaderMap) -> ApiResult<String> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiFailure::new(StatusCode::UNAUTHORIZED, "Not authenticated"))?;
    db.read()
        .await
        .tokens
        .get(token)
        .cloned()
        .ok_or_else(|| ApiFailure::new(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
}

fn ensure_same_user(current: &str, requested: &str) -> ApiResult<()> {
    if current == requested {
        Ok(())
    } else {
        Err(ApiFailure::access_denied())
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

async fn register(State(db): State<Db>, Json(input): Json<RegisterInput>) -> ApiResult<Json<User>> {
    let username = input.username.to_lowercase();
    if username.len() < 3 {
        return Err(ApiFailure::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Username must be at least 3 characters long",
        ));
    }
    if input.password.len() < 8 {
        return Err(ApiFailure::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Password must be at least 8 characters long",
        ));
    }

    let mut store = db.write().await;
    if store.accounts.contains_key(&username) {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Username already registered"));
    }
    if store.accounts.values().any(|a| a.user.email == input.email) {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Email already registered"));
    }
    let user = User {
        id: store.next_id(),
        username: username.clone(),
        email: input.email,
        is_active: true,
        created_at: now(),
    };
    store.accounts.insert(
        username,
        Account {
            user: user.clone(),
            password: input.password,
        },
    );
    debug!(username = %user.username, "registered");
    Ok(Json(user))
}

async fn login(State(db): State<Db>, Json(input): Json<LoginInput>) -> ApiResult<Json<Token>> {
    let mut store = db.write().await;
    let username = input.username.to_lowercase();
    let valid = store
        .accounts
        .get(&username)
        .is_some_and(|a| a.password == input.password);
    if !valid {
        return Err(ApiFailure::new(
            StatusCode::UNAUTHORIZED,
            "Incorrect username or password",
        ));
    }
    Ok(Json(store.issue_token(&username)))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<User>> {
    let username = authenticate(&db, &headers).await?;
    let store = db.read().await;
    store
        .accounts
        .get(&username)
        .map(|a| Json(a.user.clone()))
        .ok_or_else(|| ApiFailure::new(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
}

async fn refresh(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<Token>> {
    let username = authenticate(&db, &headers).await?;
    Ok(Json(db.write().await.issue_token(&username)))
}

// ---------------------------------------------------------------------------
// AI features
// ---------------------------------------------------------------------------

/// Each comma-separated item becomes a 100 kcal food.
async fn analyze_meal(Json(input): Json<MealInput>) -> Json<MealAnalysis> {
    let foods: Vec<Food> = input
        .user_input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| Food {
            name: name.to_string(),
            calories: 100,
            protein_g: 5.0,
            carbs_g: 12.0,
            fat_g: 3.0,
        })
        .collect();

    if foods.is_empty() {
        return Json(MealAnalysis {
            meal_name: "Unknown Meal".to_string(),
            meal_type: "snack".to_string(),
            foods: Vec::new(),
            total_calories: 0,
            analysis_method: "error_fallback".to_string(),
        });
    }

    let method = if input.image_url.is_some() { "vision" } else { "text" };
    Json(MealAnalysis {
        meal_name: format!("Meal with {}", foods[0].name),
        meal_type: "snack".to_string(),
        total_calories: foods.iter().map(|f| f.calories).sum(),
        foods,
        analysis_method: method.to_string(),
    })
}

fn intake(food_log: &[FoodItem]) -> BTreeMap<&'static str, f64> {
    let mut totals = BTreeMap::new();
    for item in food_log {
        *totals.entry("calories").or_insert(0.0) += item.calories;
        *totals.entry("protein").or_insert(0.0) += item.protein_g;
        *totals.entry("carbs").or_insert(0.0) += item.carbs_g;
        *totals.entry("fat").or_insert(0.0) += item.fat_g;
    }
    totals
}

fn advice(food_log: &[FoodItem], targets: &BTreeMap<String, f64>) -> serde_json::Value {
    let totals = intake(food_log);
    let focus: Vec<serde_json::Value> = targets
        .iter()
        .filter_map(|(nutrient, target)| {
            let current = totals.get(nutrient.as_str()).copied().unwrap_or(0.0);
            (current < *target).then(|| {
                json!({
                    "nutrient": nutrient,
                    "current_intake": current,
                    "target": target,
                    "deficit": target - current,
                    "suggestions": [],
                    "why_important": format!("You are short on {nutrient} today."),
                })
            })
        })
        .collect();
    let summary = if focus.is_empty() {
        "All daily targets met.".to_string()
    } else {
        format!("{} nutrient(s) below target.", focus.len())
    };
    json!({
        "overall_summary": summary,
        "safety_notes": [],
        "nutrients_to_focus_on": focus,
        "achievements": [],
        "tips": ["Drink water with every meal."],
    })
}

async fn nutrition_advice(Json(input): Json<AdviceInput>) -> Json<serde_json::Value> {
    Json(advice(&input.food_log, &input.daily_targets))
}

async fn personalized_advice(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<PersonalizedAdviceInput>,
) -> ApiResult<Json<serde_json::Value>> {
    let username = authenticate(&db, &headers).await?;
    ensure_same_user(&username, &input.user_id)?;

    let mut body = advice(&input.food_log, &input.daily_targets);
    let insights: Vec<String> = db
        .read()
        .await
        .profiles
        .get(&username)
        .and_then(|p| p.get("allergies"))
        .and_then(|a| a.as_array())
        .map(|allergies| {
            allergies
                .iter()
                .filter_map(|a| a.as_str())
                .map(|a| format!("Suggestions avoid {a}."))
                .collect()
        })
        .unwrap_or_default();
    body["personalized_insights"] = json!(insights);
    Ok(Json(body))
}

async fn search_food(Json(input): Json<SearchInput>) -> Json<serde_json::Value> {
    Json(json!({
        "results": [{
            "name": input.query,
            "nutrition_per_100g": {"calories": 100.0, "protein": 5.0, "carbs": 12.0, "fat": 3.0},
            "portion_suggestions": [{"portion": "1 cup", "grams": 150}],
        }]
    }))
}

async fn find_substitutes(Json(input): Json<SubstituteInput>) -> Json<serde_json::Value> {
    let reason = if input.dietary_restrictions.is_empty() {
        format!("Fits the goal: {}", input.nutrition_goals)
    } else {
        format!("Respects {}", input.dietary_restrictions.join(", "))
    };
    Json(json!({
        "original_food": input.food_name,
        "substitutes": [{
            "food": format!("Light {}", input.food_name),
            "reason": reason,
            "nutrition_comparison": "About 30% fewer calories",
            "availability": "Most supermarkets",
        }]
    }))
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

async fn upload_user_image(
    State(db): State<Db>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let username = authenticate(&db, &headers).await?;

    let mut file: Option<(Option<String>, u64)> = None;
    let mut image_type = "meal".to_string();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiFailure::new(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let is_image = field.content_type().is_some_and(|ct| ct.starts_with("image/"));
                if !is_image {
                    return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "File must be an image"));
                }
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiFailure::new(StatusCode::BAD_REQUEST, e.to_string()))?;
                file = Some((filename, bytes.len() as u64));
            }
            Some("image_type") => {
                image_type = field
                    .text()
                    .await
                    .map_err(|e| ApiFailure::new(StatusCode::BAD_REQUEST, e.to_string()))?;
            }
            _ => {}
        }
    }
    let (original_filename, file_size) =
        file.ok_or_else(|| ApiFailure::new(StatusCode::UNPROCESSABLE_ENTITY, "File is required"))?;

    let image_id = Uuid::new_v4().to_string();
    let public_id = format!("users/{username}/{image_id}");
    let image = Image {
        url: format!("https://images.example.com/{public_id}"),
        image_id,
        public_id,
        original_filename,
        file_size,
        image_type,
        uploaded_at: now(),
    };
    db.write()
        .await
        .images
        .entry(username)
        .or_default()
        .push(image.clone());

    Ok(Json(json!({
        "success": true,
        "image_id": image.image_id,
        "url": image.url,
        "public_id": image.public_id,
        "image_type": image.image_type,
        "uploaded_at": image.uploaded_at,
    })))
}

async fn list_images(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Image>>> {
    let username = authenticate(&db, &headers).await?;
    ensure_same_user(&username, &user_id)?;
    Ok(Json(db.read().await.images.get(&user_id).cloned().unwrap_or_default()))
}

// ---------------------------------------------------------------------------
// Food logs
// ---------------------------------------------------------------------------

async fn save_food_log(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<SaveFoodLogInput>,
) -> ApiResult<Json<serde_json::Value>> {
    let username = authenticate(&db, &headers).await?;
    ensure_same_user(&username, &input.user_id)?;

    let mut store = db.write().await;
    let id = store.next_id();
    let log = FoodLog {
        log_id: id.to_string(),
        meal_time: input.meal_time,
        foods: input.foods,
        total_calories: input.total_calories,
        created_at: now(),
        date_string: input.date_string,
    };
    let logs = store.food_logs.entry(username.clone()).or_default();
    logs.push(log);
    let first_log = logs.len() == 1;

    let mut awarded = Vec::new();
    if first_log {
        let achievement = Achievement {
            id: store.next_id(),
            achievement_name: "First Log".to_string(),
            description: "Logged your first meal".to_string(),
            points: 10,
            badge_icon: "🏆".to_string(),
            earned_date: now(),
        };
        awarded.push(json!({
            "name": achievement.achievement_name,
            "description": achievement.description,
            "points": achievement.points,
            "badge": achievement.badge_icon,
        }));
        store.achievements.entry(username).or_default().push(achievement);
    }

    Ok(Json(json!({
        "message": "Food log saved",
        "log_id": id.to_string(),
        "achievements": awarded,
    })))
}

async fn list_food_logs(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Query(filter): Query<FoodLogFilter>,
) -> ApiResult<Json<Vec<FoodLog>>> {
    let username = authenticate(&db, &headers).await?;
    ensure_same_user(&username, &user_id)?;

    let store = db.read().await;
    let logs = store
        .food_logs
        .get(&user_id)
        .map(|logs| {
            logs.iter()
                .rev()
                .filter(|l| filter.date_filter.as_ref().is_none_or(|d| &l.date_string == d))
                .take(filter.limit.unwrap_or(50))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Ok(Json(logs))
}

// ---------------------------------------------------------------------------
// Profile and achievements
// ---------------------------------------------------------------------------

async fn save_profile(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(mut profile): Json<serde_json::Value>,
) -> ApiResult<Json<serde_json::Value>> {
    let username = authenticate(&db, &headers).await?;
    let user_id = profile
        .get("user_id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ApiFailure::new(StatusCode::UNPROCESSABLE_ENTITY, "user_id is required"))?;
    ensure_same_user(&username, &user_id)?;

    profile["updated_at"] = json!(now());
    db.write().await.profiles.insert(user_id.clone(), profile);
    Ok(Json(json!({ "message": "Profile saved", "user_id": user_id })))
}

async fn get_profile(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let username = authenticate(&db, &headers).await?;
    ensure_same_user(&username, &user_id)?;
    db.read()
        .await
        .profiles
        .get(&user_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Profile not found"))
}

async fn list_achievements(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Achievement>>> {
    let username = authenticate(&db, &headers).await?;
    ensure_same_user(&username, &user_id)?;
    let mut achievements = db.read().await.achievements.get(&user_id).cloned().unwrap_or_default();
    achievements.sort_by(|a, b| b.earned_date.cmp(&a.earned_date));
    Ok(Json(achievements))
}
