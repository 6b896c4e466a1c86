//! Domain DTOs for the nutrition API.
//!
//! # Design
//! Field names match the server's JSON exactly. Timestamps are naive UTC
//! (`2024-01-01T08:30:00.123456`), which is what the backend emits, so they
//! decode as `NaiveDateTime`. Response types default optional collections so
//! older server builds that omit them still decode.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

// ---------------------------------------------------------------------------
// Meal analysis
// ---------------------------------------------------------------------------

/// Input for meal analysis: a photo URL, free text, or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MealAnalysisRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub user_input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrections: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Food {
    pub name: String,
    pub calories: u32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    Vision,
    Text,
    ErrorFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealAnalysis {
    pub meal_name: String,
    pub meal_type: String,
    pub foods: Vec<Food>,
    pub total_calories: u32,
    pub analysis_method: AnalysisMethod,
}

impl MealAnalysis {
    /// Turn an analysis result into a food log ready to be saved.
    pub fn to_food_log(&self, user_id: &str, date_string: &str, meal_time: MealTime) -> SaveFoodLogRequest {
        SaveFoodLogRequest {
            user_id: user_id.to_string(),
            date_string: date_string.to_string(),
            meal_time,
            foods: self
                .foods
                .iter()
                .map(|f| FoodLogItem {
                    name: f.name.clone(),
                    calories: f64::from(f.calories),
                    protein_g: f.protein_g,
                    carbs_g: f.carbs_g,
                    fat_g: f.fat_g,
                    micronutrients: None,
                })
                .collect(),
            total_calories: f64::from(self.total_calories),
        }
    }
}

// ---------------------------------------------------------------------------
// Food logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MealTime {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealTime {
    pub const ALL: [MealTime; 4] = [MealTime::Breakfast, MealTime::Lunch, MealTime::Dinner, MealTime::Snack];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealTime::Breakfast => "breakfast",
            MealTime::Lunch => "lunch",
            MealTime::Dinner => "dinner",
            MealTime::Snack => "snack",
        }
    }
}

impl fmt::Display for MealTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MealTime::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown meal time: {s}"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FoodLogItem {
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub micronutrients: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveFoodLogRequest {
    pub user_id: String,
    pub date_string: String,
    pub meal_time: MealTime,
    pub foods: Vec<FoodLogItem>,
    pub total_calories: f64,
}

/// Achievement awarded as a side effect of saving a food log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AwardedAchievement {
    pub name: String,
    pub description: String,
    pub points: i64,
    #[serde(default)]
    pub badge: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedFoodLog {
    pub message: String,
    #[serde(deserialize_with = "string_or_number")]
    pub log_id: String,
    #[serde(default)]
    pub achievements: Vec<AwardedAchievement>,
}

/// A stored food log as returned by the list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodLogEntry {
    #[serde(alias = "id", deserialize_with = "string_or_number")]
    pub log_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub date_string: String,
    pub meal_time: MealTime,
    #[serde(default)]
    pub foods: Vec<FoodLogItem>,
    pub total_calories: f64,
    pub created_at: NaiveDateTime,
}

/// Filter for `GET /users/{id}/food-logs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoodLogQuery {
    /// `YYYY-MM-DD`; all dates when `None`.
    pub date_filter: Option<String>,
    /// Server default (50) when `None`.
    pub limit: Option<u32>,
}

impl FoodLogQuery {
    pub fn for_date(date: impl Into<String>) -> Self {
        Self {
            date_filter: Some(date.into()),
            limit: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Advice
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NutritionAdviceRequest {
    pub food_log: Vec<FoodLogItem>,
    pub daily_targets: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dietary_prefs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonalizedAdviceRequest {
    pub user_id: String,
    pub food_log: Vec<FoodLogItem>,
    pub daily_targets: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodSuggestion {
    pub meal_idea: String,
    pub description: String,
    pub total_calories: f64,
    pub protein_provided: f64,
    pub carbs_provided: f64,
    pub fat_provided: f64,
    #[serde(default)]
    pub percentage_coverage: BTreeMap<String, i64>,
    pub meal_type: String,
    #[serde(default = "default_true")]
    pub easy_to_make: bool,
    pub why_perfect: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutrientAdvice {
    pub nutrient: String,
    pub current_intake: f64,
    pub target: f64,
    pub deficit: f64,
    #[serde(default)]
    pub suggestions: Vec<FoodSuggestion>,
    #[serde(default)]
    pub why_important: String,
}

/// Response of both advice endpoints; `personalized_insights` is only
/// filled by the personalized one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionAdvice {
    pub overall_summary: String,
    #[serde(default)]
    pub safety_notes: Vec<String>,
    #[serde(default)]
    pub nutrients_to_focus_on: Vec<NutrientAdvice>,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub personalized_insights: Vec<String>,
}

// ---------------------------------------------------------------------------
// Profile and achievements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserProfile {
    pub user_id: String,
    pub dietary_preferences: Vec<String>,
    pub favorite_foods: Vec<String>,
    pub disliked_foods: Vec<String>,
    pub cuisine_preferences: Vec<String>,
    pub allergies: Vec<String>,
    pub activity_level: String,
    pub nutrition_goals: BTreeMap<String, f64>,
    pub ai_personality_type: String,
    pub preferred_communication_style: String,
    pub coaching_frequency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            dietary_preferences: Vec::new(),
            favorite_foods: Vec::new(),
            disliked_foods: Vec::new(),
            cuisine_preferences: Vec::new(),
            allergies: Vec::new(),
            activity_level: "normal".to_string(),
            nutrition_goals: BTreeMap::new(),
            ai_personality_type: "supportive".to_string(),
            preferred_communication_style: "encouraging".to_string(),
            coaching_frequency: "daily".to_string(),
            updated_at: None,
        }
    }
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileSaved {
    pub message: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Achievement {
    pub id: i64,
    pub achievement_name: String,
    pub description: String,
    pub points: i64,
    pub badge_icon: String,
    pub earned_date: NaiveDateTime,
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// A local image to send to `POST /upload-user-image`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    /// MIME type, e.g. `image/jpeg`. The server rejects non-image types.
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Server-side category, `meal` by default.
    pub image_type: String,
}

impl ImageUpload {
    pub fn meal_photo(filename: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
            image_type: "meal".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageUploadResponse {
    pub success: bool,
    pub image_id: String,
    pub url: String,
    pub public_id: String,
    pub image_type: String,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserImage {
    pub image_id: String,
    pub public_id: String,
    pub url: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    pub file_size: u64,
    pub image_type: String,
    pub uploaded_at: NaiveDateTime,
}

// ---------------------------------------------------------------------------
// Search and substitutes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FoodSearchRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodSearchResult {
    pub name: String,
    #[serde(default)]
    pub nutrition_per_100g: BTreeMap<String, f64>,
    #[serde(default)]
    pub portion_suggestions: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodSearchResponse {
    pub results: Vec<FoodSearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubstituteRequest {
    pub food_name: String,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    pub nutrition_goals: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubstituteOption {
    pub food: String,
    pub reason: String,
    pub nutrition_comparison: String,
    pub availability: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubstituteResponse {
    pub original_food: String,
    pub substitutes: Vec<SubstituteOption>,
}

fn default_true() -> bool {
    true
}

/// Log ids are strings in some responses and integers in others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
