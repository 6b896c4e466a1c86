//! HTTP request builder and response parser for the nutrition API.
//!
//! # Design
//! `NutritionClient` holds the base URL and a handle to the token store.
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`; the
//! caller executes the round-trip in between. Auth is resolved while
//! building, so a call that needs a token and has none fails with
//! `NotAuthenticated` before any request exists to send.
//!
//! Three parsers touch the token store: login and refresh write the new
//! token, and a failed `parse_current_user` clears it (implicit logout).

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::multipart::MultipartForm;
use crate::session::{MemoryTokenStore, TokenStore};
use crate::types::{
    Achievement, FoodLogEntry, FoodLogQuery, FoodSearchRequest, FoodSearchResponse, ImageUpload,
    ImageUploadResponse, LoginRequest, MealAnalysis, MealAnalysisRequest, NutritionAdvice,
    NutritionAdviceRequest, PersonalizedAdviceRequest, ProfileSaved, RegisterRequest,
    SaveFoodLogRequest, SavedFoodLog, SubstituteRequest, SubstituteResponse, Token, User, UserImage,
    UserProfile,
};

/// Page size the server applies when `limit` is omitted; sent explicitly.
pub const DEFAULT_FOOD_LOG_LIMIT: u32 = 50;

const JSON: &str = "application/json";

/// Whether an endpoint needs the stored bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Fail with `NotAuthenticated` when no token is stored.
    Required,
    /// Attach the token if one is stored.
    Optional,
    /// Never attach a token.
    None,
}

/// Client for the nutrition API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network. Cloning shares the token store.
#[derive(Clone)]
pub struct NutritionClient {
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl fmt::Debug for NutritionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NutritionClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl NutritionClient {
    /// Client with an in-memory token store.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_token_store(base_url, Arc::new(MemoryTokenStore::new()))
    }

    pub fn with_token_store(base_url: &str, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ApiError::InvalidUrl(format!("{base_url}: expected an http(s) URL")));
        }
        Ok(Self {
            base_url: base_url.to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn is_authenticated(&self) -> Result<bool, ApiError> {
        self.tokens.is_authenticated()
    }

    /// Forget the stored token. Local only; the server keeps no session.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.tokens.clear()?;
        info!("logged out");
        Ok(())
    }

    // -- auth ---------------------------------------------------------------

    pub fn build_register(&self, input: &RegisterRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/register", AuthMode::None, input)
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<User, ApiError> {
        decode(&response)
    }

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/login", AuthMode::None, input)
    }

    /// Decodes the token and stores it for subsequent calls.
    pub fn parse_login(&self, response: HttpResponse) -> Result<Token, ApiError> {
        let token: Token = decode(&response)?;
        self.tokens.save(&token.access_token)?;
        info!("logged in");
        Ok(token)
    }

    pub fn build_refresh_token(&self) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Post, "/auth/refresh", AuthMode::Required, None)
    }

    pub fn parse_refresh_token(&self, response: HttpResponse) -> Result<Token, ApiError> {
        let token: Token = decode(&response)?;
        self.tokens.save(&token.access_token)?;
        debug!("token refreshed");
        Ok(token)
    }

    pub fn build_current_user(&self) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Get, "/auth/me", AuthMode::Required, None)
    }

    /// A rejected session check clears the stored token. Transport failures
    /// never reach this point, so a dropped connection keeps the session.
    pub fn parse_current_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        decode(&response).inspect_err(|err| {
            match self.tokens.clear() {
                Ok(()) => info!(error = %err, "session check failed, logged out"),
                Err(clear_err) => warn!(error = %clear_err, "could not clear token after failed session check"),
            }
        })
    }

    // -- meal analysis and images -------------------------------------------

    pub fn build_analyze_meal(&self, input: &MealAnalysisRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/ai/analyze-meal", AuthMode::Optional, input)
    }

    pub fn parse_analyze_meal(&self, response: HttpResponse) -> Result<MealAnalysis, ApiError> {
        decode(&response)
    }

    pub fn build_upload_user_image(&self, upload: &ImageUpload) -> Result<HttpRequest, ApiError> {
        self.upload_request(upload, MultipartForm::new())
    }

    fn upload_request(&self, upload: &ImageUpload, form: MultipartForm) -> Result<HttpRequest, ApiError> {
        let form = form
            .file("file", &upload.filename, &upload.content_type, upload.bytes.clone())
            .text("image_type", &upload.image_type);
        self.request(
            HttpMethod::Post,
            "/upload-user-image",
            AuthMode::Required,
            Some((form.content_type(), form.encode())),
        )
    }

    pub fn parse_upload_user_image(&self, response: HttpResponse) -> Result<ImageUploadResponse, ApiError> {
        decode(&response)
    }

    pub fn build_list_user_images(&self, user_id: &str) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Get, &user_path(user_id, "images"), AuthMode::Required, None)
    }

    pub fn parse_list_user_images(&self, response: HttpResponse) -> Result<Vec<UserImage>, ApiError> {
        decode(&response)
    }

    // -- food logs ----------------------------------------------------------

    pub fn build_save_food_log(&self, input: &SaveFoodLogRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/food-logs", AuthMode::Required, input)
    }

    pub fn parse_save_food_log(&self, response: HttpResponse) -> Result<SavedFoodLog, ApiError> {
        decode(&response)
    }

    pub fn build_list_food_logs(&self, user_id: &str, query: &FoodLogQuery) -> Result<HttpRequest, ApiError> {
        let mut params = Vec::new();
        if let Some(date) = &query.date_filter {
            params.push(format!("date_filter={}", urlencoding::encode(date)));
        }
        params.push(format!("limit={}", query.limit.unwrap_or(DEFAULT_FOOD_LOG_LIMIT)));
        let endpoint = format!("{}?{}", user_path(user_id, "food-logs"), params.join("&"));
        self.request(HttpMethod::Get, &endpoint, AuthMode::Required, None)
    }

    pub fn parse_list_food_logs(&self, response: HttpResponse) -> Result<Vec<FoodLogEntry>, ApiError> {
        decode(&response)
    }

    // -- advice -------------------------------------------------------------

    pub fn build_nutrition_advice(&self, input: &NutritionAdviceRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/ai/nutrition-advice", AuthMode::Optional, input)
    }

    pub fn parse_nutrition_advice(&self, response: HttpResponse) -> Result<NutritionAdvice, ApiError> {
        decode(&response)
    }

    pub fn build_personalized_nutrition_advice(
        &self,
        input: &PersonalizedAdviceRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Post,
            "/ai/personalized-nutrition-advice",
            AuthMode::Required,
            input,
        )
    }

    pub fn parse_personalized_nutrition_advice(&self, response: HttpResponse) -> Result<NutritionAdvice, ApiError> {
        decode(&response)
    }

    // -- profile and achievements -------------------------------------------

    pub fn build_save_profile(&self, profile: &UserProfile) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/users/profile", AuthMode::Required, profile)
    }

    pub fn parse_save_profile(&self, response: HttpResponse) -> Result<ProfileSaved, ApiError> {
        decode(&response)
    }

    pub fn build_get_profile(&self, user_id: &str) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Get, &user_path(user_id, "profile"), AuthMode::Required, None)
    }

    /// A user who never saved a profile gets 404; that is `Ok(None)`, not an error.
    pub fn parse_get_profile(&self, response: HttpResponse) -> Result<Option<UserProfile>, ApiError> {
        if response.status == 404 {
            debug!("no profile stored");
            return Ok(None);
        }
        decode(&response).map(Some)
    }

    pub fn build_list_achievements(&self, user_id: &str) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Get, &user_path(user_id, "achievements"), AuthMode::Required, None)
    }

    pub fn parse_list_achievements(&self, response: HttpResponse) -> Result<Vec<Achievement>, ApiError> {
        decode(&response)
    }

    // -- search -------------------------------------------------------------

    pub fn build_search_food(&self, input: &FoodSearchRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/ai/search", AuthMode::None, input)
    }

    pub fn parse_search_food(&self, response: HttpResponse) -> Result<FoodSearchResponse, ApiError> {
        decode(&response)
    }

    pub fn build_find_substitutes(&self, input: &SubstituteRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/ai/find-substitutes", AuthMode::None, input)
    }

    pub fn parse_find_substitutes(&self, response: HttpResponse) -> Result<SubstituteResponse, ApiError> {
        decode(&response)
    }

    // -- plumbing -----------------------------------------------------------

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        auth: AuthMode,
        payload: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.request(method, endpoint, auth, Some((JSON.to_string(), body)))
    }

    /// `body` is `(content type, bytes)`.
    fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        auth: AuthMode,
        body: Option<(String, Vec<u8>)>,
    ) -> Result<HttpRequest, ApiError> {
        let token = match auth {
            AuthMode::None => None,
            AuthMode::Optional => self.tokens.load()?,
            AuthMode::Required => match self.tokens.load()? {
                Some(token) => Some(token),
                None => {
                    debug!(endpoint, "no stored token");
                    return Err(ApiError::NotAuthenticated);
                }
            },
        };

        let mut headers = Vec::new();
        let body = body.map(|(content_type, bytes)| {
            headers.push(("content-type".to_string(), content_type));
            bytes
        });
        if let Some(token) = &token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }

        let url = format!("{}{}", self.base_url, endpoint);
        debug!(method = method.as_str(), %url, authenticated = token.is_some(), "built request");
        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }
}

fn user_path(user_id: &str, resource: &str) -> String {
    format!("/users/{}/{resource}", urlencoding::encode(user_id))
}

/// Map non-success status codes to `Api`/`Server` errors.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let err = ApiError::from_response(response);
    warn!(status = response.status, error = %err, "request failed");
    Err(err)
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
