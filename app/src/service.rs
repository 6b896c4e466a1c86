//! Async facade over `NutritionClient` and a `Transport`.
//!
//! Every method is build, execute, parse. A build error (most often
//! `NotAuthenticated`) returns before the transport is touched.

use nutai_core::{
    Achievement, ApiError, FoodLogEntry, FoodLogQuery, FoodSearchRequest, FoodSearchResponse,
    HttpRequest, HttpResponse, ImageUpload, ImageUploadResponse, LoginRequest, MealAnalysis,
    MealAnalysisRequest, NutritionAdvice, NutritionAdviceRequest, NutritionClient,
    PersonalizedAdviceRequest, ProfileSaved, RegisterRequest, SaveFoodLogRequest, SavedFoodLog,
    SubstituteRequest, SubstituteResponse, Token, User, UserImage, UserProfile,
};
use tracing::debug;

use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct NutritionService<T> {
    client: NutritionClient,
    transport: T,
}

impl<T: Transport> NutritionService<T> {
    pub fn new(client: NutritionClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &NutritionClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_authenticated(&self) -> Result<bool, ApiError> {
        self.client.is_authenticated()
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.client.logout()
    }

    async fn call<R>(
        &self,
        request: Result<HttpRequest, ApiError>,
        parse: impl FnOnce(&NutritionClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let request = request?;
        debug!(method = request.method.as_str(), url = %request.url, "sending");
        let response = self.transport.execute(request).await?;
        parse(&self.client, response)
    }

    // -- auth ---------------------------------------------------------------

    pub async fn register(&self, input: &RegisterRequest) -> Result<User, ApiError> {
        self.call(self.client.build_register(input), NutritionClient::parse_register)
            .await
    }

    /// Stores the returned token on success.
    pub async fn login(&self, input: &LoginRequest) -> Result<Token, ApiError> {
        self.call(self.client.build_login(input), NutritionClient::parse_login)
            .await
    }

    pub async fn refresh_token(&self) -> Result<Token, ApiError> {
        self.call(self.client.build_refresh_token(), NutritionClient::parse_refresh_token)
            .await
    }

    /// Fetch the logged-in user. A response that is not a valid user clears
    /// the stored token; a lost connection keeps it.
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.call(self.client.build_current_user(), NutritionClient::parse_current_user)
            .await
    }

    // -- meal analysis and images -------------------------------------------

    pub async fn analyze_meal(&self, input: &MealAnalysisRequest) -> Result<MealAnalysis, ApiError> {
        self.call(self.client.build_analyze_meal(input), NutritionClient::parse_analyze_meal)
            .await
    }

    pub async fn upload_user_image(&self, upload: &ImageUpload) -> Result<ImageUploadResponse, ApiError> {
        self.call(
            self.client.build_upload_user_image(upload),
            NutritionClient::parse_upload_user_image,
        )
        .await
    }

    pub async fn list_user_images(&self, user_id: &str) -> Result<Vec<UserImage>, ApiError> {
        self.call(
            self.client.build_list_user_images(user_id),
            NutritionClient::parse_list_user_images,
        )
        .await
    }

    // -- food logs ----------------------------------------------------------

    pub async fn save_food_log(&self, input: &SaveFoodLogRequest) -> Result<SavedFoodLog, ApiError> {
        self.call(self.client.build_save_food_log(input), NutritionClient::parse_save_food_log)
            .await
    }

    pub async fn list_food_logs(&self, user_id: &str, query: &FoodLogQuery) -> Result<Vec<FoodLogEntry>, ApiError> {
        self.call(
            self.client.build_list_food_logs(user_id, query),
            NutritionClient::parse_list_food_logs,
        )
        .await
    }

    // -- advice -------------------------------------------------------------

    pub async fn nutrition_advice(&self, input: &NutritionAdviceRequest) -> Result<NutritionAdvice, ApiError> {
        self.call(
            self.client.build_nutrition_advice(input),
            NutritionClient::parse_nutrition_advice,
        )
        .await
    }

    pub async fn personalized_nutrition_advice(
        &self,
        input: &PersonalizedAdviceRequest,
    ) -> Result<NutritionAdvice, ApiError> {
        self.call(
            self.client.build_personalized_nutrition_advice(input),
            NutritionClient::parse_personalized_nutrition_advice,
        )
        .await
    }

    // -- profile and achievements -------------------------------------------

    pub async fn save_profile(&self, profile: &UserProfile) -> Result<ProfileSaved, ApiError> {
        self.call(self.client.build_save_profile(profile), NutritionClient::parse_save_profile)
            .await
    }

    /// `Ok(None)` when the user has not saved a profile yet.
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, ApiError> {
        self.call(self.client.build_get_profile(user_id), NutritionClient::parse_get_profile)
            .await
    }

    pub async fn list_achievements(&self, user_id: &str) -> Result<Vec<Achievement>, ApiError> {
        self.call(
            self.client.build_list_achievements(user_id),
            NutritionClient::parse_list_achievements,
        )
        .await
    }

    // -- search -------------------------------------------------------------

    pub async fn search_food(&self, input: &FoodSearchRequest) -> Result<FoodSearchResponse, ApiError> {
        self.call(self.client.build_search_food(input), NutritionClient::parse_search_food)
            .await
    }

    pub async fn find_substitutes(&self, input: &SubstituteRequest) -> Result<SubstituteResponse, ApiError> {
        self.call(
            self.client.build_find_substitutes(input),
            NutritionClient::parse_find_substitutes,
        )
        .await
    }
}
