//! Operation table: maps an `FfiOperation` plus JSON input onto the core
//! `build_*` / `parse_*` pair.

use nutai_core::{ApiError, FoodLogQuery, HttpRequest, HttpResponse, NutritionClient};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::Failure;

/// Operation selector passed as a plain integer from C.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiOperation {
    Register = 0,
    Login = 1,
    RefreshToken = 2,
    CurrentUser = 3,
    AnalyzeMeal = 4,
    UploadUserImage = 5,
    ListUserImages = 6,
    SaveFoodLog = 7,
    ListFoodLogs = 8,
    NutritionAdvice = 9,
    PersonalizedNutritionAdvice = 10,
    SaveProfile = 11,
    GetProfile = 12,
    ListAchievements = 13,
    SearchFood = 14,
    FindSubstitutes = 15,
}

impl FfiOperation {
    pub fn from_raw(raw: u32) -> Option<Self> {
        use FfiOperation::*;
        Some(match raw {
            0 => Register,
            1 => Login,
            2 => RefreshToken,
            3 => CurrentUser,
            4 => AnalyzeMeal,
            5 => UploadUserImage,
            6 => ListUserImages,
            7 => SaveFoodLog,
            8 => ListFoodLogs,
            9 => NutritionAdvice,
            10 => PersonalizedNutritionAdvice,
            11 => SaveProfile,
            12 => GetProfile,
            13 => ListAchievements,
            14 => SearchFood,
            15 => FindSubstitutes,
            _ => return None,
        })
    }
}

#[derive(Deserialize)]
struct UserArgs {
    user_id: String,
}

#[derive(Deserialize)]
struct FoodLogArgs {
    user_id: String,
    #[serde(default)]
    date_filter: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
}

fn input<T: DeserializeOwned>(json: Option<&str>) -> Result<T, Failure> {
    let json = json.ok_or_else(|| Failure::null_arg("input_json"))?;
    serde_json::from_str(json).map_err(|e| Failure::invalid_input(format!("invalid input JSON: {e}")))
}

fn user_id(json: Option<&str>) -> Result<String, Failure> {
    input::<UserArgs>(json).map(|a| a.user_id)
}

fn output<T: Serialize>(value: &T) -> Result<String, Failure> {
    serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()).into())
}

/// Build the request for `op`. Uploads carry raw bytes and go through
/// `nutai_build_upload_user_image` instead.
pub(crate) fn build(client: &NutritionClient, op: FfiOperation, json: Option<&str>) -> Result<HttpRequest, Failure> {
    use FfiOperation::*;
    let req = match op {
        Register => client.build_register(&input(json)?)?,
        Login => client.build_login(&input(json)?)?,
        RefreshToken => client.build_refresh_token()?,
        CurrentUser => client.build_current_user()?,
        AnalyzeMeal => client.build_analyze_meal(&input(json)?)?,
        UploadUserImage => {
            return Err(Failure::invalid_input(
                "image uploads are built with nutai_build_upload_user_image",
            ))
        }
        ListUserImages => client.build_list_user_images(&user_id(json)?)?,
        SaveFoodLog => client.build_save_food_log(&input(json)?)?,
        ListFoodLogs => {
            let args: FoodLogArgs = input(json)?;
            let query = FoodLogQuery {
                date_filter: args.date_filter,
                limit: args.limit,
            };
            client.build_list_food_logs(&args.user_id, &query)?
        }
        NutritionAdvice => client.build_nutrition_advice(&input(json)?)?,
        PersonalizedNutritionAdvice => client.build_personalized_nutrition_advice(&input(json)?)?,
        SaveProfile => client.build_save_profile(&input(json)?)?,
        GetProfile => client.build_get_profile(&user_id(json)?)?,
        ListAchievements => client.build_list_achievements(&user_id(json)?)?,
        SearchFood => client.build_search_food(&input(json)?)?,
        FindSubstitutes => client.build_find_substitutes(&input(json)?)?,
    };
    Ok(req)
}

/// Parse `response` for `op` and re-encode the result as JSON.
pub(crate) fn parse(client: &NutritionClient, op: FfiOperation, response: HttpResponse) -> Result<String, Failure> {
    use FfiOperation::*;
    match op {
        Register => output(&client.parse_register(response)?),
        Login => output(&client.parse_login(response)?),
        RefreshToken => output(&client.parse_refresh_token(response)?),
        CurrentUser => output(&client.parse_current_user(response)?),
        AnalyzeMeal => output(&client.parse_analyze_meal(response)?),
        UploadUserImage => output(&client.parse_upload_user_image(response)?),
        ListUserImages => output(&client.parse_list_user_images(response)?),
        SaveFoodLog => output(&client.parse_save_food_log(response)?),
        ListFoodLogs => output(&client.parse_list_food_logs(response)?),
        NutritionAdvice => output(&client.parse_nutrition_advice(response)?),
        PersonalizedNutritionAdvice => output(&client.parse_personalized_nutrition_advice(response)?),
        SaveProfile => output(&client.parse_save_profile(response)?),
        GetProfile => output(&client.parse_get_profile(response)?),
        ListAchievements => output(&client.parse_list_achievements(response)?),
        SearchFood => output(&client.parse_search_food(response)?),
        FindSubstitutes => output(&client.parse_find_substitutes(response)?),
    }
}
