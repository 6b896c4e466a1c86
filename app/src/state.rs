//! Screen-level state built on `NutritionService`.
//!
//! # Design
//! State changes only after a call succeeds. A failed refresh or save
//! returns the error and leaves what was shown before untouched, so the UI
//! can display the message inline next to the old data.

use chrono::Utc;
use nutai_core::{
    Achievement, ApiError, DailySummary, FoodLogEntry, FoodLogQuery, SaveFoodLogRequest, SavedFoodLog,
    UserProfile,
};
use tracing::debug;

use crate::service::NutritionService;
use crate::transport::Transport;

/// One user's food logs for one day, with running totals.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodDiary {
    user_id: String,
    date: String,
    limit: Option<u32>,
    entries: Vec<FoodLogEntry>,
    summary: DailySummary,
}

impl FoodDiary {
    pub fn new(user_id: impl Into<String>, date: impl Into<String>) -> Self {
        let date = date.into();
        Self {
            user_id: user_id.into(),
            summary: DailySummary::from_logs(&date, &[]),
            date,
            limit: None,
            entries: Vec::new(),
        }
    }

    /// Fetch at most `limit` entries per refresh instead of the server default.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Newest first, as the server returns them.
    pub fn entries(&self) -> &[FoodLogEntry] {
        &self.entries
    }

    pub fn summary(&self) -> &DailySummary {
        &self.summary
    }

    /// Replace the entries with the server's list for this day.
    pub async fn refresh<T: Transport>(&mut self, service: &NutritionService<T>) -> Result<(), ApiError> {
        let query = FoodLogQuery {
            limit: self.limit,
            ..FoodLogQuery::for_date(self.date.clone())
        };
        let entries = service.list_food_logs(&self.user_id, &query).await?;
        self.summary = DailySummary::from_logs(&self.date, &entries);
        self.entries = entries;
        debug!(date = %self.date, entries = self.entries.len(), "diary refreshed");
        Ok(())
    }

    /// Save `log` and, if it belongs to this day, show it without a refetch.
    pub async fn record<T: Transport>(
        &mut self,
        service: &NutritionService<T>,
        log: &SaveFoodLogRequest,
    ) -> Result<SavedFoodLog, ApiError> {
        let saved = service.save_food_log(log).await?;
        if log.date_string == self.date {
            self.entries.insert(
                0,
                FoodLogEntry {
                    log_id: saved.log_id.clone(),
                    user_id: Some(log.user_id.clone()),
                    date_string: log.date_string.clone(),
                    meal_time: log.meal_time,
                    foods: log.foods.clone(),
                    total_calories: log.total_calories,
                    created_at: Utc::now().naive_utc(),
                },
            );
            if let Some(limit) = self.limit {
                self.entries.truncate(limit as usize);
            }
            self.summary = DailySummary::from_logs(&self.date, &self.entries);
        }
        Ok(saved)
    }
}

/// Profile and achievements, fetched together.
///
/// The two calls are independent; either may fail without affecting the
/// other.
#[derive(Debug)]
pub struct Dashboard {
    pub profile: Result<Option<UserProfile>, ApiError>,
    pub achievements: Result<Vec<Achievement>, ApiError>,
}

impl Dashboard {
    pub async fn load<T: Transport>(service: &NutritionService<T>, user_id: &str) -> Self {
        let (profile, achievements) =
            tokio::join!(service.get_profile(user_id), service.list_achievements(user_id));
        Self {
            profile,
            achievements,
        }
    }

    /// Sum of achievement points; zero when achievements failed to load.
    pub fn total_points(&self) -> i64 {
        self.achievements
            .as_ref()
            .map(|list| list.iter().map(|a| a.points).sum())
            .unwrap_or(0)
    }
}
