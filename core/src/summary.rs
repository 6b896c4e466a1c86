//! Per-day totals computed from fetched food logs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{FoodLogEntry, MealTime};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DailySummary {
    pub date: String,
    pub total_calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    /// Number of logged entries per meal time; absent keys mean zero.
    pub meals: BTreeMap<MealTime, usize>,
}

impl DailySummary {
    /// Calories come from each entry's `total_calories`, which is what the
    /// user confirmed; macros are summed from the individual items.
    pub fn from_logs(date: &str, logs: &[FoodLogEntry]) -> Self {
        let mut summary = DailySummary {
            date: date.to_string(),
            ..Default::default()
        };
        for entry in logs {
            summary.total_calories += entry.total_calories;
            *summary.meals.entry(entry.meal_time).or_insert(0) += 1;
            for item in &entry.foods {
                summary.protein_g += item.protein_g;
                summary.carbs_g += item.carbs_g;
                summary.fat_g += item.fat_g;
            }
        }
        summary
    }

    pub fn entry_count(&self) -> usize {
        self.meals.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FoodLogItem;
    use chrono::NaiveDate;

    fn entry(meal_time: MealTime, total: f64, items: Vec<FoodLogItem>) -> FoodLogEntry {
        FoodLogEntry {
            log_id: "1".to_string(),
            user_id: None,
            date_string: "2024-01-01".to_string(),
            meal_time,
            foods: items,
            total_calories: total,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    fn item(protein: f64, carbs: f64, fat: f64) -> FoodLogItem {
        FoodLogItem {
            name: "x".to_string(),
            calories: 0.0,
            protein_g: protein,
            carbs_g: carbs,
            fat_g: fat,
            micronutrients: None,
        }
    }

    #[test]
    fn empty_logs_give_zero_summary() {
        let summary = DailySummary::from_logs("2024-01-01", &[]);
        assert_eq!(summary.date, "2024-01-01");
        assert_eq!(summary.total_calories, 0.0);
        assert_eq!(summary.protein_g, 0.0);
        assert!(summary.is_empty());
    }

    #[test]
    fn totals_and_meal_counts() {
        let logs = vec![
            entry(MealTime::Breakfast, 300.0, vec![item(20.0, 30.0, 10.0)]),
            entry(MealTime::Snack, 100.0, vec![item(1.0, 20.0, 0.5), item(2.0, 0.0, 1.5)]),
            entry(MealTime::Snack, 50.0, Vec::new()),
        ];
        let summary = DailySummary::from_logs("2024-01-01", &logs);
        assert_eq!(summary.total_calories, 450.0);
        assert_eq!(summary.protein_g, 23.0);
        assert_eq!(summary.carbs_g, 50.0);
        assert_eq!(summary.fat_g, 12.0);
        assert_eq!(summary.meals.get(&MealTime::Snack), Some(&2));
        assert_eq!(summary.meals.get(&MealTime::Lunch), None);
        assert_eq!(summary.entry_count(), 3);
    }
}
