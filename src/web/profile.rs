use crate::domain::dashboard::{compute_dashboard, DashboardProfile, DashboardSnapshot, MealEntry};
use crate::domain::numeric::strict_number;
use crate::domain::profile::{compute_profile, quick_target, Goal, ProfileFields, UserProfile};
use crate::error::ApiError;
use crate::state::SharedState;
use crate::web::extract::ApiJson;
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    success: bool,
    data: UserProfile,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRequest {
    user_profile: Option<DashboardProfile>,
    todays_meals: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    success: bool,
    data: DashboardSnapshot,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickTargetRequest {
    goal: Option<String>,
    age: Option<Value>,
    gender: Option<String>,
    activity_level: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickTarget {
    daily_calorie_target: i64,
    goal: String,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct QuickTargetResponse {
    success: bool,
    data: QuickTarget,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/user/profile", post(create_profile).fallback(super::not_found))
        .route("/api/user/dashboard", post(dashboard).fallback(super::not_found))
        .route("/api/calculate-target", post(calculate_target).fallback(super::not_found))
        .with_state(state)
}

pub async fn create_profile(
    ApiJson(fields): ApiJson<ProfileFields>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let input = fields.into_input()?;
    let profile = compute_profile(&input)?;
    tracing::info!(
        "Profile computed: goal={}, bmr={}, tdee={}, target={}",
        profile.goal,
        profile.bmr,
        profile.tdee,
        profile.daily_calorie_target
    );
    let message = profile.summary();
    Ok(Json(ProfileResponse {
        success: true,
        data: profile,
        message,
    }))
}

pub async fn dashboard(
    ApiJson(payload): ApiJson<DashboardRequest>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let profile = payload
        .user_profile
        .ok_or_else(|| ApiError::Validation("User profile is required".to_string()))?;
    let (goal, targets) = profile.resolve()?;
    let meals: Vec<MealEntry> = payload
        .todays_meals
        .unwrap_or_default()
        .iter()
        .map(MealEntry::from_value)
        .collect();

    let snapshot = compute_dashboard(goal, &targets, &meals)?;
    tracing::debug!(
        "Dashboard: {} meals, {} kcal of {}",
        snapshot.meals_count,
        snapshot.totals.calories,
        targets.calories
    );
    Ok(Json(DashboardResponse {
        success: true,
        data: snapshot,
    }))
}

pub async fn calculate_target(
    ApiJson(payload): ApiJson<QuickTargetRequest>,
) -> Result<Json<QuickTargetResponse>, ApiError> {
    let age = payload.age.as_ref().and_then(strict_number);
    let target = quick_target(
        payload.goal.as_deref(),
        age,
        payload.gender.as_deref(),
        payload.activity_level.as_deref(),
    );
    let goal = payload.goal.unwrap_or_else(|| "maintain".to_string());
    let message = format!(
        "Your daily calorie target is {} calories for {}",
        target,
        Goal::parse(&goal).label()
    );
    Ok(Json(QuickTargetResponse {
        success: true,
        data: QuickTarget {
            daily_calorie_target: target,
            goal,
            message,
        },
    }))
}
