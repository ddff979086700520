use crate::domain::numeric::{round_half_up, strict_number};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CalcError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Invalid value for {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
    #[error("calculation produced a non-finite {0}")]
    NonFinite(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    WeightLoss,
    MuscleGain,
    Maintain,
}

impl Goal {
    /// Unrecognized goals behave as maintenance.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "weight_loss" => Self::WeightLoss,
            "muscle_gain" => Self::MuscleGain,
            _ => Self::Maintain,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::WeightLoss => "weight loss",
            Self::MuscleGain => "muscle gain",
            Self::Maintain => "maintenance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Other,
}

impl Gender {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("male") {
            Self::Male
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    /// Unknown levels are treated as moderate.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sedentary" => Self::Sedentary,
            "light" => Self::Light,
            "active" => Self::Active,
            "very_active" => Self::VeryActive,
            _ => Self::Moderate,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::Light => 1.375,
            Self::Moderate => 1.55,
            Self::Active => 1.725,
            Self::VeryActive => 1.9,
        }
    }
}

/// Raw profile fields as the client sends them. Numbers may arrive as JSON
/// numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub goal: Option<Value>,
    pub age: Option<Value>,
    pub gender: Option<Value>,
    pub height: Option<Value>,
    pub weight: Option<Value>,
    pub activity_level: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileInput {
    pub goal: String,
    pub age: f64,
    pub gender: String,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: String,
}

impl ProfileFields {
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("goal", &self.goal),
            ("age", &self.age),
            ("gender", &self.gender),
            ("height", &self.height),
            ("weight", &self.weight),
            ("activityLevel", &self.activity_level),
        ]
        .into_iter()
        .filter(|(_, value)| is_absent(value.as_ref()))
        .map(|(name, _)| name)
        .collect()
    }

    pub fn goal_text(&self) -> Option<&str> {
        self.goal.as_ref().and_then(Value::as_str)
    }

    pub fn into_input(self) -> Result<ProfileInput, CalcError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(CalcError::MissingFields(missing));
        }
        Ok(ProfileInput {
            goal: text(self.goal.as_ref(), "goal")?,
            age: positive(self.age.as_ref(), "age")?,
            gender: text(self.gender.as_ref(), "gender")?,
            height_cm: positive(self.height.as_ref(), "height")?,
            weight_kg: positive(self.weight.as_ref(), "weight")?,
            activity_level: text(self.activity_level.as_ref(), "activityLevel")?,
        })
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn text(value: Option<&Value>, field: &'static str) -> Result<String, CalcError> {
    value
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or(CalcError::InvalidField {
            field,
            reason: "expected a string",
        })
}

fn positive(value: Option<&Value>, field: &'static str) -> Result<f64, CalcError> {
    let number = value.and_then(strict_number).ok_or(CalcError::InvalidField {
        field,
        reason: "expected a number",
    })?;
    if number <= 0.0 {
        return Err(CalcError::InvalidField {
            field,
            reason: "must be greater than zero",
        });
    }
    Ok(number)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub goal: String,
    pub age: f64,
    pub gender: String,
    pub height: f64,
    pub weight: f64,
    pub activity_level: String,
    pub bmr: i64,
    pub tdee: i64,
    pub daily_calorie_target: i64,
    pub recommended_macros: MacroTargets,
}

impl UserProfile {
    pub fn summary(&self) -> String {
        format!(
            "Your daily calorie target is {} calories for {}",
            self.daily_calorie_target,
            Goal::parse(&self.goal).label()
        )
    }
}

/// Harris-Benedict BMR, unrounded.
pub fn basal_metabolic_rate(gender: Gender, weight_kg: f64, height_cm: f64, age: f64) -> f64 {
    match gender {
        Gender::Male => 88.362 + 13.397 * weight_kg + 4.799 * height_cm - 5.677 * age,
        Gender::Other => 447.593 + 9.247 * weight_kg + 3.098 * height_cm - 4.330 * age,
    }
}

pub fn compute_profile(input: &ProfileInput) -> Result<UserProfile, CalcError> {
    let bmr = basal_metabolic_rate(
        Gender::parse(&input.gender),
        input.weight_kg,
        input.height_cm,
        input.age,
    );
    let multiplier = ActivityLevel::parse(&input.activity_level).multiplier();
    let tdee = round_half_up(bmr * multiplier);

    // Protein scales the raw weight figure; no unit conversion happens here.
    let weight = input.weight_kg;
    let (target, protein, carbs, fat) = match Goal::parse(&input.goal) {
        Goal::WeightLoss => {
            let target = round_half_up(tdee - 500.0);
            (target, weight * 2.2, 0.40 * target / 4.0, 0.25 * target / 9.0)
        }
        Goal::MuscleGain => {
            let target = round_half_up(tdee + 300.0);
            (target, weight * 2.4, 0.45 * target / 4.0, 0.25 * target / 9.0)
        }
        Goal::Maintain => (tdee, weight * 2.0, 0.45 * tdee / 4.0, 0.30 * tdee / 9.0),
    };

    Ok(UserProfile {
        goal: input.goal.clone(),
        age: input.age,
        gender: input.gender.clone(),
        height: input.height_cm,
        weight: input.weight_kg,
        activity_level: input.activity_level.clone(),
        bmr: finite_int(bmr, "bmr")?,
        tdee: finite_int(tdee, "tdee")?,
        daily_calorie_target: finite_int(target, "dailyCalorieTarget")?,
        recommended_macros: MacroTargets {
            protein: finite_int(protein, "protein")?,
            carbs: finite_int(carbs, "carbs")?,
            fat: finite_int(fat, "fat")?,
        },
    })
}

fn finite_int(value: f64, name: &'static str) -> Result<i64, CalcError> {
    if value.is_finite() {
        Ok(round_half_up(value) as i64)
    } else {
        Err(CalcError::NonFinite(name))
    }
}

/// Coarse table-driven target kept for quick client testing. Absent inputs
/// contribute no adjustment.
pub fn quick_target(
    goal: Option<&str>,
    age: Option<f64>,
    gender: Option<&str>,
    activity_level: Option<&str>,
) -> i64 {
    let mut target = match gender.map(Gender::parse) {
        Some(Gender::Male) => 2000,
        _ => 1800,
    };

    match activity_level.map(|a| a.trim().to_ascii_lowercase()).as_deref() {
        Some("active") => target += 300,
        Some("sedentary") => target -= 200,
        _ => {}
    }

    match age {
        Some(age) if age > 40.0 => target -= 100,
        Some(age) if age < 25.0 => target += 100,
        _ => {}
    }

    match goal.map(Goal::parse) {
        Some(Goal::WeightLoss) => target -= 500,
        Some(Goal::MuscleGain) => target += 300,
        _ => {}
    }

    target
}
