use crate::domain::numeric::{lenient_number, round_half_up, round_to_tenth, strict_number};
use crate::domain::profile::{compute_profile, CalcError, Goal, ProfileFields, UserProfile};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_RECOMMENDATIONS: usize = 2;

/// One logged meal. `portion` multiplies every nutrient; it is a count of
/// servings, not the descriptive text a nutrition estimate carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MealEntry {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub portion: f64,
}

impl MealEntry {
    /// Unreadable nutrients count as 0 and an unreadable or zero portion as 1.
    pub fn from_value(value: &Value) -> Self {
        let read = |key: &str| value.get(key).and_then(lenient_number).unwrap_or(0.0);
        let portion = value
            .get("portionSize")
            .and_then(lenient_number)
            .filter(|p| *p != 0.0)
            .unwrap_or(1.0);
        Self {
            calories: read("calories"),
            protein: read("protein"),
            carbs: read("carbs"),
            fat: read("fat"),
            fiber: read("fiber"),
            portion,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyTargets {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl From<&UserProfile> for DailyTargets {
    fn from(profile: &UserProfile) -> Self {
        Self {
            calories: profile.daily_calorie_target as f64,
            protein: profile.recommended_macros.protein as f64,
            carbs: profile.recommended_macros.carbs as f64,
            fat: profile.recommended_macros.fat as f64,
        }
    }
}

/// Profile as resubmitted by the client for a dashboard request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardProfile {
    #[serde(flatten)]
    pub fields: ProfileFields,
    pub daily_calorie_target: Option<Value>,
    pub recommended_macros: Option<Value>,
}

impl DashboardProfile {
    /// Uses the stored targets when complete, otherwise recomputes them from
    /// the biometric fields.
    pub fn resolve(&self) -> Result<(Goal, DailyTargets), CalcError> {
        let goal = self.fields.goal_text().map(Goal::parse).unwrap_or(Goal::Maintain);
        if let Some(targets) = self.stored_targets() {
            return Ok((goal, targets));
        }
        let input = self.fields.clone().into_input()?;
        let profile = compute_profile(&input)?;
        Ok((goal, DailyTargets::from(&profile)))
    }

    fn stored_targets(&self) -> Option<DailyTargets> {
        let calories = self.daily_calorie_target.as_ref().and_then(strict_number)?;
        let macros = self.recommended_macros.as_ref()?;
        let read = |key: &str| macros.get(key).and_then(strict_number);
        Some(DailyTargets {
            calories,
            protein: read("protein")?,
            carbs: read("carbs")?,
            fat: read("fat")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientTotals {
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Remaining {
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Whole-number percentages of each target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub calories: i64,
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub goal: Goal,
    pub totals: NutrientTotals,
    pub targets: DailyTargets,
    pub remaining: Remaining,
    pub progress: Progress,
    pub recommendations: Vec<String>,
    pub meals_count: usize,
}

pub fn compute_dashboard(
    goal: Goal,
    targets: &DailyTargets,
    meals: &[MealEntry],
) -> Result<DashboardSnapshot, CalcError> {
    let mut calories = 0.0;
    let mut protein = 0.0;
    let mut carbs = 0.0;
    let mut fat = 0.0;
    let mut fiber = 0.0;
    for meal in meals {
        calories += meal.calories * meal.portion;
        protein += meal.protein * meal.portion;
        carbs += meal.carbs * meal.portion;
        fat += meal.fat * meal.portion;
        fiber += meal.fiber * meal.portion;
    }

    let raw_remaining = DailyTargets {
        calories: targets.calories - calories,
        protein: targets.protein - protein,
        carbs: targets.carbs - carbs,
        fat: targets.fat - fat,
    };

    for (name, value) in [
        ("calories", calories),
        ("protein", protein),
        ("carbs", carbs),
        ("fat", fat),
        ("fiber", fiber),
        ("remaining calories", raw_remaining.calories),
        ("remaining protein", raw_remaining.protein),
        ("remaining carbs", raw_remaining.carbs),
        ("remaining fat", raw_remaining.fat),
    ] {
        if !value.is_finite() {
            return Err(CalcError::NonFinite(name));
        }
    }

    let progress = Progress {
        calories: percent(calories, targets.calories),
        protein: percent(protein, targets.protein),
        carbs: percent(carbs, targets.carbs),
        fat: percent(fat, targets.fat),
    };

    let recommendations = recommendations(goal, &progress, &raw_remaining);

    Ok(DashboardSnapshot {
        goal,
        totals: NutrientTotals {
            calories: round_half_up(calories) as i64,
            protein: round_to_tenth(protein),
            carbs: round_to_tenth(carbs),
            fat: round_to_tenth(fat),
            fiber: round_to_tenth(fiber),
        },
        targets: *targets,
        remaining: Remaining {
            calories: round_half_up(raw_remaining.calories) as i64,
            protein: round_to_tenth(raw_remaining.protein),
            carbs: round_to_tenth(raw_remaining.carbs),
            fat: round_to_tenth(raw_remaining.fat),
        },
        progress,
        recommendations,
        meals_count: meals.len(),
    })
}

/// A non-positive target reports 0%.
fn percent(total: f64, target: f64) -> i64 {
    if target <= 0.0 || !target.is_finite() {
        return 0;
    }
    round_half_up(100.0 * total / target) as i64
}

fn recommendations(goal: Goal, progress: &Progress, remaining: &DailyTargets) -> Vec<String> {
    let mut out = Vec::new();

    match goal {
        Goal::WeightLoss => {
            if progress.calories > 90 {
                out.push(
                    "You're close to your calorie target for today. Keep the rest of the day light."
                        .to_string(),
                );
            } else if remaining.calories > 300.0 {
                out.push(format!(
                    "You have {} calories left. There's room for a healthy snack like roasted chana or fruit.",
                    round_half_up(remaining.calories) as i64
                ));
            }
        }
        Goal::MuscleGain => {
            if remaining.protein > 15.0 {
                out.push(format!(
                    "Add about {}g more protein to support muscle growth. Paneer, dal or eggs work well.",
                    round_half_up(remaining.protein) as i64
                ));
            }
            if remaining.calories > 200.0 {
                out.push(
                    "You still have calories to spare. Add carbs like rice, roti or poha to fuel training."
                        .to_string(),
                );
            }
        }
        Goal::Maintain => {
            if remaining.calories.abs() < 100.0 {
                out.push("Great balance today! You're right on track with your calories.".to_string());
            }
        }
    }

    if remaining.protein > 20.0 {
        out.push("Your protein intake is low today. Include dal, curd or chicken in your next meal.".to_string());
    }
    if remaining.carbs > 30.0 {
        out.push("You're short on carbohydrates. Whole grains like brown rice or millet can help.".to_string());
    }

    out.truncate(MAX_RECOMMENDATIONS);
    out
}
