//! Prompt construction for meal plans, recipe details and the cooking assistant.
//!
//! Every builder here is a pure function of its input. User supplied text is
//! cleaned and validated by [`MealPlanRequest::resolve`] before it reaches a
//! prompt, so the section markers can only ever appear once.

use std::fmt::Write;

use common::error::{AppError, Res};
use serde::{Deserialize, Deserializer};

use crate::parser::MealSlot;

pub const MEAL_PLAN_MARKER: &str = "MEAL PLAN:";
pub const GROCERY_LIST_MARKER: &str = "GROCERY LIST:";

pub const DEFAULT_DIET: &str = "balanced";
pub const DEFAULT_CUISINE: &str = "Contemporary Nigerian";
pub const DEFAULT_BUDGET: &str = "moderate";
pub const DEFAULT_SKILL_LEVEL: &str = "Intermediate";

const MAX_TEXT_LEN: usize = 200;
const MAX_CHAT_LEN: usize = 2000;

const ASSISTANT_CONTEXT: &str = "You are a Nigerian cuisine expert assistant for a meal planning service, specializing in:\n\
1. Nigerian cooking and recipes\n\
2. UK-Nigerian fusion cuisine\n\
3. Finding African ingredients in the UK\n\
4. Cooking techniques and cultural context";

/// Generation preferences as submitted by the client.
///
/// Accepted as JSON or as an urlencoded form, so numbers may arrive as strings
/// and `include_snacks` may be the checkbox value `on`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MealPlanRequest {
    #[serde(default, alias = "dietary_preferences")]
    pub diet: Option<String>,
    #[serde(default, alias = "preferred_cuisine")]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub health_goals: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub meals_per_day: Option<u32>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub include_snacks: Option<bool>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub plan_days: Option<u32>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub skill_level: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub family_size: Option<u32>,
}

/// Validated preferences with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanPreferences {
    pub diet: String,
    pub cuisine: String,
    pub health_goals: String,
    pub allergies: String,
    pub meals_per_day: u32,
    pub include_snacks: bool,
    pub plan_days: u32,
    pub budget: String,
    pub skill_level: String,
    pub family_size: u32,
}

impl Default for PlanPreferences {
    fn default() -> Self {
        PlanPreferences {
            diet: DEFAULT_DIET.to_string(),
            cuisine: DEFAULT_CUISINE.to_string(),
            health_goals: String::new(),
            allergies: String::new(),
            meals_per_day: 3,
            include_snacks: false,
            plan_days: 7,
            budget: DEFAULT_BUDGET.to_string(),
            skill_level: DEFAULT_SKILL_LEVEL.to_string(),
            family_size: 4,
        }
    }
}

impl MealPlanRequest {
    /// Applies defaults and validates every field.
    /// Fails with [`AppError::Validation`] before anything is sent out.
    pub fn resolve(self) -> Res<PlanPreferences> {
        let defaults = PlanPreferences::default();

        let prefs = PlanPreferences {
            diet: text_or(self.diet, "diet", &defaults.diet)?,
            cuisine: text_or(self.cuisine, "cuisine", &defaults.cuisine)?,
            health_goals: text_or(self.health_goals, "health goals", "")?,
            allergies: text_or(self.allergies, "allergies", "")?,
            meals_per_day: self.meals_per_day.unwrap_or(defaults.meals_per_day),
            include_snacks: self.include_snacks.unwrap_or(defaults.include_snacks),
            plan_days: self.plan_days.unwrap_or(defaults.plan_days),
            budget: text_or(self.budget, "budget", &defaults.budget)?,
            skill_level: text_or(self.skill_level, "skill level", &defaults.skill_level)?,
            family_size: self.family_size.unwrap_or(defaults.family_size),
        };

        check_range("plan days", prefs.plan_days, 1, 14)?;
        check_range("meals per day", prefs.meals_per_day, 1, 6)?;
        check_range("family size", prefs.family_size, 1, 20)?;

        Ok(prefs)
    }
}

fn check_range(field: &str, value: u32, min: u32, max: u32) -> Res<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{} must be between {} and {}",
            field, min, max
        )))
    }
}

/// Collapses whitespace runs (newlines included) into single spaces.
fn clean_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn contains_marker(value: &str) -> bool {
    let upper = value.to_uppercase();
    upper.contains(MEAL_PLAN_MARKER) || upper.contains(GROCERY_LIST_MARKER)
}

fn text_or(value: Option<String>, field: &str, default: &str) -> Res<String> {
    let cleaned = value.as_deref().map(clean_text).unwrap_or_default();
    if cleaned.is_empty() {
        return Ok(default.to_string());
    }
    if cleaned.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, MAX_TEXT_LEN
        )));
    }
    if contains_marker(&cleaned) {
        return Err(AppError::Validation(format!(
            "{} contains reserved text",
            field
        )));
    }
    Ok(cleaned)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u32),
    Text(String),
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(raw)) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            raw.parse()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid number: {raw}")))
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagOrText {
    Flag(bool),
    Text(String),
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    match Option::<FlagOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(FlagOrText::Flag(flag)) => Ok(Some(flag)),
        Some(FlagOrText::Text(raw)) => match raw.trim().to_lowercase().as_str() {
            "on" | "true" | "1" | "yes" => Ok(Some(true)),
            "off" | "false" | "0" | "no" | "" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!("invalid flag: {other}"))),
        },
    }
}

fn write_preferences(prompt: &mut String, prefs: &PlanPreferences) {
    let _ = writeln!(
        prompt,
        "Generate a meal plan for {} days and grocery list for a {} diet with {} cuisine.",
        prefs.plan_days, prefs.diet, prefs.cuisine
    );
    if !prefs.health_goals.is_empty() {
        let _ = writeln!(prompt, "Health goals: {}.", prefs.health_goals);
    }
    if !prefs.allergies.is_empty() {
        let _ = writeln!(prompt, "Allergies and restrictions: {}.", prefs.allergies);
    }
    let _ = writeln!(prompt, "Include {} meals per day.", prefs.meals_per_day);
    if prefs.include_snacks {
        prompt.push_str("Include a snack for each day.\n");
    }
    let _ = writeln!(prompt, "Budget: {}.", prefs.budget);
    let _ = writeln!(prompt, "Skill level: {}.", prefs.skill_level);
    let _ = writeln!(prompt, "Family size: {}.", prefs.family_size);
    prompt.push('\n');
}

/// Slots each day asks for, in prompt order. One meal a day is lunch only,
/// two adds breakfast and three or more adds dinner.
pub fn meal_slots(prefs: &PlanPreferences) -> Vec<MealSlot> {
    let mut slots = Vec::with_capacity(4);
    if prefs.meals_per_day >= 2 {
        slots.push(MealSlot::Breakfast);
    }
    slots.push(MealSlot::Lunch);
    if prefs.include_snacks {
        slots.push(MealSlot::Snack);
    }
    if prefs.meals_per_day >= 3 {
        slots.push(MealSlot::Dinner);
    }
    slots
}

/// Builds the two-section text prompt.
pub fn build_prompt(prefs: &PlanPreferences) -> String {
    let mut prompt = String::new();
    write_preferences(&mut prompt, prefs);

    prompt.push_str("Please format the response exactly as follows:\n");
    prompt.push_str(MEAL_PLAN_MARKER);
    prompt.push('\n');

    let slots = meal_slots(prefs);
    for day in 1..=prefs.plan_days {
        let _ = writeln!(prompt, "Day {}:", day);
        for slot in &slots {
            let _ = writeln!(prompt, "{}: {}", slot.label(), slot.placeholder());
        }
        prompt.push('\n');
    }

    prompt.push_str(GROCERY_LIST_MARKER);
    prompt.push_str("\n[List each ingredient on a new line with a - in front]");
    prompt
}

/// Builds the prompt for the structured output contract.
pub fn build_json_prompt(prefs: &PlanPreferences) -> String {
    let mut prompt = String::new();
    write_preferences(&mut prompt, prefs);

    let meals: String = meal_slots(prefs)
        .iter()
        .map(|slot| format!(", \"{}\": \"{}\"", slot.as_str(), slot.example()))
        .collect();
    let _ = write!(
        prompt,
        "Respond with a single JSON object and no other text, shaped as:\n\
         {{\"days\": [{{\"day\": \"Day 1\"{}}}], \
         \"grocery_list\": [\"ingredient\"]}}\n\
         The days array must contain exactly {} entries, numbered from Day 1.",
        meals, prefs.plan_days
    );
    prompt
}

/// Builds the recipe detail prompt for one meal of a plan.
pub fn build_recipe_prompt(meal_name: &str) -> String {
    format!(
        r#"Generate a detailed recipe for {meal}, a {cuisine} dish.
Return ONLY a JSON object with NO additional text or formatting.
The JSON must follow this EXACT structure:
{{
    "title": "{meal}",
    "description": "A detailed description of the dish and its cultural significance",
    "prepTime": "Preparation time in minutes",
    "cookTime": "Cooking time in minutes",
    "servings": "Number of people it serves",
    "difficulty": "Easy/Medium/Hard",
    "ingredients": ["List each ingredient with exact measurements"],
    "instructions": ["Numbered step-by-step cooking instructions"],
    "nutrition": {{
        "calories": "Calories per serving",
        "protein": "Protein in grams",
        "carbs": "Carbohydrates in grams",
        "fat": "Fat in grams"
    }},
    "tips": ["Cooking tips and variations"]
}}"#,
        meal = clean_text(meal_name),
        cuisine = DEFAULT_CUISINE,
    )
}

/// System context and validated user message for the cooking assistant.
pub fn build_chat_prompt(message: &str) -> Res<(&'static str, String)> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }
    if message.chars().count() > MAX_CHAT_LEN {
        return Err(AppError::Validation(format!(
            "message must be at most {} characters",
            MAX_CHAT_LEN
        )));
    }
    Ok((ASSISTANT_CONTEXT, message.to_string()))
}
