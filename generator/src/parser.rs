//! Turns completion output into days, meals and grocery items.
//!
//! Two contracts are understood: the two-section text format requested by
//! [`crate::prompt::build_prompt`] and the JSON document requested by
//! [`crate::prompt::build_json_prompt`]. Both end up as a [`ParsedPlan`] with
//! the same filler rules applied, so callers never care which one was used.

use std::fmt::{self, Write};

use common::error::{AppError, Res};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::prompt::{GROCERY_LIST_MARKER, MEAL_PLAN_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealSlot {
    pub const ALL: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Dinner,
        MealSlot::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
            MealSlot::Snack => "snack",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "Breakfast",
            MealSlot::Lunch => "Lunch",
            MealSlot::Dinner => "Dinner",
            MealSlot::Snack => "Snack",
        }
    }

    /// Matches a line label case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        MealSlot::ALL.into_iter().find(|slot| slot.as_str() == label)
    }

    /// Sample value shown to the model for this slot.
    pub fn example(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast meal",
            MealSlot::Lunch => "lunch meal",
            MealSlot::Dinner => "dinner meal",
            MealSlot::Snack => "snack food",
        }
    }

    pub fn placeholder(&self) -> String {
        format!("[{}]", self.example())
    }

    pub fn filler(&self) -> String {
        format!("{} of your choice", self.label())
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meals {
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
    /// `None` when snacks were not requested and the text supplied none.
    pub snack: Option<String>,
}

impl Meals {
    pub fn get(&self, slot: MealSlot) -> Option<&str> {
        let value = match slot {
            MealSlot::Breakfast => &self.breakfast,
            MealSlot::Lunch => &self.lunch,
            MealSlot::Dinner => &self.dinner,
            MealSlot::Snack => self.snack.as_ref()?,
        };
        Some(value.as_str()).filter(|v| !v.is_empty())
    }

    fn set(&mut self, slot: MealSlot, value: String) {
        match slot {
            MealSlot::Breakfast => self.breakfast = value,
            MealSlot::Lunch => self.lunch = value,
            MealSlot::Dinner => self.dinner = value,
            MealSlot::Snack => self.snack = Some(value),
        }
    }

    fn fill_missing(&mut self, include_snacks: bool) {
        for slot in [MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner] {
            if self.get(slot).is_none() {
                self.set(slot, slot.filler());
            }
        }
        if self.get(MealSlot::Snack).is_none() {
            if include_snacks {
                self.set(MealSlot::Snack, MealSlot::Snack.filler());
            } else {
                self.snack = None;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: String,
    pub meals: Meals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedPlan {
    /// Meal-plan section as stored on the plan record.
    pub meal_plan_text: String,
    pub days: Vec<DayPlan>,
    pub grocery_list: Vec<String>,
}

/// Parses the two-section text contract.
pub fn parse_response(raw: &str, include_snacks: bool) -> Res<ParsedPlan> {
    let (meal_part, grocery_part) = raw
        .split_once(GROCERY_LIST_MARKER)
        .ok_or_else(|| AppError::Format(format!("missing {} marker", GROCERY_LIST_MARKER)))?;

    let meal_plan_text = meal_part.replace(MEAL_PLAN_MARKER, "").trim().to_string();
    let days = structure_days(&meal_plan_text, include_snacks);

    Ok(ParsedPlan {
        meal_plan_text,
        days,
        grocery_list: parse_grocery_list(grocery_part),
    })
}

/// Scans meal-plan text line by line into day records.
pub fn structure_days(meal_plan_text: &str, include_snacks: bool) -> Vec<DayPlan> {
    let mut days: Vec<DayPlan> = Vec::new();

    for line in meal_plan_text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if line.starts_with("Day") {
            let label = line.split(':').next().unwrap_or(line).trim();
            days.push(DayPlan {
                day: label.to_string(),
                meals: Meals::default(),
            });
            continue;
        }
        let (Some(current), Some((label, value))) = (days.last_mut(), line.split_once(':')) else {
            continue;
        };
        if let Some(slot) = MealSlot::from_label(label) {
            let value = value.trim();
            if !value.is_empty() {
                current.meals.set(slot, value.to_string());
            }
        }
    }

    for day in &mut days {
        day.meals.fill_missing(include_snacks);
    }
    days
}

pub fn parse_grocery_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim_start_matches(|c: char| c == '-' || c.is_whitespace()).trim_end())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Renders days back into the text form stored as a plan description.
pub fn render_meal_plan(days: &[DayPlan]) -> String {
    let mut text = String::new();
    for (i, day) in days.iter().enumerate() {
        if i > 0 {
            text.push('\n');
        }
        let _ = writeln!(text, "{}:", day.day);
        for slot in [
            MealSlot::Breakfast,
            MealSlot::Lunch,
            MealSlot::Snack,
            MealSlot::Dinner,
        ] {
            if let Some(value) = day.meals.get(slot) {
                let _ = writeln!(text, "{}: {}", slot.label(), value);
            }
        }
    }
    text.trim_end().to_string()
}

/// Removes a surrounding markdown code fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Debug, Deserialize)]
struct PlanDocument {
    days: Vec<DocumentDay>,
    #[serde(default)]
    grocery_list: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentDay {
    day: String,
    #[serde(default)]
    breakfast: Option<String>,
    #[serde(default)]
    lunch: Option<String>,
    #[serde(default)]
    dinner: Option<String>,
    #[serde(default)]
    snack: Option<String>,
}

/// JSON schema sent along with structured generation requests.
pub fn plan_schema() -> Value {
    let meal = json!({ "type": "string" });
    json!({
        "type": "object",
        "properties": {
            "days": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "day": meal,
                        "breakfast": meal,
                        "lunch": meal,
                        "dinner": meal,
                        "snack": meal
                    },
                    "required": ["day", "breakfast", "lunch", "dinner"]
                }
            },
            "grocery_list": { "type": "array", "items": meal }
        },
        "required": ["days", "grocery_list"]
    })
}

/// Parses the structured JSON contract.
pub fn parse_structured(raw: &str, include_snacks: bool) -> Res<ParsedPlan> {
    let document: PlanDocument = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| AppError::Format(format!("malformed plan document: {}", e)))?;
    if document.days.is_empty() {
        return Err(AppError::Format("plan document has no days".to_string()));
    }

    let days: Vec<DayPlan> = document
        .days
        .into_iter()
        .map(|doc| {
            let mut meals = Meals::default();
            for (slot, value) in [
                (MealSlot::Breakfast, doc.breakfast),
                (MealSlot::Lunch, doc.lunch),
                (MealSlot::Dinner, doc.dinner),
                (MealSlot::Snack, doc.snack),
            ] {
                if let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
                {
                    meals.set(slot, value);
                }
            }
            meals.fill_missing(include_snacks);
            DayPlan {
                day: doc.day.trim().to_string(),
                meals,
            }
        })
        .collect();

    let grocery_list = document
        .grocery_list
        .iter()
        .flat_map(|item| parse_grocery_list(item))
        .collect();

    Ok(ParsedPlan {
        meal_plan_text: render_meal_plan(&days),
        days,
        grocery_list,
    })
}

/// Recipe details produced for a single meal of a plan.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeneratedRecipe {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "prepTime")]
    pub prep_time: Option<String>,
    #[serde(default, alias = "cookTime")]
    pub cook_time: Option<String>,
    #[serde(default)]
    pub servings: Option<Value>,
    #[serde(default)]
    pub difficulty: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[serde(default, alias = "nutrition")]
    pub nutrition_info: Option<Value>,
    #[serde(default)]
    pub tips: Vec<String>,
}

impl GeneratedRecipe {
    /// First number found in `servings`, which providers send as text or number.
    pub fn servings_count(&self) -> Option<i32> {
        match self.servings.as_ref()? {
            Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
            Value::String(s) => {
                let digits: String = s
                    .chars()
                    .skip_while(|c| !c.is_ascii_digit())
                    .take_while(char::is_ascii_digit)
                    .collect();
                digits.parse().ok()
            }
            _ => None,
        }
        .filter(|n| *n > 0)
    }
}

pub fn parse_recipe_json(raw: &str) -> Res<GeneratedRecipe> {
    let recipe: GeneratedRecipe = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| AppError::Format(format!("malformed recipe: {}", e)))?;
    if recipe.title.trim().chars().count() < 3 {
        return Err(AppError::Format("recipe title is too short".to_string()));
    }
    if recipe.ingredients.is_empty() || recipe.instructions.is_empty() {
        return Err(AppError::Format(
            "recipe has no ingredients or instructions".to_string(),
        ));
    }
    Ok(recipe)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AKARA: &str = "MEAL PLAN:\nDay 1:\nBreakfast: Akara\nLunch: Jollof rice\nDinner: Suya\n\nGROCERY LIST:\n- Beans\n- Rice\n- Beef";

    #[test]
    fn parses_single_day_example() {
        let plan = parse_response(AKARA, false).unwrap();
        assert_eq!(plan.days.len(), 1);
        let day = &plan.days[0];
        assert_eq!(day.day, "Day 1");
        assert_eq!(day.meals.breakfast, "Akara");
        assert_eq!(day.meals.lunch, "Jollof rice");
        assert_eq!(day.meals.dinner, "Suya");
        assert_eq!(day.meals.snack, None);
        assert_eq!(plan.grocery_list, vec!["Beans", "Rice", "Beef"]);
        assert_eq!(
            plan.meal_plan_text,
            "Day 1:\nBreakfast: Akara\nLunch: Jollof rice\nDinner: Suya"
        );
    }

    #[test]
    fn missing_marker_is_a_format_error() {
        let err = parse_response("MEAL PLAN:\nDay 1:\nBreakfast: Akara", false).unwrap_err();
        assert!(matches!(err, AppError::Format(_)));
        assert_eq!(err.user_message(), "invalid response format");
    }

    #[test]
    fn parsing_is_idempotent() {
        let raw = "MEAL PLAN:\nDay 1:\nBreakfast: Pap\nSnack: Chin chin\nDay 2:\nLunch: Amala\nGROCERY LIST:\n-Yam\n\n  - Pepper  \n";
        let first = parse_response(raw, true).unwrap();
        let second = parse_response(raw, true).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.grocery_list, vec!["Yam", "Pepper"]);
    }

    #[test]
    fn missing_slots_get_fillers() {
        let plan = parse_response("Day 1:\nLunch: Amala\nGROCERY LIST:\n", true).unwrap();
        let meals = &plan.days[0].meals;
        assert_eq!(meals.breakfast, "Breakfast of your choice");
        assert_eq!(meals.lunch, "Amala");
        assert_eq!(meals.dinner, "Dinner of your choice");
        assert_eq!(meals.snack.as_deref(), Some("Snack of your choice"));
        assert!(plan.grocery_list.is_empty());
    }

    #[test]
    fn snack_stays_empty_when_not_requested() {
        let plan = parse_response(AKARA, false).unwrap();
        assert!(plan.days.iter().all(|d| d.meals.get(MealSlot::Snack).is_none()));

        let supplied = "Day 1:\nBreakfast: Akara\nSnack: Puff puff\nGROCERY LIST:\n- Flour";
        let plan = parse_response(supplied, false).unwrap();
        assert_eq!(plan.days[0].meals.snack.as_deref(), Some("Puff puff"));
    }

    #[test]
    fn unknown_labels_and_bare_lines_are_dropped() {
        let raw = "Day 1: Monday\nBreakfast: Moi moi\nDrink: Zobo\nJust some chatter\ndinner:  Egusi soup \nGROCERY LIST:\n- Melon seeds";
        let plan = parse_response(raw, false).unwrap();
        let day = &plan.days[0];
        assert_eq!(day.day, "Day 1");
        assert_eq!(day.meals.breakfast, "Moi moi");
        assert_eq!(day.meals.dinner, "Egusi soup");
        assert_eq!(day.meals.lunch, "Lunch of your choice");
    }

    #[test]
    fn lines_before_the_first_day_are_ignored() {
        let raw = "Here is your plan\nBreakfast: Toast\nDay 1:\nGROCERY LIST:";
        let plan = parse_response(raw, false).unwrap();
        assert_eq!(plan.days.len(), 1);
        assert_eq!(plan.days[0].meals.breakfast, "Breakfast of your choice");
    }

    #[test]
    fn stored_text_reparses_to_the_same_days() {
        let plan = parse_response(AKARA, false).unwrap();
        assert_eq!(structure_days(&plan.meal_plan_text, false), plan.days);
    }

    #[test]
    fn structured_documents_share_the_filler_rules() {
        let raw = r#"```json
{"days":[{"day":"Day 1","breakfast":"Akara","lunch":"Jollof rice","dinner":"Suya"},
         {"day":"Day 2","breakfast":"","lunch":"Amala"}],
 "grocery_list":["- Beans","Rice",""]}
```"#;
        let plan = parse_structured(raw, false).unwrap();
        assert_eq!(plan.days.len(), 2);
        assert_eq!(plan.days[0].meals.dinner, "Suya");
        assert_eq!(plan.days[1].meals.breakfast, "Breakfast of your choice");
        assert_eq!(plan.days[1].meals.snack, None);
        assert_eq!(plan.grocery_list, vec!["Beans", "Rice"]);
        assert_eq!(structure_days(&plan.meal_plan_text, false), plan.days);
    }

    #[test]
    fn malformed_structured_documents_are_format_errors() {
        for raw in ["not json", r#"{"days":[],"grocery_list":[]}"#, r#"{"grocery_list":[]}"#] {
            assert!(matches!(
                parse_structured(raw, false),
                Err(AppError::Format(_))
            ));
        }
    }

    #[test]
    fn recipe_json_is_unfenced_and_validated() {
        let raw = r#"```json
{"title":"Jollof rice","description":"Party rice","prepTime":"20 minutes","cookTime":"45 minutes",
 "servings":"4-6 servings","difficulty":"Medium","ingredients":["2 cups rice"],"instructions":["Cook"],
 "nutrition":{"calories":"450"},"tips":["Use parboiled rice"]}
```"#;
        let recipe = parse_recipe_json(raw).unwrap();
        assert_eq!(recipe.title, "Jollof rice");
        assert_eq!(recipe.prep_time.as_deref(), Some("20 minutes"));
        assert_eq!(recipe.servings_count(), Some(4));
        assert_eq!(recipe.nutrition_info.unwrap()["calories"], "450");

        assert!(parse_recipe_json(r#"{"title":"Ok","ingredients":["a"],"instructions":["b"]}"#).is_err());
        assert!(parse_recipe_json("Sorry, I can't").is_err());
    }
}
