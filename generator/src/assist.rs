//! One-shot completions outside the meal-plan pipeline.

use common::error::Res;

use crate::{
    completion::{CompletionClient, CompletionRequest},
    parser::{self, GeneratedRecipe},
    prompt,
};

/// Asks the provider for the recipe of a single meal.
pub async fn generate_recipe(
    client: &dyn CompletionClient,
    meal_name: &str,
) -> Res<GeneratedRecipe> {
    let request = CompletionRequest::text(prompt::build_recipe_prompt(meal_name));
    let raw = client.complete(&request).await?;
    parser::parse_recipe_json(&raw)
}

/// Cooking assistant reply to a user message.
pub async fn chat(client: &dyn CompletionClient, message: &str) -> Res<String> {
    let (context, message) = prompt::build_chat_prompt(message)?;
    let request = CompletionRequest::text(message).with_system(context);
    Ok(client.complete(&request).await?)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use common::error::AppError;

    use super::*;
    use crate::completion::CompletionError;

    struct Canned(&'static str);

    #[async_trait]
    impl CompletionClient for Canned {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            assert!(!request.prompt.is_empty());
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn recipe_reply_is_parsed() {
        let client = Canned(
            r#"```json
{"title": "Akara", "prepTime": "20 mins", "servings": "4 people",
 "ingredients": ["2 cups beans"], "instructions": ["Blend", "Fry"]}
```"#,
        );
        let recipe = generate_recipe(&client, "Akara").await.unwrap();
        assert_eq!(recipe.title, "Akara");
        assert_eq!(recipe.servings_count(), Some(4));
    }

    #[tokio::test]
    async fn malformed_recipe_is_a_format_error() {
        let err = generate_recipe(&Canned("Sorry, I can't help"), "Akara")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Format(_)));
    }

    #[tokio::test]
    async fn empty_chat_message_never_reaches_the_provider() {
        struct Unreachable;

        #[async_trait]
        impl CompletionClient for Unreachable {
            async fn complete(&self, _: &CompletionRequest) -> Result<String, CompletionError> {
                panic!("provider must not be called");
            }
        }

        let err = chat(&Unreachable, "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
