use std::sync::Arc;

use actix_web::{Responder, post, web};
use common::{error::Res, http::Success};
use generator::{Generator, assist};

use crate::dtos::meal::{ChatRequest, ChatResponse};

/// Cooking assistant. Only available on tiers with assistant chat.
///
/// # Input
/// - `message`: the user's question, not empty
///
/// # Output
/// - Success: `{ success: true, response }`
/// - 403 `{ requires_upgrade: true }` without the feature
///
/// # Frontend Example
/// ```javascript
/// const { response } = await (await fetch('/api/dashboard/assistant/chat', {
///   method: 'POST',
///   headers: { 'Authorization': `Bearer ${token}`, 'Content-Type': 'application/json' },
///   body: JSON.stringify({ message: 'How long do I soak beans for moi moi?' })
/// })).json();
/// ```
#[post("/chat")]
pub async fn post_chat(
    generator: web::Data<Arc<Generator>>,
    body: web::Json<ChatRequest>,
) -> Res<impl Responder> {
    let client = generator.client();
    let response = assist::chat(&*client, &body.message).await?;
    Success::ok(ChatResponse {
        success: true,
        response,
    })
}
