use uuid::Uuid;

use crate::models::feedback::FeedbackType;

pub struct FeedbackCreateRequest {
    pub user_id: Uuid,
    pub feedback_type: FeedbackType,
    pub subject: String,
    pub message: String,
}
