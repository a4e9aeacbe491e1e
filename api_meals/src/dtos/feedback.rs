use db::models::feedback::{Feedback, FeedbackStats};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub feedback_type: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackStatusResponse {
    pub success: bool,
    pub is_resolved: bool,
    pub feedback_stats: FeedbackStats,
}

#[derive(Debug, Serialize)]
pub struct FeedbackOverviewResponse {
    pub feedback_stats: FeedbackStats,
    pub recent_feedback: Vec<Feedback>,
}
