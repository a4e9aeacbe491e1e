use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount_cents: i64,
    pub currency: String,
    pub transaction_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
