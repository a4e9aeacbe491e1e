use uuid::Uuid;

pub struct PaymentCreateRequest {
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount_cents: i64,
    pub currency: String,
    pub transaction_id: String,
    pub status: String,
}
