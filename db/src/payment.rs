use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{dtos::payment::PaymentCreateRequest, models::payment::PaymentRecord};

pub async fn insert_payment<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: PaymentCreateRequest,
) -> Res<PaymentRecord> {
    sqlx::query_as::<_, PaymentRecord>(
        r#"
        INSERT INTO payment_history (user_id, subscription_id, amount_cents, currency, transaction_id, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.subscription_id)
    .bind(data.amount_cents)
    .bind(data.currency)
    .bind(data.transaction_id)
    .bind(data.status)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_payments_by_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Vec<PaymentRecord>> {
    sqlx::query_as::<_, PaymentRecord>(
        "SELECT * FROM payment_history WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}
