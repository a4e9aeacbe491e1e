use db::models::subscription::TierType;
use stripe::{
    CheckoutSessionMode, CreateCheckoutSessionLineItemsPriceDataRecurring,
    CreateCheckoutSessionLineItemsPriceDataRecurringInterval,
};

/// Recurring price data for checkout; `None` for one-off payments.
pub(crate) fn checkout_recurring(
    tier_type: TierType,
) -> Option<CreateCheckoutSessionLineItemsPriceDataRecurring> {
    let interval = match tier_type {
        TierType::Weekly => CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Week,
        TierType::Monthly => CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Month,
        TierType::OneTime => return None,
    };
    Some(CreateCheckoutSessionLineItemsPriceDataRecurring {
        interval,
        interval_count: Some(1),
    })
}

pub(crate) fn checkout_mode(tier_type: TierType) -> CheckoutSessionMode {
    if tier_type.is_recurring() {
        CheckoutSessionMode::Subscription
    } else {
        CheckoutSessionMode::Payment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_time_tier_checks_out_as_payment() {
        assert!(checkout_recurring(TierType::OneTime).is_none());
        assert_eq!(checkout_mode(TierType::OneTime), CheckoutSessionMode::Payment);
        assert_eq!(
            checkout_mode(TierType::Monthly),
            CheckoutSessionMode::Subscription
        );
        let weekly = checkout_recurring(TierType::Weekly).unwrap();
        assert_eq!(
            weekly.interval,
            CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Week
        );
    }
}
