//! Regional checkout prices.
//!
//! A tier is sold in GBP, USD, EUR and NGN. Fixed prices come from
//! `tier_prices`; a currency without a row is converted from the tier's
//! base price with fixed reference rates.

use std::{fmt, str::FromStr};

use common::error::AppError;
use db::models::subscription::{SubscriptionTier, TierPrice};
use serde::{Deserialize, Serialize};
use stripe::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriceCurrency {
    Gbp,
    Usd,
    Eur,
    Ngn,
}

impl PriceCurrency {
    pub const ALL: [PriceCurrency; 4] = [
        PriceCurrency::Gbp,
        PriceCurrency::Usd,
        PriceCurrency::Eur,
        PriceCurrency::Ngn,
    ];

    /// Lowercase ISO code, as stored in the database.
    pub fn code(&self) -> &'static str {
        match self {
            PriceCurrency::Gbp => "gbp",
            PriceCurrency::Usd => "usd",
            PriceCurrency::Eur => "eur",
            PriceCurrency::Ngn => "ngn",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            PriceCurrency::Gbp => "£",
            PriceCurrency::Usd => "$",
            PriceCurrency::Eur => "€",
            PriceCurrency::Ngn => "₦",
        }
    }

    /// Units of this currency per pound.
    fn rate_per_gbp(&self) -> f64 {
        match self {
            PriceCurrency::Gbp => 1.0,
            PriceCurrency::Usd => 1.25,
            PriceCurrency::Eur => 1.15,
            PriceCurrency::Ngn => 583.0,
        }
    }

    pub fn stripe(&self) -> Currency {
        match self {
            PriceCurrency::Gbp => Currency::GBP,
            PriceCurrency::Usd => Currency::USD,
            PriceCurrency::Eur => Currency::EUR,
            PriceCurrency::Ngn => Currency::NGN,
        }
    }
}

impl fmt::Display for PriceCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PriceCurrency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_lowercase();
        PriceCurrency::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| AppError::Validation(format!("Unsupported currency: {}", s.trim())))
    }
}

/// What a tier costs in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub currency: PriceCurrency,
    pub symbol: String,
    pub amount_cents: i64,
    /// e.g. `£5.99`
    pub display: String,
}

impl PriceQuote {
    fn new(currency: PriceCurrency, amount_cents: i64) -> Self {
        PriceQuote {
            currency,
            symbol: currency.symbol().to_string(),
            amount_cents,
            display: format!(
                "{}{}.{:02}",
                currency.symbol(),
                amount_cents / 100,
                amount_cents % 100
            ),
        }
    }
}

/// Price of `tier` in `currency`, from `prices` when listed there.
pub fn quote(tier: &SubscriptionTier, prices: &[TierPrice], currency: PriceCurrency) -> PriceQuote {
    if let Some(price) = prices
        .iter()
        .find(|p| p.tier_id == tier.id && p.currency.eq_ignore_ascii_case(currency.code()))
    {
        return PriceQuote::new(currency, price.amount_cents);
    }

    // an unknown base currency is treated as GBP
    let base = tier.currency.parse().unwrap_or(PriceCurrency::Gbp);
    let gbp = tier.price_cents as f64 / base.rate_per_gbp();
    PriceQuote::new(currency, (gbp * currency.rate_per_gbp()).round() as i64)
}

/// Quotes in every supported currency.
pub fn quote_all(tier: &SubscriptionTier, prices: &[TierPrice]) -> Vec<PriceQuote> {
    PriceCurrency::ALL
        .into_iter()
        .map(|currency| quote(tier, prices, currency))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::models::subscription::TierType;
    use uuid::Uuid;

    use super::*;

    fn tier(tier_type: TierType, price_cents: i64) -> SubscriptionTier {
        SubscriptionTier {
            id: Uuid::new_v4(),
            name: "Weekly Access".to_string(),
            tier_type,
            description: String::new(),
            price_cents,
            currency: "gbp".to_string(),
            meal_plan_limit: 0,
            assistant_chat: true,
            detailed_nutrition: true,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn price(tier: &SubscriptionTier, currency: &str, amount_cents: i64) -> TierPrice {
        TierPrice {
            tier_id: tier.id,
            currency: currency.to_string(),
            amount_cents,
        }
    }

    #[test]
    fn listed_prices_win() {
        let weekly = tier(TierType::Weekly, 1299);
        let prices = vec![price(&weekly, "usd", 1699), price(&weekly, "ngn", 750000)];

        let usd = quote(&weekly, &prices, PriceCurrency::Usd);
        assert_eq!(usd.amount_cents, 1699);
        assert_eq!(usd.display, "$16.99");
        assert_eq!(quote(&weekly, &prices, PriceCurrency::Ngn).display, "₦7500.00");
    }

    #[test]
    fn missing_currencies_convert_from_gbp() {
        let monthly = tier(TierType::Monthly, 4000);
        let eur = quote(&monthly, &[], PriceCurrency::Eur);
        assert_eq!(eur.amount_cents, 4600);
        assert_eq!(eur.symbol, "€");
        assert_eq!(quote(&monthly, &[], PriceCurrency::Gbp).display, "£40.00");
    }

    #[test]
    fn prices_of_other_tiers_are_ignored() {
        let weekly = tier(TierType::Weekly, 1299);
        let other = tier(TierType::OneTime, 599);
        let quote = quote(&weekly, &[price(&other, "usd", 799)], PriceCurrency::Usd);
        assert_eq!(quote.amount_cents, 1624);
    }

    #[test]
    fn currencies_parse_case_insensitively() {
        assert_eq!("NGN".parse::<PriceCurrency>().unwrap(), PriceCurrency::Ngn);
        assert_eq!(PriceCurrency::Ngn.stripe(), Currency::NGN);
        assert!(matches!(
            "jpy".parse::<PriceCurrency>(),
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            serde_json::to_value(PriceCurrency::Eur).unwrap(),
            serde_json::json!("EUR")
        );
    }

    #[test]
    fn every_currency_is_quoted() {
        let quotes = quote_all(&tier(TierType::Weekly, 1299), &[]);
        assert_eq!(quotes.len(), 4);
        assert_eq!(quotes[0].currency, PriceCurrency::Gbp);
        assert_eq!(quotes[0].amount_cents, 1299);
    }
}
