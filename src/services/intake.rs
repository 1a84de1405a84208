use std::sync::Arc;

use crate::errors::{BotError, BotResult};
use crate::models::{IntakeReport, LineItem};
use crate::services::{Catalog, Ledger};

/// A raw `(product, amount)` token pair as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakePair {
    pub product: String,
    pub amount: String,
}

/// Parses a decimal number, accepting a comma as the decimal separator.
pub fn parse_decimal(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Splits a message into `product amount` pairs.
///
/// Purely syntactic: the text is lowercased and split on whitespace, and
/// anything other than an even, non-zero number of tokens yields nothing.
pub fn parse_intake(text: &str) -> Vec<IntakePair> {
    let normalized = text.trim().to_lowercase();
    let tokens: Vec<&str> = normalized.split_whitespace().collect();

    if tokens.len() < 2 || tokens.len() % 2 != 0 {
        return Vec::new();
    }

    tokens
        .chunks_exact(2)
        .map(|pair| IntakePair {
            product: pair[0].to_string(),
            amount: pair[1].to_string(),
        })
        .collect()
}

/// Turns parsed pairs into calories and books them on the user's ledger.
pub struct IntakeResolver {
    catalog: Arc<Catalog>,
    ledger: Arc<Ledger>,
}

impl IntakeResolver {
    pub fn new(catalog: Arc<Catalog>, ledger: Arc<Ledger>) -> Self {
        Self { catalog, ledger }
    }

    /// Returns `Ok(None)` when no pair matched a known product; nothing is
    /// written in that case. Unparseable amounts and unknown products are
    /// skipped without being reported.
    pub async fn resolve(&self, user_id: i64, pairs: &[IntakePair]) -> BotResult<Option<IntakeReport>> {
        if !self.ledger.is_registered(user_id).await? {
            return Err(BotError::NotRegistered(user_id));
        }

        let mut items = Vec::new();
        let mut total_kcal = 0.0;

        for pair in pairs {
            let amount = match parse_decimal(&pair.amount) {
                Some(amount) if amount >= 0.0 => amount,
                _ => continue,
            };

            let kcal_per_100g = match self.catalog.kcal_for(&pair.product).await? {
                Some(kcal) => kcal,
                None => continue,
            };

            let kcal = kcal_per_100g * amount / 100.0;
            total_kcal += kcal;
            items.push(LineItem {
                product: pair.product.clone(),
                amount,
                kcal,
            });
        }

        if items.is_empty() {
            return Ok(None);
        }

        self.ledger.add_eaten(user_id, total_kcal).await?;
        log::info!("🍽️ User {} logged {} item(s), +{:.1} kcal", user_id, items.len(), total_kcal);

        Ok(Some(IntakeReport { items, total_kcal }))
    }
}
