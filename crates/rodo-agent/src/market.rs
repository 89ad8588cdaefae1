//! Market reference data fed into the prompt.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use rodo_store::{ConversationStore, MarketQuote, StoreError};
use tracing::debug;

/// Indicative prices used when no fresh quotes are stored.
pub const INDICATIVE_SNAPSHOT: &str = "\
Precios de referencia (datos indicativos, consultar para valores actualizados):

SOJA:
  - Rosario disponible: ~295 USD/tn
  - MATBA May25: ~290 USD/tn
  - Chicago May25: ~378 USD/tn

MAÍZ:
  - Rosario disponible: ~175 USD/tn
  - MATBA May25: ~172 USD/tn
  - Chicago May25: ~188 USD/tn

TRIGO:
  - Rosario disponible: ~210 USD/tn
  - MATBA May25: ~208 USD/tn
  - Chicago May25: ~225 USD/tn

Nota: Estos son valores de referencia. Los precios reales se actualizarán cuando se integre el feed de mercado.";

#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("market store error: {0}")]
    Store(#[from] StoreError),
}

/// Produces the human-readable market snapshot for a turn.
#[async_trait]
pub trait MarketContextSource: Send + Sync {
    async fn current_context(&self) -> Result<String, MarketError>;
}

/// Always returns the indicative snapshot.
pub struct StaticMarketContext;

#[async_trait]
impl MarketContextSource for StaticMarketContext {
    async fn current_context(&self) -> Result<String, MarketError> {
        Ok(INDICATIVE_SNAPSHOT.to_string())
    }
}

/// Reads recent quotes from the store.
pub struct StoreMarketContext {
    store: Arc<ConversationStore>,
    freshness: Duration,
}

impl StoreMarketContext {
    pub fn new(store: Arc<ConversationStore>, freshness_hours: i64) -> Self {
        Self {
            store,
            freshness: Duration::hours(freshness_hours.max(0)),
        }
    }
}

#[async_trait]
impl MarketContextSource for StoreMarketContext {
    async fn current_context(&self) -> Result<String, MarketError> {
        let now = Utc::now();
        let quotes = self.store.recent_market_quotes(now - self.freshness)?;
        if quotes.is_empty() {
            debug!("no fresh market quotes, using indicative snapshot");
            return Ok(INDICATIVE_SNAPSHOT.to_string());
        }
        Ok(format_quotes(&quotes, now.date_naive()))
    }
}

/// Group quotes by crop, keeping the order in which crops first appear.
pub fn format_quotes(quotes: &[MarketQuote], today: NaiveDate) -> String {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();

    for q in quotes {
        let crop = q.crop.to_uppercase();
        let label = q.position.as_deref().unwrap_or(&q.kind);
        let line = format!("  - {} {}: {} {}/tn", q.market, label, q.price, q.currency);

        match groups.iter_mut().find(|(c, _)| *c == crop) {
            Some((_, lines)) => lines.push(line),
            None => groups.push((crop, vec![line])),
        }
    }

    let sections: Vec<String> = groups
        .into_iter()
        .map(|(crop, lines)| format!("{crop}:\n{}", lines.join("\n")))
        .collect();

    format!(
        "Precios actualizados ({}):\n\n{}",
        today.format("%d/%m/%Y"),
        sections.join("\n\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rodo_store::db::format_ts;

    fn quote(crop: &str, market: &str, position: Option<&str>, price: f64) -> MarketQuote {
        MarketQuote {
            crop: crop.into(),
            market: market.into(),
            kind: if position.is_some() { "futuro" } else { "spot" }.into(),
            position: position.map(String::from),
            price,
            currency: "USD".into(),
            date: format_ts(Utc::now()),
        }
    }

    #[test]
    fn groups_by_crop_in_first_seen_order() {
        let quotes = vec![
            quote("soja", "Rosario", None, 295.0),
            quote("maíz", "Rosario", None, 175.0),
            quote("soja", "MATBA", Some("May25"), 290.5),
        ];
        let today = NaiveDate::from_ymd_opt(2025, 3, 7).expect("date");
        let text = format_quotes(&quotes, today);

        assert_eq!(
            text,
            "Precios actualizados (07/03/2025):\n\n\
             SOJA:\n  - Rosario spot: 295 USD/tn\n  - MATBA May25: 290.5 USD/tn\n\n\
             MAÍZ:\n  - Rosario spot: 175 USD/tn"
        );
    }

    #[tokio::test]
    async fn empty_store_falls_back_to_snapshot() {
        let store = Arc::new(ConversationStore::open_in_memory().expect("store"));
        let source = StoreMarketContext::new(store, 24);
        assert_eq!(source.current_context().await.expect("ctx"), INDICATIVE_SNAPSHOT);
    }

    #[tokio::test]
    async fn fresh_quotes_are_rendered() {
        let store = Arc::new(ConversationStore::open_in_memory().expect("store"));
        store
            .insert_market_quote(&quote("trigo", "Rosario", None, 210.0))
            .expect("insert");

        let text = StoreMarketContext::new(store, 24)
            .current_context()
            .await
            .expect("ctx");
        assert!(text.starts_with("Precios actualizados ("));
        assert!(text.contains("TRIGO:\n  - Rosario spot: 210 USD/tn"));
    }

    #[tokio::test]
    async fn stale_quotes_fall_back_to_snapshot() {
        let store = Arc::new(ConversationStore::open_in_memory().expect("store"));
        let mut old = quote("soja", "Rosario", None, 280.0);
        old.date = format_ts(Utc::now() - Duration::hours(48));
        store.insert_market_quote(&old).expect("insert");

        let text = StoreMarketContext::new(store, 24)
            .current_context()
            .await
            .expect("ctx");
        assert_eq!(text, INDICATIVE_SNAPSHOT);
    }
}
