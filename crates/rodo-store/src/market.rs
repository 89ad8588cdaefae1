use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::debug;

use crate::db::format_ts;
use crate::error::Result;
use crate::store::ConversationStore;
use crate::types::MarketQuote;

impl ConversationStore {
    /// Record a price observation.
    pub fn insert_market_quote(&self, quote: &MarketQuote) -> Result<()> {
        self.with_conn(|db| {
            db.execute(
                "INSERT INTO market_data (crop, market, kind, position, price, currency, date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    quote.crop,
                    quote.market,
                    quote.kind,
                    quote.position,
                    quote.price,
                    quote.currency,
                    quote.date,
                ],
            )?;
            Ok(())
        })
    }

    /// Quotes observed at or after `since`, newest first.
    pub fn recent_market_quotes(&self, since: DateTime<Utc>) -> Result<Vec<MarketQuote>> {
        let since = format_ts(since);
        self.with_conn(|db| {
            let mut stmt = db.prepare(
                "SELECT crop, market, kind, position, price, currency, date
                 FROM market_data
                 WHERE date >= ?1
                 ORDER BY date DESC, id DESC",
            )?;
            let rows = stmt.query_map(params![since], |row| {
                Ok(MarketQuote {
                    crop: row.get(0)?,
                    market: row.get(1)?,
                    kind: row.get(2)?,
                    position: row.get(3)?,
                    price: row.get(4)?,
                    currency: row.get(5)?,
                    date: row.get(6)?,
                })
            })?;
            let quotes = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            debug!(count = quotes.len(), since = %since, "loaded market quotes");
            Ok(quotes)
        })
    }
}
