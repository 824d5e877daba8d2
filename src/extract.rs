//! Price Extractor/Validator: reads the rendered result rows into a
//! category -> price mapping. Individual unreadable rows are skipped with a
//! warning; an empty validated quote fails the check.

use tracing::{debug, warn};

use crate::driver::{PageDriver, RawRow};
use crate::error::{Error, Result};
use crate::model::PriceQuote;
use crate::site;

/// Sanity bounds for extracted prices. Prices strictly inside `(min, max)`
/// are accepted; anything at or beyond a bound is treated as parsing garbage
/// or a site-side display bug and skipped. Guards against garbage, not
/// genuine price volatility.
#[derive(Debug, Clone, Copy)]
pub struct PriceBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for PriceBounds {
    fn default() -> Self {
        Self {
            min: 20.0,
            max: 5000.0,
        }
    }
}

impl PriceBounds {
    pub fn accepts(&self, price: f64) -> bool {
        price > self.min && price < self.max
    }
}

/// Read every rendered category row and build the validated quote.
pub async fn extract_quote<D: PageDriver + ?Sized>(
    driver: &D,
    bounds: PriceBounds,
) -> Result<PriceQuote> {
    let rows = driver.scrape_rows(&site::result_rows()).await?;
    debug!(rows = rows.len(), "scanning result rows");
    quote_from_rows(rows, bounds)
}

fn quote_from_rows(rows: Vec<RawRow>, bounds: PriceBounds) -> Result<PriceQuote> {
    let mut quote = PriceQuote::new();
    for (index, row) in rows.into_iter().enumerate() {
        let label = match row.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_owned(),
            _ => {
                warn!(row = index, "row has no readable category label, skipping");
                continue;
            }
        };
        let price = match row.price.as_deref().and_then(|p| p.trim().parse::<f64>().ok()) {
            Some(price) => price,
            None => {
                warn!(row = index, category = %label, "row has no parseable price, skipping");
                continue;
            }
        };
        if !bounds.accepts(price) {
            warn!(category = %label, price, "price outside sane bounds, skipping");
            continue;
        }
        quote.insert(label, price);
    }
    if quote.is_empty() {
        return Err(Error::EmptyQuote);
    }
    Ok(quote)
}
