//! Market price listing route.
//!
//! Internal REST surface over the same dataset the dialogue engine consults.
//! Unlike the gateway channels, a failed read here is a real HTTP error.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use farmline_core::PriceRecord;

use crate::state::AppState;

/// Create market price router
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/market-prices", get(list_prices))
}

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub crop_type: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PriceListResponse {
    pub prices: Vec<PriceRecord>,
    pub count: usize,
}

/// List price records, optionally filtered by crop and/or region
pub async fn list_prices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<PriceListResponse>, (StatusCode, String)> {
    let prices = state
        .prices
        .query(query.crop_type.as_deref(), query.region.as_deref())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(PriceListResponse {
        count: prices.len(),
        prices,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use farmline_core::{MenuCatalog, StaticPriceBook};

    fn record(crop: &str, region: &str, date: &str, price: f64) -> PriceRecord {
        PriceRecord {
            region: region.to_string(),
            crop_type: crop.to_string(),
            date: date.parse().unwrap(),
            price_per_kg: price,
            currency: "ETB".to_string(),
        }
    }

    fn test_state() -> Arc<AppState> {
        let prices = StaticPriceBook::new(vec![
            record("maize", "Oromia", "2025-06-10", 18.5),
            record("teff", "Amhara", "2025-06-09", 52.0),
        ]);
        AppState::with_parts(Config::default(), MenuCatalog::new().unwrap(), Arc::new(prices))
            .unwrap()
    }

    #[tokio::test]
    async fn lists_all_prices_without_filters() {
        let state = test_state();
        let resp = list_prices(
            State(state),
            Query(PriceQuery {
                crop_type: None,
                region: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(resp.0.count, 2);
    }

    #[tokio::test]
    async fn filters_by_crop_type() {
        let state = test_state();
        let resp = list_prices(
            State(state),
            Query(PriceQuery {
                crop_type: Some("teff".to_string()),
                region: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(resp.0.count, 1);
        assert_eq!(resp.0.prices[0].region, "Amhara");
    }

    #[tokio::test]
    async fn unreadable_dataset_is_a_500() {
        let state = AppState::with_parts(
            Config::default(),
            MenuCatalog::new().unwrap(),
            Arc::new(farmline_core::JsonPriceBook::new("/nonexistent/prices.json")),
        )
        .unwrap();
        let err = list_prices(
            State(state),
            Query(PriceQuery {
                crop_type: None,
                region: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
