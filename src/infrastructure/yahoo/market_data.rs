use crate::domain::errors::MarketDataError;
use crate::domain::market::price_series::{PricePoint, PriceSeries};
use crate::domain::ports::PriceHistoryProvider;
use crate::infrastructure::core::HttpClientFactory;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

/// Daily closes from the Yahoo Finance chart endpoint.
pub struct YahooPriceHistoryProvider {
    client: Client,
    base_url: String,
}

impl YahooPriceHistoryProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: HttpClientFactory::create_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Turn a chart payload into a series, dropping sessions with no close.
fn parse_chart(symbol: &str, body: ChartResponse) -> Result<PriceSeries, MarketDataError> {
    if let Some(err) = body.chart.error {
        return Err(MarketDataError::Decode {
            symbol: symbol.to_string(),
            reason: format!(
                "{}: {}",
                err.code,
                err.description.unwrap_or_default()
            ),
        });
    }

    let Some(result) = body.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(MarketDataError::Empty {
            symbol: symbol.to_string(),
        });
    };

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    if closes.len() != result.timestamp.len() {
        return Err(MarketDataError::Decode {
            symbol: symbol.to_string(),
            reason: format!(
                "{} timestamps but {} closes",
                result.timestamp.len(),
                closes.len()
            ),
        });
    }

    // Session dates are taken in exchange time.
    let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let points: Vec<PricePoint> = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let close = close?;
            let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
            Some(PricePoint { date, close })
        })
        .collect();

    let series = PriceSeries::new(symbol, points);
    if series.is_empty() {
        return Err(MarketDataError::Empty {
            symbol: symbol.to_string(),
        });
    }
    Ok(series)
}

#[async_trait]
impl PriceHistoryProvider for YahooPriceHistoryProvider {
    async fn fetch_daily_closes(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<PriceSeries, MarketDataError> {
        let end = Utc::now();
        let start = end - ChronoDuration::days(i64::from(lookback_days));
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        debug!(
            "YahooPriceHistoryProvider: Fetching daily closes for {} from {} to {}",
            symbol,
            start.date_naive(),
            end.date_naive()
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(
                "YahooPriceHistoryProvider: API error {} for {}: {}",
                status, symbol, body
            );
            return Err(MarketDataError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChartResponse = response.json().await.map_err(|e| MarketDataError::Decode {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })?;

        let series = parse_chart(symbol, body)?;
        debug!(
            "YahooPriceHistoryProvider: {} closes for {} (last {:?})",
            series.len(),
            symbol,
            series.last_date()
        );
        Ok(series)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn parse(json: &str) -> Result<PriceSeries, MarketDataError> {
        let body: ChartResponse = serde_json::from_str(json).unwrap();
        parse_chart("TCS.NS", body)
    }

    #[test]
    fn test_parse_chart_skips_null_closes() {
        // 2024-05-02, 05-03, 05-06 at 09:15 IST
        let series = parse(
            r#"{"chart":{"result":[{
                "meta":{"currency":"INR","symbol":"TCS.NS","gmtoffset":19800},
                "timestamp":[1714621500,1714707900,1714967100],
                "indicators":{"quote":[{"close":[3850.5,null,3901.25],"open":[1,2,3]}]}
            }],"error":null}}"#,
        )
        .unwrap();

        assert_eq!(series.symbol(), "TCS.NS");
        assert_eq!(series.closes(), vec![3850.5, 3901.25]);
        assert_eq!(
            series.last_date(),
            NaiveDate::from_ymd_opt(2024, 5, 6)
        );
    }

    #[test]
    fn test_parse_chart_error_payload() {
        let err = parse(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MarketDataError::Decode { .. }));
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn test_parse_chart_empty_result() {
        let err = parse(r#"{"chart":{"result":[],"error":null}}"#).unwrap_err();
        assert!(matches!(err, MarketDataError::Empty { .. }));

        let err = parse(
            r#"{"chart":{"result":[{"timestamp":[1714621500],"indicators":{"quote":[{"close":[null]}]}}],"error":null}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MarketDataError::Empty { .. }));
    }

    #[test]
    fn test_parse_chart_length_mismatch() {
        let err = parse(
            r#"{"chart":{"result":[{"timestamp":[1714621500,1714707900],"indicators":{"quote":[{"close":[1.0]}]}}],"error":null}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MarketDataError::Decode { .. }));
    }
}
