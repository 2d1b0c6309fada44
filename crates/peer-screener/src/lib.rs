//! Peer selection by market-cap similarity.
//!
//! The industry pass takes the eight candidates closest to the subject's
//! market cap. When that yields fewer than five, a sector pass fills the list
//! up to five. Batch mode fans out per chunk and sleeps a fixed second
//! between chunks to stay under provider rate limits; individual failures
//! are recorded and never abort the batch.

use chrono::Utc;
use dashboard_core::{DashboardError, ScreenerEntry};
use dashboard_store::{PeerRecord, PeerStore};
use fmp_client::{FmpClient, ScreenerQuery};
use futures_util::future::join_all;
use llm_client::LlmClient;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

/// Peers taken in the industry pass.
const INDUSTRY_PEER_LIMIT: usize = 8;

/// Minimum list size before the sector pass stops topping up.
const MIN_PEERS: usize = 5;

/// Screener floor; micro caps make poor comparables.
const MARKET_CAP_FLOOR: f64 = 100_000_000.0;

/// Candidate rows fetched per screener call.
const SCREENER_FETCH_LIMIT: u32 = 100;

/// Peers requested from the LLM regenerator.
const LLM_PEER_COUNT: usize = 8;

const BATCH_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Serialize)]
pub struct ScreenOutcome {
    pub symbol: String,
    pub name: Option<String>,
    pub peers: Vec<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchError {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub processed: Vec<ScreenOutcome>,
    pub errors: Vec<BatchError>,
}

pub struct PeerScreener {
    client: FmpClient,
    store: PeerStore,
}

impl PeerScreener {
    pub fn new(client: FmpClient, store: PeerStore) -> Self {
        Self { client, store }
    }

    /// Screen one symbol and persist the resulting record.
    pub async fn screen(&self, symbol: &str) -> Result<ScreenOutcome, DashboardError> {
        let symbol = symbol.trim().to_uppercase();
        let profile = self.client.profile(&symbol).await?;

        let subject_cap = profile
            .mkt_cap
            .filter(|cap| *cap > 0.0)
            .ok_or_else(|| DashboardError::InvalidData(format!("no market cap for {}", symbol)))?;

        let mut exclude: HashSet<String> = HashSet::new();
        exclude.insert(symbol.clone());

        let mut peers = Vec::new();
        if let Some(industry) = &profile.industry {
            let candidates = self
                .client
                .screener(&ScreenerQuery {
                    industry: Some(industry.clone()),
                    market_cap_more_than: Some(MARKET_CAP_FLOOR),
                    limit: SCREENER_FETCH_LIMIT,
                    ..Default::default()
                })
                .await?;
            peers = rank_by_cap_distance(subject_cap, &candidates, &exclude, INDUSTRY_PEER_LIMIT);
        }

        if peers.len() < MIN_PEERS {
            if let Some(sector) = &profile.sector {
                for peer in &peers {
                    exclude.insert(peer.clone());
                }
                let candidates = self
                    .client
                    .screener(&ScreenerQuery {
                        sector: Some(sector.clone()),
                        market_cap_more_than: Some(MARKET_CAP_FLOOR),
                        limit: SCREENER_FETCH_LIMIT,
                        ..Default::default()
                    })
                    .await?;
                let fill =
                    rank_by_cap_distance(subject_cap, &candidates, &exclude, MIN_PEERS - peers.len());
                peers.extend(fill);
            }
        }

        self.persist(&symbol, &profile.company_name, peers, &profile.sector, &profile.industry)
            .await
    }

    /// Replace a symbol's peers with the LLM's recommendation.
    pub async fn regenerate_with_llm(
        &self,
        llm: &LlmClient,
        symbol: &str,
    ) -> Result<ScreenOutcome, DashboardError> {
        let symbol = symbol.trim().to_uppercase();
        let profile = self.client.profile(&symbol).await?;

        let peers = llm_client::peers::recommend_peers(
            llm,
            &symbol,
            profile.company_name.as_deref(),
            profile.sector.as_deref(),
            profile.industry.as_deref(),
            LLM_PEER_COUNT,
        )
        .await
        .map_err(|e| DashboardError::ApiError(e.to_string()))?;

        self.persist(&symbol, &profile.company_name, peers, &profile.sector, &profile.industry)
            .await
    }

    async fn persist(
        &self,
        symbol: &str,
        name: &Option<String>,
        peers: Vec<String>,
        sector: &Option<String>,
        industry: &Option<String>,
    ) -> Result<ScreenOutcome, DashboardError> {
        let record = self
            .store
            .upsert(&PeerRecord {
                symbol: symbol.to_string(),
                name: name.clone(),
                peers,
                sector: sector.clone(),
                industry: industry.clone(),
                updated_at: Utc::now(),
            })
            .await
            .map_err(|e| DashboardError::DatabaseError(e.to_string()))?;

        Ok(ScreenOutcome {
            symbol: record.symbol,
            name: record.name,
            peers: record.peers,
            sector: record.sector,
            industry: record.industry,
        })
    }

    /// Screen many symbols in chunks of `batch_size`.
    pub async fn screen_batch(&self, symbols: &[String], batch_size: usize) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            processed: Vec::new(),
            errors: Vec::new(),
        };

        let chunks: Vec<&[String]> = symbols.chunks(batch_size.max(1)).collect();
        let total = chunks.len();

        for (index, chunk) in chunks.into_iter().enumerate() {
            tracing::info!("screening batch {}/{} ({} symbols)", index + 1, total, chunk.len());

            let results = join_all(chunk.iter().map(|symbol| self.screen(symbol))).await;
            for (symbol, result) in chunk.iter().zip(results) {
                match result {
                    Ok(screened) => outcome.processed.push(screened),
                    Err(e) => {
                        tracing::warn!("screening {} failed: {}", symbol, e);
                        outcome.errors.push(BatchError {
                            symbol: symbol.trim().to_uppercase(),
                            error: e.to_string(),
                        });
                    }
                }
            }

            if index + 1 < total {
                tokio::time::sleep(BATCH_DELAY).await;
            }
        }

        outcome
    }
}

/// Rank candidates by absolute market-cap distance from the subject and take
/// the closest `take`, skipping excluded symbols and non-positive caps.
fn rank_by_cap_distance(
    subject_cap: f64,
    candidates: &[ScreenerEntry],
    exclude: &HashSet<String>,
    take: usize,
) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut ranked: Vec<(String, f64)> = Vec::new();
    for entry in candidates {
        let ticker = entry.symbol.trim().to_uppercase();
        let cap = entry.market_cap.unwrap_or(0.0);
        if ticker.is_empty() || cap <= 0.0 || exclude.contains(&ticker) || !seen.insert(ticker.clone()) {
            continue;
        }
        ranked.push((ticker, (cap - subject_cap).abs()));
    }

    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    ranked.into_iter().take(take).map(|(ticker, _)| ticker).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(symbol: &str, cap: f64) -> ScreenerEntry {
        ScreenerEntry {
            symbol: symbol.to_string(),
            company_name: None,
            market_cap: Some(cap),
            sector: None,
            industry: None,
            exchange_short_name: None,
        }
    }

    #[test]
    fn test_ranking_prefers_closest_market_cap() {
        let candidates = vec![
            entry("HUGE", 3_000e9),
            entry("NEAR", 1_050e9),
            entry("CLOSEST", 990e9),
            entry("SMALL", 20e9),
        ];
        let exclude = HashSet::new();
        let peers = rank_by_cap_distance(1_000e9, &candidates, &exclude, 8);
        assert_eq!(peers, vec!["CLOSEST", "NEAR", "HUGE", "SMALL"]);
    }

    #[test]
    fn test_subject_and_nonpositive_caps_are_skipped() {
        let candidates = vec![
            entry("AAPL", 1_000e9),
            entry("ZERO", 0.0),
            entry("NEG", -5.0),
            entry("MSFT", 900e9),
        ];
        let mut exclude = HashSet::new();
        exclude.insert("AAPL".to_string());

        let peers = rank_by_cap_distance(1_000e9, &candidates, &exclude, 8);
        assert_eq!(peers, vec!["MSFT"]);
    }

    #[test]
    fn test_take_limit_applies() {
        let candidates: Vec<ScreenerEntry> = (0..20)
            .map(|i| entry(&format!("S{}", i), 100e9 + i as f64 * 1e9))
            .collect();
        let exclude = HashSet::new();

        let peers = rank_by_cap_distance(100e9, &candidates, &exclude, INDUSTRY_PEER_LIMIT);
        assert_eq!(peers.len(), 8);
        assert_eq!(peers[0], "S0");
    }
}
