//! Peer recommendation via the chat model.

use crate::error::{LlmError, LlmResult};
use crate::json::extract_json_object;
use crate::LlmClient;
use serde_json::Value;

const PEER_SYSTEM_PROMPT: &str = "You are a financial analyst. Respond with JSON only, \
no prose, no code fences. The JSON must match the schema the user describes.";

fn build_peer_prompt(
    symbol: &str,
    name: Option<&str>,
    sector: Option<&str>,
    industry: Option<&str>,
    count: usize,
) -> String {
    let mut prompt = format!(
        "List the {} closest publicly traded competitors of {} ({})",
        count,
        name.unwrap_or(symbol),
        symbol
    );
    if let Some(industry) = industry {
        prompt.push_str(&format!(" in the {} industry", industry));
    } else if let Some(sector) = sector {
        prompt.push_str(&format!(" in the {} sector", sector));
    }
    prompt.push_str(
        ". Consider business model overlap, market capitalization, and valuation comparability. \
         Use US exchange ticker symbols. \
         Respond with: { \"peers\": [\"TICKER1\", \"TICKER2\", ...] }",
    );
    prompt
}

/// Extract, normalize, and de-duplicate the peer list from a model response.
/// The subject symbol is always excluded.
pub fn parse_peer_response(value: &Value, symbol: &str) -> LlmResult<Vec<String>> {
    let subject = symbol.to_uppercase();
    let raw = value
        .get("peers")
        .and_then(|p| p.as_array())
        .ok_or_else(|| LlmError::InvalidResponse("missing peers array".to_string()))?;

    let mut peers = Vec::new();
    for entry in raw {
        let ticker = match entry.as_str() {
            Some(t) => t.trim().to_uppercase(),
            None => continue,
        };
        if ticker.is_empty() || ticker == subject || peers.contains(&ticker) {
            continue;
        }
        peers.push(ticker);
    }
    Ok(peers)
}

/// Ask the model for comparable companies.
pub async fn recommend_peers(
    client: &LlmClient,
    symbol: &str,
    name: Option<&str>,
    sector: Option<&str>,
    industry: Option<&str>,
    count: usize,
) -> LlmResult<Vec<String>> {
    let prompt = build_peer_prompt(symbol, name, sector, industry, count);
    let output = client.chat(PEER_SYSTEM_PROMPT, &prompt).await?;
    let value = extract_json_object(&output)?;
    parse_peer_response(&value, symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_peers_normalizes_and_excludes_subject() {
        let value = json!({ "peers": ["msft", "GOOGL", "AAPL", "msft", " amzn "] });
        let peers = parse_peer_response(&value, "aapl").unwrap();
        assert_eq!(peers, vec!["MSFT", "GOOGL", "AMZN"]);
    }

    #[test]
    fn test_parse_peers_missing_array() {
        let value = json!({ "competitors": [] });
        assert!(parse_peer_response(&value, "AAPL").is_err());
    }

    #[test]
    fn test_prompt_mentions_industry_over_sector() {
        let prompt = build_peer_prompt(
            "NFLX",
            Some("Netflix"),
            Some("Communication Services"),
            Some("Entertainment"),
            8,
        );
        assert!(prompt.contains("Entertainment industry"));
        assert!(!prompt.contains("Communication Services sector"));
    }
}
