//! Keyword-count sentiment over recent news.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::financial_routes::require_symbol;
use crate::{ApiError, AppState};

const NEWS_WINDOW: u32 = 30;
const TOP_HEADLINES: usize = 5;

/// Word lists for simple news scoring: one point per hit, either direction.
const POSITIVE_WORDS: &[&str] = &[
    "upgrade", "beat", "beats", "surge", "rally", "gain", "growth", "profit",
    "bullish", "outperform", "strong", "record", "positive", "buy", "boost",
    "rise", "jump", "soar", "momentum", "exceeds", "expansion", "recovery",
    "innovative", "partnership", "dividend",
];

const NEGATIVE_WORDS: &[&str] = &[
    "downgrade", "miss", "misses", "plunge", "crash", "loss", "decline",
    "bearish", "underperform", "weak", "negative", "sell", "drop", "fall",
    "slump", "warning", "risk", "lawsuit", "fraud", "bankruptcy", "default",
    "layoff", "layoffs", "recession", "investigation", "recall", "concern",
];

#[derive(Deserialize)]
pub struct SentimentQuery {
    pub symbol: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlineEntry {
    pub title: String,
    pub published: Option<String>,
    pub sentiment: f64,
    pub sentiment_label: String,
    pub url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentResponse {
    pub symbol: String,
    pub available: bool,
    pub news_mentions: i32,
    pub sentiment_score: f64,
    pub sentiment_label: String,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub neutral_pct: f64,
    pub top_headlines: Vec<HeadlineEntry>,
}

pub fn sentiment_routes() -> Router<AppState> {
    Router::new().route("/api/sentiment", get(get_sentiment))
}

fn score_text(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut score = 0.0f64;
    for word in lower.split_whitespace() {
        let clean: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
        if POSITIVE_WORDS.contains(&clean.as_str()) {
            score += 1.0;
        }
        if NEGATIVE_WORDS.contains(&clean.as_str()) {
            score -= 1.0;
        }
    }
    score
}

/// Word-list scores cluster in roughly -3..3; stretch onto -100..100.
fn normalize_score(avg: f64) -> f64 {
    (avg * 33.3).clamp(-100.0, 100.0)
}

fn score_label(normalized: f64) -> &'static str {
    if normalized > 20.0 {
        "Bullish"
    } else if normalized < -20.0 {
        "Bearish"
    } else {
        "Neutral"
    }
}

fn article_label(score: f64) -> &'static str {
    if score > 0.5 {
        "Positive"
    } else if score < -0.5 {
        "Negative"
    } else {
        "Neutral"
    }
}

async fn get_sentiment(
    State(state): State<AppState>,
    Query(query): Query<SentimentQuery>,
) -> Result<Json<SentimentResponse>, ApiError> {
    let symbol = require_symbol(&query.symbol)?;
    let articles = state.market()?.news(&symbol, NEWS_WINDOW).await?;

    if articles.is_empty() {
        return Ok(Json(SentimentResponse {
            symbol,
            available: false,
            news_mentions: 0,
            sentiment_score: 0.0,
            sentiment_label: "Neutral".to_string(),
            positive_pct: 0.0,
            negative_pct: 0.0,
            neutral_pct: 100.0,
            top_headlines: Vec::new(),
        }));
    }

    let count = articles.len() as f64;
    let mut total_score = 0.0f64;
    let mut positive = 0i32;
    let mut negative = 0i32;
    let mut headlines = Vec::new();

    for article in &articles {
        let text = format!("{} {}", article.title, article.text.as_deref().unwrap_or(""));
        let score = score_text(&text);
        total_score += score;

        if score > 0.5 {
            positive += 1;
        } else if score < -0.5 {
            negative += 1;
        }

        if headlines.len() < TOP_HEADLINES {
            headlines.push(HeadlineEntry {
                title: article.title.clone(),
                published: article.published_date.clone(),
                sentiment: normalize_score(score),
                sentiment_label: article_label(score).to_string(),
                url: article.url.clone(),
            });
        }
    }

    let sentiment_score = normalize_score(total_score / count);
    let positive_pct = (positive as f64 / count * 100.0).round();
    let negative_pct = (negative as f64 / count * 100.0).round();
    let neutral_pct = (100.0 - positive_pct - negative_pct).max(0.0);

    Ok(Json(SentimentResponse {
        symbol,
        available: true,
        news_mentions: articles.len() as i32,
        sentiment_score: (sentiment_score * 10.0).round() / 10.0,
        sentiment_label: score_label(sentiment_score).to_string(),
        positive_pct,
        negative_pct,
        neutral_pct,
        top_headlines: headlines,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_counts_both_directions() {
        assert_eq!(score_text("Shares surge after earnings beat"), 2.0);
        assert_eq!(score_text("Downgrade follows lawsuit warning"), -3.0);
        assert_eq!(score_text("Quarterly report published today"), 0.0);
    }

    #[test]
    fn test_punctuation_is_stripped() {
        assert_eq!(score_text("\"Fraud!\" the filing alleged."), -1.0);
    }

    #[test]
    fn test_labels() {
        assert_eq!(score_label(normalize_score(1.0)), "Bullish");
        assert_eq!(score_label(normalize_score(-1.0)), "Bearish");
        assert_eq!(score_label(normalize_score(0.2)), "Neutral");
    }
}
