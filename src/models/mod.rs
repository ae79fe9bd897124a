/*!
Core data model for the sniping engine: markets, signals, wallet scores,
paper trades and the error taxonomy shared by every component.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Crate-wide error type. Most component-level operations (scan, a listener
/// cycle, track_order) catch these internally and degrade rather than
/// propagate them; they surface mainly at the HTTP/persistence/config seams.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("data error: {0}")]
    DataError(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("state error: {0}")]
    StateError(String),

    #[error("strategy error: {0}")]
    StrategyError(String),
}

pub type TradingResult<T> = Result<T, TradingError>;

impl From<reqwest::Error> for TradingError {
    fn from(e: reqwest::Error) -> Self {
        TradingError::NetworkError(e.to_string())
    }
}

impl From<serde_json::Error> for TradingError {
    fn from(e: serde_json::Error) -> Self {
        TradingError::DataError(e.to_string())
    }
}

// ---------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tweet,
    Speech,
    Announcement,
    Interview,
    Statement,
    Reaction,
    Action,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tweet => "tweet",
            Category::Speech => "speech",
            Category::Announcement => "announcement",
            Category::Interview => "interview",
            Category::Statement => "statement",
            Category::Reaction => "reaction",
            Category::Action => "action",
            Category::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Expired,
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

/// Raw event as returned by the exchange's `/events` endpoint, before
/// categorization/scoring. Kept distinct from `Market` so enrichment never
/// mutates the document we actually received.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub volume: serde_json::Value,
    #[serde(default)]
    pub liquidity: serde_json::Value,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "endDate", default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub markets: Vec<serde_json::Value>,
}

/// Breakdown of the weighted snipe-score components, each already
/// normalized to [0,1] except `urgency` which is additionally discretized
/// into `urgency_rate` on the enclosing `Market`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub trigger_clarity: f64,
    pub monitorability: f64,
    pub reaction_speed: f64,
    pub urgency: f64,
}

/// A fully enriched, scored market, ready to be matched against or ranked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub url: String,
    pub image: String,
    pub end_date: Option<DateTime<Utc>>,
    pub volume: f64,
    pub liquidity: f64,
    pub category: Category,
    pub persons: Vec<String>,
    pub days_remaining: Option<i64>,
    pub urgency: Urgency,
    pub urgency_rate: u32,
    pub snipe_score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub is_favorite: bool,
    pub priority_boost: f64,
}

impl Market {
    /// Quoted substrings (length >= 2) in the title, used both as the
    /// per-market trigger keywords and (lowercased) for keyword matching.
    pub fn trigger_keywords(&self) -> Vec<String> {
        extract_quoted(&self.title)
    }
}

/// Extract single- or double-quoted substrings of length >= 2, lowercased.
pub fn extract_quoted(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' || c == '"' {
            if let Some(end_offset) = chars[i + 1..].iter().position(|&x| x == c) {
                let end = i + 1 + end_offset;
                if end - (i + 1) >= 2 {
                    let s: String = chars[i + 1..end].iter().collect();
                    out.push(s.to_lowercase());
                }
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }
    out
}

// ---------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    CriticalSnipe,
    SmartMoney,
    ListenerMatch,
    Spike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Yes => "YES",
            Side::No => "NO",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub signal_type: SignalType,
    pub market_id: String,
    pub side: Side,
    pub magnitude: f64,
    pub timestamp: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

// ---------------------------------------------------------------------
// Wallet scoring
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    Unknown,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::Unknown => "UNKNOWN",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "A" => Grade::A,
            "B" => Grade::B,
            "C" => Grade::C,
            "D" => Grade::D,
            _ => Grade::Unknown,
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            Grade::A => 1.0,
            Grade::B => 0.75,
            Grade::C => 0.5,
            Grade::D => 0.25,
            Grade::Unknown => 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletScoreBreakdown {
    pub success_rate: f64,
    pub roi_adjusted: f64,
    pub timing_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletScore {
    pub address: String,
    pub grade: Grade,
    pub components: WalletScoreBreakdown,
    pub total_markets: u32,
    pub total_volume: f64,
    pub avg_entry_timing: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

/// One closed or open trade fed into the wallet scorer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoricalTrade {
    pub outcome: Option<String>, // "WIN" | "LOSS"
    #[serde(default)]
    pub profit: f64,
    #[serde(default)]
    pub bet_size: f64,
    pub time_to_move: Option<f64>,
    pub market_duration: Option<f64>,
}

// ---------------------------------------------------------------------
// Paper trading
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Open,
    Closed,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperTrade {
    pub market_id: String,
    pub market_title: String,
    pub side: Side,
    pub size: f64,
    pub confidence: f64,
    pub signal_quality: f64,
    pub market_quality: f64,
    pub signal_source: Option<String>,
    pub signal_content: Option<String>,
    pub status: TradeStatus,
    pub outcome: Option<Outcome>,
    pub payout: Option<f64>,
    pub profit: Option<f64>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub initial_capital: f64,
    pub available_balance: f64,
    pub total_value: f64,
    pub open_positions: usize,
    pub total_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub win_rate: f64,
    pub total_profit: f64,
    pub roi: f64,
}

// ---------------------------------------------------------------------
// Favorites / activity snapshots / system log entries
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub market_id: String,
    pub market_title: String,
    pub market_url: String,
    pub priority_boost: f64,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_detected: u64,
    pub trades_executed: u64,
    pub active_targets: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemLogEntry {
    pub module: String,
    pub level: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// A social post or news item offered to the executor for scoring.
#[derive(Debug, Clone, Default)]
pub struct SignalContext {
    pub source: String, // "twitter" | "rss" | ...
    pub author: String,
    pub url: String,
    pub content: String,
    pub keywords_matched: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl SignalContext {
    pub fn metadata(&self) -> HashMap<String, serde_json::Value> {
        let mut m = HashMap::new();
        m.insert("source".to_string(), serde_json::Value::String(self.source.clone()));
        m.insert("author".to_string(), serde_json::Value::String(self.author.clone()));
        m.insert(
            "content".to_string(),
            serde_json::Value::String(self.content.chars().take(200).collect()),
        );
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_quoted_picks_up_single_and_double_quotes() {
        let kws = extract_quoted("Will Trump tweet 'MAGA' before Friday?");
        assert_eq!(kws, vec!["maga".to_string()]);

        let kws = extract_quoted(r#"Will Elon say "Dogecoin" this week?"#);
        assert_eq!(kws, vec!["dogecoin".to_string()]);
    }

    #[test]
    fn extract_quoted_ignores_short_fragments() {
        let kws = extract_quoted("Does he say 'x' today?");
        assert!(kws.is_empty());
    }

    #[test]
    fn grade_scores_match_spec() {
        assert_eq!(Grade::A.score(), 1.0);
        assert_eq!(Grade::B.score(), 0.75);
    }
}
