/*!
Trade Executor: scores a (signal, market) pair, gates it against liquidity
and confidence thresholds, sizes the trade, and opens a paper position.
*/

use crate::config::ExecutorConfig;
use crate::models::{Market, PaperTrade, Side, SignalContext, TradeStatus};
use crate::portfolio::Portfolio;
use chrono::{Datelike, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

const IMPORTANT_HANDLES: &[&str] = &["realdonaldtrump", "elonmusk", "joebiden"];
const MAJOR_NEWS_SOURCES: &[&str] = &["reuters", "bloomberg", "ap", "cnn", "bbc"];
const ACTION_WORDS: &[&str] = &["announce", "declare", "confirm", "reveal"];
const HEDGING_WORDS: &[&str] = &["maybe", "possibly", "might", "could"];
const NEGATION_WORDS: &[&str] = &["not", "didn't", "won't", "never", "denies", "rejects"];

pub struct ScoreReport {
    pub signal_quality: f64,
    pub market_quality: f64,
    pub confidence: f64,
}

pub enum ExecutionOutcome {
    Opened(PaperTrade),
    Skipped(&'static str),
}

struct DailyCounter {
    count: u32,
    reset_date: chrono::NaiveDate,
}

pub struct Executor {
    config: ExecutorConfig,
    portfolio: Arc<Portfolio>,
    daily: Mutex<DailyCounter>,
}

impl Executor {
    pub fn new(config: ExecutorConfig, portfolio: Arc<Portfolio>) -> Self {
        Self {
            config,
            portfolio,
            daily: Mutex::new(DailyCounter {
                count: 0,
                reset_date: Utc::now().date_naive(),
            }),
        }
    }

    fn source_reliability(ctx: &SignalContext) -> f64 {
        match ctx.source.as_str() {
            "twitter" => {
                let author = ctx.author.to_lowercase();
                if IMPORTANT_HANDLES.iter().any(|h| author.contains(h)) {
                    1.0
                } else {
                    0.8
                }
            }
            "rss" => {
                let url = ctx.url.to_lowercase();
                if MAJOR_NEWS_SOURCES.iter().any(|s| url.contains(s)) {
                    0.7
                } else {
                    0.5
                }
            }
            _ => 0.3,
        }
    }

    fn keyword_match(ctx: &SignalContext, market: &Market) -> f64 {
        let content = ctx.content.to_lowercase();
        let keywords = market.trigger_keywords();

        // `keywords` are already the quoted phrases extracted from the market
        // title; finding one verbatim in content is the exact-match tier.
        if !keywords.is_empty() && keywords.iter().any(|k| content.contains(k.as_str())) {
            return 1.0;
        }

        if !ctx.keywords_matched.is_empty() {
            let matched = ctx
                .keywords_matched
                .iter()
                .filter(|k| content.contains(k.as_str()))
                .count();
            let rate = matched as f64 / ctx.keywords_matched.len() as f64;
            return if rate >= 1.0 {
                0.9
            } else if rate >= 0.75 {
                0.7
            } else if rate >= 0.5 {
                0.5
            } else {
                0.3
            };
        }

        0.5
    }

    fn timing(ctx: &SignalContext) -> f64 {
        let Some(ts) = ctx.timestamp else { return 0.5 };
        let age = (Utc::now() - ts).num_seconds().max(0) as f64;
        if age < 10.0 {
            1.0
        } else if age < 60.0 {
            0.9
        } else if age < 300.0 {
            0.7
        } else if age < 900.0 {
            0.5
        } else {
            0.2
        }
    }

    fn clarity(ctx: &SignalContext) -> f64 {
        let content = ctx.content.to_lowercase();
        if !crate::models::extract_quoted(&ctx.content).is_empty() {
            1.0
        } else if ACTION_WORDS.iter().any(|w| content.contains(w)) {
            0.8
        } else if HEDGING_WORDS.iter().any(|w| content.contains(w)) {
            0.3
        } else {
            0.5
        }
    }

    pub fn calculate_signal_quality(&self, ctx: &SignalContext, market: &Market) -> f64 {
        0.40 * Self::source_reliability(ctx)
            + 0.30 * Self::keyword_match(ctx, market)
            + 0.20 * Self::timing(ctx)
            + 0.10 * Self::clarity(ctx)
    }

    fn volume_bucket(volume: f64) -> f64 {
        if volume >= 100_000.0 {
            1.0
        } else if volume >= 50_000.0 {
            0.8
        } else if volume >= 10_000.0 {
            0.6
        } else if volume >= 5_000.0 {
            0.4
        } else {
            0.2
        }
    }

    fn liquidity_bucket(liquidity: f64) -> f64 {
        if liquidity >= 50_000.0 {
            1.0
        } else if liquidity >= 20_000.0 {
            0.8
        } else if liquidity >= 5_000.0 {
            0.6
        } else if liquidity >= 1_000.0 {
            0.4
        } else {
            0.2
        }
    }

    fn urgency_bucket(days_remaining: Option<i64>) -> f64 {
        match days_remaining {
            None => 0.0,
            Some(d) if d <= 0 => 0.0,
            Some(d) if d <= 1 => 1.0,
            Some(d) if d <= 7 => 0.9,
            Some(d) if d <= 30 => 0.7,
            Some(d) if d <= 90 => 0.5,
            _ => 0.2,
        }
    }

    pub fn calculate_market_quality(market: &Market) -> f64 {
        0.50 * market.snipe_score
            + 0.20 * Self::volume_bucket(market.volume)
            + 0.20 * Self::liquidity_bucket(market.liquidity)
            + 0.10 * Self::urgency_bucket(market.days_remaining)
    }

    pub fn calculate_confidence(signal_quality: f64, market_quality: f64) -> f64 {
        0.60 * signal_quality + 0.40 * market_quality
    }

    pub fn determine_side(content: &str) -> Side {
        let lower = content.to_lowercase();
        if NEGATION_WORDS.iter().any(|w| lower.contains(w)) {
            Side::No
        } else {
            Side::Yes
        }
    }

    async fn reset_daily_counter_if_needed(&self) {
        let mut daily = self.daily.lock().await;
        let today = Utc::now().date_naive();
        if daily.reset_date.num_days_from_ce() != today.num_days_from_ce() {
            daily.count = 0;
            daily.reset_date = today;
        }
    }

    pub async fn execute_trade(
        &self,
        ctx: &SignalContext,
        market: &Market,
    ) -> ExecutionOutcome {
        self.reset_daily_counter_if_needed().await;

        let signal_quality = self.calculate_signal_quality(ctx, market);
        let market_quality = Self::calculate_market_quality(market);
        let confidence = Self::calculate_confidence(signal_quality, market_quality);

        if market.volume < self.config.min_volume {
            return ExecutionOutcome::Skipped("volume below minimum");
        }
        if signal_quality < self.config.min_signal_quality {
            return ExecutionOutcome::Skipped("signal quality below minimum");
        }
        match market.days_remaining {
            Some(d) if d <= 0 => return ExecutionOutcome::Skipped("market expired"),
            _ => {}
        }

        let trades_today = self.daily.lock().await.count;
        if trades_today >= self.config.max_trades_per_day {
            return ExecutionOutcome::Skipped("daily trade limit reached");
        }
        if confidence < self.config.min_confidence {
            return ExecutionOutcome::Skipped("confidence below minimum");
        }

        let size = self
            .portfolio
            .calculate_position_size(
                confidence,
                self.config.base_bet_pct,
                self.config.max_bet_pct,
                self.config.min_bet,
            )
            .await;

        if !self.portfolio.can_trade(size).await {
            return ExecutionOutcome::Skipped("insufficient balance");
        }

        let side = Self::determine_side(&ctx.content);
        if !self.portfolio.open_position(&market.id, side, size, confidence).await {
            return ExecutionOutcome::Skipped("insufficient balance");
        }

        self.daily.lock().await.count += 1;

        let trade = PaperTrade {
            market_id: market.id.clone(),
            market_title: market.title.clone(),
            side,
            size,
            confidence,
            signal_quality,
            market_quality,
            signal_source: Some(ctx.source.clone()),
            signal_content: Some(ctx.content.chars().take(200).collect()),
            status: TradeStatus::Open,
            outcome: None,
            payout: None,
            profit: None,
            opened_at: Utc::now(),
            closed_at: None,
        };

        info!(market_id = %market.id, side = side.as_str(), size, confidence, "paper trade opened");
        ExecutionOutcome::Opened(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ScoreBreakdown, Urgency};

    fn sample_market() -> Market {
        Market {
            id: "m1".to_string(),
            title: "Will Elon say 'Dogecoin' this week?".to_string(),
            description: String::new(),
            slug: "doge".to_string(),
            url: String::new(),
            image: String::new(),
            end_date: Some(Utc::now() + chrono::Duration::days(5)),
            volume: 8_000.0,
            liquidity: 2_000.0,
            category: Category::Tweet,
            persons: vec!["Elon Musk".to_string()],
            days_remaining: Some(5),
            urgency: Urgency::High,
            urgency_rate: 90,
            snipe_score: 0.3,
            score_breakdown: ScoreBreakdown {
                trigger_clarity: 0.9,
                monitorability: 1.0,
                reaction_speed: 1.0,
                urgency: 0.9,
            },
            is_favorite: true,
            priority_boost: 1.0,
        }
    }

    #[test]
    fn negation_flips_side_to_no() {
        assert_eq!(Executor::determine_side("I will not mention Dogecoin today"), Side::No);
        assert_eq!(Executor::determine_side("Dogecoin to the moon"), Side::Yes);
    }

    #[test]
    fn quoted_phrase_in_plain_content_scores_exact_match() {
        let market = sample_market();
        let ctx = SignalContext {
            source: "twitter".to_string(),
            author: "elonmusk".to_string(),
            url: String::new(),
            content: "Dogecoin to the moon, no cap".to_string(),
            keywords_matched: vec![],
            timestamp: Some(Utc::now()),
        };
        assert_eq!(Executor::keyword_match(&ctx, &market), 1.0);
    }

    #[tokio::test]
    async fn low_confidence_is_skipped() {
        let portfolio = Arc::new(Portfolio::new(10_000.0));
        let executor = Executor::new(ExecutorConfig::default(), portfolio);
        let market = sample_market();
        let ctx = SignalContext {
            source: "rss".to_string(),
            author: "some-blog".to_string(),
            url: "https://some-blog.example".to_string(),
            content: "maybe a rumor is spreading".to_string(),
            keywords_matched: vec![],
            timestamp: Some(Utc::now() - chrono::Duration::minutes(20)),
        };

        let outcome = executor.execute_trade(&ctx, &market).await;
        assert!(matches!(outcome, ExecutionOutcome::Skipped(_)));
    }
}
