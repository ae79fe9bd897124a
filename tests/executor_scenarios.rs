use chrono::Utc;
use sniper_bot::config::ExecutorConfig;
use sniper_bot::executor::{ExecutionOutcome, Executor};
use sniper_bot::models::{Category, Market, ScoreBreakdown, Side, SignalContext, Urgency};
use sniper_bot::portfolio::Portfolio;
use std::sync::Arc;

fn dogecoin_market(favorite: bool) -> Market {
    Market {
        id: "dogecoin-market".to_string(),
        title: "Will Elon say 'Dogecoin' this week?".to_string(),
        description: String::new(),
        slug: "dogecoin".to_string(),
        url: String::new(),
        image: String::new(),
        end_date: Some(Utc::now() + chrono::Duration::days(5)),
        volume: 8_000.0,
        liquidity: 6_000.0,
        category: Category::Tweet,
        persons: vec!["Elon Musk".to_string()],
        days_remaining: Some(5),
        urgency: Urgency::High,
        urgency_rate: 90,
        snipe_score: 0.85,
        score_breakdown: ScoreBreakdown {
            trigger_clarity: 1.0,
            monitorability: 1.0,
            reaction_speed: 1.0,
            urgency: 0.9,
        },
        is_favorite: favorite,
        priority_boost: 1.0,
    }
}

fn content_ctx(content: &str) -> SignalContext {
    SignalContext {
        source: "twitter".to_string(),
        author: "elonmusk".to_string(),
        url: "https://nitter.net/elonmusk/status/1".to_string(),
        content: content.to_string(),
        keywords_matched: vec!["dogecoin".to_string()],
        timestamp: Some(Utc::now()),
    }
}

/// Scenario 2 (favorite match): a quoted, single-keyword hit from an
/// important handle on a liquid, urgent market opens a YES paper trade.
#[tokio::test]
async fn favorite_match_opens_yes_trade() {
    let portfolio = Arc::new(Portfolio::new(10_000.0));
    let executor = Executor::new(ExecutorConfig::default(), portfolio.clone());
    let market = dogecoin_market(true);
    let ctx = content_ctx("Dogecoin to the moon");

    match executor.execute_trade(&ctx, &market).await {
        ExecutionOutcome::Opened(trade) => {
            assert_eq!(trade.side, Side::Yes);
            assert_eq!(trade.market_id, market.id);
        }
        ExecutionOutcome::Skipped(reason) => panic!("expected trade to open, got skip: {reason}"),
    }

    let stats = portfolio.stats().await;
    assert_eq!(stats.total_trades, 1);
}

/// Scenario 3 (negation): the same market, but the matched content negates
/// the claim, so the executor flips the side to NO instead of skipping.
#[tokio::test]
async fn negated_match_opens_no_trade() {
    let portfolio = Arc::new(Portfolio::new(10_000.0));
    let executor = Executor::new(ExecutorConfig::default(), portfolio.clone());
    let market = dogecoin_market(false);
    let ctx = content_ctx("I will not mention Dogecoin today");

    match executor.execute_trade(&ctx, &market).await {
        ExecutionOutcome::Opened(trade) => assert_eq!(trade.side, Side::No),
        ExecutionOutcome::Skipped(reason) => panic!("expected trade to open, got skip: {reason}"),
    }
}

/// Scenario 6 (gating): a low-confidence context on an otherwise-eligible
/// market is skipped, and the portfolio is left untouched.
#[tokio::test]
async fn low_confidence_skips_without_touching_portfolio() {
    let portfolio = Arc::new(Portfolio::new(10_000.0));
    let executor = Executor::new(ExecutorConfig::default(), portfolio.clone());
    let mut market = dogecoin_market(false);
    market.snipe_score = 0.1;
    market.score_breakdown.trigger_clarity = 0.1;

    let ctx = SignalContext {
        source: "rss".to_string(),
        author: "some-blog".to_string(),
        url: "https://some-blog.example/posts/1".to_string(),
        content: "maybe dogecoin rumor, possibly nothing".to_string(),
        keywords_matched: vec![],
        timestamp: Some(Utc::now() - chrono::Duration::minutes(20)),
    };

    let outcome = executor.execute_trade(&ctx, &market).await;
    assert!(matches!(outcome, ExecutionOutcome::Skipped(_)));

    let stats = portfolio.stats().await;
    assert_eq!(stats.total_trades, 0);
}
