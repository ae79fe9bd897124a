/*!
Paper-trading portfolio: a single in-memory account tracking open and closed
positions against a starting balance. Distinct from a real-wallet balance
monitor: every trade here is simulated.
*/

use crate::models::{Outcome, PortfolioStats, Side};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Position {
    side: Side,
    size: f64,
    confidence: f64,
    status: Status,
    outcome: Option<Outcome>,
    payout: Option<f64>,
    profit: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Open,
    Closed,
}

struct State {
    available_balance: f64,
    positions: HashMap<String, Position>,
    total_trades: u64,
    winning_trades: u64,
    losing_trades: u64,
    total_profit: f64,
}

pub struct Portfolio {
    initial_capital: f64,
    state: Mutex<State>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            state: Mutex::new(State {
                available_balance: initial_capital,
                positions: HashMap::new(),
                total_trades: 0,
                winning_trades: 0,
                losing_trades: 0,
                total_profit: 0.0,
            }),
        }
    }

    pub async fn can_trade(&self, size: f64) -> bool {
        self.state.lock().await.available_balance >= size
    }

    /// `base=balance*0.02`; `mult=max(1, confidence/0.5)`; clamp to [$10, balance*0.05].
    pub async fn calculate_position_size(&self, confidence: f64, base_pct: f64, max_pct: f64, min_bet: f64) -> f64 {
        let balance = self.state.lock().await.available_balance;
        let base = balance * base_pct;
        let multiplier = (confidence / 0.5).max(1.0);
        let adjusted = base * multiplier;
        let ceiling = balance * max_pct;
        adjusted.max(min_bet).min(ceiling)
    }

    pub async fn open_position(
        &self,
        market_id: &str,
        side: Side,
        size: f64,
        confidence: f64,
    ) -> bool {
        let mut state = self.state.lock().await;
        if state.available_balance < size {
            return false;
        }
        state.available_balance -= size;
        state.total_trades += 1;
        state.positions.insert(
            market_id.to_string(),
            Position {
                side,
                size,
                confidence,
                status: Status::Open,
                outcome: None,
                payout: None,
                profit: None,
            },
        );
        true
    }

    pub async fn close_position(
        &self,
        market_id: &str,
        outcome: Outcome,
        payout: Option<f64>,
    ) -> Option<f64> {
        let mut state = self.state.lock().await;
        let position = state.positions.get(market_id)?.clone();
        if position.status != Status::Open {
            return None;
        }

        let payout = payout.unwrap_or(match outcome {
            Outcome::Win => position.size * 2.0,
            Outcome::Loss => 0.0,
        });
        let profit = payout - position.size;

        state.available_balance += payout;
        state.total_profit += profit;
        match outcome {
            Outcome::Win => state.winning_trades += 1,
            Outcome::Loss => state.losing_trades += 1,
        }

        if let Some(p) = state.positions.get_mut(market_id) {
            p.status = Status::Closed;
            p.outcome = Some(outcome);
            p.payout = Some(payout);
            p.profit = Some(profit);
        }

        Some(profit)
    }

    pub async fn stats(&self) -> PortfolioStats {
        let state = self.state.lock().await;
        let open_sizes: f64 = state
            .positions
            .values()
            .filter(|p| p.status == Status::Open)
            .map(|p| p.size)
            .sum();
        let total_value = state.available_balance + open_sizes;
        let win_rate = if state.total_trades > 0 {
            state.winning_trades as f64 / state.total_trades as f64 * 100.0
        } else {
            0.0
        };
        let roi = (total_value - self.initial_capital) / self.initial_capital * 100.0;

        PortfolioStats {
            initial_capital: self.initial_capital,
            available_balance: state.available_balance,
            total_value,
            open_positions: state.positions.values().filter(|p| p.status == Status::Open).count(),
            total_trades: state.total_trades,
            winning_trades: state.winning_trades,
            losing_trades: state.losing_trades,
            win_rate,
            total_profit: state.total_profit,
            roi,
        }
    }

    #[cfg(test)]
    async fn available_balance(&self) -> f64 {
        self.state.lock().await.available_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn win_then_stats_round_trip() {
        let portfolio = Portfolio::new(10_000.0);
        assert!(portfolio.open_position("m1", Side::Yes, 200.0, 0.7).await);
        assert_eq!(portfolio.available_balance().await, 9_800.0);

        let profit = portfolio.close_position("m1", Outcome::Win, None).await;
        assert_eq!(profit, Some(200.0));
        assert_eq!(portfolio.available_balance().await, 10_200.0);

        let stats = portfolio.stats().await;
        assert_eq!(stats.winning_trades, 1);
        assert_eq!(stats.win_rate, 100.0);
        assert_eq!(stats.total_profit, 200.0);
    }

    #[tokio::test]
    async fn cannot_open_beyond_balance() {
        let portfolio = Portfolio::new(100.0);
        assert!(!portfolio.can_trade(200.0).await);
        assert!(!portfolio.open_position("m1", Side::Yes, 200.0, 0.9).await);
    }
}
