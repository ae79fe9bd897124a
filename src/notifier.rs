/*!
Messenger channel: best-effort Telegram notifications for critical snipes,
new-market alerts, trade confirmations, and news matches.
*/

use crate::config::MessengerConfig;
use crate::models::{TradingError, TradingResult};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct Notifier {
    client: reqwest::Client,
    config: MessengerConfig,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

impl Notifier {
    pub fn new(config: MessengerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("notifier http client");

        if config.enabled() {
            info!("telegram notifier enabled");
        } else {
            warn!("telegram notifier disabled: missing bot token or chat id");
        }

        Self { client, config }
    }

    pub async fn send_message(&self, text: &str) -> TradingResult<bool> {
        let (Some(token), Some(chat_id)) =
            (self.config.bot_token.as_deref(), self.config.chat_id.as_deref())
        else {
            debug!("notifier disabled, dropping message");
            return Ok(false);
        };

        let url = format!("{}/bot{}/sendMessage", self.config.base_url, token);
        let body = SendMessageRequest {
            chat_id,
            text: text.to_string(),
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(TradingError::from)?;

        let ok = response.status().is_success();
        if !ok {
            warn!(status = %response.status(), "telegram send failed");
        }
        Ok(ok)
    }

    pub async fn send_critical_market_alert(
        &self,
        market_id: &str,
        title: &str,
    ) -> TradingResult<bool> {
        let text = format!(
            "🚨 <b>CRITICAL SNIPE</b>\n{}\n<a href=\"https://polymarket.com/event/{}\">view market</a>",
            title, market_id
        );
        self.send_message(&text).await
    }

    pub async fn send_new_market_alert(&self, title: &str) -> TradingResult<bool> {
        let text = format!("🆕 <b>New market detected</b>\n{title}");
        self.send_message(&text).await
    }

    pub async fn send_trade_alert(
        &self,
        market_title: &str,
        side: &str,
        size: f64,
    ) -> TradingResult<bool> {
        let text = format!("💰 <b>Paper trade opened</b>\n{market_title}\nside={side} size=${size:.2}");
        self.send_message(&text).await
    }

    pub async fn send_news_alert(&self, market_title: &str, snippet: &str) -> TradingResult<bool> {
        let text = format!("📰 <b>{market_title}</b>\n{snippet}");
        self.send_message(&text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_notifier_returns_false_without_sending() {
        let notifier = Notifier::new(MessengerConfig::default());
        assert_eq!(notifier.send_message("hello").await.unwrap(), false);
    }

    #[tokio::test]
    async fn enabled_notifier_posts_and_reports_success() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST_TOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let config = MessengerConfig {
            base_url: mock_server.uri(),
            bot_token: Some("TEST_TOKEN".to_string()),
            chat_id: Some("12345".to_string()),
            ..MessengerConfig::default()
        };
        let notifier = Notifier::new(config);
        assert_eq!(notifier.send_message("hello").await.unwrap(), true);
    }

    #[tokio::test]
    async fn enabled_notifier_reports_failure_on_error_status() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST_TOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let config = MessengerConfig {
            base_url: mock_server.uri(),
            bot_token: Some("TEST_TOKEN".to_string()),
            chat_id: Some("12345".to_string()),
            ..MessengerConfig::default()
        };
        let notifier = Notifier::new(config);
        assert_eq!(notifier.send_message("hello").await.unwrap(), false);
    }
}
