/*!
Signal Listener: polls social handles and news feeds implied by the active
market set, matches fresh content against each market's trigger keywords,
and on a hit opens a paper trade through the Executor.
*/

use crate::config::ListenerConfig;
use crate::executor::{Executor, ExecutionOutcome};
use crate::models::{Market, SignalContext, SignalType};
use crate::publisher::SignalSink;
use crate::radar::MarketRadar;
use crate::store::Store;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct Post {
    pub link: String,
    pub text: String,
}

#[async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_recent(&self, handle: &str, count: u32) -> Vec<Post>;
}

pub struct HttpPostSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPostSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[derive(serde::Deserialize)]
struct TweetsResponse {
    #[serde(default)]
    tweets: Vec<TweetEntry>,
}

#[derive(serde::Deserialize)]
struct TweetEntry {
    link: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl PostSource for HttpPostSource {
    async fn fetch_recent(&self, handle: &str, count: u32) -> Vec<Post> {
        let url = format!("{}/{}", self.base_url, handle);
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, handle, "failed to fetch social posts");
                return Vec::new();
            }
        };
        let parsed: TweetsResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, handle, "failed to parse social feed response");
                return Vec::new();
            }
        };
        parsed
            .tweets
            .into_iter()
            .take(count as usize)
            .map(|t| Post { link: t.link, text: t.text })
            .collect()
    }
}

fn handles_for_persons(persons: &[String]) -> Vec<String> {
    let mut handles = Vec::new();
    for person in persons {
        let handle = match person.as_str() {
            "Trump" => Some("realDonaldTrump"),
            "Elon Musk" => Some("elonmusk"),
            "Biden" => Some("POTUS"),
            _ => None,
        };
        if let Some(h) = handle {
            if !handles.contains(&h.to_string()) {
                handles.push(h.to_string());
            }
        }
    }
    handles
}

struct SeenSet {
    last_seen: HashMap<String, DateTime<Utc>>,
    cap: usize,
    prune_to: usize,
    max_age_hours: i64,
}

impl SeenSet {
    fn new(cap: usize, prune_to: usize, max_age_hours: i64) -> Self {
        Self {
            last_seen: HashMap::new(),
            cap,
            prune_to,
            max_age_hours,
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.last_seen.contains_key(key)
    }

    fn record(&mut self, key: String) {
        self.last_seen.insert(key, Utc::now());
        if self.last_seen.len() > self.cap {
            self.prune();
        }
    }

    fn prune(&mut self) {
        let cutoff = Utc::now() - chrono::Duration::hours(self.max_age_hours);
        self.last_seen.retain(|_, t| *t >= cutoff);

        if self.last_seen.len() > self.prune_to {
            let mut entries: Vec<(String, DateTime<Utc>)> =
                self.last_seen.iter().map(|(k, v)| (k.clone(), *v)).collect();
            entries.sort_by_key(|(_, t)| *t);
            let drop_count = entries.len() - self.prune_to;
            for (key, _) in entries.into_iter().take(drop_count) {
                self.last_seen.remove(&key);
            }
        }
    }
}

struct ListenerState {
    active_markets: Vec<Market>,
    global_keywords: Vec<String>,
    cycle_count: u64,
    seen_posts: SeenSet,
    seen_news: SeenSet,
}

pub struct Listener {
    config: ListenerConfig,
    radar: Arc<MarketRadar>,
    store: Arc<Store>,
    executor: Arc<Executor>,
    sink: Arc<dyn SignalSink>,
    post_source: Arc<dyn PostSource>,
    running: AtomicBool,
    state: Mutex<ListenerState>,
}

impl Listener {
    pub fn new(
        config: ListenerConfig,
        radar: Arc<MarketRadar>,
        store: Arc<Store>,
        executor: Arc<Executor>,
        sink: Arc<dyn SignalSink>,
        post_source: Arc<dyn PostSource>,
    ) -> Self {
        let seen_posts = SeenSet::new(config.seen_cap, config.seen_prune_to, config.seen_max_age_hours);
        let seen_news = SeenSet::new(config.seen_cap, config.seen_prune_to, config.seen_max_age_hours);
        Self {
            config,
            radar,
            store,
            executor,
            sink,
            post_source,
            running: AtomicBool::new(false),
            state: Mutex::new(ListenerState {
                active_markets: Vec::new(),
                global_keywords: Vec::new(),
                cycle_count: 0,
                seen_posts,
                seen_news,
            }),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub async fn run(self: Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);
        while self.running.load(Ordering::SeqCst) {
            let cycle_failed = self.run_cycle().await.is_err();
            let sleep_for = if cycle_failed {
                self.config.error_recovery_seconds
            } else {
                self.config.cycle_interval_seconds
            };
            tokio::time::sleep(std::time::Duration::from_secs(sleep_for)).await;
        }
    }

    async fn run_cycle(&self) -> Result<(), ()> {
        let cycle_count = {
            let mut state = self.state.lock().await;
            state.cycle_count += 1;
            state.cycle_count
        };

        if cycle_count % self.config.target_refresh_cycles == 0 || cycle_count == 1 {
            self.refresh_targets().await;
        }

        let markets = self.state.lock().await.active_markets.clone();
        let persons: Vec<String> = markets.iter().flat_map(|m| m.persons.clone()).collect();
        let handles = handles_for_persons(&persons);

        for handle in &handles {
            let posts = self.post_source.fetch_recent(handle, self.config.posts_per_handle).await;
            for post in posts {
                let is_new = {
                    let mut state = self.state.lock().await;
                    if state.seen_posts.contains(&post.link) {
                        false
                    } else {
                        state.seen_posts.record(post.link.clone());
                        true
                    }
                };
                if is_new {
                    self.analyze_content(&post.text, "twitter", handle, &post.link).await;
                }
            }
        }

        for feed_url in &self.config.rss_feeds {
            let entries = fetch_feed_entries(feed_url, self.config.news_entries_per_feed).await;
            for entry in entries {
                let is_new = {
                    let mut state = self.state.lock().await;
                    if state.seen_news.contains(&entry.link) {
                        false
                    } else {
                        state.seen_news.record(entry.link.clone());
                        true
                    }
                };
                if is_new {
                    self.analyze_content(&entry.text, "rss", feed_url, &entry.link).await;
                }
            }
        }

        Ok(())
    }

    async fn refresh_targets(&self) {
        let mut markets = self.radar.scan(true).await;
        let favorites = self.store.list_favorites().await;
        let favorite_ids: std::collections::HashSet<String> =
            favorites.iter().map(|f| f.market_id.clone()).collect();
        for market in &mut markets {
            market.is_favorite = favorite_ids.contains(&market.id);
            if let Some(fav) = favorites.iter().find(|f| f.market_id == market.id) {
                market.priority_boost = fav.priority_boost;
            }
        }
        markets.sort_by(|a, b| {
            b.is_favorite
                .cmp(&a.is_favorite)
                .then(b.snipe_score.partial_cmp(&a.snipe_score).unwrap())
        });

        let keywords = self.store.get_global_keywords().await;

        let mut state = self.state.lock().await;
        state.active_markets = markets;
        state.global_keywords = keywords;
        debug!(count = state.active_markets.len(), "refreshed listener targets");
    }

    async fn analyze_content(&self, content: &str, source: &str, source_name: &str, link: &str) {
        let markets = self.state.lock().await.active_markets.clone();
        let global_keywords = self.state.lock().await.global_keywords.clone();
        let lower_content = content.to_lowercase();

        for market in &markets {
            let keywords = market.trigger_keywords();
            let matched = if market.is_favorite {
                !keywords.is_empty() && keywords.iter().any(|k| lower_content.contains(k.as_str()))
            } else if !keywords.is_empty() {
                keywords.iter().all(|k| lower_content.contains(k.as_str()))
            } else {
                false
            };

            let global_match = !matched
                && global_keywords.iter().any(|k| lower_content.contains(k.as_str()))
                && market
                    .persons
                    .iter()
                    .any(|p| lower_content.contains(&p.to_lowercase()));

            if matched || global_match {
                self.trigger_snipe(market, content, source, source_name, link, &keywords).await;
            }
        }
    }

    async fn trigger_snipe(
        &self,
        market: &Market,
        content: &str,
        source: &str,
        source_name: &str,
        link: &str,
        keywords_matched: &[String],
    ) {
        info!(market_id = %market.id, source, "listener match triggered");

        let magnitude = (market.snipe_score * market.priority_boost).min(1.0);
        self.sink
            .emit(
                SignalType::ListenerMatch,
                &market.id,
                crate::executor::Executor::determine_side(content),
                magnitude,
                serde_json::json!({ "source": source, "source_name": source_name, "link": link }),
            )
            .await;

        let ctx = SignalContext {
            source: source.to_string(),
            author: source_name.to_string(),
            url: link.to_string(),
            content: content.to_string(),
            keywords_matched: keywords_matched.to_vec(),
            timestamp: Some(Utc::now()),
        };

        match self.executor.execute_trade(&ctx, market).await {
            ExecutionOutcome::Opened(trade) => {
                if let Err(e) = self.store.save_paper_trade(&trade).await {
                    error!(error = %e, "failed to persist paper trade");
                }
            }
            ExecutionOutcome::Skipped(reason) => {
                debug!(market_id = %market.id, reason, "executor skipped trade");
            }
        }
    }
}

struct FeedEntry {
    link: String,
    text: String,
}

async fn fetch_feed_entries(feed_url: &str, limit: u32) -> Vec<FeedEntry> {
    let body = match reqwest::get(feed_url).await {
        Ok(r) => match r.text().await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, feed_url, "failed to read rss feed body");
                return Vec::new();
            }
        },
        Err(e) => {
            warn!(error = %e, feed_url, "failed to fetch rss feed");
            return Vec::new();
        }
    };

    let channel = match rss::Channel::read_from(body.as_bytes()) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, feed_url, "failed to parse rss feed");
            return Vec::new();
        }
    };

    channel
        .items()
        .iter()
        .take(limit as usize)
        .filter_map(|item| {
            let link = item.link()?.to_string();
            let title = item.title().unwrap_or_default();
            let summary = item.description().unwrap_or_default();
            Some(FeedEntry {
                link,
                text: format!("{title} {summary}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_known_handles() {
        let handles = handles_for_persons(&["Trump".to_string(), "Elon Musk".to_string()]);
        assert_eq!(handles, vec!["realDonaldTrump".to_string(), "elonmusk".to_string()]);
    }

    #[test]
    fn seen_set_dedups_and_prunes() {
        let mut set = SeenSet::new(3, 2, 24);
        set.record("a".to_string());
        set.record("b".to_string());
        assert!(set.contains("a"));
        set.record("c".to_string());
        set.record("d".to_string());
        assert!(set.last_seen.len() <= 3);
    }

    #[tokio::test]
    async fn fetch_recent_parses_tweets_json() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/elonmusk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tweets": [
                    {"link": "https://x.com/elonmusk/status/1", "text": "Dogecoin to the moon"},
                    {"link": "https://x.com/elonmusk/status/2", "text": "another post"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let source = HttpPostSource::new(mock_server.uri());
        let posts = source.fetch_recent("elonmusk", 5).await;
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].link, "https://x.com/elonmusk/status/1");
        assert_eq!(posts[0].text, "Dogecoin to the moon");
    }

    #[tokio::test]
    async fn fetch_recent_degrades_to_empty_on_malformed_body() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/elonmusk"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let source = HttpPostSource::new(mock_server.uri());
        assert!(source.fetch_recent("elonmusk", 5).await.is_empty());
    }

    #[tokio::test]
    async fn fetch_feed_entries_parses_rss() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let rss_body = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<title>Test Feed</title>
<item>
<title>Trump announces something</title>
<link>https://news.example/1</link>
<description>details here</description>
</item>
</channel></rss>"#;

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(rss_body))
            .mount(&mock_server)
            .await;

        let feed_url = format!("{}/feed", mock_server.uri());
        let entries = fetch_feed_entries(&feed_url, 10).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://news.example/1");
        assert!(entries[0].text.contains("Trump announces something"));
    }
}
