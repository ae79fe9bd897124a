/*!
Market Radar: scans the exchange for snipable political/news-driven markets,
scores and ranks them, and caches the result for the Listener and Executor.
*/

use crate::config::RadarConfig;
use crate::models::{Category, Market, RawEvent, ScoreBreakdown, Urgency};
use crate::publisher::SignalSink;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Tweet, &["tweet", "post", "twitter", "x.com"]),
    (Category::Speech, &["speech", "address", "rally", "speak at"]),
    (
        Category::Announcement,
        &["announce", "reveal", "disclose", "unveil"],
    ),
    (
        Category::Interview,
        &["interview", "appearance", "podcast", "show"],
    ),
    (
        Category::Statement,
        &["statement", "declare", "proclaim", "press conference"],
    ),
    (
        Category::Reaction,
        &["respond", "react", "comment on", "reply"],
    ),
    (Category::Action, &["do", "will", "happen", "occur"]),
];

const POLITICAL_FIGURES: &[(&[&str], &str)] = &[
    (&["trump", "donald trump"], "Trump"),
    (&["biden", "joe biden"], "Biden"),
    (&["elon", "musk", "elon musk"], "Elon Musk"),
    (&["putin", "vladimir putin"], "Putin"),
];

struct CacheState {
    markets: Vec<Market>,
    fetched_at: Option<Instant>,
}

pub struct MarketRadar {
    config: RadarConfig,
    client: reqwest::Client,
    cache: RwLock<CacheState>,
    refresh_lock: Mutex<()>,
    notified_critical: Mutex<HashSet<String>>,
    sink: Arc<dyn SignalSink>,
}

impl MarketRadar {
    pub fn new(config: RadarConfig, sink: Arc<dyn SignalSink>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .expect("radar http client");

        Self {
            config,
            client,
            cache: RwLock::new(CacheState {
                markets: Vec::new(),
                fetched_at: None,
            }),
            refresh_lock: Mutex::new(()),
            notified_critical: Mutex::new(HashSet::new()),
            sink,
        }
    }

    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        cache.markets.clear();
        cache.fetched_at = None;
    }

    fn is_cache_valid(cache: &CacheState, ttl: Duration) -> bool {
        cache
            .fetched_at
            .is_some_and(|t| t.elapsed() < ttl)
    }

    /// Returns enriched, ranked markets. Never propagates upstream failures;
    /// a failed refresh leaves the previous cache in place.
    pub async fn scan(&self, use_cache: bool) -> Vec<Market> {
        let ttl = Duration::from_secs(self.config.cache_ttl_seconds);

        if use_cache {
            let cache = self.cache.read().await;
            if Self::is_cache_valid(&cache, ttl) {
                return cache.markets.clone();
            }
        }

        // Coalesce concurrent refreshes: only the first caller does the work,
        // everyone else waits for it and reads the resulting cache.
        let _guard = self.refresh_lock.lock().await;
        {
            let cache = self.cache.read().await;
            if Self::is_cache_valid(&cache, ttl) {
                return cache.markets.clone();
            }
        }

        let fresh = self.refresh().await;
        let mut cache = self.cache.write().await;
        if !fresh.is_empty() || cache.fetched_at.is_none() {
            cache.markets = fresh;
            cache.fetched_at = Some(Instant::now());
        }
        cache.markets.clone()
    }

    async fn refresh(&self) -> Vec<Market> {
        let mut by_id = std::collections::HashMap::new();
        for query in &self.config.search_queries {
            let events = self.search(query, self.config.search_limit).await;
            for event in events {
                by_id.entry(event.id.clone()).or_insert(event);
            }
        }

        let mut markets: Vec<Market> = Vec::new();
        for raw in by_id.into_values() {
            let market = self.enrich(raw);
            if self.is_snipable(&market) {
                markets.push(market);
            }
        }

        markets.sort_by(|a, b| b.snipe_score.partial_cmp(&a.snipe_score).unwrap());

        for market in &markets {
            if market.urgency_rate >= 90 {
                self.maybe_fire_critical_alert(market).await;
            }
        }

        info!(count = markets.len(), "radar scan completed");
        markets
    }

    pub async fn search(&self, query: &str, limit: u32) -> Vec<RawEvent> {
        let url = format!("{}/events", self.config.exchange_base_url);
        let limit_str = limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("active", "true"),
                ("closed", "false"),
                ("archived", "false"),
                ("limit", limit_str.as_str()),
                ("query", query),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, query, "radar search request failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), query, "radar search returned error status");
            return Vec::new();
        }

        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, query, "radar search returned invalid json");
                return Vec::new();
            }
        };

        let array = body
            .as_array()
            .cloned()
            .or_else(|| body.get("data").and_then(|d| d.as_array()).cloned())
            .unwrap_or_default();

        array
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<RawEvent>(v) {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!(error = %e, "dropping malformed event");
                    None
                }
            })
            .collect()
    }

    fn enrich(&self, raw: RawEvent) -> Market {
        let haystack = format!("{} {}", raw.title, raw.description).to_lowercase();
        let category = categorize(&haystack);
        let persons = detect_persons(&haystack);
        let volume = coerce_numeric(&raw.volume);
        let liquidity = coerce_numeric(&raw.liquidity);
        let end_date = raw.end_date.as_deref().and_then(parse_iso8601);
        // Unclamped: a market due later today has a raw delta of 0, which must
        // still land in the "critical" branch below, not the "expired" one.
        // Only a genuinely negative delta (end date already passed) is expired.
        let raw_days_remaining = end_date.map(|end| (end - Utc::now()).num_days());
        let days_remaining = raw_days_remaining.map(|d| d.max(0));

        let urgency = urgency_bucket(raw_days_remaining);
        let urgency_rate = urgency_rate_discretized(raw_days_remaining);

        let has_quote = !crate::models::extract_quoted(&raw.title).is_empty();
        let trigger_clarity = trigger_clarity_score(category, has_quote, &raw.title);
        let monitorability = monitorability_score(category);
        let reaction_speed = reaction_speed_score(category, raw_days_remaining);
        let urgency_sub = urgency_sub_score(raw_days_remaining, end_date.is_none());
        let volume_score = (volume / 100_000.0).min(1.0);
        let liquidity_score = (liquidity / 50_000.0).min(1.0);

        let snipe_score = 0.30 * trigger_clarity
            + 0.25 * monitorability
            + 0.20 * reaction_speed
            + 0.15 * urgency_sub
            + 0.05 * volume_score
            + 0.05 * liquidity_score;

        let url = format!("https://polymarket.com/event/{}", raw.slug);

        Market {
            id: raw.id,
            title: raw.title,
            description: raw.description,
            slug: raw.slug,
            url,
            image: raw.image,
            end_date,
            volume,
            liquidity,
            category,
            persons,
            days_remaining,
            urgency,
            urgency_rate,
            snipe_score,
            score_breakdown: ScoreBreakdown {
                trigger_clarity,
                monitorability,
                reaction_speed,
                urgency: urgency_sub,
            },
            is_favorite: false,
            priority_boost: 1.0,
        }
    }

    fn is_snipable(&self, m: &Market) -> bool {
        if m.urgency == Urgency::Expired {
            return false;
        }
        if m.snipe_score < 0.20 {
            return false;
        }
        if m.volume < 500.0 {
            return false;
        }
        if m.score_breakdown.trigger_clarity < 0.20 {
            return false;
        }
        match m.days_remaining {
            Some(d) if d > 120 => return false,
            _ => {}
        }
        true
    }

    async fn maybe_fire_critical_alert(&self, market: &Market) {
        let mut notified = self.notified_critical.lock().await;
        if notified.contains(&market.id) {
            return;
        }
        notified.insert(market.id.clone());
        drop(notified);

        debug!(market_id = %market.id, "firing critical snipe alert");
        self.sink
            .emit(
                crate::models::SignalType::CriticalSnipe,
                &market.id,
                crate::models::Side::Yes,
                1.0,
                serde_json::json!({ "title": market.title, "urgency_rate": market.urgency_rate }),
            )
            .await;
    }

    pub async fn by_person(&self, name: &str) -> Vec<Market> {
        let needle = name.to_lowercase();
        self.scan(true)
            .await
            .into_iter()
            .filter(|m| m.persons.iter().any(|p| p.to_lowercase() == needle))
            .collect()
    }

    pub async fn by_category(&self, category: Category) -> Vec<Market> {
        self.scan(true)
            .await
            .into_iter()
            .filter(|m| m.category == category)
            .collect()
    }

    pub async fn by_urgency(&self, min: Urgency) -> Vec<Market> {
        self.scan(true)
            .await
            .into_iter()
            .filter(|m| m.urgency >= min)
            .collect()
    }
}

fn categorize(haystack: &str) -> Category {
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|kw| haystack.contains(kw)) {
            return *category;
        }
    }
    Category::Other
}

fn detect_persons(haystack: &str) -> Vec<String> {
    let mut found = Vec::new();
    for (tokens, canonical) in POLITICAL_FIGURES {
        if tokens.iter().any(|t| haystack.contains(t)) && !found.contains(&canonical.to_string()) {
            found.push(canonical.to_string());
        }
    }
    found
}

fn coerce_numeric(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub fn parse_iso8601(s: &str) -> Option<DateTime<Utc>> {
    let normalized = if s.ends_with('Z') {
        format!("{}+00:00", &s[..s.len() - 1])
    } else {
        s.to_string()
    };
    DateTime::parse_from_rfc3339(&normalized)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn urgency_bucket(days_remaining: Option<i64>) -> Urgency {
    match days_remaining {
        None => Urgency::Unknown,
        Some(d) if d <= 0 => Urgency::Expired,
        Some(d) if d <= 1 => Urgency::Critical,
        Some(d) if d <= 7 => Urgency::High,
        Some(d) if d <= 30 => Urgency::Medium,
        _ => Urgency::Low,
    }
}

fn urgency_rate_discretized(days_remaining: Option<i64>) -> u32 {
    match days_remaining {
        None => 0,
        Some(d) if d <= 0 => 0,
        Some(d) if d <= 1 => 100,
        Some(d) if d <= 7 => 90,
        Some(d) if d <= 30 => 70,
        Some(d) if d <= 90 => 40,
        _ => 10,
    }
}

fn trigger_clarity_score(category: Category, has_quote: bool, title: &str) -> f64 {
    match category {
        Category::Tweet if has_quote => 1.0,
        Category::Tweet => 0.9,
        Category::Speech | Category::Announcement | Category::Statement if has_quote => 0.9,
        Category::Speech | Category::Announcement | Category::Statement => 0.7,
        _ if title.to_lowercase().contains("before") || title.to_lowercase().contains("by ") => {
            0.6
        }
        _ => 0.3,
    }
}

fn monitorability_score(category: Category) -> f64 {
    match category {
        Category::Tweet => 1.0,
        Category::Announcement | Category::Statement => 0.8,
        Category::Speech => 0.7,
        Category::Interview => 0.6,
        Category::Action => 0.4,
        _ => 0.3,
    }
}

fn reaction_speed_score(category: Category, days_remaining: Option<i64>) -> f64 {
    match category {
        Category::Tweet => 1.0,
        Category::Announcement | Category::Statement | Category::Speech => 0.7,
        _ if days_remaining.is_some_and(|d| d > 30) => 0.2,
        _ => 0.5,
    }
}

fn urgency_sub_score(days_remaining: Option<i64>, unparseable: bool) -> f64 {
    if unparseable {
        return 0.3;
    }
    match days_remaining {
        None => 0.3,
        Some(d) if d <= 0 => 0.0,
        Some(d) if d <= 1 => 1.0,
        Some(d) if d <= 7 => 0.9,
        Some(d) if d <= 30 => 0.7,
        Some(d) if d <= 90 => 0.4,
        _ => 0.1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorizes_tweet_before_other_keywords() {
        assert_eq!(categorize("will he tweet about it"), Category::Tweet);
        assert_eq!(categorize("a press conference today"), Category::Statement);
        assert_eq!(categorize("nothing special happening"), Category::Action);
    }

    #[test]
    fn detects_canonical_persons_only() {
        let persons = detect_persons("donald trump and xi jinping spoke");
        assert_eq!(persons, vec!["Trump".to_string()]);
    }

    #[test]
    fn coerces_string_numbers() {
        assert_eq!(coerce_numeric(&Value::String("12345".to_string())), 12345.0);
        assert_eq!(coerce_numeric(&Value::String("garbage".to_string())), 0.0);
    }

    #[test]
    fn basic_enrichment_matches_expected_snipe_score() {
        let raw = RawEvent {
            id: "1".to_string(),
            title: "Will Trump tweet 'MAGA' before Friday?".to_string(),
            slug: "trump-maga".to_string(),
            description: String::new(),
            volume: Value::String("12345".to_string()),
            liquidity: Value::Number(serde_json::Number::from(0)),
            created_at: None,
            end_date: Some((Utc::now() + chrono::Duration::days(3)).to_rfc3339()),
            image: String::new(),
            markets: Vec::new(),
        };

        let sink: Arc<dyn SignalSink> = Arc::new(crate::publisher::NullSink);
        let radar = MarketRadar::new(RadarConfig::default(), sink);
        let market = radar.enrich(raw);

        assert_eq!(market.category, Category::Tweet);
        assert_eq!(market.persons, vec!["Trump".to_string()]);
        assert_eq!(market.urgency, Urgency::High);
        assert_eq!(market.urgency_rate, 90);
        assert!((market.snipe_score - 0.894).abs() < 0.01);
        assert!(radar.is_snipable(&market));
    }

    #[tokio::test]
    async fn search_parses_bare_array_response() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .and(query_param("query", "trump elon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "42", "title": "Will Trump speak?", "slug": "x", "description": ""}
            ])))
            .mount(&mock_server)
            .await;

        let mut config = RadarConfig::default();
        config.exchange_base_url = mock_server.uri();
        let sink: Arc<dyn SignalSink> = Arc::new(crate::publisher::NullSink);
        let radar = MarketRadar::new(config, sink);

        let events = radar.search("trump elon", 10).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "42");
    }

    #[tokio::test]
    async fn search_parses_data_wrapped_response() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": "7", "title": "Will Biden announce?", "slug": "y", "description": ""}]
            })))
            .mount(&mock_server)
            .await;

        let mut config = RadarConfig::default();
        config.exchange_base_url = mock_server.uri();
        let sink: Arc<dyn SignalSink> = Arc::new(crate::publisher::NullSink);
        let radar = MarketRadar::new(config, sink);

        let events = radar.search("anything", 10).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "7");
    }

    #[tokio::test]
    async fn search_degrades_to_empty_on_error_status() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let mut config = RadarConfig::default();
        config.exchange_base_url = mock_server.uri();
        let sink: Arc<dyn SignalSink> = Arc::new(crate::publisher::NullSink);
        let radar = MarketRadar::new(config, sink);

        assert!(radar.search("anything", 10).await.is_empty());
    }

    #[test]
    fn due_later_today_is_critical_not_expired() {
        let raw = RawEvent {
            id: "2".to_string(),
            title: "Will Trump speak today?".to_string(),
            slug: "trump-today".to_string(),
            description: String::new(),
            volume: Value::String("10000".to_string()),
            liquidity: Value::Number(serde_json::Number::from(0)),
            created_at: None,
            end_date: Some((Utc::now() + chrono::Duration::hours(2)).to_rfc3339()),
            image: String::new(),
            markets: Vec::new(),
        };

        let sink: Arc<dyn SignalSink> = Arc::new(crate::publisher::NullSink);
        let radar = MarketRadar::new(RadarConfig::default(), sink);
        let market = radar.enrich(raw);

        assert_eq!(market.days_remaining, Some(0));
        assert_eq!(market.urgency, Urgency::Critical);
        assert_eq!(market.score_breakdown.urgency, 1.0);
        assert!(radar.is_snipable(&market));
    }

    #[test]
    fn past_due_is_expired_and_unsnipable() {
        let raw = RawEvent {
            id: "3".to_string(),
            title: "Did Trump speak yesterday?".to_string(),
            slug: "trump-yesterday".to_string(),
            description: String::new(),
            volume: Value::String("10000".to_string()),
            liquidity: Value::Number(serde_json::Number::from(0)),
            created_at: None,
            end_date: Some((Utc::now() - chrono::Duration::days(1)).to_rfc3339()),
            image: String::new(),
            markets: Vec::new(),
        };

        let sink: Arc<dyn SignalSink> = Arc::new(crate::publisher::NullSink);
        let radar = MarketRadar::new(RadarConfig::default(), sink);
        let market = radar.enrich(raw);

        assert_eq!(market.urgency, Urgency::Expired);
        assert!(!radar.is_snipable(&market));
    }
}
