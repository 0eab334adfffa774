//! Upstream fetch orchestration.
//!
//! One search fans out into an ordered plan of (URL variant x user agent)
//! pairs, tried strictly in sequence so a bot-check on an early attempt can
//! short-circuit the rest. Every attempt has its own hard timeout, the whole
//! plan has an overall budget, and attempts after the first are spaced by a
//! jittered, growing delay. The orchestrator classifies every way a fetch
//! can go wrong into a `FailReason` instead of surfacing errors.

use crate::extract;
use crate::models::{FailReason, FetchOutcome};
use anyhow::{Context, Result};
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Desktop Chrome first: historically the most successful combination
pub const USER_AGENTS: [&str; 2] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Human-verification phrases; any hit aborts the whole plan
const BOT_CHECK_MARKERS: [&str; 4] = [
    "verify you're a human",
    "captcha",
    "robot",
    "to continue, please",
];

/// Immutable orchestrator configuration, injected at construction so tests
/// can run with fake plans and short timings
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agents: Vec<String>,
    /// Hard cap per attempt; the in-flight request is cancelled on expiry
    pub attempt_timeout: Duration,
    /// Budget for the whole plan, strictly above one attempt so a fallback
    /// variant still gets a chance
    pub overall_budget: Duration,
    pub backoff_base: Duration,
    pub backoff_jitter: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agents: USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            attempt_timeout: Duration::from_secs(14),
            overall_budget: Duration::from_secs(40),
            backoff_base: Duration::from_millis(400),
            backoff_jitter: Duration::from_millis(500),
        }
    }
}

/// What one plan execution reports back
#[derive(Debug)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    /// URLs tried, in order, for `meta.upstream`
    pub tried: Vec<String>,
    /// Variant in flight when a terminal failure hit
    pub last_tried: Option<String>,
    /// User agent of the winning attempt, reused for pagination
    pub winning_ua: Option<String>,
}

/// Raw classification of a single attempt, before plan-level policy
#[derive(Debug)]
enum Attempt {
    Html(String),
    /// 2xx but the cascade found nothing in it
    Empty,
    BotCheck,
    RateLimited,
    BadStatus(u16),
    TimedOut,
    NetworkFailed,
}

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        Self::with_config(FetchConfig::default())
    }

    pub fn with_config(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.attempt_timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, config })
    }

    /// Run the resilience plan: every (variant, user agent) pair in order
    /// until one returns HTML the cascade can parse
    pub async fn fetch_listings(&self, url_variants: &[String]) -> FetchReport {
        let deadline = Instant::now() + self.config.overall_budget;
        let plan = build_plan(url_variants, &self.config.user_agents);

        let mut tried = Vec::new();
        let mut saw_empty_parse = false;
        let mut saw_timeout = false;
        let mut saw_bad_status = false;

        for (index, (url, ua)) in plan.iter().enumerate() {
            if Instant::now() >= deadline {
                warn!("overall fetch budget exhausted after {} attempts", index);
                return FetchReport {
                    outcome: FetchOutcome::Failure {
                        reason: FailReason::Timeout,
                    },
                    tried,
                    last_tried: None,
                    winning_ua: None,
                };
            }

            if index > 0 {
                tokio::time::sleep(backoff_delay(&self.config, index)).await;
            }

            tried.push(url.clone());
            debug!(url = url.as_str(), attempt = index + 1, "trying upstream variant");

            match self.attempt_with_retry(url, ua).await {
                Attempt::Html(html) => {
                    info!(url = url.as_str(), bytes = html.len(), "upstream fetch succeeded");
                    return FetchReport {
                        outcome: FetchOutcome::Success {
                            html,
                            url: url.clone(),
                        },
                        tried,
                        last_tried: None,
                        winning_ua: Some(ua.clone()),
                    };
                }
                // Terminal: a challenged session will be challenged again
                Attempt::BotCheck => {
                    warn!(url = url.as_str(), "bot-check detected, aborting plan");
                    return FetchReport {
                        outcome: FetchOutcome::Failure {
                            reason: FailReason::BotCheck,
                        },
                        tried,
                        last_tried: Some(url.clone()),
                        winning_ua: None,
                    };
                }
                Attempt::RateLimited => {
                    warn!(url = url.as_str(), "rate limited upstream");
                    return FetchReport {
                        outcome: FetchOutcome::Failure {
                            reason: FailReason::RateLimited,
                        },
                        tried,
                        last_tried: Some(url.clone()),
                        winning_ua: None,
                    };
                }
                Attempt::Empty => {
                    debug!(url = url.as_str(), "page fetched but parsed empty");
                    saw_empty_parse = true;
                }
                Attempt::TimedOut => {
                    debug!(url = url.as_str(), "attempt timed out");
                    saw_timeout = true;
                }
                Attempt::BadStatus(status) => {
                    debug!(url = url.as_str(), status, "bad upstream status after retry");
                    saw_bad_status = true;
                }
                Attempt::NetworkFailed => {
                    debug!(url = url.as_str(), "network failure");
                    saw_bad_status = true;
                }
            }
        }

        // Exhausted: report the most informative of what was seen
        let reason = if saw_empty_parse {
            FailReason::EmptyParse
        } else if saw_timeout {
            FailReason::Timeout
        } else if saw_bad_status {
            FailReason::UpstreamFailed
        } else {
            FailReason::Exception
        };
        FetchReport {
            outcome: FetchOutcome::Failure { reason },
            tried,
            last_tried: None,
            winning_ua: None,
        }
    }

    /// Fetch additional result pages with an already-validated (variant,
    /// agent) pair. Pages are independent, so these run concurrently; a
    /// failure on one page does not invalidate the others.
    pub async fn fetch_pages(&self, page_urls: &[String], user_agent: &str) -> Vec<String> {
        let fetches = page_urls
            .iter()
            .map(|url| self.attempt(url, user_agent));
        let results = futures::future::join_all(fetches).await;

        results
            .into_iter()
            .zip(page_urls)
            .filter_map(|(attempt, url)| match attempt {
                Attempt::Html(html) => Some(html),
                other => {
                    debug!(url = url.as_str(), ?other, "pagination fetch dropped");
                    None
                }
            })
            .collect()
    }

    /// Single raw request for the debug surface: status and body, no
    /// classification, no retries
    pub async fn probe(&self, url: &str) -> Result<(u16, String)> {
        let ua = self
            .config
            .user_agents
            .first()
            .map(String::as_str)
            .unwrap_or(USER_AGENTS[0]);
        let response = self
            .client
            .get(url)
            .header("user-agent", ua)
            .header("accept-language", "en-US,en;q=0.9")
            .send()
            .await
            .context("Upstream request failed")?;
        let status = response.status().as_u16();
        let body = response.text().await.context("Failed to read body")?;
        Ok((status, body))
    }

    /// One attempt; non-2xx statuses other than 429/403 get exactly one
    /// same-request retry
    async fn attempt_with_retry(&self, url: &str, user_agent: &str) -> Attempt {
        match self.attempt(url, user_agent).await {
            Attempt::BadStatus(_) | Attempt::NetworkFailed => {
                debug!(url, "retrying same request once");
                self.attempt(url, user_agent).await
            }
            other => other,
        }
    }

    async fn attempt(&self, url: &str, user_agent: &str) -> Attempt {
        let request = self
            .client
            .get(url)
            .header("user-agent", user_agent)
            .header(
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("accept-language", "en-US,en;q=0.9")
            .header("referer", "https://www.ebay.com/");

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Attempt::TimedOut,
            Err(e) => {
                debug!(url, error = %e, "request failed");
                return Attempt::NetworkFailed;
            }
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN {
            return Attempt::RateLimited;
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) if e.is_timeout() => return Attempt::TimedOut,
            Err(_) => return Attempt::NetworkFailed,
        };

        // Error pages may mention "robot" (robots.txt and the like) without
        // being a challenge; only a served 2xx body counts as a bot-check
        if !status.is_success() {
            return Attempt::BadStatus(status.as_u16());
        }
        if contains_bot_check(&body) {
            return Attempt::BotCheck;
        }
        if extract::extract(&body).is_empty() {
            return Attempt::Empty;
        }
        Attempt::Html(body)
    }
}

/// Ordered (URL variant x user agent) pairs: all variants under the best
/// agent first, then the next agent
pub fn build_plan(url_variants: &[String], user_agents: &[String]) -> Vec<(String, String)> {
    let mut plan = Vec::with_capacity(url_variants.len() * user_agents.len());
    for ua in user_agents {
        for url in url_variants {
            plan.push((url.clone(), ua.clone()));
        }
    }
    plan
}

/// Case-insensitive scan for human-verification phrases
pub fn contains_bot_check(body: &str) -> bool {
    let lower = body.to_lowercase();
    BOT_CHECK_MARKERS.iter().any(|m| lower.contains(m))
}

/// Jittered delay before attempt `index`, growing with the index so
/// request timing never looks uniform
fn backoff_delay(config: &FetchConfig, index: usize) -> Duration {
    let jitter_ms = config.backoff_jitter.as_millis() as u64;
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..jitter_ms)
    };
    config.backoff_base * index as u32 + Duration::from_millis(jitter)
}
