//! HTTP client for the upstream market-data pages.
//!
//! One attempt per call: the client maps transport failures onto
//! [`SourceError`] and leaves retry counting to the caller, which paces
//! attempts with [`Backoff`].

use std::time::Duration;

use rand::Rng;
use reqwest::Client;

use crate::config::SourceSettings;
use crate::error::SourceError;

/// Client over the scraped source endpoints.
#[derive(Debug, Clone)]
pub struct SourceClient {
    http: Client,
    base_url: String,
}

impl SourceClient {
    /// Build a client from source settings.
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        let http = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.read_timeout)
            .build()
            .map_err(|e| SourceError::InvalidRequest(e.to_string()))?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the positional live-tick payload for one symbol.
    ///
    /// The trailing `+` on the script parameter is part of the upstream
    /// contract.
    pub async fn live_snapshot(&self, symbol_id: &str, script: u32) -> Result<String, SourceError> {
        let url = format!(
            "{}/tsev2/data/instinfodata.aspx?i={symbol_id}&c={script}+",
            self.base_url
        );
        self.get_text(&url).await
    }

    /// Fetch the instrument reference page for one symbol.
    pub async fn instrument_page(&self, symbol_id: &str) -> Result<String, SourceError> {
        let url = format!(
            "{}/Loader.aspx?ParTree=151311&i={symbol_id}",
            self.base_url
        );
        self.get_text(&url).await
    }

    /// Fetch one market listing page.
    pub async fn listing_page(
        &self,
        partree: &str,
        kind: u32,
        flow: &str,
    ) -> Result<String, SourceError> {
        let url = format!(
            "{}/Loader.aspx?Partree={partree}&Type={kind}&Flow={flow}",
            self.base_url
        );
        self.get_text(&url).await
    }

    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self.http.get(url).send().await.map_err(SourceError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }
        response
            .text()
            .await
            .map_err(|e| SourceError::Body(e.to_string()))
    }
}

/// Exponential backoff with jitter for retrying transient source failures.
#[derive(Debug)]
pub struct Backoff {
    attempt: u32,
    max_attempts: u32,
    initial_ms: u64,
    max_ms: u64,
    multiplier: f64,
    jitter_factor: f64,
}

impl Backoff {
    /// Backoff paced for a sweep loop: starts at 500ms, caps at 30s.
    #[must_use]
    pub const fn for_sweep(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            initial_ms: 500,
            max_ms: 30_000,
            multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }

    /// The next delay, or `None` once attempts are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let base = self.base_ms();
        self.attempt += 1;
        Some(Duration::from_millis(self.jittered(base).min(self.max_ms)))
    }

    /// Attempts consumed so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempt
    }

    fn base_ms(&self) -> u64 {
        #[allow(clippy::cast_possible_wrap)]
        let multiplier = self.multiplier.powi(self.attempt as i32);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let base = (self.initial_ms as f64 * multiplier) as u64;
        base.min(self.max_ms)
    }

    fn jittered(&self, base_ms: u64) -> u64 {
        if self.jitter_factor <= 0.0 {
            return base_ms;
        }
        let mut rng = rand::rng();
        #[allow(clippy::cast_precision_loss)]
        let spread = base_ms as f64 * self.jitter_factor;
        #[allow(clippy::cast_precision_loss)]
        let min = (base_ms as f64 - spread).max(0.0);
        #[allow(clippy::cast_precision_loss)]
        let max = base_ms as f64 + spread;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let jittered = rng.random_range(min..=max) as u64;
        jittered
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn backoff_exhausts_after_max_attempts() {
        let mut backoff = Backoff::for_sweep(3);
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
        assert_eq!(backoff.attempts(), 3);
    }

    #[test]
    fn delays_grow_and_stay_within_jitter_bounds() {
        for _ in 0..50 {
            let mut backoff = Backoff::for_sweep(10);
            let first = backoff.next_delay().unwrap();
            assert!(first >= Duration::from_millis(400));
            assert!(first <= Duration::from_millis(600));

            let second = backoff.next_delay().unwrap();
            assert!(second >= Duration::from_millis(800));
            assert!(second <= Duration::from_millis(1200));
        }
    }

    #[test]
    fn delays_cap_at_max() {
        let mut backoff = Backoff::for_sweep(30);
        let mut last = Duration::ZERO;
        for _ in 0..30 {
            last = backoff.next_delay().unwrap();
        }
        assert!(last <= Duration::from_millis(30_000));
    }
}
