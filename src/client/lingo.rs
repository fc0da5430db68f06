//! Bridge-backed translation client.
//! Single texts go to `POST /translate` with up to three attempts and
//! exponential backoff; lists go to `POST /translate/batch` in one request
//! with a timeout that grows with the list.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::transport::{HttpResponse, ReqwestTransport, Transport};
use super::Translator;
use crate::bridge::HealthProbe;
use crate::config::{Config, QualityMode, TranslationConfig};
use crate::error::{LingoError, Result};
use crate::locale;
use crate::retry::{with_retry, RetryPolicy};

pub const TRANSLATE_PATH: &str = "/translate";
pub const BATCH_PATH: &str = "/translate/batch";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest<'a> {
    text: &'a str,
    source_locale: &'a str,
    target_locale: &'a str,
    fast: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchRequest<'a> {
    texts: &'a [String],
    source_locale: &'a str,
    target_locale: &'a str,
    fast: bool,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translation: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    results: Option<Vec<serde_json::Value>>,
    error: Option<String>,
}

/// Waits once per client lifetime for the bridge to answer its probe
struct ReadinessGate {
    probe: Arc<dyn HealthProbe>,
    wait: Duration,
    poll: Duration,
    checked: OnceCell<bool>,
}

impl ReadinessGate {
    async fn wait_for_bridge(&self) -> bool {
        let deadline = Instant::now() + self.wait;
        loop {
            if self.probe.is_ready().await {
                debug!("Bridge ready for first request");
                return true;
            }
            if Instant::now() + self.poll > deadline {
                warn!(
                    wait_ms = self.wait.as_millis() as u64,
                    "Bridge not ready, requests will fail fast until it is"
                );
                return false;
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

pub struct TranslationClient {
    transport: Arc<dyn Transport>,
    config: TranslationConfig,
    retry: RetryPolicy,
    readiness: Option<ReadinessGate>,
}

impl TranslationClient {
    pub fn new(config: TranslationConfig, transport: Arc<dyn Transport>) -> Self {
        let retry = RetryPolicy::new(config.max_attempts, Duration::from_millis(config.backoff_base_ms));
        Self {
            transport,
            config,
            retry,
            readiness: None,
        }
    }

    /// Client talking to the bridge at the configured base URL.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.bridge.base_url(), config.translation.api_key.clone())?;
        if config.translation.is_enabled() {
            info!("Translation client enabled for {}", transport.base_url());
        } else {
            info!("No API key configured, translation runs in passthrough mode");
        }
        Ok(Self::new(config.translation.clone(), Arc::new(transport)))
    }

    /// Gate the first request on the bridge becoming ready.
    pub fn with_readiness(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.readiness = Some(ReadinessGate {
            probe,
            wait: self.config.readiness_wait(),
            poll: self.config.readiness_poll(),
            checked: OnceCell::new(),
        });
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn ensure_ready(&self) {
        if let Some(gate) = &self.readiness {
            gate.checked.get_or_init(|| gate.wait_for_bridge()).await;
        }
    }

    fn check_locale(target_locale: &str) -> Result<()> {
        if locale::is_well_formed(target_locale) {
            Ok(())
        } else {
            Err(LingoError::InvalidLocale(target_locale.to_string()))
        }
    }

    fn status_error(response: &HttpResponse) -> LingoError {
        LingoError::Status {
            status: response.status,
            body: response.body.chars().take(200).collect(),
        }
    }

    /// Interpret one `/translate` response.
    fn parse_single(response: HttpResponse) -> Result<String> {
        if !response.is_success() {
            return Err(Self::status_error(&response));
        }

        let parsed: TranslateResponse = serde_json::from_str(&response.body)
            .map_err(|e| LingoError::MalformedResponse(format!("invalid JSON: {}", e)))?;

        if let Some(error) = parsed.error {
            return Err(LingoError::Backend(error));
        }

        match parsed.translation {
            Some(t) if !t.trim().is_empty() => Ok(t),
            Some(_) => Err(LingoError::MalformedResponse("empty translation".to_string())),
            None => Err(LingoError::MalformedResponse("missing translation field".to_string())),
        }
    }

    /// Interpret one `/translate/batch` response positionally.
    fn parse_batch(response: HttpResponse, expected: usize) -> Result<Vec<Option<String>>> {
        if !response.is_success() {
            return Err(Self::status_error(&response));
        }

        let parsed: BatchResponse = serde_json::from_str(&response.body)
            .map_err(|e| LingoError::MalformedResponse(format!("invalid JSON: {}", e)))?;

        let results = match (parsed.results, parsed.error) {
            (Some(results), _) => results,
            (None, Some(error)) => return Err(LingoError::Backend(error)),
            (None, None) => {
                return Err(LingoError::MalformedResponse("missing results field".to_string()))
            }
        };

        if results.len() != expected {
            warn!(
                expected,
                received = results.len(),
                "Batch result count mismatch, unmatched entries keep their original text"
            );
        }

        Ok((0..expected)
            .map(|i| {
                results
                    .get(i)
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
            })
            .collect())
    }
}

#[async_trait]
impl Translator for TranslationClient {
    fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    async fn translate_one(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
        quality: QualityMode,
    ) -> Result<String> {
        if text.is_empty() || !self.is_enabled() {
            return Ok(text.to_string());
        }
        Self::check_locale(target_locale)?;
        self.ensure_ready().await;

        let body = serde_json::to_value(TranslateRequest {
            text,
            source_locale,
            target_locale,
            fast: quality.is_fast(),
        })?;
        let timeout = self.config.request_timeout();

        with_retry(&self.retry, "translate", |_| {
            let body = &body;
            async move {
                let response = self.transport.post_json(TRANSLATE_PATH, body, timeout).await?;
                Self::parse_single(response)
            }
        })
        .await
    }

    async fn translate_batch_entries(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
        quality: QualityMode,
    ) -> Result<Vec<Option<String>>> {
        if texts.is_empty() || !self.is_enabled() {
            return Ok(vec![None; texts.len()]);
        }
        Self::check_locale(target_locale)?;
        self.ensure_ready().await;

        let body = serde_json::to_value(BatchRequest {
            texts,
            source_locale,
            target_locale,
            fast: quality.is_fast(),
        })?;
        let timeout = self.config.batch_timeout(texts.len());

        debug!(count = texts.len(), target_locale, "Sending batch translation");
        let response = self.transport.post_json(BATCH_PATH, &body, timeout).await?;
        Self::parse_batch(response, texts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::health::MockHealthProbe;
    use crate::client::transport::MockTransport;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn enabled_config() -> TranslationConfig {
        TranslationConfig {
            api_key: Some("test-key".to_string()),
            backoff_base_ms: 5,
            readiness_wait_ms: 60,
            readiness_poll_ms: 10,
            ..TranslationConfig::default()
        }
    }

    fn client(transport: MockTransport) -> TranslationClient {
        TranslationClient::new(enabled_config(), Arc::new(transport))
    }

    fn ok(body: serde_json::Value) -> Result<HttpResponse> {
        Ok(HttpResponse::new(200, body.to_string()))
    }

    #[tokio::test]
    async fn test_translate_one_success() {
        let mut transport = MockTransport::new();
        transport
            .expect_post_json()
            .withf(|path, body, _| {
                path == TRANSLATE_PATH
                    && body["text"] == "Hello"
                    && body["sourceLocale"] == "en"
                    && body["targetLocale"] == "es"
                    && body["fast"] == false
            })
            .times(1)
            .returning(|_, _, _| ok(json!({"translation": "Hola"})));

        let translated = client(transport)
            .translate_one("Hello", "en", "es", QualityMode::Quality)
            .await
            .unwrap();
        assert_eq!(translated, "Hola");
    }

    #[tokio::test]
    async fn test_empty_text_and_disabled_make_no_calls() {
        let mut transport = MockTransport::new();
        transport.expect_post_json().times(0);
        let client = client(transport);
        assert_eq!(client.translate_one("", "en", "es", QualityMode::Fast).await.unwrap(), "");

        let mut transport = MockTransport::new();
        transport.expect_post_json().times(0);
        let disabled = TranslationClient::new(TranslationConfig::default(), Arc::new(transport));
        assert!(!disabled.is_enabled());
        assert_eq!(
            disabled.translate_one("Hello", "en", "es", QualityMode::Fast).await.unwrap(),
            "Hello"
        );
        let map = disabled
            .translate_batch(&["Yes".to_string()], "en", "es", QualityMode::Fast)
            .await
            .unwrap();
        assert_eq!(map.get("Yes").map(String::as_str), Some("Yes"));
    }

    #[tokio::test]
    async fn test_invalid_locale_is_rejected_without_io() {
        let mut transport = MockTransport::new();
        transport.expect_post_json().times(0);
        let err = client(transport)
            .translate_one("Hello", "en", "spanish!", QualityMode::Quality)
            .await
            .unwrap_err();
        assert!(matches!(err, LingoError::InvalidLocale(_)));
    }

    #[tokio::test]
    async fn test_two_failures_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let mut transport = MockTransport::new();
        transport.expect_post_json().times(3).returning(move |_, _, _| {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(HttpResponse::new(503, "unavailable")),
                1 => ok(json!({"error": "upstream timeout"})),
                _ => ok(json!({"translation": "Hola"})),
            }
        });

        let translated = client(transport)
            .translate_one("Hello", "en", "es", QualityMode::Quality)
            .await
            .unwrap();
        assert_eq!(translated, "Hola");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_three_failures_return_last_error() {
        let mut transport = MockTransport::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        transport.expect_post_json().times(3).returning(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(200, "not json"))
        });

        let err = client(transport)
            .translate_one("Hello", "en", "es", QualityMode::Quality)
            .await
            .unwrap_err();
        assert!(matches!(err, LingoError::MalformedResponse(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_translation_is_not_success() {
        let mut transport = MockTransport::new();
        transport
            .expect_post_json()
            .times(3)
            .returning(|_, _, _| ok(json!({"translation": "  "})));

        let err = client(transport)
            .translate_one("Hello", "en", "es", QualityMode::Quality)
            .await
            .unwrap_err();
        assert!(matches!(err, LingoError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_batch_maps_positionally_with_fallbacks() {
        let mut transport = MockTransport::new();
        transport
            .expect_post_json()
            .withf(|path, body, timeout| {
                path == BATCH_PATH
                    && body["texts"] == json!(["Yes", "No", "Cancel", "Help"])
                    && body["fast"] == true
                    && *timeout == Duration::from_millis(6_000)
            })
            .times(1)
            .returning(|_, _, _| ok(json!({"results": ["Sí", null, ""], "stats": {"ms": 12}})));

        let texts: Vec<String> = ["Yes", "No", "Cancel", "Help"].iter().map(|s| s.to_string()).collect();
        let client = client(transport);
        let map = client
            .translate_batch(&texts, "en", "es", QualityMode::Fast)
            .await
            .unwrap();

        assert_eq!(map.len(), 4);
        assert_eq!(map["Yes"], "Sí");
        assert_eq!(map["No"], "No");
        assert_eq!(map["Cancel"], "Cancel");
        assert_eq!(map["Help"], "Help");
    }

    #[tokio::test]
    async fn test_batch_without_results_fails_whole_batch() {
        let mut transport = MockTransport::new();
        transport
            .expect_post_json()
            .times(1)
            .returning(|_, _, _| ok(json!({"error": "batch endpoint unavailable"})));

        let err = client(transport)
            .translate_batch_entries(&["Yes".to_string()], "en", "es", QualityMode::Quality)
            .await
            .unwrap_err();
        assert!(matches!(err, LingoError::Backend(_)));

        let mut transport = MockTransport::new();
        transport
            .expect_post_json()
            .times(1)
            .returning(|_, _, _| Ok(HttpResponse::new(404, "Cannot POST /translate/batch")));
        let err = client(transport)
            .translate_batch_entries(&["Yes".to_string()], "en", "es", QualityMode::Quality)
            .await
            .unwrap_err();
        assert!(matches!(err, LingoError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_readiness_wait_happens_once() {
        let mut probe = MockHealthProbe::new();
        probe.expect_is_ready().returning(|| false);

        let mut transport = MockTransport::new();
        transport
            .expect_post_json()
            .times(2)
            .returning(|_, _, _| ok(json!({"translation": "Hola"})));

        let client = client(transport).with_readiness(Arc::new(probe));

        let started = std::time::Instant::now();
        client.translate_one("Hello", "en", "es", QualityMode::Quality).await.unwrap();
        let first = started.elapsed();
        assert!(first >= Duration::from_millis(50), "first call waited {:?}", first);

        let started = std::time::Instant::now();
        client.translate_one("Hello", "en", "es", QualityMode::Quality).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_ready_bridge_skips_wait() {
        let mut probe = MockHealthProbe::new();
        probe.expect_is_ready().times(1).returning(|| true);

        let mut transport = MockTransport::new();
        transport
            .expect_post_json()
            .times(1)
            .returning(|_, _, _| ok(json!({"translation": "Bonjour"})));

        let translated = client(transport)
            .with_readiness(Arc::new(probe))
            .translate_one("Hello", "en", "fr", QualityMode::Quality)
            .await
            .unwrap();
        assert_eq!(translated, "Bonjour");
    }
}
