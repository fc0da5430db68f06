//! Bounded-wait translation entry point for the UI.
//!
//! `translate` never blocks longer than the configured wait (300 ms by
//! default). A miss spawns the request as its own task; the task writes
//! the cache itself, so a request that outlives the wait still heals the
//! cache for the next render.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, debug_span, info, warn, Instrument};
use uuid::Uuid;

use crate::cache::TranslationCache;
use crate::client::Translator;
use crate::config::{QualityMode, TranslationConfig};
use crate::locale;
use crate::prewarm::Prewarmer;

/// Status hint shown after a language switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageStatus {
    /// Switched back to the source language
    Default,
    /// Non-source language selected but no credential is configured
    Unavailable,
    /// Translation active; `cached` entries were present right after the switch
    Active { cached: usize },
}

impl fmt::Display for LanguageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "UI language set to the source language"),
            Self::Unavailable => write!(
                f,
                "translation unavailable, set LINGODOTDEV_API_KEY in a .env file"
            ),
            Self::Active { cached } => write!(f, "{} strings translated", cached),
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    timed_out: AtomicU64,
    healed: AtomicU64,
    passthrough: AtomicU64,
    in_flight: AtomicU64,
}

/// Counts one running request for as long as it is alive, including
/// when the request panics or is dropped by a runtime shutdown.
struct InFlight(Arc<Counters>);

impl InFlight {
    fn enter(counters: &Arc<Counters>) -> Self {
        counters.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counters))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Point-in-time view of the orchestrator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationStats {
    pub hits: u64,
    pub misses: u64,
    /// Calls that returned the source text because the wait expired
    pub timed_out: u64,
    /// Translations cached after their caller had already given up
    pub healed: u64,
    pub passthrough: u64,
    pub in_flight: u64,
}

/// Where a finished request reports its result
enum Waiter {
    Blocking(std::sync::mpsc::SyncSender<Option<String>>),
    Async(oneshot::Sender<Option<String>>),
}

impl Waiter {
    /// False when the caller stopped waiting.
    fn deliver(self, result: Option<String>) -> bool {
        match self {
            Self::Blocking(tx) => tx.send(result).is_ok(),
            Self::Async(tx) => tx.send(result).is_ok(),
        }
    }
}

enum Lookup {
    Done(String),
    Fetch,
}

pub struct Orchestrator {
    cache: Arc<TranslationCache>,
    translator: Arc<dyn Translator>,
    runtime: Handle,
    source_locale: String,
    quality: QualityMode,
    wait: Duration,
    current_locale: RwLock<String>,
    counters: Arc<Counters>,
    prewarmer: Prewarmer,
    last_prewarm: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(
        cache: Arc<TranslationCache>,
        translator: Arc<dyn Translator>,
        runtime: Handle,
        config: &TranslationConfig,
    ) -> Self {
        let prewarmer = Prewarmer::new(
            Arc::clone(&cache),
            Arc::clone(&translator),
            runtime.clone(),
            config.source_locale.clone(),
            config.quality,
        );

        Self {
            cache,
            translator,
            runtime,
            source_locale: config.source_locale.clone(),
            quality: config.quality,
            wait: config.wait_timeout(),
            current_locale: RwLock::new(config.source_locale.clone()),
            counters: Arc::new(Counters::default()),
            prewarmer,
            last_prewarm: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    pub fn source_locale(&self) -> &str {
        &self.source_locale
    }

    pub fn current_locale(&self) -> String {
        self.current_locale.read().clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.translator.is_enabled()
    }

    fn is_source(&self, locale: &str) -> bool {
        locale.is_empty() || locale.eq_ignore_ascii_case(&self.source_locale)
    }

    fn passthrough(&self, text: &str) -> Lookup {
        self.counters.passthrough.fetch_add(1, Ordering::Relaxed);
        Lookup::Done(text.to_string())
    }

    /// Everything that can be answered without a request.
    fn lookup(&self, text: &str, locale: &str) -> Lookup {
        if text.is_empty() || self.is_source(locale) || !self.translator.is_enabled() {
            return self.passthrough(text);
        }

        if let Some(hit) = self.cache.get(locale, text) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Lookup::Done(hit);
        }

        if self.cache.is_full() {
            debug!(capacity = self.cache.capacity(), "Cache full, not translating new text");
            return self.passthrough(text);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        Lookup::Fetch
    }

    /// Spawn one translation request. The task caches a successful result
    /// before reporting it to `waiter`, unless the cache was cleared by a
    /// language switch in the meantime.
    fn spawn_request(&self, text: &str, locale: &str, waiter: Waiter) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        let translator = Arc::clone(&self.translator);
        let counters = Arc::clone(&self.counters);
        let generation = cache.generation();
        let text = text.to_string();
        let target = locale.to_string();
        let source = self.source_locale.clone();
        let quality = self.quality;

        let span = debug_span!("translate", request_id = %Uuid::new_v4(), locale = %target);

        let in_flight = InFlight::enter(&counters);
        self.runtime.spawn(async move {
            let _in_flight = in_flight;
            let mut cached = false;
            let result = match translator.translate_one(&text, &source, &target, quality).await {
                Ok(translated) => {
                    cached = cache.put_since(generation, &target, &text, &translated);
                    if !cached {
                        debug!("Language changed while translating, result not cached");
                    }
                    Some(translated)
                }
                Err(e) => {
                    warn!("Translation failed, showing source text: {}", e);
                    None
                }
            };

            if !waiter.deliver(result) && cached {
                counters.healed.fetch_add(1, Ordering::Relaxed);
                debug!("Late translation cached for '{}'", text);
            }
        }
        .instrument(span))
    }

    fn expired(&self, text: &str) -> String {
        self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
        debug!(
            wait_ms = self.wait.as_millis() as u64,
            "Translation still running, showing source text"
        );
        text.to_string()
    }

    /// Translate `text` into `locale`, blocking for at most the bounded
    /// wait. Returns the source text on passthrough, failure or timeout.
    ///
    /// Intended for the UI thread. Must not be called from inside a task
    /// on a current-thread runtime, which could not drive the request.
    pub fn translate(&self, text: &str, locale: &str) -> String {
        let locale = locale::normalize(locale);
        if let Lookup::Done(result) = self.lookup(text, &locale) {
            return result;
        }

        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        self.spawn_request(text, &locale, Waiter::Blocking(tx));

        match rx.recv_timeout(self.wait) {
            Ok(Some(translated)) => translated,
            Ok(None) | Err(RecvTimeoutError::Disconnected) => text.to_string(),
            Err(RecvTimeoutError::Timeout) => self.expired(text),
        }
    }

    /// `translate` for async callers.
    pub async fn translate_async(&self, text: &str, locale: &str) -> String {
        let locale = locale::normalize(locale);
        if let Lookup::Done(result) = self.lookup(text, &locale) {
            return result;
        }

        let (tx, rx) = oneshot::channel();
        self.spawn_request(text, &locale, Waiter::Async(tx));

        match tokio::time::timeout(self.wait, rx).await {
            Ok(Ok(Some(translated))) => translated,
            Ok(_) => text.to_string(),
            Err(_) => self.expired(text),
        }
    }

    /// Translate into the current UI language.
    pub fn tr(&self, text: &str) -> String {
        let locale = self.current_locale();
        self.translate(text, &locale)
    }

    /// Change the UI language. A change clears the cache; `known_strings`
    /// are then prewarmed in the background.
    pub fn switch_language<S: AsRef<str>>(&self, locale: &str, known_strings: &[S]) -> LanguageStatus {
        let locale = locale::normalize(locale);
        let locale = locale.as_ref();
        let changed = {
            let mut current = self.current_locale.write();
            if current.as_str() == locale {
                false
            } else {
                *current = locale.to_string();
                true
            }
        };

        let name = locale::find_language(locale).map_or(locale, |l| l.name);
        if changed {
            self.cache.clear();
            info!("UI language set to {}", name);
        }

        if self.is_source(locale) {
            return LanguageStatus::Default;
        }
        if !self.translator.is_enabled() {
            warn!("UI set to {} but translation is unavailable", name);
            return LanguageStatus::Unavailable;
        }

        let handle = self.prewarmer.prewarm(known_strings, locale);
        if let Some(previous) = std::mem::replace(&mut *self.last_prewarm.lock(), handle) {
            if !previous.is_finished() {
                debug!("Earlier prewarm still running");
            }
        }

        LanguageStatus::Active {
            cached: self.cache.size(),
        }
    }

    /// Start a background prewarm for `locale` without switching to it.
    pub fn prewarm<S: AsRef<str>>(&self, texts: &[S], locale: &str) -> Option<JoinHandle<()>> {
        self.prewarmer.prewarm(texts, locale)
    }

    /// Wait for the latest prewarm and for every in-flight request to
    /// finish, up to `limit`. Returns false if work was still running.
    pub async fn settle(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;

        let pending = self.last_prewarm.lock().take();
        if let Some(handle) = pending {
            if tokio::time::timeout_at(deadline, handle).await.is_err() {
                return false;
            }
        }

        while self.counters.in_flight.load(Ordering::SeqCst) > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    pub fn stats(&self) -> TranslationStats {
        let c = &self.counters;
        TranslationStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            timed_out: c.timed_out.load(Ordering::Relaxed),
            healed: c.healed.load(Ordering::Relaxed),
            passthrough: c.passthrough.load(Ordering::Relaxed),
            in_flight: c.in_flight.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LingoError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::runtime::Runtime;

    struct UppercaseTranslator {
        enabled: bool,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl UppercaseTranslator {
        fn new(enabled: bool, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                enabled,
                delay,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Translator for UppercaseTranslator {
        fn is_enabled(&self) -> bool {
            self.enabled
        }

        async fn translate_one(&self, text: &str, _: &str, _: &str, _: QualityMode) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if text == "boom" {
                panic!("translator crashed");
            }
            if text == "fail" {
                return Err(LingoError::Backend("no translation".into()));
            }
            Ok(text.to_uppercase())
        }

        async fn translate_batch_entries(
            &self,
            texts: &[String],
            _: &str,
            _: &str,
            _: QualityMode,
        ) -> Result<Vec<Option<String>>> {
            Ok(texts.iter().map(|t| Some(t.to_uppercase())).collect())
        }
    }

    fn runtime() -> Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    fn orchestrator(rt: &Runtime, translator: Arc<UppercaseTranslator>, capacity: usize) -> Orchestrator {
        Orchestrator::new(
            Arc::new(TranslationCache::new(capacity)),
            translator,
            rt.handle().clone(),
            &TranslationConfig::default(),
        )
    }

    fn orchestrator_with_wait(rt: &Runtime, translator: Arc<UppercaseTranslator>, wait_ms: u64) -> Orchestrator {
        let config = TranslationConfig {
            wait_timeout_ms: wait_ms,
            ..TranslationConfig::default()
        };
        Orchestrator::new(Arc::new(TranslationCache::new(10)), translator, rt.handle().clone(), &config)
    }

    #[test]
    fn test_passthrough_rules() {
        let rt = runtime();
        let translator = UppercaseTranslator::new(true, Duration::ZERO);
        let orch = orchestrator(&rt, Arc::clone(&translator), 10);

        assert_eq!(orch.translate("", "es"), "");
        assert_eq!(orch.translate("Hello", "en"), "Hello");
        assert_eq!(orch.translate("Hello", "EN"), "Hello");
        assert_eq!(orch.translate("Hello", ""), "Hello");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(orch.cache().size(), 0);
        assert_eq!(orch.stats().passthrough, 4);
    }

    #[test]
    fn test_miss_then_hit() {
        let rt = runtime();
        let translator = UppercaseTranslator::new(true, Duration::ZERO);
        let orch = orchestrator(&rt, Arc::clone(&translator), 10);

        assert_eq!(orch.translate("hello", "es"), "HELLO");
        assert_eq!(orch.cache().get("es", "hello").as_deref(), Some("HELLO"));
        assert_eq!(orch.translate("hello", "es"), "HELLO");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);

        let stats = orch.stats();
        assert_eq!((stats.hits, stats.misses, stats.timed_out), (1, 1, 0));
    }

    #[test]
    fn test_failure_is_not_cached() {
        let rt = runtime();
        let translator = UppercaseTranslator::new(true, Duration::ZERO);
        let orch = orchestrator(&rt, Arc::clone(&translator), 10);

        assert_eq!(orch.translate("fail", "es"), "fail");
        assert_eq!(orch.cache().get("es", "fail"), None);
        assert_eq!(orch.translate("fail", "es"), "fail");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_full_cache_skips_new_text() {
        let rt = runtime();
        let translator = UppercaseTranslator::new(true, Duration::ZERO);
        let orch = orchestrator(&rt, Arc::clone(&translator), 1);

        assert_eq!(orch.translate("one", "es"), "ONE");
        assert_eq!(orch.translate("two", "es"), "two");
        assert_eq!(orch.translate("one", "es"), "ONE");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tr_uses_current_language() {
        let rt = runtime();
        let orch = orchestrator(&rt, UppercaseTranslator::new(true, Duration::ZERO), 10);

        assert_eq!(orch.tr("hello"), "hello");
        orch.switch_language::<&str>("de", &[]);
        assert_eq!(orch.current_locale(), "de");
        assert_eq!(orch.tr("hello"), "HELLO");
    }

    #[test]
    fn test_switch_language_statuses() {
        let rt = runtime();
        let orch = orchestrator(&rt, UppercaseTranslator::new(true, Duration::ZERO), 10);

        orch.cache().put("es", "Stale", "Viejo");
        let status = orch.switch_language("fr", &["Open", "Quit"]);
        assert!(matches!(status, LanguageStatus::Active { .. }));
        assert_eq!(orch.cache().get("es", "Stale"), None);

        assert!(rt.block_on(orch.settle(Duration::from_secs(2))));
        assert_eq!(orch.cache().get("fr", "Open").as_deref(), Some("OPEN"));
        assert_eq!(orch.cache().size(), 2);

        // same language again keeps the cache
        assert_eq!(
            orch.switch_language("fr", &["Open", "Quit"]),
            LanguageStatus::Active { cached: 2 }
        );

        assert_eq!(orch.switch_language::<&str>("en", &[]), LanguageStatus::Default);
        assert_eq!(orch.cache().size(), 0);

        let disabled = orchestrator(&rt, UppercaseTranslator::new(false, Duration::ZERO), 10);
        assert_eq!(
            disabled.switch_language("es", &["Open"]),
            LanguageStatus::Unavailable
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_translate_async_times_out_then_heals() {
        let translator = UppercaseTranslator::new(true, Duration::from_millis(400));
        let orch = Orchestrator::new(
            Arc::new(TranslationCache::new(10)),
            translator,
            Handle::current(),
            &TranslationConfig::default(),
        );

        assert_eq!(orch.translate_async("slow", "es").await, "slow");
        assert_eq!(orch.stats().timed_out, 1);

        assert!(orch.settle(Duration::from_secs(2)).await);
        assert_eq!(orch.translate_async("slow", "es").await, "SLOW");
        assert_eq!(orch.stats().healed, 1);
    }

    #[test]
    fn test_panicking_request_releases_in_flight() {
        let rt = runtime();
        let orch = orchestrator(&rt, UppercaseTranslator::new(true, Duration::ZERO), 10);

        assert_eq!(orch.translate("boom", "es"), "boom");
        assert!(rt.block_on(orch.settle(Duration::from_secs(1))));

        let stats = orch.stats();
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.timed_out, 0);
        assert_eq!(orch.cache().size(), 0);
    }

    #[test]
    fn test_results_for_previous_language_are_dropped() {
        let rt = runtime();
        let orch = orchestrator_with_wait(&rt, UppercaseTranslator::new(true, Duration::from_millis(100)), 10);

        orch.switch_language::<&str>("es", &[]);
        assert_eq!(orch.translate("hello", "es"), "hello");
        orch.switch_language::<&str>("fr", &[]);

        assert!(rt.block_on(orch.settle(Duration::from_secs(2))));
        assert_eq!(orch.cache().get("es", "hello"), None);
        assert_eq!(orch.cache().size(), 0);
        assert_eq!(orch.stats().healed, 0);
    }

    #[test]
    fn test_locale_case_is_normalized() {
        let rt = runtime();
        let translator = UppercaseTranslator::new(true, Duration::ZERO);
        let orch = orchestrator(&rt, Arc::clone(&translator), 10);

        orch.switch_language::<&str>("es", &[]);
        assert_eq!(orch.translate("hello", "ES"), "HELLO");
        assert_eq!(orch.cache().get("es", "hello").as_deref(), Some("HELLO"));

        // same language in another spelling keeps the cache
        orch.switch_language::<&str>("ES", &[]);
        assert_eq!(orch.current_locale(), "es");
        assert_eq!(orch.translate("hello", "es"), "HELLO");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    }
}
