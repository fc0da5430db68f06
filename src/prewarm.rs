//! Background batch translation of strings the UI is about to show.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::TranslationCache;
use crate::client::Translator;
use crate::config::QualityMode;
use crate::locale;

pub struct Prewarmer {
    cache: Arc<TranslationCache>,
    translator: Arc<dyn Translator>,
    runtime: Handle,
    source_locale: String,
    quality: QualityMode,
}

impl Prewarmer {
    pub fn new(
        cache: Arc<TranslationCache>,
        translator: Arc<dyn Translator>,
        runtime: Handle,
        source_locale: impl Into<String>,
        quality: QualityMode,
    ) -> Self {
        Self {
            cache,
            translator,
            runtime,
            source_locale: source_locale.into(),
            quality,
        }
    }

    /// Translate every uncached string in `texts` into `locale` on a
    /// background task. Returns `None` when there is nothing to do.
    ///
    /// One batch request is tried first; if it fails the strings are
    /// translated one by one and individual failures are ignored. Only real
    /// translations are cached, never the fallback to the source text.
    pub fn prewarm<S: AsRef<str>>(&self, texts: &[S], locale: &str) -> Option<JoinHandle<()>> {
        let locale = locale::normalize(locale);
        let locale = locale.as_ref();
        if locale.is_empty()
            || locale.eq_ignore_ascii_case(&self.source_locale)
            || !self.translator.is_enabled()
        {
            return None;
        }

        let missing = self.cache.missing(locale, texts);
        if missing.is_empty() {
            debug!(locale, "All strings already cached, skipping prewarm");
            return None;
        }

        let cache = Arc::clone(&self.cache);
        let generation = cache.generation();
        let translator = Arc::clone(&self.translator);
        let source = self.source_locale.clone();
        let target = locale.to_string();
        let quality = self.quality;

        debug!(count = missing.len(), locale, "Prewarming translations");
        Some(self.runtime.spawn(async move {
            match translator
                .translate_batch_entries(&missing, &source, &target, quality)
                .await
            {
                Ok(entries) => {
                    let mut stored = 0usize;
                    for (text, entry) in missing.iter().zip(entries) {
                        if let Some(translated) = entry {
                            if cache.put_since(generation, &target, text, &translated) {
                                stored += 1;
                            }
                        }
                    }
                    info!(
                        locale = %target,
                        stored,
                        requested = missing.len(),
                        "Prewarm batch finished"
                    );
                }
                Err(e) => {
                    warn!("Batch prewarm failed, translating individually: {}", e);
                    for text in &missing {
                        if cache.get(&target, text).is_some() {
                            continue;
                        }
                        match translator.translate_one(text, &source, &target, quality).await {
                            Ok(translated) => {
                                if !cache.put_since(generation, &target, text, &translated) {
                                    debug!("Language changed during prewarm, stopping");
                                    return;
                                }
                            }
                            Err(e) => debug!("Skipping '{}': {}", text, e),
                        }
                    }
                    info!(locale = %target, cached = cache.size(), "Sequential prewarm finished");
                }
            }
        }))
    }
}
