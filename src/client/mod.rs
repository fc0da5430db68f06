// Translation client architecture
//
// - Translator: the async seam the orchestrator and prewarmer depend on
// - lingo: TranslationClient, the bridge-backed implementation
// - transport: HTTP seam (reqwest in production, mocks in tests)

pub mod lingo;
pub mod transport;

use std::collections::HashMap;

use async_trait::async_trait;

pub use lingo::TranslationClient;
pub use transport::{HttpResponse, ReqwestTransport, Transport};

use crate::config::QualityMode;
use crate::error::Result;

/// Translates UI strings between locales
#[async_trait]
pub trait Translator: Send + Sync {
    /// False means every call is a passthrough with no I/O.
    fn is_enabled(&self) -> bool;

    /// Translate a single string.
    async fn translate_one(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
        quality: QualityMode,
    ) -> Result<String>;

    /// Translate a list in one request. Entry `i` is `None` when the
    /// backend had no usable translation for `texts[i]`.
    async fn translate_batch_entries(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
        quality: QualityMode,
    ) -> Result<Vec<Option<String>>>;

    /// Translate a list in one request, mapping each text to its
    /// translation or, when none came back, to itself.
    async fn translate_batch(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
        quality: QualityMode,
    ) -> Result<HashMap<String, String>> {
        let entries = self
            .translate_batch_entries(texts, source_locale, target_locale, quality)
            .await?;

        Ok(texts
            .iter()
            .zip(entries.into_iter().chain(std::iter::repeat(None)))
            .map(|(text, entry)| (text.clone(), entry.unwrap_or_else(|| text.clone())))
            .collect())
    }
}
