//! In-memory UI translation cache.
//! Keyed by (target locale, exact source text). Bounded by admission:
//! once full, new keys are dropped silently; nothing is ever evicted.

use std::collections::HashMap;

use parking_lot::RwLock;

#[derive(Default)]
struct Entries {
    /// locale -> source text -> translation
    by_locale: HashMap<String, HashMap<String, String>>,
    len: usize,
    /// Bumped by every `clear`
    generation: u64,
}

pub struct TranslationCache {
    inner: RwLock<Entries>,
    capacity: usize,
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Entries::default()),
            capacity,
        }
    }

    /// Look up a translation. Takes only the read lock.
    pub fn get(&self, locale: &str, text: &str) -> Option<String> {
        let entries = self.inner.read();
        entries
            .by_locale
            .get(locale)
            .and_then(|texts| texts.get(text))
            .cloned()
    }

    /// Store a translation. A no-op for empty text, or for a new key once
    /// the cache holds `capacity` entries.
    pub fn put(&self, locale: &str, text: &str, translated: &str) {
        if text.is_empty() {
            return;
        }
        let mut entries = self.inner.write();
        self.insert(&mut entries, locale, text, translated);
    }

    /// Current generation; changes whenever the cache is cleared.
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// `put`, unless the cache was cleared since `generation` was read.
    /// Returns whether the write was applied.
    pub fn put_since(&self, generation: u64, locale: &str, text: &str, translated: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let mut entries = self.inner.write();
        if entries.generation != generation {
            return false;
        }
        self.insert(&mut entries, locale, text, translated);
        true
    }

    fn insert(&self, entries: &mut Entries, locale: &str, text: &str, translated: &str) {
        let full = entries.len >= self.capacity;

        if let Some(existing) = entries
            .by_locale
            .get_mut(locale)
            .and_then(|texts| texts.get_mut(text))
        {
            *existing = translated.to_string();
            return;
        }
        if full {
            return;
        }

        entries
            .by_locale
            .entry(locale.to_string())
            .or_default()
            .insert(text.to_string(), translated.to_string());
        entries.len += 1;
    }

    pub fn size(&self) -> usize {
        self.inner.read().len
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.size() >= self.capacity
    }

    /// Drop every entry (used when the UI language changes).
    pub fn clear(&self) {
        let mut entries = self.inner.write();
        entries.by_locale.clear();
        entries.len = 0;
        entries.generation = entries.generation.wrapping_add(1);
    }

    /// Texts from `texts` that have no entry for `locale`, in input order,
    /// skipping empty strings and duplicates. Evaluated under one read lock.
    pub fn missing<S: AsRef<str>>(&self, locale: &str, texts: &[S]) -> Vec<String> {
        let entries = self.inner.read();
        let cached = entries.by_locale.get(locale);
        let mut out: Vec<String> = Vec::new();

        for text in texts {
            let text = text.as_ref();
            if text.is_empty() || out.iter().any(|t| t == text) {
                continue;
            }
            if cached.is_some_and(|c| c.contains_key(text)) {
                continue;
            }
            out.push(text.to_string());
        }

        out
    }
}
