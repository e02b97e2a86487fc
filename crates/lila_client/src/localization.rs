use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{CancelToken, GatewayError, LilaClient, RemoteCall};

/// Literal source phrase to localized phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: HashMap<String, String>,
}

impl Dictionary {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Phrases without an entry pass through untranslated.
    pub fn translate<'a>(&'a self, phrase: &'a str) -> &'a str {
        let key = phrase.trim();
        self.entries.get(key).map(String::as_str).unwrap_or(phrase)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Process-scoped, lazily fetched dictionary. Loaded on first use and kept
/// until [`Localizer::reset`] (a language change).
#[derive(Default)]
pub struct Localizer {
    dictionary: Mutex<Option<Arc<Dictionary>>>,
}

impl Localizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached dictionary, fetching it once if needed. A failed
    /// fetch is not cached, so the next call tries again.
    pub async fn dictionary<G: RemoteCall>(
        &self,
        client: &LilaClient<G>,
    ) -> Result<Arc<Dictionary>, GatewayError> {
        let mut guard = self.dictionary.lock().await;
        if let Some(dictionary) = guard.as_ref() {
            return Ok(Arc::clone(dictionary));
        }

        match client.language_text(&CancelToken::new()).await {
            Ok(entries) => {
                info!(entries = entries.len(), "loaded language dictionary");
                let dictionary = Arc::new(Dictionary::new(entries));
                *guard = Some(Arc::clone(&dictionary));
                Ok(dictionary)
            }
            Err(err) => {
                warn!("failed to load language dictionary: {err}");
                Err(err)
            }
        }
    }

    pub async fn reset(&self) {
        self.dictionary.lock().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_phrases_pass_through() {
        let dictionary = Dictionary::new(HashMap::from([(
            "Check".to_string(),
            "チェック".to_string(),
        )]));
        assert_eq!(dictionary.translate("  Check "), "チェック");
        assert_eq!(dictionary.translate("Workspace"), "Workspace");
    }
}
