use crate::api::client::WikiClient;
use crate::api::fetchers;
use crate::core::cache::ResolutionCache;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::transform::locator::{find_search_match, url_variations};

/// Resolves character names to wiki page URLs: cache, then URL variations, then site search.
#[derive(Clone)]
pub struct PageLocator {
    client: WikiClient,
    base_url: String,
    cache: ResolutionCache,
}

impl PageLocator {
    pub fn new(client: WikiClient, cache: ResolutionCache) -> Self {
        let base_url = client.config().base_url.trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            cache,
        }
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// `PageNotFound` when neither a variation nor search turns up a page. A failed probe or
    /// search only moves on to the next step; cancellation is the one error that propagates.
    pub async fn resolve(&self, name: &str) -> AppResult<String> {
        if let Some(url) = self.cache.get(name).await {
            return Ok(url);
        }

        for candidate in url_variations(&self.base_url, name) {
            match fetchers::probe_page(&self.client, &candidate).await {
                Ok(Some(final_url)) => {
                    log(
                        LogLevel::Debug,
                        &format!("Resolved '{}' -> {}", name, final_url),
                    );
                    self.cache.insert(name, final_url.clone()).await;
                    return Ok(final_url);
                }
                Ok(None) => {}
                Err(e @ AppError::Cancelled(_)) => return Err(e),
                Err(e) => log(
                    LogLevel::Debug,
                    &format!("Skipping variation {} for '{}': {}", candidate, name, e),
                ),
            }
        }

        let results = match fetchers::fetch_search_results(&self.client, &self.base_url, name).await {
            Ok(html) => html,
            Err(e @ AppError::Cancelled(_)) => return Err(e),
            Err(_) => return Err(AppError::PageNotFound(name.to_string())),
        };
        match find_search_match(&results, name, &self.base_url) {
            Some(url) => {
                log(
                    LogLevel::Debug,
                    &format!("Resolved '{}' via search -> {}", name, url),
                );
                self.cache.insert(name, url.clone()).await;
                Ok(url)
            }
            None => Err(AppError::PageNotFound(name.to_string())),
        }
    }
}
