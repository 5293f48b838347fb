use super::client::WikiClient;
use super::transport::HttpResponse;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};

/// HEAD probe. `Some(final_url)` when the page exists, `None` on 404.
pub async fn probe_page(client: &WikiClient, url: &str) -> AppResult<Option<String>> {
    match client.head(url).await {
        Ok(resp) => Ok(Some(resp.final_url)),
        Err(AppError::PageNotFound(_)) => Ok(None),
        Err(e) => {
            log(
                LogLevel::Debug,
                &format!("Probe FAIL for '{}': {}", url, e),
            );
            Err(e)
        }
    }
}

pub async fn fetch_page_html(client: &WikiClient, url: &str) -> AppResult<String> {
    match client.get_text(url).await {
        Ok(html) => {
            if html.trim().is_empty() {
                return Err(AppError::HtmlParseError(format!(
                    "Empty page body returned for {}",
                    url
                )));
            }
            Ok(html)
        }
        Err(e) => {
            if !e.is_not_found() {
                log(
                    LogLevel::Warning,
                    &format!("Page Fetch FAIL '{}': {}", url, e),
                );
            }
            Err(e)
        }
    }
}

pub fn search_url(base_url: &str, query: &str) -> String {
    format!(
        "{}/wiki/Special:Search?query={}&scope=internal&navigationSearch=true",
        base_url.trim_end_matches('/'),
        urlencoding::encode(query.trim())
    )
}

pub async fn fetch_search_results(
    client: &WikiClient,
    base_url: &str,
    query: &str,
) -> AppResult<String> {
    let url = search_url(base_url, query);
    client.get_text(&url).await.map_err(|e| {
        log(
            LogLevel::Warning,
            &format!("Search FAIL for '{}': {}", query, e),
        );
        e
    })
}

pub async fn fetch_image(client: &WikiClient, url: &str) -> AppResult<HttpResponse> {
    let resp = client.get(url).await?;
    if resp.body.is_empty() {
        return Err(AppError::Image(format!("Empty image body from {}", url)));
    }
    Ok(resp)
}

pub async fn head_image(client: &WikiClient, url: &str) -> AppResult<HttpResponse> {
    client.head(url).await
}
