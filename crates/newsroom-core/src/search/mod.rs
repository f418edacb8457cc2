//! Search results feeding the corroboration stage.
//!
//! The provider is a trait so an integrator can drop in a live search
//! API. The in-tree implementation simulates results deterministically
//! from the query, which is enough for the LLM to exercise its tier
//! classification and for tests to be reproducible.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One search hit handed to the corroboration analyst.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResult {
    /// Result title.
    pub title: String,
    /// Result URL.
    pub link: String,
    /// Domain of the publishing outlet, without `www.`.
    pub source_domain: String,
    /// Snippet shown for the result.
    pub snippet: String,
    /// Approximate publication date, ISO date string.
    pub date_approx: String,
}

/// Provider of news search results for a subject/entity query.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns the display name of this provider.
    fn name(&self) -> &str;

    /// Search for coverage of `subject`, biased toward `entities`.
    async fn search_news(&self, subject: &str, entities: &[String]) -> Vec<SearchResult>;
}

/// Maximum results handed to the LLM.
pub const MAX_SEARCH_RESULTS: usize = 7;

/// Deterministic simulated search results.
///
/// Fabricates plausible tier-1 and tier-2 coverage for the subject so the
/// corroboration analyst has material to classify. Deployments wanting
/// real verification replace this with a live `SearchProvider`.
#[derive(Debug, Default)]
pub struct SimulatedSearchProvider;

const TIER1_DOMAINS: &[&str] = &["reuters.com", "techcrunch.com", "theverge.com", "wired.com"];
const TIER2_DOMAINS: &[&str] = &["hackernoon.com", "thenewstack.io"];

#[async_trait::async_trait]
impl SearchProvider for SimulatedSearchProvider {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn search_news(&self, subject: &str, entities: &[String]) -> Vec<SearchResult> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let entity = entities.first().map(String::as_str).unwrap_or(subject);

        let mut results: Vec<SearchResult> = TIER1_DOMAINS
            .iter()
            .map(|domain| SearchResult {
                title: format!("{entity}: {subject}"),
                link: format!("https://{domain}/articles/{}", slug_fragment(subject)),
                source_domain: (*domain).to_string(),
                snippet: format!("Coverage of {subject}, naming {entity}."),
                date_approx: today.clone(),
            })
            .collect();

        results.extend(TIER2_DOMAINS.iter().map(|domain| SearchResult {
            title: format!("Analysis: {subject}"),
            link: format!("https://{domain}/{}", slug_fragment(subject)),
            source_domain: (*domain).to_string(),
            snippet: format!("Independent analysis of {subject}."),
            date_approx: today.clone(),
        }));

        results.truncate(MAX_SEARCH_RESULTS);
        results
    }
}

fn slug_fragment(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Extract the registrable-ish domain from a URL, dropping `www.`.
pub fn domain_of(url: &str) -> Option<String> {
    let rest = url.split("//").nth(1)?;
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.split('@').last()?.split(':').next()?;
    Some(host.trim_start_matches("www.").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_results_are_bounded_and_relevant() {
        let provider = SimulatedSearchProvider;
        let results = provider
            .search_news("Zeus quantum AI chip launch", &["NVIDIA".to_string()])
            .await;

        assert!(!results.is_empty());
        assert!(results.len() <= MAX_SEARCH_RESULTS);
        assert!(results.iter().all(|r| r.title.contains("Zeus")));
        assert!(results.iter().any(|r| r.source_domain == "reuters.com"));
    }

    #[test]
    fn domain_extraction() {
        assert_eq!(
            domain_of("https://www.example.com/a/b?q=1"),
            Some("example.com".to_string())
        );
        assert_eq!(
            domain_of("http://blog.vendor.io:8080/post"),
            Some("blog.vendor.io".to_string())
        );
        assert_eq!(domain_of("not a url"), None);
    }
}
