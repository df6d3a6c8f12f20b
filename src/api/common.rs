//! Common API utilities and shared types

use serde::Deserialize;

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size for list endpoints
pub fn default_page_size() -> u32 {
    10
}

/// Basic pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Search query parameters shared by the news and articles endpoints.
///
/// `date_after` is accepted as `YYYY-MM-DD`; an unparsable value is ignored
/// rather than rejected.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date_after: Option<String>,
    pub category: Option<i64>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl SearchQuery {
    /// Convert to service-layer search filters
    pub fn filters(&self) -> crate::models::PostSearch {
        crate::models::PostSearch {
            title: self.title.clone(),
            author: self.author.clone(),
            date_after: self
                .date_after
                .as_deref()
                .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            category_id: self.category,
        }
    }
}
