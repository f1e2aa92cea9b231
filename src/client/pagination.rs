//! Search parameters and paged results
//!
//! GitHub search is page-numbered (1-based) with a fixed page size, so a
//! page request is fully described by [`SearchParams`].

use serde::{Deserialize, Serialize};

use crate::config::{MAX_RESULTS_PER_PAGE, MIN_RESULTS_PER_PAGE};
use crate::package::PackageKind;

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = MAX_RESULTS_PER_PAGE;

/// Search result ordering field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchSort {
    #[default]
    Stars,
    Forks,
    HelpWantedIssues,
    Updated,
}

impl SearchSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSort::Stars => "stars",
            SearchSort::Forks => "forks",
            SearchSort::HelpWantedIssues => "help-wanted-issues",
            SearchSort::Updated => "updated",
        }
    }
}

/// Sort order for search requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order (fewest stars, oldest first)
    Asc,
    /// Descending order (most stars, newest first)
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Repository search request.
///
/// # Example
/// ```ignore
/// let params = SearchParams::for_kind(PackageKind::Plugin, "seo")
///     .page(2)
///     .sort(SearchSort::Updated);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Raw query, topic filter included
    pub query: String,
    /// Page number (1-indexed)
    pub page: usize,
    /// Items per page
    pub per_page: usize,
    pub sort: SearchSort,
    pub order: SortOrder,
}

impl SearchParams {
    /// Search with an explicit query; an empty query searches the plugin topic.
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        let query = if query.trim().is_empty() {
            format!("topic:{}", PackageKind::Plugin.default_topic())
        } else {
            query.trim().to_string()
        };
        Self {
            query,
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
            sort: SearchSort::default(),
            order: SortOrder::default(),
        }
    }

    /// Search `keywords` scoped to the topic of `kind`, unless the keywords
    /// already carry a topic filter.
    pub fn for_kind(kind: PackageKind, keywords: &str) -> Self {
        let keywords = keywords.trim();
        let topic = format!("topic:{}", kind.default_topic());
        let query = if keywords.is_empty() {
            topic
        } else if keywords.contains("topic:") {
            keywords.to_string()
        } else {
            format!("{} {}", keywords, topic)
        };
        Self::new(query)
    }

    /// Set the page number; 0 is treated as 1.
    pub fn page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    /// Set the page size, clamped to the supported range.
    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page.clamp(MIN_RESULTS_PER_PAGE, MAX_RESULTS_PER_PAGE);
        self
    }

    pub fn sort(mut self, sort: SearchSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Query sent upstream: archived repositories are excluded unless the
    /// caller already filtered on archived state.
    pub fn effective_query(&self) -> String {
        if self.query.contains("archived:") {
            self.query.clone()
        } else {
            format!("{} archived:false", self.query)
        }
    }

    /// Convert to query string parameters for `/search/repositories`.
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("q", self.effective_query()),
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
            ("sort", self.sort.as_str().to_string()),
            ("order", self.order.as_str().to_string()),
        ]
    }
}

/// One page of results with the total reported by GitHub
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    pub items: Vec<T>,
    /// Total matching items across all pages
    pub total_count: usize,
    /// Page this response holds (1-indexed)
    pub page: usize,
    pub per_page: usize,
}

impl<T> PagedResponse<T> {
    pub fn new(items: Vec<T>, total_count: usize, page: usize, per_page: usize) -> Self {
        Self {
            items,
            total_count,
            page,
            per_page,
        }
    }

    /// Total number of pages.
    pub fn total_pages(&self) -> usize {
        if self.per_page == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.per_page)
    }

    /// Check if there are more pages after this one.
    pub fn has_more_pages(&self) -> bool {
        self.page < self.total_pages()
    }
}
