//! Paginated post listing
//!
//! The listing starts from the first page of a query and grows by following
//! the `next_page` pointer. Pages are concatenated in fetch order; posts that
//! the backend repeats across pages are kept twice.

use crate::cms::{CmsError, ContentSource, Predicate, QueryOptions};
use crate::config::CmsConfig;
use crate::content::{PostPage, PostSummary};

/// Posts fetched so far plus the pointer to the next page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostListing {
    posts: Vec<PostSummary>,
    next_page: Option<String>,
    pages_loaded: usize,
}

impl PostListing {
    /// Start a listing from an already fetched page
    pub fn from_page(page: PostPage) -> Self {
        let mut listing = Self::default();
        listing.merge(page);
        listing
    }

    /// Fetch the first page of posts of the configured document type
    pub async fn first_page(source: &dyn ContentSource, cms: &CmsConfig) -> Result<Self, CmsError> {
        let predicate = Predicate::document_type(&cms.document_type);
        let page = source
            .query(&predicate, &QueryOptions::first(cms.page_size))
            .await?;
        Ok(Self::from_page(page))
    }

    /// Fetch the first page, then follow next-page pointers until `pages`
    /// pages are loaded or the pointers run out
    pub async fn load_pages(
        source: &dyn ContentSource,
        cms: &CmsConfig,
        pages: usize,
    ) -> Result<Self, CmsError> {
        let mut listing = Self::first_page(source, cms).await?;
        while listing.pages_loaded < pages && listing.can_load_more() {
            listing.load_more(source).await?;
        }
        Ok(listing)
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    /// Number of pages merged into this listing
    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    /// Load-more is offered only while a next-page pointer exists
    pub fn can_load_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Fetch the next page and append it
    ///
    /// Returns the number of posts appended, 0 when there is nothing left to
    /// load.
    pub async fn load_more(&mut self, source: &dyn ContentSource) -> Result<usize, CmsError> {
        let Some(url) = self.next_page.clone() else {
            return Ok(0);
        };

        let page = source.fetch_next(&url).await?;
        let added = self.merge(page);
        tracing::debug!("Loaded {} more posts from {}", added, url);
        Ok(added)
    }

    /// Append a page's results and take over its next-page pointer
    pub fn merge(&mut self, page: PostPage) -> usize {
        let added = page.results.len();
        self.posts.extend(page.results);
        self.next_page = page.next_page;
        self.pages_loaded += 1;
        added
    }

    pub fn into_posts(self) -> Vec<PostSummary> {
        self.posts
    }
}
