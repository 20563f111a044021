//! In-memory content source
//!
//! Serves a fixed list of pages, e.g. from a JSON fixture for running the
//! site offline. Next-page pointers take the form `memory://page/N`.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::{CmsError, ContentSource, Predicate, QueryOptions};
use crate::content::{PostDetail, PostPage, PostSummary};

const PAGE_SCHEME: &str = "memory://page/";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemorySource {
    /// Listing pages in fetch order
    #[serde(default)]
    pages: Vec<Vec<PostSummary>>,
    /// Full posts, looked up by uid
    #[serde(default)]
    posts: Vec<PostDetail>,
}

impl MemorySource {
    pub fn new(pages: Vec<Vec<PostSummary>>, posts: Vec<PostDetail>) -> Self {
        Self { pages, posts }
    }

    /// Load a fixture file of the form `{"pages": [[summary..]..], "posts": [detail..]}`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Pointer to the 1-based page `number`
    pub fn page_url(number: usize) -> String {
        format!("{}{}", PAGE_SCHEME, number)
    }

    fn page(&self, number: usize) -> PostPage {
        let results = number
            .checked_sub(1)
            .and_then(|index| self.pages.get(index))
            .cloned()
            .unwrap_or_default();
        let next_page = (number < self.pages.len()).then(|| Self::page_url(number + 1));
        PostPage { next_page, results }
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn query(
        &self,
        _predicate: &Predicate,
        options: &QueryOptions,
    ) -> Result<PostPage, CmsError> {
        Ok(self.page(options.page as usize))
    }

    async fn get_by_uid(&self, _doc_type: &str, uid: &str) -> Result<Option<PostDetail>, CmsError> {
        Ok(self.posts.iter().find(|p| p.uid == uid).cloned())
    }

    async fn fetch_next(&self, url: &str) -> Result<PostPage, CmsError> {
        let number = url
            .strip_prefix(PAGE_SCHEME)
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| CmsError::ForeignPageUrl(url.to_string()))?;
        Ok(self.page(number))
    }
}
