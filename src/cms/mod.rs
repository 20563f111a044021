//! Headless CMS access
//!
//! Pages talk to the CMS through the [`ContentSource`] trait. The
//! [`PrismicClient`] implementation speaks the Prismic REST API; the
//! [`MemorySource`] serves a fixed set of posts from memory or a JSON file.

mod document;
mod error;
mod memory;
mod prismic;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::config::CmsConfig;
use crate::content::{PostDetail, PostPage};

pub use document::{ApiInfo, ApiPage, ApiRef, Document};
pub use error::CmsError;
pub use memory::MemorySource;
pub use prismic::PrismicClient;

/// A source of blog posts
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Query documents matching a predicate
    async fn query(&self, predicate: &Predicate, options: &QueryOptions)
        -> Result<PostPage, CmsError>;

    /// Fetch a single document of the given type by its UID
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<PostDetail>, CmsError>;

    /// Follow a `next_page` pointer returned by an earlier query
    async fn fetch_next(&self, url: &str) -> Result<PostPage, CmsError>;
}

/// Build the content source described by the configuration
pub fn from_config(config: &CmsConfig) -> anyhow::Result<Arc<dyn ContentSource>> {
    match &config.fixture {
        Some(path) => {
            tracing::info!("Serving content from fixture {:?}", path);
            Ok(Arc::new(MemorySource::load(path)?))
        }
        None => {
            tracing::debug!("Using CMS endpoint {}", config.endpoint);
            Ok(Arc::new(PrismicClient::new(config)?))
        }
    }
}

/// Document query predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `path` equals `value`
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At {
            path: path.into(),
            value: value.into(),
        }
    }

    /// All documents of a custom type
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    /// The document of a custom type carrying `uid`
    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Self::at(format!("my.{}.uid", doc_type), uid)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::At { path, value } => {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "[at({}, \"{}\")]", path, escaped)
            }
        }
    }
}

/// Paging options for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub page_size: u32,
    /// 1-based page number
    pub page: u32,
}

impl QueryOptions {
    pub fn first(page_size: u32) -> Self {
        Self { page_size, page: 1 }
    }
}
