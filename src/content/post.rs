//! Post models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post as shown on the listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Unique identifier, also the slug of the detail page
    pub uid: String,

    /// First publication date, absent for documents never published
    #[serde(default)]
    pub first_publication_date: Option<DateTime<Utc>>,

    pub title: String,

    #[serde(default)]
    pub subtitle: String,

    #[serde(default)]
    pub author: String,
}

/// A full post as shown on the detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: String,

    #[serde(default)]
    pub first_publication_date: Option<DateTime<Utc>>,

    pub title: String,

    /// Banner image URL
    #[serde(default)]
    pub banner_url: String,

    #[serde(default)]
    pub author: String,

    /// Content sections in document order
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// A heading followed by its paragraphs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub heading: String,

    #[serde(default)]
    pub body: Vec<TextBlock>,
}

/// One paragraph of rich text, reduced to its plain text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub text: String,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// One page of summaries as returned by a single fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPage {
    /// Pointer to the following page, `None` on the last page
    pub next_page: Option<String>,
    pub results: Vec<PostSummary>,
}
