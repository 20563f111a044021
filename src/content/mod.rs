//! Content module - post models shared by the CMS client and the pages

mod post;

pub use post::{ContentBlock, PostDetail, PostPage, PostSummary, TextBlock};
