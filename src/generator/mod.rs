//! Generator module - writes the blog out as static HTML files

use anyhow::Result;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::cms::ContentSource;
use crate::helpers::{encode_segment, static_listing_path, DateFormatter};
use crate::listing::PostListing;
use crate::templates::{LoadMore, PostCard, PostView, TemplateRenderer, STYLESHEET};
use crate::Blog;

/// What a generation run produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateStats {
    pub listing_pages: usize,
    pub posts: usize,
}

/// Static site generator
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
    formatter: DateFormatter,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        let renderer = TemplateRenderer::new(&blog.config)?;
        let formatter = DateFormatter::from_config(&blog.config)?;

        Ok(Self {
            blog: blog.clone(),
            renderer,
            formatter,
        })
    }

    /// Generate the entire site
    ///
    /// `index.html` holds the first page of posts and `page/N/index.html` the
    /// first N pages, so the load-more link works without a server. Every
    /// listed uid gets one `post/<uid>/index.html`, even when the source
    /// lists it more than once.
    pub async fn generate(&self, source: &dyn ContentSource) -> Result<GenerateStats> {
        let public_dir = &self.blog.public_dir;
        let config = &self.blog.config;
        fs::create_dir_all(public_dir)?;
        fs::write(public_dir.join("style.css"), STYLESHEET)?;

        let mut stats = GenerateStats::default();

        // Listing pages
        let mut listing = PostListing::first_page(source, &config.cms).await?;
        loop {
            let pages = listing.pages_loaded();
            let cards = PostCard::from_summaries(listing.posts(), config, &self.formatter);
            let load_more = listing.can_load_more().then(|| LoadMore {
                href: static_listing_path(config, pages + 1),
                api: None,
                next_page: None,
            });
            let html = self.renderer.home(&cards, pages, load_more.as_ref())?;

            let dir = if pages == 1 {
                public_dir.to_path_buf()
            } else {
                public_dir.join("page").join(pages.to_string())
            };
            write_page(&dir, &html)?;
            stats.listing_pages += 1;

            if !listing.can_load_more() || pages >= config.max_pages {
                break;
            }
            listing.load_more(source).await?;
        }

        // Post pages
        let mut written = HashSet::new();
        for summary in listing.posts() {
            if !written.insert(summary.uid.as_str()) {
                continue;
            }
            match source.get_by_uid(&config.cms.document_type, &summary.uid).await? {
                Some(post) => {
                    let view = PostView::new(&post, config, &self.formatter);
                    let html = self.renderer.post(&view)?;
                    let dir = public_dir.join("post").join(encode_segment(&post.uid));
                    write_page(&dir, &html)?;
                    stats.posts += 1;
                }
                None => tracing::warn!("Listed post {} has no document", summary.uid),
            }
        }

        let not_found = self.renderer.not_found()?;
        fs::write(public_dir.join("404.html"), not_found)?;

        Ok(stats)
    }
}

fn write_page(dir: &Path, html: &str) -> Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join("index.html");
    fs::write(&path, html)?;
    tracing::debug!("Generated: {:?}", path);
    Ok(())
}
