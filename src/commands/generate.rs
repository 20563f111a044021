//! Generate the static site

use anyhow::Result;
use std::time::Instant;

use crate::generator::{GenerateStats, Generator};
use crate::Blog;

/// Fetch all listed posts and write them to the public directory
pub async fn run(blog: &Blog) -> Result<GenerateStats> {
    let start = Instant::now();

    let source = blog.content_source()?;
    let generator = Generator::new(blog)?;
    let stats = generator.generate(source.as_ref()).await?;

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} listing pages and {} posts in {:.2}s",
        stats.listing_pages,
        stats.posts,
        duration.as_secs_f64()
    );

    Ok(stats)
}
