//! List posts from the content source

use anyhow::Result;

use crate::helpers::DateFormatter;
use crate::listing::PostListing;
use crate::Blog;

/// Print the first `pages` pages of posts
pub async fn run(blog: &Blog, pages: usize) -> Result<()> {
    let source = blog.content_source()?;
    let formatter = DateFormatter::from_config(&blog.config)?;
    let listing = PostListing::load_pages(source.as_ref(), &blog.config.cms, pages.max(1)).await?;

    println!("Posts ({}):", listing.posts().len());
    for post in listing.posts() {
        let date = post
            .first_publication_date
            .map(|d| formatter.format(&d))
            .unwrap_or_else(|| "unpublished".to_string());
        println!("  {} - {} [{}]", date, post.title, post.uid);
    }
    if listing.can_load_more() {
        println!("  ... more posts available");
    }

    Ok(())
}
