//! Built-in page templates using the Tera template engine
//!
//! Templates are embedded in the binary; values coming from the CMS are
//! HTML-escaped by Tera's autoescaping.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{ContentBlock, PostDetail, PostSummary};
use crate::helpers::{date_xml, full_url_for, post_path, url_for, DateFormatter};

/// Stylesheet shared by all pages
pub const STYLESHEET: &str = include_str!("site/style.css");

/// Seconds between reloads of the loading placeholder
const LOADING_REFRESH_SECS: u64 = 1;

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
    site: SiteData,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("home.html", include_str!("site/home.html")),
            ("post.html", include_str!("site/post.html")),
            ("loading.html", include_str!("site/loading.html")),
            ("not_found.html", include_str!("site/not_found.html")),
            ("error.html", include_str!("site/error.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
            (
                "partials/post_card.html",
                include_str!("site/partials/post_card.html"),
            ),
        ])?;

        Ok(Self {
            tera,
            site: SiteData::new(config),
        })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context
    }

    /// Home page with the listed posts and an optional load-more control
    pub fn home(&self, posts: &[PostCard], pages: usize, load_more: Option<&LoadMore>) -> Result<String> {
        let mut context = self.context();
        context.insert("posts", posts);
        context.insert("pages", &pages);
        context.insert("load_more", &load_more);
        self.render("home.html", &context)
    }

    /// Post detail page
    pub fn post(&self, post: &PostView) -> Result<String> {
        let mut context = self.context();
        context.insert("post", post);
        self.render("post.html", &context)
    }

    /// Placeholder shown while a post is being fetched
    pub fn loading(&self) -> Result<String> {
        let mut context = self.context();
        context.insert("refresh_secs", &LOADING_REFRESH_SECS);
        self.render("loading.html", &context)
    }

    pub fn not_found(&self) -> Result<String> {
        self.render("not_found.html", &self.context())
    }

    /// Generic failure page; error details stay in the logs
    pub fn error(&self) -> Result<String> {
        self.render("error.html", &self.context())
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub root: String,
    pub stylesheet: String,
}

impl SiteData {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            root: url_for(config, ""),
            stylesheet: url_for(config, "style.css"),
        }
    }
}

/// A post on the listing page, with its date already formatted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCard {
    pub uid: String,
    pub href: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: Option<String>,
    pub datetime: Option<String>,
}

impl PostCard {
    pub fn new(summary: &PostSummary, config: &SiteConfig, formatter: &DateFormatter) -> Self {
        Self {
            uid: summary.uid.clone(),
            href: post_path(config, &summary.uid),
            title: summary.title.clone(),
            subtitle: summary.subtitle.clone(),
            author: summary.author.clone(),
            date: summary.first_publication_date.map(|d| formatter.format(&d)),
            datetime: summary.first_publication_date.map(|d| date_xml(&d)),
        }
    }

    pub fn from_summaries(
        summaries: &[PostSummary],
        config: &SiteConfig,
        formatter: &DateFormatter,
    ) -> Vec<Self> {
        summaries
            .iter()
            .map(|s| Self::new(s, config, formatter))
            .collect()
    }
}

/// The load-more control of the home page
#[derive(Debug, Clone, Serialize)]
pub struct LoadMore {
    /// Link showing one more page, used without script
    pub href: String,
    /// JSON endpoint for in-place loading, absent on static output
    pub api: Option<String>,
    /// Pointer handed to `api`
    pub next_page: Option<String>,
}

/// A post on its detail page
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub uid: String,
    pub permalink: String,
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub date: Option<String>,
    pub datetime: Option<String>,
    pub content: Vec<ContentBlock>,
}

impl PostView {
    pub fn new(post: &PostDetail, config: &SiteConfig, formatter: &DateFormatter) -> Self {
        Self {
            uid: post.uid.clone(),
            permalink: full_url_for(config, &post_path(config, &post.uid)),
            title: post.title.clone(),
            banner_url: post.banner_url.clone(),
            author: post.author.clone(),
            date: post.first_publication_date.map(|d| formatter.format(&d)),
            datetime: post.first_publication_date.map(|d| date_xml(&d)),
            content: post.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::TextBlock;
    use chrono::{TimeZone, Utc};

    fn setup() -> (SiteConfig, DateFormatter, TemplateRenderer) {
        let config = SiteConfig::default();
        let formatter = DateFormatter::from_config(&config).unwrap();
        let renderer = TemplateRenderer::new(&config).unwrap();
        (config, formatter, renderer)
    }

    fn summary(uid: &str, title: &str) -> PostSummary {
        PostSummary {
            uid: uid.to_string(),
            first_publication_date: Some(Utc.with_ymd_and_hms(2021, 3, 25, 19, 25, 28).unwrap()),
            title: title.to_string(),
            subtitle: "Subtitle".to_string(),
            author: "Joseph Oliveira".to_string(),
        }
    }

    #[test]
    fn test_post_card_formats_date() {
        let (config, formatter, _) = setup();
        let card = PostCard::new(&summary("hooks", "Hooks"), &config, &formatter);
        assert_eq!(card.href, "/post/hooks");
        assert_eq!(card.date.as_deref(), Some("25 mar 2021"));
        assert_eq!(card.datetime.as_deref(), Some("2021-03-25T19:25:28+00:00"));
    }

    #[test]
    fn test_home_lists_posts_in_order() {
        let (config, formatter, renderer) = setup();
        let cards = PostCard::from_summaries(
            &[summary("first", "First post"), summary("second", "Second post")],
            &config,
            &formatter,
        );
        let html = renderer.home(&cards, 1, None).unwrap();

        assert!(html.contains("<title>Home | spacetraveling</title>"));
        let first = html.find("First post").unwrap();
        let second = html.find("Second post").unwrap();
        assert!(first < second);
        assert!(html.contains(r#"href="/post/first""#));
        assert!(html.contains("25 mar 2021"));
    }

    #[test]
    fn test_home_without_next_page_has_no_load_more() {
        let (config, formatter, renderer) = setup();
        let cards = PostCard::from_summaries(&[summary("a", "A")], &config, &formatter);
        let html = renderer.home(&cards, 1, None).unwrap();
        assert!(!html.contains("load-more\""));
        assert!(!html.contains("Carregar mais posts"));
    }

    #[test]
    fn test_home_with_next_page_has_load_more() {
        let (config, formatter, renderer) = setup();
        let cards = PostCard::from_summaries(&[summary("a", "A")], &config, &formatter);
        let load_more = LoadMore {
            href: "/?pages=2".to_string(),
            api: Some("/api/posts".to_string()),
            next_page: Some("memory://page/2".to_string()),
        };
        let html = renderer.home(&cards, 1, Some(&load_more)).unwrap();
        assert!(html.contains("Carregar mais posts"));
        assert!(html.contains(r#"href="/?pages=2""#));
        assert!(html.contains(r#"data-api="/api/posts""#));
    }

    #[test]
    fn test_post_page() {
        let (config, formatter, renderer) = setup();
        let post = PostDetail {
            uid: "hooks".to_string(),
            first_publication_date: Some(Utc.with_ymd_and_hms(2021, 3, 25, 19, 25, 28).unwrap()),
            title: "Como utilizar Hooks".to_string(),
            banner_url: "https://images.prismic.io/banner.png".to_string(),
            author: "Joseph Oliveira".to_string(),
            content: vec![ContentBlock {
                heading: "Proin et varius".to_string(),
                body: vec![TextBlock::new("Lorem ipsum."), TextBlock::new("Nullam <b>dolor</b>.")],
            }],
        };
        let html = renderer
            .post(&PostView::new(&post, &config, &formatter))
            .unwrap();

        assert!(html.contains("<title>Como utilizar Hooks | spacetraveling</title>"));
        assert!(html.contains("<h1>Como utilizar Hooks</h1>"));
        assert!(html.contains(r#"class="banner""#));
        assert!(html.contains("<h2>Proin et varius</h2>"));
        assert!(html.contains("<p>Lorem ipsum.</p>"));
        // CMS text is escaped
        assert!(html.contains("Nullam &lt;b&gt;dolor&lt;&#x2F;b&gt;."));
        assert!(html.contains("25 mar 2021"));
    }

    #[test]
    fn test_loading_page() {
        let (_, _, renderer) = setup();
        let html = renderer.loading().unwrap();
        assert!(html.contains("Carregando..."));
        assert!(html.contains(r#"http-equiv="refresh""#));
    }

    #[test]
    fn test_not_found_and_error_pages() {
        let (_, _, renderer) = setup();
        assert!(renderer.not_found().unwrap().contains("404"));
        assert!(renderer.error().unwrap().contains("Algo deu errado"));
    }
}
