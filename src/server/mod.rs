//! HTTP server rendering the blog from the CMS

mod posts;

pub use posts::{Lookup, PostCache};

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::cms::{CmsError, ContentSource};
use crate::config::SiteConfig;
use crate::helpers::{listing_path, url_for, DateFormatter};
use crate::listing::PostListing;
use crate::templates::{LoadMore, PostCard, PostView, TemplateRenderer, STYLESHEET};
use crate::Blog;

/// Server state
pub struct AppState {
    config: SiteConfig,
    source: Arc<dyn ContentSource>,
    renderer: TemplateRenderer,
    formatter: DateFormatter,
    posts: Arc<PostCache>,
}

impl AppState {
    pub fn new(config: SiteConfig, source: Arc<dyn ContentSource>) -> Result<Self> {
        let renderer = TemplateRenderer::new(&config)?;
        let formatter = DateFormatter::from_config(&config)?;
        let posts = Arc::new(PostCache::new(source.clone(), &config));

        Ok(Self {
            config,
            source,
            renderer,
            formatter,
            posts,
        })
    }

    /// Render every post on the first listing page into the cache
    pub async fn prebuild(&self) -> Result<usize> {
        let listing = PostListing::first_page(self.source.as_ref(), &self.config.cms).await?;
        let slugs = listing.into_posts().into_iter().map(|p| p.uid);
        Ok(self.posts.prebuild(slugs).await)
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/post/:slug", get(post_handler))
        .route("/api/posts", get(next_page_handler))
        .route("/style.css", get(stylesheet_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, prebuild: bool) -> Result<()> {
    let source = blog.content_source()?;
    let state = Arc::new(AppState::new(blog.config.clone(), source)?);

    if prebuild {
        tracing::info!("Pre-rendering posts...");
        let built = state.prebuild().await?;
        println!("Pre-rendered {} posts", built);
    }

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct HomeQuery {
    pages: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct NextPageQuery {
    next: String,
}

#[derive(Debug, Serialize)]
struct NextPageResponse {
    results: Vec<PostCard>,
    next_page: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

async fn home_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HomeQuery>,
) -> Response {
    let pages = query.pages.unwrap_or(1).clamp(1, state.config.max_pages.max(1));

    let listing =
        match PostListing::load_pages(state.source.as_ref(), &state.config.cms, pages).await {
            Ok(listing) => listing,
            Err(e) => return failure(&state, "listing", &e),
        };

    let cards = PostCard::from_summaries(listing.posts(), &state.config, &state.formatter);
    let loaded = listing.pages_loaded();
    let load_more = listing.next_page().map(|next| LoadMore {
        href: listing_path(&state.config, loaded + 1),
        api: Some(url_for(&state.config, "api/posts")),
        next_page: Some(next.to_string()),
    });

    page(&state, state.renderer.home(&cards, loaded, load_more.as_ref()))
}

async fn post_handler(State(state): State<Arc<AppState>>, Path(slug): Path<String>) -> Response {
    match state.posts.lookup(&slug).await {
        Lookup::Ready(post) => {
            let view = PostView::new(&post, &state.config, &state.formatter);
            page(&state, state.renderer.post(&view))
        }
        Lookup::Loading => page(&state, state.renderer.loading()),
        Lookup::NotFound => not_found(&state),
        Lookup::Failed(message) => {
            tracing::error!("Post {} unavailable: {}", slug, message);
            error_page(&state)
        }
    }
}

async fn next_page_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NextPageQuery>,
) -> Response {
    match state.source.fetch_next(&query.next).await {
        Ok(page) => {
            let results = PostCard::from_summaries(&page.results, &state.config, &state.formatter);
            Json(NextPageResponse {
                results,
                next_page: page.next_page,
            })
            .into_response()
        }
        Err(e) if e.is_bad_request() => {
            tracing::warn!("Rejected next page pointer: {}", e);
            let body = ApiError {
                error: e.to_string(),
            };
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to load next page: {}", e);
            let body = ApiError {
                error: "content source unavailable".to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn stylesheet_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

async fn not_found_handler(State(state): State<Arc<AppState>>) -> Response {
    not_found(&state)
}

/// Turn a rendered template into a response
fn page(state: &AppState, rendered: Result<String>) -> Response {
    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template error: {:#}", e);
            error_page(state)
        }
    }
}

fn not_found(state: &AppState) -> Response {
    match state.renderer.not_found() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

fn failure(state: &AppState, what: &str, error: &CmsError) -> Response {
    tracing::error!("Failed to load {}: {}", what, error);
    error_page(state)
}

fn error_page(state: &AppState) -> Response {
    match state.renderer.error() {
        Ok(html) => (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}
