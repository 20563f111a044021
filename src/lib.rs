//! spacetraveling: a server-rendered blog front-end backed by a headless CMS
//!
//! Posts live in a Prismic repository. The home page lists post summaries a
//! page at a time and the detail page renders a single post; both are
//! served by an axum server or written out as static HTML.

pub mod cms;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod listing;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Name of the site configuration file
pub const CONFIG_FILE: &str = "_config.yml";

/// The main blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
}

impl Blog {
    /// Create a new blog instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No {} found, using defaults", CONFIG_FILE);
            config::SiteConfig::default()
        };
        config.apply_env();

        // Relative fixture paths are resolved against the site directory
        if let Some(fixture) = config.cms.fixture.as_mut() {
            if fixture.is_relative() {
                *fixture = base_dir.join(&*fixture);
            }
        }

        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
        })
    }

    /// The content source this blog reads from
    pub fn content_source(&self) -> Result<Arc<dyn cms::ContentSource>> {
        cms::from_config(&self.config.cms)
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<generator::GenerateStats> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
