//! Initialize a new blog directory

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

use crate::CONFIG_FILE;

const DEFAULT_CONFIG: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
description: ''
language: pt-BR
timezone: UTC
date_format: dd MMM yyyy

# URL
url: http://localhost:4000
root: /

# Directory
public_dir: public

# Content source
## Endpoint and token can also be set with PRISMIC_API_ENDPOINT / PRISMIC_ACCESS_TOKEN
cms:
  endpoint: https://spacetraveling.cdn.prismic.io/api/v2
  access_token: ''
  document_type: post
  page_size: 20
  timeout_secs: 10
  ## Serve the bundled sample posts instead of the CMS
  # fixture: fixtures/posts.json

# Post pages
## placeholder: answer with a loading page while a post is fetched
## blocking: hold the request until the post is fetched
fallback: placeholder
revalidate_secs: 1800
max_pages: 50
"#;

const SAMPLE_FIXTURE: &str = r#"{
  "pages": [
    [
      {
        "uid": "hello-world",
        "first_publication_date": "2021-03-25T19:25:28Z",
        "title": "Hello World",
        "subtitle": "Your very first post",
        "author": "spacetraveling"
      }
    ]
  ],
  "posts": [
    {
      "uid": "hello-world",
      "first_publication_date": "2021-03-25T19:25:28Z",
      "title": "Hello World",
      "banner_url": "",
      "author": "spacetraveling",
      "content": [
        {
          "heading": "Quick Start",
          "body": [
            { "text": "Point cms.endpoint at your Prismic repository and run the server." }
          ]
        }
      ]
    }
  ]
}
"#;

/// Initialize a new blog in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        bail!("{:?} already exists", config_path);
    }

    fs::create_dir_all(target_dir.join("fixtures"))?;
    fs::write(&config_path, DEFAULT_CONFIG)?;
    fs::write(target_dir.join("fixtures/posts.json"), SAMPLE_FIXTURE)?;

    Ok(())
}
