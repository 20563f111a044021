//! Prismic REST API client

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::document::{ApiInfo, ApiPage};
use super::{CmsError, ContentSource, Predicate, QueryOptions};
use crate::config::CmsConfig;
use crate::content::{PostDetail, PostPage};

/// Client for a Prismic repository's `api/v2` endpoint
#[derive(Debug, Clone)]
pub struct PrismicClient {
    http: Client,
    endpoint: Url,
    access_token: Option<String>,
}

impl PrismicClient {
    /// Create a client from the CMS configuration
    pub fn new(config: &CmsConfig) -> Result<Self, CmsError> {
        let endpoint = Url::parse(config.endpoint.trim_end_matches('/'))?;
        let http = Client::builder()
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// The ref of the currently published content
    ///
    /// Looked up on every query so that newly published documents show up
    /// without restarting.
    async fn master_ref(&self) -> Result<String, CmsError> {
        let mut url = self.endpoint.clone();
        self.authorize(&mut url);
        let info: ApiInfo = self.get_json(url).await?;
        info.master_ref()
            .map(str::to_string)
            .ok_or(CmsError::NoMasterRef)
    }

    async fn search(&self, predicates: &[Predicate], options: &QueryOptions) -> Result<ApiPage, CmsError> {
        let master = self.master_ref().await?;
        let q: String = predicates.iter().map(ToString::to_string).collect();

        let mut url = self.search_url()?;
        url.query_pairs_mut()
            .append_pair("ref", &master)
            .append_pair("q", &format!("[{}]", q))
            .append_pair("pageSize", &options.page_size.to_string())
            .append_pair("page", &options.page.to_string());
        self.authorize(&mut url);

        tracing::debug!("Querying CMS: {}", q);
        self.get_json(url).await
    }

    fn search_url(&self) -> Result<Url, CmsError> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}/documents/search", base))?)
    }

    fn authorize(&self, url: &mut Url) {
        if let Some(token) = &self.access_token {
            let present = url.query_pairs().any(|(k, _)| k == "access_token");
            if !present {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }
    }

    /// Whether `url` points at this client's repository
    fn owns(&self, url: &Url) -> bool {
        url.scheme() == self.endpoint.scheme()
            && url.host_str() == self.endpoint.host_str()
            && url.port_or_known_default() == self.endpoint.port_or_known_default()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CmsError> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status {
                status: status.as_u16(),
                url: redact(&url),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn query(
        &self,
        predicate: &Predicate,
        options: &QueryOptions,
    ) -> Result<PostPage, CmsError> {
        let page = self.search(std::slice::from_ref(predicate), options).await?;
        tracing::debug!(
            "Fetched page {} of {} ({} results)",
            page.page,
            page.total_pages,
            page.results.len()
        );
        Ok(page.into())
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<PostDetail>, CmsError> {
        let predicates = [Predicate::document_type(doc_type), Predicate::uid(doc_type, uid)];
        let page = self.search(&predicates, &QueryOptions::first(1)).await?;
        Ok(page.results.into_iter().next().map(|doc| doc.into_detail()))
    }

    async fn fetch_next(&self, url: &str) -> Result<PostPage, CmsError> {
        let mut next = Url::parse(url).map_err(|_| CmsError::ForeignPageUrl(url.to_string()))?;
        if !self.owns(&next) {
            return Err(CmsError::ForeignPageUrl(url.to_string()));
        }
        self.authorize(&mut next);

        let page: ApiPage = self.get_json(next).await?;
        Ok(page.into())
    }
}

/// Strip the access token before a URL ends up in logs or error pages
fn redact(url: &Url) -> String {
    let mut clean = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "access_token")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(pairs);
    }
    clean.to_string()
}
