//! Prismic REST API payloads and their conversion into post models

use serde::{Deserialize, Deserializer};

use crate::content::{ContentBlock, PostDetail, PostPage, PostSummary, TextBlock};
use crate::helpers::parse_timestamp;

/// Response of the API root, listing the content refs
#[derive(Debug, Clone, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub refs: Vec<ApiRef>,
}

impl ApiInfo {
    /// The ref pointing at the currently published content
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRef {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

/// One page of search results
#[derive(Debug, Clone, Deserialize)]
pub struct ApiPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub results: Vec<Document>,
}

impl From<ApiPage> for PostPage {
    fn from(page: ApiPage) -> Self {
        PostPage {
            next_page: page.next_page,
            results: page.results.into_iter().map(Document::into_summary).collect(),
        }
    }
}

/// A post document
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub data: PostFields,
}

/// The `data` object of a post document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostFields {
    #[serde(deserialize_with = "text_field")]
    pub title: String,
    #[serde(deserialize_with = "text_field")]
    pub subtitle: String,
    #[serde(deserialize_with = "text_field")]
    pub author: String,
    #[serde(deserialize_with = "nullable")]
    pub banner: Image,
    #[serde(deserialize_with = "nullable")]
    pub content: Vec<Section>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Image {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Section {
    #[serde(deserialize_with = "text_field")]
    pub heading: String,
    #[serde(deserialize_with = "nullable")]
    pub body: Vec<RichTextNode>,
}

/// A rich-text paragraph; spans and types are not rendered
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RichTextNode {
    #[serde(deserialize_with = "nullable")]
    pub text: String,
}

/// Key-text fields arrive as plain strings, rich-text fields as node lists
#[derive(Deserialize)]
#[serde(untagged)]
enum TextValue {
    Plain(String),
    Rich(Vec<RichTextNode>),
    Empty(()),
}

fn text_field<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match TextValue::deserialize(deserializer)? {
        TextValue::Plain(s) => s,
        TextValue::Rich(nodes) => nodes
            .into_iter()
            .map(|n| n.text)
            .collect::<Vec<_>>()
            .join(" "),
        TextValue::Empty(()) => String::new(),
    })
}

/// Treat an explicit `null` like an absent field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Document {
    fn publication_date(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let raw = self.first_publication_date.as_deref()?;
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            tracing::warn!("Unparseable publication date on {}: {}", self.id, raw);
        }
        parsed
    }

    fn uid_or_id(&self) -> String {
        self.uid.clone().unwrap_or_else(|| self.id.clone())
    }

    /// Reduce to the fields the listing shows
    pub fn into_summary(self) -> PostSummary {
        PostSummary {
            uid: self.uid_or_id(),
            first_publication_date: self.publication_date(),
            title: self.data.title,
            subtitle: self.data.subtitle,
            author: self.data.author,
        }
    }

    /// Convert into a full post
    pub fn into_detail(self) -> PostDetail {
        let uid = self.uid_or_id();
        let first_publication_date = self.publication_date();
        let data = self.data;

        PostDetail {
            uid,
            first_publication_date,
            title: data.title,
            banner_url: data.banner.url.unwrap_or_default(),
            author: data.author,
            content: data
                .content
                .into_iter()
                .map(|section| ContentBlock {
                    heading: section.heading,
                    body: section
                        .body
                        .into_iter()
                        .map(|node| TextBlock::new(node.text))
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const SEARCH_RESPONSE: &str = r#"{
        "page": 1,
        "results_per_page": 2,
        "total_pages": 2,
        "next_page": "https://repo.cdn.prismic.io/api/v2/documents/search?ref=X&page=2&pageSize=2",
        "prev_page": null,
        "results": [
            {
                "id": "YF0b",
                "uid": "como-utilizar-hooks",
                "type": "post",
                "first_publication_date": "2021-03-25T19:25:28+0000",
                "data": {
                    "title": "Como utilizar Hooks",
                    "subtitle": "Pensando em sincronização em vez de ciclos de vida",
                    "author": "Joseph Oliveira"
                }
            },
            {
                "id": "YF0c",
                "uid": "criando-um-app-cra-do-zero",
                "type": "post",
                "first_publication_date": null,
                "data": {
                    "title": "Criando um app CRA do zero",
                    "subtitle": "Tudo sobre como criar a sua primeira aplicação",
                    "author": "Danilo Vieira"
                }
            }
        ]
    }"#;

    #[test]
    fn test_page_conversion() {
        let api: ApiPage = serde_json::from_str(SEARCH_RESPONSE).unwrap();
        let page = PostPage::from(api);

        assert!(page.next_page.as_deref().unwrap().contains("page=2"));
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].uid, "como-utilizar-hooks");
        assert_eq!(page.results[0].author, "Joseph Oliveira");
        assert_eq!(
            page.results[0].first_publication_date,
            Some(Utc.with_ymd_and_hms(2021, 3, 25, 19, 25, 28).unwrap())
        );
        assert_eq!(page.results[1].first_publication_date, None);
    }

    #[test]
    fn test_detail_conversion() {
        let json = r#"{
            "id": "YF0b",
            "uid": "como-utilizar-hooks",
            "type": "post",
            "first_publication_date": "2021-03-25T19:25:28+0000",
            "data": {
                "title": "Como utilizar Hooks",
                "banner": { "url": "https://images.prismic.io/banner.png" },
                "author": "Joseph Oliveira",
                "content": [
                    {
                        "heading": "Proin et varius",
                        "body": [
                            { "type": "paragraph", "text": "Lorem ipsum.", "spans": [] },
                            { "type": "paragraph", "text": "Nullam dolor.", "spans": [] }
                        ]
                    },
                    { "heading": "Cras laoreet", "body": [] }
                ]
            }
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        let post = doc.into_detail();

        assert_eq!(post.uid, "como-utilizar-hooks");
        assert_eq!(post.banner_url, "https://images.prismic.io/banner.png");
        assert_eq!(post.content.len(), 2);
        assert_eq!(post.content[0].heading, "Proin et varius");
        assert_eq!(
            post.content[0].body,
            vec![TextBlock::new("Lorem ipsum."), TextBlock::new("Nullam dolor.")]
        );
        assert!(post.content[1].body.is_empty());
    }

    #[test]
    fn test_missing_fields_default() {
        let doc: Document = serde_json::from_str(r#"{"id": "abc", "data": {}}"#).unwrap();
        let post = doc.into_detail();
        assert_eq!(post.uid, "abc");
        assert_eq!(post.title, "");
        assert_eq!(post.banner_url, "");
        assert!(post.content.is_empty());
    }

    #[test]
    fn test_rich_text_title() {
        let json = r#"{
            "id": "x",
            "data": {
                "title": [{ "type": "heading1", "text": "Rich", "spans": [] }],
                "author": null
            }
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        let summary = doc.into_summary();
        assert_eq!(summary.title, "Rich");
        assert_eq!(summary.author, "");
    }

    #[test]
    fn test_null_fields_default() {
        let json = r#"{
            "id": "x",
            "uid": "nulls",
            "data": {
                "title": "Nulls",
                "banner": null,
                "content": [
                    { "heading": null, "body": null },
                    { "heading": "Body", "body": [{ "type": "paragraph", "text": null }] }
                ]
            }
        }"#;
        let post = serde_json::from_str::<Document>(json).unwrap().into_detail();
        assert_eq!(post.banner_url, "");
        assert_eq!(post.content.len(), 2);
        assert!(post.content[0].body.is_empty());
        assert_eq!(post.content[1].body, vec![TextBlock::new("")]);

        let doc: Document =
            serde_json::from_str(r#"{"id": "y", "data": {"content": null}}"#).unwrap();
        assert!(doc.into_detail().content.is_empty());

        let page: ApiPage = serde_json::from_str(
            r#"{"next_page": null, "results": [{"id": "z", "uid": "z", "data": null}]}"#,
        )
        .unwrap();
        assert_eq!(PostPage::from(page).results[0].uid, "z");
    }

    #[test]
    fn test_master_ref() {
        let json = r#"{"refs": [
            {"id": "preview", "ref": "P1", "isMasterRef": false},
            {"id": "master", "ref": "YF0cAA", "isMasterRef": true}
        ]}"#;
        let info: ApiInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.master_ref(), Some("YF0cAA"));
    }
}
