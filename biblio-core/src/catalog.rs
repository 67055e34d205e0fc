//! Book catalog client.
//!
//! A [`Catalog`] answers one question: "the first book matching this term, by
//! title, author or subject". It always keeps two outcomes apart:
//!
//! - `Ok(None)`: the catalog answered and found nothing (a miss)
//! - `Err(CatalogError)`: the catalog could not be asked (unreachable)
//!
//! What to do with an unreachable catalog is the orchestrator's decision.
//!
//! [`OpenLibraryCatalog`] talks to the Open Library search API and normalizes
//! its loosely typed documents into [`BookRecord`]s.

use async_trait::async_trait;
use biblio_common::config::CatalogConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Placeholder for any bibliographic field the catalog left blank.
pub const UNKNOWN: &str = "desconhecido";

// ============================================================================
// Book Record
// ============================================================================

/// A normalized catalog hit.
///
/// Title, authors and year are never blank: missing values become [`UNKNOWN`],
/// so text assembly downstream cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    title: String,
    authors: Vec<String>,
    publication_year: String,
    description: Option<String>,
    key: Option<String>,
}

impl BookRecord {
    pub fn new(
        title: Option<String>,
        authors: Vec<String>,
        publication_year: Option<String>,
        description: Option<String>,
    ) -> Self {
        let authors: Vec<String> = authors
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        Self {
            title: non_blank(title).unwrap_or_else(|| UNKNOWN.to_string()),
            authors: if authors.is_empty() {
                vec![UNKNOWN.to_string()]
            } else {
                authors
            },
            publication_year: non_blank(publication_year).unwrap_or_else(|| UNKNOWN.to_string()),
            description: non_blank(description),
            key: None,
        }
    }

    /// Attach the catalog's own identifier (e.g. "/works/OL893415W").
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = non_blank(Some(key.into()));
        self
    }

    /// Same record with a replaced description (used after translation).
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = non_blank(description);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn publication_year(&self) -> &str {
        &self.publication_year
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Authors joined for display: "A", "A e B", "A, B e C".
    pub fn authors_display(&self) -> String {
        match self.authors.as_slice() {
            [] => UNKNOWN.to_string(),
            [one] => one.clone(),
            [init @ .., last] => format!("{} e {}", init.join(", "), last),
        }
    }

    pub fn has_known_year(&self) -> bool {
        self.publication_year != UNKNOWN
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Search Kind
// ============================================================================

/// Lookup strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    Title,
    Author,
    Subject,
}

impl SearchKind {
    /// Order of the fallback sweep.
    pub const SWEEP_ORDER: [SearchKind; 3] = [SearchKind::Title, SearchKind::Author, SearchKind::Subject];

    /// Query parameter name on the search endpoint.
    pub fn query_param(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Subject => "subject",
        }
    }

    /// Portuguese label for user-facing text.
    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "título",
            Self::Author => "autor",
            Self::Subject => "assunto",
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_param())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// The catalog could not be asked. A zero-result answer is not an error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog request timed out")]
    Timeout,

    #[error("catalog transport error: {0}")]
    Transport(String),

    #[error("catalog returned HTTP {0}")]
    Status(u16),

    #[error("catalog response could not be decoded: {0}")]
    Decode(String),

    #[error("invalid catalog URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<url::ParseError> for CatalogError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}

// ============================================================================
// Catalog Trait
// ============================================================================

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Backend name (e.g., "openlibrary")
    fn name(&self) -> &str;

    /// First record matching `term` under the given strategy.
    async fn search(&self, kind: SearchKind, term: &str)
        -> Result<Option<BookRecord>, CatalogError>;

    async fn search_by_title(&self, term: &str) -> Result<Option<BookRecord>, CatalogError> {
        self.search(SearchKind::Title, term).await
    }

    async fn search_by_author(&self, term: &str) -> Result<Option<BookRecord>, CatalogError> {
        self.search(SearchKind::Author, term).await
    }

    async fn search_by_subject(&self, term: &str) -> Result<Option<BookRecord>, CatalogError> {
        self.search(SearchKind::Subject, term).await
    }

    /// Like [`search`](Catalog::search), for callers that only need to know
    /// which book matched. Backends may skip the description.
    async fn resolve(
        &self,
        kind: SearchKind,
        term: &str,
    ) -> Result<Option<BookRecord>, CatalogError> {
        self.search(kind, term).await
    }
}

// ============================================================================
// Open Library
// ============================================================================

const SEARCH_FIELDS: &str = "key,title,author_name,first_publish_year";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author_name: Vec<String>,
    #[serde(default)]
    first_publish_year: Option<YearValue>,
}

impl SearchDoc {
    fn into_record(self, description: Option<String>) -> BookRecord {
        let record = BookRecord::new(
            self.title,
            self.author_name,
            self.first_publish_year.map(YearValue::into_text),
            description,
        );
        match self.key {
            Some(key) => record.with_key(key),
            None => record,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YearValue {
    Number(i64),
    Text(String),
}

impl YearValue {
    fn into_text(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkResponse {
    #[serde(default)]
    description: Option<DescriptionValue>,
}

/// Work descriptions come either as a bare string or as `{"type", "value"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DescriptionValue {
    Text(String),
    Typed { value: String },
}

impl DescriptionValue {
    fn into_text(self) -> String {
        match self {
            Self::Text(s) | Self::Typed { value: s } => s,
        }
    }
}

/// Open Library (<https://openlibrary.org>) search client.
pub struct OpenLibraryCatalog {
    base: Url,
    language: Option<String>,
    client: Client,
}

impl OpenLibraryCatalog {
    pub fn new(base_url: &str, timeout: Duration, language: Option<&str>) -> Result<Self, CatalogError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            language: language
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
            client: Client::builder()
                .timeout(timeout)
                .connect_timeout(timeout.min(Duration::from_secs(10)))
                .build()
                .unwrap_or_else(|_| Client::new()),
        })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            Some(&config.language),
        )
    }

    fn search_url(&self, kind: SearchKind, term: &str) -> Result<Url, CatalogError> {
        let mut url = self.base.join("search.json")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(kind.query_param(), term);
            query.append_pair("limit", "1");
            query.append_pair("fields", SEARCH_FIELDS);
            if let Some(language) = &self.language {
                query.append_pair("language", language);
            }
        }
        Ok(url)
    }

    async fn first_doc(
        &self,
        kind: SearchKind,
        term: &str,
    ) -> Result<Option<SearchDoc>, CatalogError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(None);
        }

        let url = self.search_url(kind, term)?;
        tracing::debug!(kind = %kind, term = %term, "Catalog search");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;

        let doc = body.docs.into_iter().next();
        if doc.is_none() {
            tracing::debug!(kind = %kind, term = %term, "Catalog miss");
        }
        Ok(doc)
    }

    /// Description of a work, by its key ("/works/OL45804W").
    pub async fn fetch_description(&self, key: &str) -> Result<Option<String>, CatalogError> {
        let url = self
            .base
            .join(&format!("{}.json", key.trim_start_matches('/')))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let work: WorkResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;
        Ok(work
            .description
            .map(DescriptionValue::into_text)
            .filter(|d| !d.trim().is_empty()))
    }
}

#[async_trait]
impl Catalog for OpenLibraryCatalog {
    fn name(&self) -> &str {
        "openlibrary"
    }

    async fn search(
        &self,
        kind: SearchKind,
        term: &str,
    ) -> Result<Option<BookRecord>, CatalogError> {
        let Some(doc) = self.first_doc(kind, term).await? else {
            return Ok(None);
        };

        let description = match doc.key.as_deref() {
            Some(key) => self.fetch_description(key).await.unwrap_or_else(|e| {
                tracing::warn!(key = %key, error = %e, "Description fetch failed");
                None
            }),
            None => None,
        };
        Ok(Some(doc.into_record(description)))
    }

    async fn resolve(
        &self,
        kind: SearchKind,
        term: &str,
    ) -> Result<Option<BookRecord>, CatalogError> {
        Ok(self
            .first_doc(kind, term)
            .await?
            .map(|doc| doc.into_record(None)))
    }
}
