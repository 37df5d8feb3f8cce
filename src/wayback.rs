//! A module for querying the [Wayback Machine](https://web.archive.org)
//! capture index and retrieving individual snapshots.

use url::Url;

use crate::error::{Error, Result};

static CDX_PATH: &str = "/cdx/search/cdx";
static HISTORY_FIELDS: &str = "timestamp,digest,length";
const NUM_HISTORY_FIELDS: usize = 3;

/// One capture of the target URL, as listed by the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryItem {
    /// Capture time, `yyyyMMddhhmmss`.
    pub timestamp: String,
    /// Archive-reported content digest. Not used for deduplication.
    pub digest: String,
    pub length: String,
}

impl HistoryItem {
    /// Builds an item from row `index` of the index table. Columns past the
    /// third are ignored.
    fn from_row(index: usize, row: Vec<String>) -> Result<Self> {
        let num_columns = row.len();
        let mut columns = row.into_iter();
        match (columns.next(), columns.next(), columns.next()) {
            (Some(timestamp), Some(digest), Some(length)) => Ok(Self {
                timestamp,
                digest,
                length,
            }),
            _ => Err(Error::Parse(format!(
                "row {} has {} columns, expected at least {}",
                index, num_columns, NUM_HISTORY_FIELDS
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CdxQuery {
    pub url: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i32>,
    pub filters: Vec<String>,
}

impl CdxQuery {
    /// Creates a query for every capture of `url`.
    ///
    /// # Errors
    ///
    /// Fails with a usage error if `url` is empty.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::Usage("url argument is required".into()));
        }
        Ok(Self {
            url,
            ..Self::default()
        })
    }
}

pub fn build_cdx_url(base_url: &str, query: &CdxQuery) -> Result<Url> {
    let mut params = vec![
        ("url", query.url.clone()),
        ("output", "json".to_string()),
        ("fl", HISTORY_FIELDS.to_string()),
    ];
    let str_nonempty = |s: &&String| !s.is_empty();
    if let Some(from) = query.from.as_ref().filter(str_nonempty) {
        params.push(("from", from.clone()));
    }
    if let Some(to) = query.to.as_ref().filter(str_nonempty) {
        params.push(("to", to.clone()));
    }
    if let Some(limit) = query.limit.filter(|limit| *limit != 0) {
        params.push(("limit", limit.to_string()));
    }
    for filter in query.filters.iter().filter(str_nonempty) {
        params.push(("filter", filter.clone()));
    }

    let url = Url::parse_with_params(&format!("{}{}", base_url, CDX_PATH), params)?;
    Ok(url)
}

/// Parses the index's tabular JSON: a header row followed by one row per
/// capture.
pub fn parse_history(body: &[u8]) -> Result<Vec<HistoryItem>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let rows: Vec<Vec<String>> = serde_json::from_slice(body)?;
    rows.into_iter()
        .enumerate()
        .skip(1)
        .map(|(index, row)| HistoryItem::from_row(index, row))
        .collect()
}

#[derive(Debug)]
pub struct WaybackClient<'a> {
    base_url: String,
    client: &'a reqwest::Client,
}

impl<'a> WaybackClient<'a> {
    pub fn new(base_url: String, client: &'a reqwest::Client) -> Self {
        Self { base_url, client }
    }

    /// Lists every capture matching `query`, in the order the index returns
    /// them.
    ///
    /// # Errors
    ///
    /// Fails if the request fails, the index answers with a non-success
    /// status, or the response is not a table of at least three columns.
    pub async fn history(&self, query: &CdxQuery) -> Result<Vec<HistoryItem>> {
        let url = build_cdx_url(&self.base_url, query)?;
        log::info!("querying capture index: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| Error::transport(url.as_str(), e))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(url.as_str(), e))?;

        let items = parse_history(&body)?;
        log::info!("found {} captures for {}", items.len(), query.url);
        Ok(items)
    }

    /// Returns the identity (`if_`) rendering URL of `item`, which serves the
    /// captured bytes without the archive's banner.
    pub fn snapshot_url(&self, item: &HistoryItem, url: &str) -> String {
        format!("{}/web/{}if_/{}", self.base_url, item.timestamp, url)
    }

    /// Downloads the full body of one capture.
    ///
    /// A non-success status is only logged; the body is returned as is.
    pub async fn fetch_snapshot(&self, item: &HistoryItem, url: &str) -> Result<Vec<u8>> {
        let snapshot_url = self.snapshot_url(item, url);
        log::debug!("fetching {}", snapshot_url);

        let response = self
            .client
            .get(&snapshot_url)
            .send()
            .await
            .map_err(|e| Error::transport(&snapshot_url, e))?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("{} returned HTTP {}", snapshot_url, status);
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(&snapshot_url, e))?;
        Ok(body.to_vec())
    }
}
