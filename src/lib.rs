//! Collects historical responses for a URL from the
//! [Wayback Machine](https://web.archive.org).

use std::io::Write;

use crate::{
    dedup::UniqueResponses,
    error::Result,
    output::OutputMode,
    wayback::{CdxQuery, WaybackClient},
};

pub mod config;
pub mod dedup;
pub mod error;
pub mod output;
pub mod wayback;

/// What a finished run did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub history_items: usize,
    pub fetched: usize,
    pub unique: Option<usize>,
}

#[derive(Debug)]
pub struct Collector<'a> {
    wayback: &'a WaybackClient<'a>,
    mode: OutputMode,
}

impl<'a> Collector<'a> {
    pub fn new(wayback: &'a WaybackClient<'a>, mode: OutputMode) -> Self {
        Self { wayback, mode }
    }

    /// Looks up every capture for `query` and emits them according to the
    /// output mode.
    ///
    /// Captures are fetched one at a time, in index order. In raw mode each
    /// body is written to `buf` as soon as it arrives, so output produced
    /// before a failure stays written.
    ///
    /// # Errors
    ///
    /// Stops at the first failed request, malformed index response, or
    /// failed write.
    pub async fn run(&self, query: &CdxQuery, buf: &mut impl Write) -> Result<RunSummary> {
        let history = self.wayback.history(query).await?;
        let mut summary = RunSummary {
            history_items: history.len(),
            ..RunSummary::default()
        };

        if self.mode == OutputMode::Urls {
            let urls: Vec<String> = history
                .iter()
                .map(|item| self.wayback.snapshot_url(item, &query.url))
                .collect();
            output::write_urls(buf, &urls)?;
            return Ok(summary);
        }

        let mut responses = UniqueResponses::new();
        for item in &history {
            let body = self.wayback.fetch_snapshot(item, &query.url).await?;
            summary.fetched += 1;
            if self.mode.deduplicates() {
                responses.insert(body);
            } else {
                output::write_bodies(buf, Some(body.as_slice()))?;
            }
        }

        match &self.mode {
            OutputMode::Unique => output::write_bodies(buf, responses.bodies())?,
            OutputMode::Directory(dir) => {
                let written = output::write_to_dir(dir, &responses)?;
                log::info!("wrote {} files to {}", written.len(), dir.display());
            }
            OutputMode::Raw | OutputMode::Urls => {}
        }
        if self.mode.deduplicates() {
            summary.unique = Some(responses.len());
        }

        Ok(summary)
    }
}
