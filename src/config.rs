use url::Url;

use crate::error::{Error, Result};

pub static DEFAULT_ARCHIVE_URL: &str = "https://web.archive.org";
pub static ARCHIVE_URL_ENV_VAR: &str = "WAYBACK_COLLECTOR_ARCHIVE_URL";

/// Normalizes the archive base URL: it must parse, and the trailing `/` is
/// dropped so endpoint paths can be appended verbatim.
pub fn archive_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::Usage("archive url must not be empty".into()));
    }
    let parsed = Url::parse(trimmed)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Usage(format!(
            "archive url must be http or https: {}",
            trimmed
        )));
    }
    Ok(trimmed.to_owned())
}
