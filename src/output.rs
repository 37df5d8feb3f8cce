//! Output modes and the writers behind them.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::{
    dedup::UniqueResponses,
    error::{Error, Result},
};

#[cfg(unix)]
const OUTPUT_DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const OUTPUT_FILE_MODE: u32 = 0o644;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// Print every snapshot body as it is fetched.
    Raw,
    /// Print snapshot URLs without fetching them.
    Urls,
    /// Print each distinct body once, after all fetches complete.
    Unique,
    /// Write each distinct body to `<dir>/<hex sha1>`.
    Directory(PathBuf),
}

impl OutputMode {
    /// Picks the mode from the CLI flags. An empty `output` counts as unset.
    ///
    /// # Errors
    ///
    /// Fails with a usage error if more than one mode is requested.
    pub fn from_flags(urls: bool, unique: bool, output: Option<&Path>) -> Result<Self> {
        let output = output.filter(|dir| !dir.as_os_str().is_empty());
        match (urls, unique, output) {
            (false, false, None) => Ok(Self::Raw),
            (true, false, None) => Ok(Self::Urls),
            (false, true, None) => Ok(Self::Unique),
            (false, false, Some(dir)) => Ok(Self::Directory(dir.to_path_buf())),
            _ => Err(Error::Usage(
                "you can only set one of the following arguments: urls, unique, output".into(),
            )),
        }
    }

    pub fn deduplicates(&self) -> bool {
        matches!(self, Self::Unique | Self::Directory(_))
    }
}

/// Writes each body followed by a newline.
pub fn write_bodies<'a>(
    buf: &mut impl Write,
    bodies: impl IntoIterator<Item = &'a [u8]>,
) -> Result<()> {
    for body in bodies {
        buf.write_all(body)?;
        buf.write_all(b"\n")?;
    }
    buf.flush()?;
    Ok(())
}

pub fn write_urls<S: AsRef<str>>(buf: &mut impl Write, urls: &[S]) -> Result<()> {
    for url in urls {
        writeln!(buf, "{}", url.as_ref())?;
    }
    buf.flush()?;
    Ok(())
}

/// Writes every unique body to a file named by its hex hash inside `dir`,
/// creating `dir` and its parents first.
///
/// Returns the paths written.
pub fn write_to_dir(dir: &Path, responses: &UniqueResponses) -> Result<Vec<PathBuf>> {
    create_output_dir(dir).map_err(|e| Error::filesystem(dir, e))?;

    let mut written = Vec::with_capacity(responses.len());
    for (hash, body) in responses.iter() {
        let path = dir.join(hash.to_string());
        write_output_file(&path, body).map_err(|e| Error::filesystem(&path, e))?;
        log::debug!("wrote {} bytes to {}", body.len(), path.display());
        written.push(path);
    }
    Ok(written)
}

fn create_output_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(OUTPUT_DIR_MODE);
    }
    builder.create(dir)
}

fn write_output_file(path: &Path, body: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(OUTPUT_FILE_MODE);
    }
    let mut file = options.open(path)?;
    file.write_all(body)?;
    file.flush()
}
