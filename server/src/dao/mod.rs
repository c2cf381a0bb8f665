use anyhow::Result;
use async_trait::async_trait;

use api::ticket::Url;
use common::config::HtsConfig;

pub mod file;
pub mod url;

pub use file::FilePathDao;
pub use url::UrlDao;

// uniform capability set over the two backing kinds.  the backings differ
// enough (stat vs head request, self-url vs server-mediated url) that a small
// trait object is the right seam
#[async_trait]
pub trait DataAccessObject: Send + Sync {
    async fn content_length(&self) -> Result<i64>;

    // a partition of the whole object into inclusive byte ranges, one ticket
    // url per block.  fetched in order and concatenated, the blocks
    // reproduce the backing file exactly
    async fn byte_range_urls(&self) -> Result<Vec<Url>>;

    // human-readable identity used in diagnostics
    fn identity(&self) -> String;
}

// anything that parses as an http(s) url is remote; everything else is a
// local filesystem path
pub fn is_url(path: &str) -> bool {
    reqwest::Url::parse(path)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

pub fn create_dao(
    id: &str,
    path: &str,
    config: &HtsConfig,
    client: &reqwest::Client,
) -> Box<dyn DataAccessObject> {
    if is_url(path) {
        Box::new(UrlDao::new(id, path, config.data.block_size, client.clone()))
    } else {
        Box::new(FilePathDao::new(
            id,
            path,
            &config.server.host,
            config.data.block_size,
        ))
    }
}

// partitions [0, content_length) into contiguous inclusive ranges of at most
// block_size bytes, the last possibly shorter
pub(crate) fn block_ranges(content_length: i64, block_size: i64) -> Vec<(i64, i64)> {
    let mut ranges = Vec::new();

    let mut start = 0;
    while start < content_length {
        let end = (start + block_size - 1).min(content_length - 1);
        ranges.push((start, end));
        start = end + 1;
    }

    ranges
}
