use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::instrument;

use api::ticket::{Headers, Url};

use crate::dao::{block_ranges, DataAccessObject};

// data access for objects backed by an http(s) url.  byte-range urls point
// straight at the origin with a range header, so clients stream from it
// without the server proxying any bytes
#[derive(Clone, Debug)]
pub struct UrlDao {
    id: String,
    url: String,
    block_size: i64,
    client: reqwest::Client,
}

impl UrlDao {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        block_size: i64,
        client: reqwest::Client,
    ) -> Self {
        UrlDao {
            id: id.into(),
            url: url.into(),
            block_size,
            client,
        }
    }
}

#[async_trait]
impl DataAccessObject for UrlDao {
    #[instrument(skip(self))]
    async fn content_length(&self) -> Result<i64> {
        let response = self
            .client
            .head(&self.url)
            .send()
            .await
            .with_context(|| format!("head request to {} failed", self.url))?;

        let length = response
            .headers()
            .get(http::header::CONTENT_LENGTH)
            .with_context(|| format!("no content-length in head response from {}", self.url))?
            .to_str()
            .context("content-length header is not valid utf-8")?
            .parse::<i64>()
            .context("content-length header is not an integer")?;

        Ok(length)
    }

    async fn byte_range_urls(&self) -> Result<Vec<Url>> {
        let length = self.content_length().await?;

        Ok(block_ranges(length, self.block_size)
            .into_iter()
            .map(|(start, end)| {
                Url::new(self.url.clone()).with_headers(Headers::new().with_range(start, end))
            })
            .collect())
    }

    fn identity(&self) -> String {
        format!("UrlDao id={}, url={}", self.id, self.url)
    }
}
