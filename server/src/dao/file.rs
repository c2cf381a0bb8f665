use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::instrument;

use api::ticket::{Headers, Url};
use api::FILE_BYTES_PATH;

use crate::dao::{block_ranges, DataAccessObject};

// data access for objects backed by a local file.  byte-range urls point at
// the server's own file-bytes endpoint, with the path and range carried in
// headers, since the client has no direct route to the filesystem
#[derive(Clone, Debug)]
pub struct FilePathDao {
    id: String,
    file_path: String,
    host: String,
    block_size: i64,
}

impl FilePathDao {
    pub fn new(
        id: impl Into<String>,
        file_path: impl Into<String>,
        host: impl Into<String>,
        block_size: i64,
    ) -> Self {
        FilePathDao {
            id: id.into(),
            file_path: file_path.into(),
            host: host.into(),
            block_size,
        }
    }
}

#[async_trait]
impl DataAccessObject for FilePathDao {
    #[instrument(skip(self))]
    async fn content_length(&self) -> Result<i64> {
        let meta = tokio::fs::metadata(&self.file_path)
            .await
            .with_context(|| format!("failed to stat backing file {}", self.file_path))?;

        Ok(meta.len() as i64)
    }

    async fn byte_range_urls(&self) -> Result<Vec<Url>> {
        let length = self.content_length().await?;
        let endpoint = format!("{}{}", self.host.trim_end_matches('/'), FILE_BYTES_PATH);

        Ok(block_ranges(length, self.block_size)
            .into_iter()
            .map(|(start, end)| {
                Url::new(endpoint.clone()).with_headers(
                    Headers::new()
                        .with_range(start, end)
                        .with_file_path(self.file_path.as_str()),
                )
            })
            .collect())
    }

    fn identity(&self) -> String {
        format!("FilePathDao id={}, filePath={}", self.id, self.file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scratch_file(name: &str, contents: &[u8]) -> String {
        let path = std::env::temp_dir().join(name);
        tokio::fs::write(&path, contents).await.unwrap();
        path.to_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn content_length_stats_the_file() {
        let path = scratch_file("dao_len.bam", &[0u8; 128]).await;
        let dao = FilePathDao::new("obj1", &path, "http://localhost:3000", 500_000_000);

        assert_eq!(dao.content_length().await.unwrap(), 128);
    }

    #[tokio::test]
    async fn content_length_fails_for_missing_file() {
        let dao = FilePathDao::new(
            "obj1",
            "/no/such/file.bam",
            "http://localhost:3000",
            500_000_000,
        );

        assert!(dao.content_length().await.is_err());
    }

    #[tokio::test]
    async fn byte_range_urls_are_server_mediated() {
        let path = scratch_file("dao_blocks.bam", &[0u8; 25]).await;
        let dao = FilePathDao::new("obj1", &path, "http://localhost:3000/", 10);

        let urls = dao.byte_range_urls().await.unwrap();

        assert_eq!(urls.len(), 3);
        assert!(urls.iter().all(|u| u.url == "http://localhost:3000/file-bytes"));

        let headers = urls[0].headers.as_ref().unwrap();
        assert_eq!(headers.range.as_deref(), Some("bytes=0-9"));
        assert_eq!(headers.file_path.as_deref(), Some(path.as_str()));

        let last = urls[2].headers.as_ref().unwrap();
        assert_eq!(last.range.as_deref(), Some("bytes=20-24"));
    }

    #[tokio::test]
    async fn identity_string() {
        let dao = FilePathDao::new(
            "gatk.NA12878",
            "/data/wgs_bam/NA12878.bam",
            "http://localhost:3000",
            500_000_000,
        );

        assert_eq!(
            dao.identity(),
            "FilePathDao id=gatk.NA12878, filePath=/data/wgs_bam/NA12878.bam"
        );
    }
}
