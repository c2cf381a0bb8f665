use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, Level};

// htsget server configuration subtables
//
// split out into substructs so the toml file reads as named sections, and
// so each part of the server can borrow just the piece it needs

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    // tcp port the http server binds
    #[serde(default = "default_port")]
    pub port: u16,

    // externally visible url base, used when assembling ticket urls, since
    // we may be running behind a reverse proxy
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DataConfig {
    // size of the byte-range blocks handed out for whole-file downloads
    #[serde(default = "default_block_size")]
    pub block_size: i64,

    // temporary folder used when measuring embedded header sizes through
    // scratch files
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            block_size: default_block_size(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

// a single id-to-path mapping rule.  the pattern may define named capture
// groups which are substituted into {name} placeholders in the path
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SourceEntry {
    pub pattern: String,
    pub path: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HtsConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default = "default_reads_sources")]
    pub reads: SourcesConfig,

    #[serde(default)]
    pub variants: SourcesConfig,
}

impl Default for HtsConfig {
    fn default() -> Self {
        HtsConfig {
            server: ServerConfig::default(),
            data: DataConfig::default(),
            reads: default_reads_sources(),
            variants: SourcesConfig::default(),
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    String::from("http://localhost:3000")
}

fn default_block_size() -> i64 {
    500_000_000
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
}

// the stock reads registry points at the public tabula muris buckets, so a
// bare server still has something to serve
fn default_reads_sources() -> SourcesConfig {
    SourcesConfig {
        sources: vec![
            SourceEntry {
                pattern: String::from(r"^tabulamuris\.(?P<accession>10X.*)$"),
                path: String::from(
                    "https://s3.amazonaws.com/czbiohub-tabula-muris/10x_bam_files/{accession}_possorted_genome.bam",
                ),
            },
            SourceEntry {
                pattern: String::from(r"^tabulamuris\.(?P<accession>.*)$"),
                path: String::from(
                    "https://s3.amazonaws.com/czbiohub-tabula-muris/facs_bam_files/{accession}.mus.Aligned.out.sorted.bam",
                ),
            },
        ],
    }
}

// in order to extract the config table from a larger document, we specify it
// as a subtable of the root node, i.e. a substruct
#[derive(Debug, Deserialize, Serialize)]
struct TomlConfigFile {
    #[serde(default)]
    config: HtsConfig,
}

#[instrument(level=Level::DEBUG)]
pub async fn read_config(filename: Option<PathBuf>) -> Result<Arc<HtsConfig>> {
    let mut config = match filename {
        None => {
            debug!("no config file given, using defaults");
            HtsConfig::default()
        }
        Some(filename) => {
            debug!("reading config file");

            let doc = tokio::fs::read_to_string(&filename)
                .await
                .with_context(|| format!("failed to read config file {filename:?}"))?;

            let data: TomlConfigFile =
                toml::from_str(&doc).context("failed to parse config file")?;

            debug!("successfully parsed config file");
            data.config
        }
    };

    // environment variables win over both the file and the defaults
    if let Ok(port) = std::env::var("HTSGET_PORT") {
        config.server.port = port
            .parse()
            .context("failed to parse HTSGET_PORT as a port number")?;
    }

    if let Ok(host) = std::env::var("HTSGET_HOST") {
        config.server.host = host;
    }

    Ok(Arc::new(config))
}
