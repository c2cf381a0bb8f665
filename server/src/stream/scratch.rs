use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::cli::CommandChain;

// measures the byte size of a chain's output by writing it through a scratch
// file and stat'ing the result.  used for the embedded-header sizes that
// cannot be known ahead of time (compressed bam headers, binary bcf headers)
//
// the file is uniquely named per request and removed before returning
#[instrument(skip(chain))]
pub async fn chain_output_size(chain: CommandChain, scratch_dir: &Path, tag: &str) -> Result<u64> {
    let tag = tag.replace(['/', '\\'], "_");
    let filename = scratch_dir.join(format!("{tag}_{:08x}", rand::random::<u32>()));

    let mut file = tokio::fs::File::create(&filename)
        .await
        .with_context(|| format!("failed to create scratch file {filename:?}"))?;

    let running = chain.execute()?;
    let result = running.copy_to(&mut file).await;

    let size = match result {
        Ok(_) => {
            tokio::fs::metadata(&filename)
                .await
                .context("failed to stat scratch file")
                .map(|meta| meta.len())
        }
        Err(err) => Err(err),
    };

    // best effort: a leaked scratch file is not worth failing the request
    if let Err(err) = tokio::fs::remove_file(&filename).await {
        debug!("failed to remove scratch file {filename:?}: {err}");
    }

    let size = size?;
    debug!(size, "measured chain output");
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Command;

    #[tokio::test]
    async fn measures_and_cleans_up() {
        let scratch = std::env::temp_dir();
        let chain = CommandChain::new().add(Command::new("echo").arg("four"));

        let size = chain_output_size(chain, &scratch, "test_header")
            .await
            .unwrap();

        // "four\n"
        assert_eq!(size, 5);
    }

    #[tokio::test]
    async fn piped_chain_size() {
        let scratch = std::env::temp_dir();
        let chain = CommandChain::new()
            .add(Command::new("seq").args(["1", "5"]))
            .add(crate::cli::head(2));

        let size = chain_output_size(chain, &scratch, "probe").await.unwrap();

        // "1\n2\n"
        assert_eq!(size, 4);
    }
}
