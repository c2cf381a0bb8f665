use anyhow::Result;
use tracing::instrument;

use api::region::Region;
use api::request::{BlockClass, Endpoint, Format};
use api::ticket::{Headers, Url};
use common::config::HtsConfig;

use crate::cli::samtools::SamtoolsView;
use crate::cli::CommandChain;
use crate::stream::scratch::chain_output_size;
use crate::stream::BGZF_EOF;

// assembles the ordered descriptor list for a region-constrained ticket: one
// header block, one body block per execution group, and a footer block for
// bam.  fetched in order and concatenated, the blocks form a single valid
// file restricted to the requested regions
#[instrument(skip(config, groups))]
pub async fn ticket_urls(
    config: &HtsConfig,
    endpoint: Endpoint,
    id: &str,
    path: &str,
    format: Format,
    groups: &[Vec<Region>],
) -> Result<Vec<Url>> {
    let base_url = data_url(config, endpoint, id, format);

    let footer_blocks = usize::from(format == Format::Bam);
    let total_blocks = 1 + groups.len() + footer_blocks;

    // bam bodies embed a compressed copy of the header and their own eof
    // block; both must be trimmed for the concatenation to stay valid.  text
    // bodies are emitted headerless, and bcf header sizes are measured at
    // dereference time instead
    let (head_bytes, tail_bytes) = match format {
        Format::Bam => (
            bam_header_size(config, id, path).await?,
            BGZF_EOF.len() as u64,
        ),
        _ => (0, 0),
    };

    let mut urls = Vec::with_capacity(total_blocks);

    urls.push(
        Url::new(base_url.clone())
            .with_headers(
                Headers::new()
                    .with_block_class(BlockClass::Header)
                    .with_block_index(0, total_blocks),
            )
            .with_class(BlockClass::Header),
    );

    for (i, group) in groups.iter().enumerate() {
        let region = bounding_region(group);

        urls.push(
            Url::new(format!("{base_url}{}", region_query(&region)))
                .with_headers(
                    Headers::new()
                        .with_block_class(BlockClass::Body)
                        .with_block_index(i + 1, total_blocks)
                        .with_num_bytes_header(head_bytes)
                        .with_num_bytes_tail(tail_bytes),
                )
                .with_class(BlockClass::Body),
        );
    }

    if format == Format::Bam {
        urls.push(
            Url::new(base_url)
                .with_headers(
                    Headers::new()
                        .with_block_class(BlockClass::Footer)
                        .with_block_index(total_blocks - 1, total_blocks),
                )
                .with_class(BlockClass::Footer),
        );
    }

    Ok(urls)
}

// a class=header ticket carries just the header block
pub fn header_only_urls(
    config: &HtsConfig,
    endpoint: Endpoint,
    id: &str,
    format: Format,
) -> Vec<Url> {
    vec![
        Url::new(data_url(config, endpoint, id, format))
            .with_headers(
                Headers::new()
                    .with_block_class(BlockClass::Header)
                    .with_block_index(0, 1),
            )
            .with_class(BlockClass::Header),
    ]
}

fn data_url(config: &HtsConfig, endpoint: Endpoint, id: &str, format: Format) -> String {
    format!(
        "{}{}{id}?format={format}",
        config.server.host.trim_end_matches('/'),
        endpoint.data_path()
    )
}

// a bridged group is executed as one tool invocation over its bounding
// interval; merge and bridge have already guaranteed that nothing between
// the members can be lost
pub(crate) fn bounding_region(group: &[Region]) -> Region {
    let mut start = group[0].start;
    let mut end = group[0].end;

    for region in &group[1..] {
        start = match (start, region.start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            _ => None,
        };
        end = match (end, region.end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
    }

    Region::new(group[0].reference_name.clone(), start, end)
}

fn region_query(region: &Region) -> String {
    let mut query = format!("&referenceName={}", region.reference_name);

    if let Some(start) = region.start {
        query.push_str(&format!("&start={start}"));
    }
    if let Some(end) = region.end {
        query.push_str(&format!("&end={end}"));
    }

    query
}

// the embedded header prefix of a bam body, measured by writing the
// header-only output through a scratch file.  the probe's own trailing eof
// block is not part of that prefix
async fn bam_header_size(config: &HtsConfig, id: &str, path: &str) -> Result<u64> {
    let chain = CommandChain::new().add(
        SamtoolsView::new(path)
            .header_only(true)
            .output_bam(true)
            .build(),
    );

    let size = chain_output_size(chain, &config.data.scratch_dir, &format!("{id}_header")).await?;

    Ok(size.saturating_sub(BGZF_EOF.len() as u64))
}
