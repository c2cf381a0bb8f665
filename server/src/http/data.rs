use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, instrument};

use api::region::Region;
use api::request::{BlockClass, Endpoint, Format};
use api::{HEADER_BLOCK_CLASS, HEADER_NUM_BYTES_HEADER, HEADER_NUM_BYTES_TAIL};

use crate::cli::bcftools::BcftoolsView;
use crate::cli::samtools::SamtoolsView;
use crate::cli::CommandChain;
use crate::http::svc::HttpEndpoint;
use crate::http::{parse_format, HtsgetError};
use crate::stream::scratch::chain_output_size;
use crate::stream::{trim, BGZF_EOF};

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DataQuery {
    format: Option<String>,
    reference_name: Option<String>,
    start: Option<i64>,
    end: Option<i64>,
}

#[instrument(skip(state, query, headers))]
pub(super) async fn reads_data(
    State(state): State<Arc<HttpEndpoint>>,
    Path(id): Path<String>,
    Query(query): Query<DataQuery>,
    headers: HeaderMap,
) -> Result<Response, HtsgetError> {
    stream_data(&state, Endpoint::Reads, &id, query, headers).await
}

#[instrument(skip(state, query, headers))]
pub(super) async fn variants_data(
    State(state): State<Arc<HttpEndpoint>>,
    Path(id): Path<String>,
    Query(query): Query<DataQuery>,
    headers: HeaderMap,
) -> Result<Response, HtsgetError> {
    stream_data(&state, Endpoint::Variants, &id, query, headers).await
}

// dereferences a single ticket descriptor: resolves the backing, assembles
// the tool pipeline for the requested block class, and streams the output
// with header/tail trimming applied
async fn stream_data(
    state: &HttpEndpoint,
    endpoint: Endpoint,
    id: &str,
    query: DataQuery,
    headers: HeaderMap,
) -> Result<Response, HtsgetError> {
    let format = parse_format(endpoint, &query.format)?;

    let path = state
        .registry(endpoint)
        .resolve(id)
        .ok_or_else(|| HtsgetError::NotFound(format!("no data source matched id {id}")))?;

    let class = match header_str(&headers, HEADER_BLOCK_CLASS) {
        None => BlockClass::Body,
        Some(value) => value.parse::<BlockClass>().map_err(|value| {
            HtsgetError::InvalidInput(format!("unsupported block class {value}"))
        })?,
    };

    let region = query
        .reference_name
        .as_ref()
        .map(|name| Region::new(name.as_str(), query.start, query.end));

    debug!(?class, ?region, path = %path, "streaming data block");

    match (endpoint, class) {
        (Endpoint::Reads, BlockClass::Header) => {
            let chain = CommandChain::new().add(
                SamtoolsView::new(path)
                    .header_only(true)
                    .output_bam(format == Format::Bam)
                    .build(),
            );

            command_response(chain, 0, 0)
        }
        (Endpoint::Reads, BlockClass::Body) => {
            let head_bytes = header_u64(&headers, HEADER_NUM_BYTES_HEADER);
            let tail_bytes = header_u64(&headers, HEADER_NUM_BYTES_TAIL);

            let chain = CommandChain::new().add(
                SamtoolsView::new(path)
                    .output_bam(format == Format::Bam)
                    .regions(region)
                    .build(),
            );

            command_response(chain, head_bytes, tail_bytes)
        }
        (Endpoint::Reads, BlockClass::Footer) => {
            if format != Format::Bam {
                return Err(HtsgetError::InvalidInput(String::from(
                    "footer blocks only exist for BAM",
                )));
            }

            Ok((
                [(CONTENT_TYPE, OCTET_STREAM)],
                Body::from(Bytes::from_static(&BGZF_EOF)),
            )
                .into_response())
        }
        (Endpoint::Variants, BlockClass::Header) => {
            let chain = CommandChain::new().add(
                BcftoolsView::new(path)
                    .header_only(true)
                    .output_format(format)
                    .build(),
            );

            command_response(chain, 0, 0)
        }
        (Endpoint::Variants, BlockClass::Body) => {
            // binary bcf bodies carry a length-prefixed header whose size is
            // only knowable by measuring it
            let head_bytes = if format == Format::Bcf {
                bcf_header_size(state, id, &path).await?
            } else {
                0
            };

            let mut builder = BcftoolsView::new(path).output_format(format);
            if let Some(region) = region {
                builder = builder.region(region);
            }

            let chain = CommandChain::new().add(builder.build());

            command_response(chain, head_bytes, 0)
        }
        (Endpoint::Variants, BlockClass::Footer) => Err(HtsgetError::InvalidInput(String::from(
            "variants responses have no footer block",
        ))),
    }
}

// executes the chain and wires its output through the trim combinators into
// the response body.  dropping the body (client disconnect) tears down every
// subprocess
fn command_response(
    chain: CommandChain,
    head_bytes: u64,
    tail_bytes: u64,
) -> Result<Response, HtsgetError> {
    let running = chain.execute()?;

    let stream = trim::tail_trim(
        trim::head_trim(running.into_stream(), head_bytes),
        tail_bytes as usize,
    );

    Ok((
        [(CONTENT_TYPE, OCTET_STREAM)],
        Body::from_stream(stream),
    )
        .into_response())
}

async fn bcf_header_size(state: &HttpEndpoint, id: &str, path: &str) -> Result<u64> {
    let chain = CommandChain::new().add(
        BcftoolsView::new(path)
            .header_only(true)
            .output_format(Format::Bcf)
            .build(),
    );

    chain_output_size(
        chain,
        &state.config.data.scratch_dir,
        &format!("{id}_header"),
    )
    .await
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn header_u64(headers: &HeaderMap, name: &str) -> u64 {
    header_str(headers, name)
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_metadata_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_NUM_BYTES_HEADER, "151".parse().unwrap());
        headers.insert(HEADER_BLOCK_CLASS, "body".parse().unwrap());

        assert_eq!(header_u64(&headers, HEADER_NUM_BYTES_HEADER), 151);
        assert_eq!(header_u64(&headers, HEADER_NUM_BYTES_TAIL), 0);
        assert_eq!(header_str(&headers, HEADER_BLOCK_CLASS), Some("body"));
    }

    #[test]
    fn garbage_block_metadata_defaults_to_zero() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_NUM_BYTES_HEADER, "not-a-number".parse().unwrap());

        assert_eq!(header_u64(&headers, HEADER_NUM_BYTES_HEADER), 0);
    }
}
