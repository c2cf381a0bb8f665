use std::io::SeekFrom;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use http::{
    header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE},
    HeaderValue,
};
use regex::Regex;
use tokio::{fs::File, io::AsyncSeekExt};
use tokio_stream::StreamExt;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::{debug, instrument};

use api::HEADER_FILE_PATH;

use crate::http::{svc::HttpEndpoint, HtsgetError};

// serves a byte range of a local file named by the HtsgetFilePath header.
// this is the endpoint behind the byte-range descriptors that local-file
// daos hand out, since the client has no direct route to the filesystem
#[instrument(skip_all)]
pub(super) async fn file_bytes(
    State(state): State<Arc<HttpEndpoint>>,
    headers: HeaderMap,
) -> Result<Response, HtsgetError> {
    let file_path = headers
        .get(HEADER_FILE_PATH)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            HtsgetError::InvalidInput(format!("missing or malformed {HEADER_FILE_PATH} header"))
        })?;

    debug!(file_path, "serving file bytes");

    // tokio handles the filesystem operations so we don't block the server
    // threads
    let mut file_handle = match File::open(&file_path).await {
        Ok(handle) => handle,
        Err(err) => {
            return Err(HtsgetError::NotFound(format!(
                "failed to open {file_path}: {err}"
            )));
        }
    };

    let length = file_handle
        .metadata()
        .await
        .map_err(anyhow::Error::from)?
        .len();

    // the range header is what allows clients to fetch a large file in
    // blocks; without it they get the whole thing in one response
    let (partial, (start, end)) = match headers.get(RANGE) {
        None => (false, (0, length)),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| HtsgetError::InvalidRange(String::from("malformed range header")))?;

            match parse_range(&state.range_regex, value, length) {
                Ok(range) => (true, range),
                Err(err) => {
                    return Ok(
                        (StatusCode::RANGE_NOT_SATISFIABLE, format!("{err}")).into_response()
                    );
                }
            }
        }
    };

    // response headers all have to be correct for clients to resume and
    // reassemble downloads
    let mut response_headers = HeaderMap::new();

    response_headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response_headers.insert(CONTENT_LENGTH, HeaderValue::from(end - start));
    response_headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );

    // start is zero-indexed but end is one-indexed here, while the s-e pair
    // in the header is zero-indexed on both sides
    if partial {
        response_headers.insert(
            CONTENT_RANGE,
            HeaderValue::from_str(&format!("bytes {start}-{}/{length}", end - 1))
                .map_err(anyhow::Error::from)?,
        );
    }

    let body = if partial {
        file_handle
            .seek(SeekFrom::Start(start))
            .await
            .map_err(anyhow::Error::from)?;

        // note the argument to take() is a count, not an index
        Body::from_stream(
            FramedRead::new(file_handle, BytesCodec::new())
                .take((end - start).try_into().map_err(anyhow::Error::from)?),
        )
    } else {
        Body::from_stream(FramedRead::new(file_handle, BytesCodec::new()))
    };

    let code = if partial {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    Ok((code, response_headers, body).into_response())
}

// http range header parser
//
// errors here are reported as RANGE_NOT_SATISFIABLE by the caller.  only a
// single range is supported; multipart responses are not
fn parse_range(regex: &Regex, ranges: &str, length: u64) -> Result<(u64, u64)> {
    // there is only one supported unit, though the range header grammar
    // technically allows for others
    if !ranges.starts_with("bytes=") {
        return Err(anyhow::Error::msg("invalid range unit"));
    }

    let mut match_iter = regex
        .captures_iter(ranges)
        .map(|captures| captures.extract::<2>())
        .map(|(_, [start, end])| parse_endpoints(start, end));

    let (start, end) = match match_iter.next() {
        None => return Ok((0, length)),
        Some(range) => {
            // the output semantics are awkward: start feeds seek(), where it
            // is zero-indexed, while end feeds take(), where it is a count.
            // both s and e in the "s-e" pattern are zero-indexed, so the
            // maximal value of e is length-1
            match range? {
                // "0-511" => the first 512 bytes
                (Some(start), Some(end)) => (start, end + 1),
                // "512-" (of a 1024b file) => the second 512
                (Some(start), None) => (start, length),
                // "-512" (of a 1024b file) => the final 512
                (None, Some(end)) => (length.saturating_sub(end), length),
                // a range header with no usable range: the whole file
                (None, None) => (0, length),
            }
        }
    };

    // u64 cannot be negative, so ordering and non-emptiness are the only
    // checks left
    if start > length || end > length || start > end || end == 0 {
        return Err(anyhow::Error::msg("invalid range"));
    }

    if match_iter.next().is_some() {
        return Err(anyhow::Error::msg("multiple ranges unsupported"));
    }

    Ok((start, end))
}

fn parse_endpoints(start: &str, end: &str) -> Result<(Option<u64>, Option<u64>)> {
    let parse = |s: &str| match s {
        "" => Ok(None),
        s => Some(
            s.parse::<u64>()
                .map_err(|_| anyhow::Error::msg("failed to parse range endpoint")),
        )
        .transpose(),
    };

    Ok((parse(start)?, parse(end)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regex() -> Regex {
        Regex::new(r"(\d*)-(\d*)").unwrap()
    }

    #[test]
    fn bounded_range() {
        assert_eq!(parse_range(&regex(), "bytes=10-50", 1024).unwrap(), (10, 51));
    }

    #[test]
    fn open_ended_range() {
        assert_eq!(parse_range(&regex(), "bytes=512-", 1024).unwrap(), (512, 1024));
    }

    #[test]
    fn suffix_range() {
        assert_eq!(parse_range(&regex(), "bytes=-512", 1024).unwrap(), (512, 1024));
    }

    #[test]
    fn full_block_range() {
        // the kind of range the byte-range planner hands out
        assert_eq!(
            parse_range(&regex(), "bytes=0-499999999", 1_200_000_000).unwrap(),
            (0, 500_000_000)
        );
    }

    #[test]
    fn malformed_ranges() {
        assert!(parse_range(&regex(), "malformedheader20to400", 1024).is_err());
        assert!(parse_range(&regex(), "bytes=50-10", 1024).is_err());
        assert!(parse_range(&regex(), "bytes=10-5000", 1024).is_err());
    }

    #[test]
    fn endpoint_parsing() {
        assert_eq!(parse_endpoints("", "").unwrap(), (None, None));
        assert_eq!(parse_endpoints("12", "").unwrap(), (Some(12), None));
        assert_eq!(parse_endpoints("", "40").unwrap(), (None, Some(40)));
        assert_eq!(parse_endpoints("12", "40").unwrap(), (Some(12), Some(40)));
    }
}
