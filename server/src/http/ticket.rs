use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{debug, instrument};

use api::region::Region;
use api::request::{BlockClass, Endpoint, Format, TicketRequestBody};
use api::ticket::Ticket;
use api::TICKET_MEDIA_TYPE;

use crate::dao::create_dao;
use crate::http::svc::HttpEndpoint;
use crate::http::{parse_format, HtsgetError};
use crate::plan;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TicketQuery {
    format: Option<String>,
    class: Option<String>,
    reference_name: Option<String>,
    start: Option<i64>,
    end: Option<i64>,
}

#[instrument(skip(state, query))]
pub(super) async fn reads_ticket(
    State(state): State<Arc<HttpEndpoint>>,
    Path(id): Path<String>,
    Query(query): Query<TicketQuery>,
) -> Result<Response, HtsgetError> {
    let (format, class, regions) = parse_query(Endpoint::Reads, query)?;
    build_ticket(&state, Endpoint::Reads, &id, format, class, regions).await
}

#[instrument(skip(state, body))]
pub(super) async fn reads_ticket_post(
    State(state): State<Arc<HttpEndpoint>>,
    Path(id): Path<String>,
    Json(body): Json<TicketRequestBody>,
) -> Result<Response, HtsgetError> {
    let (format, regions) = parse_body(Endpoint::Reads, body)?;
    build_ticket(&state, Endpoint::Reads, &id, format, None, regions).await
}

#[instrument(skip(state, query))]
pub(super) async fn variants_ticket(
    State(state): State<Arc<HttpEndpoint>>,
    Path(id): Path<String>,
    Query(query): Query<TicketQuery>,
) -> Result<Response, HtsgetError> {
    let (format, class, regions) = parse_query(Endpoint::Variants, query)?;
    build_ticket(&state, Endpoint::Variants, &id, format, class, regions).await
}

#[instrument(skip(state, body))]
pub(super) async fn variants_ticket_post(
    State(state): State<Arc<HttpEndpoint>>,
    Path(id): Path<String>,
    Json(body): Json<TicketRequestBody>,
) -> Result<Response, HtsgetError> {
    let (format, regions) = parse_body(Endpoint::Variants, body)?;
    build_ticket(&state, Endpoint::Variants, &id, format, None, regions).await
}

fn parse_query(
    endpoint: Endpoint,
    query: TicketQuery,
) -> Result<(Format, Option<BlockClass>, Vec<Region>), HtsgetError> {
    let format = parse_format(endpoint, &query.format)?;

    // only header-only tickets are addressable by class; a bare body is not
    // a valid response file
    let class = match &query.class {
        None => None,
        Some(class) if class == "header" => Some(BlockClass::Header),
        Some(class) => {
            return Err(HtsgetError::InvalidInput(format!(
                "unsupported class {class}"
            )));
        }
    };

    let regions = match &query.reference_name {
        None => {
            if query.start.is_some() || query.end.is_some() {
                return Err(HtsgetError::InvalidInput(String::from(
                    "start and end require a referenceName",
                )));
            }
            Vec::new()
        }
        Some(reference_name) => {
            validate_bounds(query.start, query.end)?;
            vec![Region::new(reference_name.as_str(), query.start, query.end)]
        }
    };

    Ok((format, class, regions))
}

fn parse_body(
    endpoint: Endpoint,
    body: TicketRequestBody,
) -> Result<(Format, Vec<Region>), HtsgetError> {
    let format = parse_format(endpoint, &body.format)?;

    let regions = body.regions.unwrap_or_default();
    for region in &regions {
        if region.reference_name.is_empty() {
            return Err(HtsgetError::InvalidInput(String::from(
                "every region requires a referenceName",
            )));
        }
        validate_bounds(region.start, region.end)?;
    }

    Ok((format, regions))
}

fn validate_bounds(start: Option<i64>, end: Option<i64>) -> Result<(), HtsgetError> {
    if start.is_some_and(|start| start < 0) || end.is_some_and(|end| end < 0) {
        return Err(HtsgetError::InvalidRange(String::from(
            "start and end must be non-negative",
        )));
    }

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(HtsgetError::InvalidRange(format!(
                "start {start} is greater than end {end}"
            )));
        }
    }

    Ok(())
}

async fn build_ticket(
    state: &HttpEndpoint,
    endpoint: Endpoint,
    id: &str,
    format: Format,
    class: Option<BlockClass>,
    regions: Vec<Region>,
) -> Result<Response, HtsgetError> {
    let path = state
        .registry(endpoint)
        .resolve(id)
        .ok_or_else(|| HtsgetError::NotFound(format!("no data source matched id {id}")))?;

    let dao = create_dao(id, &path, &state.config, &state.client);
    debug!("serving ticket from {}", dao.identity());

    let urls = if class == Some(BlockClass::Header) {
        plan::ticket::header_only_urls(&state.config, endpoint, id, format)
    } else if regions.is_empty() {
        // whole-object download: hand out the byte-range plan directly, with
        // no tool invocations involved
        dao.byte_range_urls().await?
    } else {
        let groups = plan::preprocess_regions(endpoint, &path, regions).await;
        plan::ticket_urls(&state.config, endpoint, id, &path, format, &groups).await?
    };

    let ticket = Ticket::new(format, urls);

    Ok(([(CONTENT_TYPE, TICKET_MEDIA_TYPE)], Json(ticket)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(
        format: Option<&str>,
        class: Option<&str>,
        reference_name: Option<&str>,
        start: Option<i64>,
        end: Option<i64>,
    ) -> TicketQuery {
        TicketQuery {
            format: format.map(str::to_owned),
            class: class.map(str::to_owned),
            reference_name: reference_name.map(str::to_owned),
            start,
            end,
        }
    }

    #[test]
    fn single_region_query() {
        let (format, class, regions) = parse_query(
            Endpoint::Reads,
            query(Some("BAM"), None, Some("chr1"), Some(10), Some(20)),
        )
        .unwrap();

        assert_eq!(format, Format::Bam);
        assert_eq!(class, None);
        assert_eq!(regions, vec![Region::new("chr1", Some(10), Some(20))]);
    }

    #[test]
    fn bounds_without_reference_are_rejected() {
        let err =
            parse_query(Endpoint::Reads, query(None, None, None, Some(10), None)).unwrap_err();

        assert!(matches!(err, HtsgetError::InvalidInput(_)));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = parse_query(
            Endpoint::Reads,
            query(None, None, Some("chr1"), Some(30), Some(10)),
        )
        .unwrap_err();

        assert!(matches!(err, HtsgetError::InvalidRange(_)));
    }

    #[test]
    fn negative_bounds_are_rejected() {
        let err = parse_query(
            Endpoint::Variants,
            query(None, None, Some("chr1"), Some(-5), None),
        )
        .unwrap_err();

        assert!(matches!(err, HtsgetError::InvalidRange(_)));
    }

    #[test]
    fn header_class_is_accepted() {
        let (_, class, regions) =
            parse_query(Endpoint::Reads, query(None, Some("header"), None, None, None)).unwrap();

        assert_eq!(class, Some(BlockClass::Header));
        assert!(regions.is_empty());
    }

    #[test]
    fn body_class_is_rejected() {
        let err = parse_query(Endpoint::Reads, query(None, Some("body"), None, None, None))
            .unwrap_err();

        assert!(matches!(err, HtsgetError::InvalidInput(_)));
    }

    #[test]
    fn post_body_with_multiple_regions() {
        let body = TicketRequestBody {
            format: Some(String::from("VCF")),
            regions: Some(vec![
                Region::new("chr1", Some(10), Some(20)),
                Region::new("chr2", None, None),
            ]),
        };

        let (format, regions) = parse_body(Endpoint::Variants, body).unwrap();

        assert_eq!(format, Format::Vcf);
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn post_body_rejects_empty_reference() {
        let body = TicketRequestBody {
            format: None,
            regions: Some(vec![Region::new("", Some(10), Some(20))]),
        };

        assert!(parse_body(Endpoint::Variants, body).is_err());
    }
}
