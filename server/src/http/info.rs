use axum::{
    response::{IntoResponse, Response},
    Json,
};

use api::request::Endpoint;

// ga4gh service-info documents, one per endpoint.  static apart from the
// per-endpoint datatype and format list
pub(super) async fn reads_service_info() -> Response {
    service_info(Endpoint::Reads)
}

pub(super) async fn variants_service_info() -> Response {
    service_info(Endpoint::Variants)
}

fn service_info(endpoint: Endpoint) -> Response {
    let (datatype, formats) = match endpoint {
        Endpoint::Reads => ("reads", vec!["BAM", "SAM"]),
        Endpoint::Variants => ("variants", vec!["VCF", "BCF"]),
    };

    Json(serde_json::json!({
        "id": format!("org.ga4gh.htsget.{datatype}"),
        "name": "htsget reference server",
        "type": {
            "group": "org.ga4gh",
            "artifact": "htsget",
            "version": "1.2.0"
        },
        "htsget": {
            "datatype": datatype,
            "formats": formats,
            "fieldsParametersEffective": false,
            "tagsParametersEffective": false
        }
    }))
    .into_response()
}
