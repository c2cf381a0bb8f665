use serde::{Deserialize, Serialize};

use crate::request::{BlockClass, Format};
use crate::{
    HEADER_BLOCK_CLASS, HEADER_CURRENT_BLOCK, HEADER_FILE_PATH, HEADER_NUM_BYTES_HEADER,
    HEADER_NUM_BYTES_TAIL, HEADER_TOTAL_BLOCKS,
};

// the json envelope returned by ticket endpoints.  fetching the enumerated
// urls in order and concatenating the bytes reproduces a valid file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub htsget: TicketBody,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketBody {
    pub format: Format,
    pub urls: Vec<Url>,
}

impl Ticket {
    pub fn new(format: Format, urls: Vec<Url>) -> Self {
        Ticket {
            htsget: TicketBody { format, urls },
        }
    }
}

// a single downloadable block.  passthrough descriptors point straight at
// the backing url with a range header; server-mediated descriptors point at
// a server endpoint and carry instructions in custom headers.  clients treat
// both uniformly
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Url {
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<BlockClass>,
}

impl Url {
    pub fn new(url: impl Into<String>) -> Self {
        Url {
            url: url.into(),
            headers: None,
            class: None,
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_class(mut self, class: BlockClass) -> Self {
        self.class = Some(class);
        self
    }
}

// the header set attached to a ticket url, serialized with the exact header
// names the data endpoints expect back
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Headers {
    #[serde(rename = "Range", skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,

    #[serde(rename = "HtsgetFilePath", skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    #[serde(rename = "HtsgetBlockClass", skip_serializing_if = "Option::is_none")]
    pub block_class: Option<String>,

    #[serde(rename = "HtsgetCurrentBlock", skip_serializing_if = "Option::is_none")]
    pub current_block: Option<String>,

    #[serde(rename = "HtsgetTotalBlocks", skip_serializing_if = "Option::is_none")]
    pub total_blocks: Option<String>,

    #[serde(rename = "HtsgetNumBytesHeader", skip_serializing_if = "Option::is_none")]
    pub num_bytes_header: Option<String>,

    #[serde(rename = "HtsgetNumBytesTail", skip_serializing_if = "Option::is_none")]
    pub num_bytes_tail: Option<String>,
}

impl Headers {
    pub fn new() -> Self {
        Headers::default()
    }

    // inclusive on both ends, per http byte-range semantics
    pub fn with_range(mut self, start: i64, end: i64) -> Self {
        self.range = Some(format!("bytes={}-{}", start, end));
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_block_class(mut self, class: BlockClass) -> Self {
        self.block_class = Some(class.as_str().to_owned());
        self
    }

    pub fn with_block_index(mut self, current: usize, total: usize) -> Self {
        self.current_block = Some(current.to_string());
        self.total_blocks = Some(total.to_string());
        self
    }

    pub fn with_num_bytes_header(mut self, num_bytes: u64) -> Self {
        self.num_bytes_header = Some(num_bytes.to_string());
        self
    }

    pub fn with_num_bytes_tail(mut self, num_bytes: u64) -> Self {
        self.num_bytes_tail = Some(num_bytes.to_string());
        self
    }

    // flattened (name, value) view used when assembling http requests
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        let mut entries = Vec::new();

        if let Some(range) = &self.range {
            entries.push(("Range", range.as_str()));
        }
        if let Some(file_path) = &self.file_path {
            entries.push((HEADER_FILE_PATH, file_path.as_str()));
        }
        if let Some(class) = &self.block_class {
            entries.push((HEADER_BLOCK_CLASS, class.as_str()));
        }
        if let Some(current) = &self.current_block {
            entries.push((HEADER_CURRENT_BLOCK, current.as_str()));
        }
        if let Some(total) = &self.total_blocks {
            entries.push((HEADER_TOTAL_BLOCKS, total.as_str()));
        }
        if let Some(num) = &self.num_bytes_header {
            entries.push((HEADER_NUM_BYTES_HEADER, num.as_str()));
        }
        if let Some(num) = &self.num_bytes_tail {
            entries.push((HEADER_NUM_BYTES_TAIL, num.as_str()));
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_header_is_inclusive() {
        let headers = Headers::new().with_range(0, 499_999_999);

        assert_eq!(headers.range.as_deref(), Some("bytes=0-499999999"));
    }

    #[test]
    fn header_entries_use_wire_names() {
        let headers = Headers::new()
            .with_range(0, 100)
            .with_block_class(BlockClass::Body)
            .with_block_index(1, 3)
            .with_num_bytes_header(151)
            .with_num_bytes_tail(28);

        assert_eq!(
            headers.entries(),
            vec![
                ("Range", "bytes=0-100"),
                ("HtsgetBlockClass", "body"),
                ("HtsgetCurrentBlock", "1"),
                ("HtsgetTotalBlocks", "3"),
                ("HtsgetNumBytesHeader", "151"),
                ("HtsgetNumBytesTail", "28"),
            ]
        );
    }

    #[test]
    fn ticket_serde_shape() {
        let ticket = Ticket::new(
            Format::Bam,
            vec![
                Url::new("http://localhost:3000/reads/data/object1")
                    .with_headers(Headers::new().with_block_class(BlockClass::Header))
                    .with_class(BlockClass::Header),
            ],
        );

        let json = serde_json::to_value(&ticket).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "htsget": {
                    "format": "BAM",
                    "urls": [
                        {
                            "url": "http://localhost:3000/reads/data/object1",
                            "headers": {"HtsgetBlockClass": "header"},
                            "class": "header"
                        }
                    ]
                }
            })
        );
    }

    #[test]
    fn passthrough_url_omits_empty_fields() {
        let url = Url::new("https://example.org/data.bam")
            .with_headers(Headers::new().with_range(10, 50));

        let json = serde_json::to_value(&url).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "url": "https://example.org/data.bam",
                "headers": {"Range": "bytes=10-50"}
            })
        );
    }
}
