pub mod error;
pub mod region;
pub mod request;
pub mod ticket;

// url paths assembled into ticket descriptors
pub const READS_DATA_PATH: &str = "/reads/data/";
pub const VARIANTS_DATA_PATH: &str = "/variants/data/";
pub const FILE_BYTES_PATH: &str = "/file-bytes";

// custom request headers carried by server-mediated ticket urls
pub const HEADER_BLOCK_CLASS: &str = "HtsgetBlockClass";
pub const HEADER_CURRENT_BLOCK: &str = "HtsgetCurrentBlock";
pub const HEADER_TOTAL_BLOCKS: &str = "HtsgetTotalBlocks";
pub const HEADER_NUM_BYTES_HEADER: &str = "HtsgetNumBytesHeader";
pub const HEADER_NUM_BYTES_TAIL: &str = "HtsgetNumBytesTail";
pub const HEADER_FILE_PATH: &str = "HtsgetFilePath";

// content type of the ticket json envelope
pub const TICKET_MEDIA_TYPE: &str = "application/vnd.ga4gh.htsget.v1.2.0+json";
