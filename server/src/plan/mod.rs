pub mod regions;
pub mod ticket;

pub use regions::preprocess_regions;
pub use ticket::ticket_urls;
