pub mod bucket;
pub mod config;
pub mod data_loader;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod models;
pub mod request;
pub mod secrets;
pub mod store;
pub mod upstream;

pub use bucket::{parse_instant, plan_period, plan_relative, Bucket, Granularity, RangeEdge, RelativeWindow};
pub use config::{normalize_domain_input, LoaderConfig, LoaderSettings, Scope};
pub use data_loader::DataLoader;
pub use enrich::{Enricher, NoopEnricher};
pub use error::{FetchFailure, LoaderError};
pub use filter::filter_range;
pub use models::{BucketChunk, Bundle, RangeResult};
pub use request::build_url;
