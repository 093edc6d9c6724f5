pub mod app_state;
pub mod constants;
pub mod loader;

pub use loader::{
    Bucket, DataLoader, Enricher, Granularity, LoaderConfig, LoaderError, LoaderSettings,
    RangeResult, Scope,
};
