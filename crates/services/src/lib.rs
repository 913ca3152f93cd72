#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod snapshot;
pub mod store;

pub use catalog::{CatalogConfig, CatalogSource, FileCatalogSource, HttpCatalogSource};
pub use error::{CatalogError, SnapshotError, StoreError};
pub use snapshot::DEFAULT_NAMESPACE;
pub use store::{CatalogLoad, QuizProgressStore};
