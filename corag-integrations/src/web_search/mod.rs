//! Web search provider adapters.

mod google;

pub use google::GoogleSearchProvider;
