//! Client for the structured-entity lookup provider used to enrich
//! organization records (ticker, parent reference, legal-name variants)
//! before firm matching.

mod client;
mod errors;
mod query;
pub mod types;

pub use self::client::Client;
pub use self::errors::Error;
pub use self::query::LookupQuery;
