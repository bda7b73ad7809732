//! Application services: rendering, aggregation and the site read model.

pub mod error;
pub mod ledger;
pub mod render;
pub mod reviews;
pub mod site;
pub mod upstream;
