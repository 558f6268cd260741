pub mod config;
pub mod conflict;
pub mod errors;
pub mod logging;
pub mod model;
pub mod schedule;
pub mod store;
pub mod sync;
