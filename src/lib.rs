pub mod aggregator;
pub mod app;
pub mod coerce;
pub mod config;
pub mod errors;
pub mod fixture;
pub mod format;
pub mod handlers;
pub mod models;
pub mod refresh;
pub mod source;
pub mod state;
pub mod ui;

pub use aggregator::{aggregate, AggregateOptions, RatePolicy};
pub use app::router;
pub use config::Config;
pub use refresh::{spawn_periodic, RefreshOutcome, Refresher};
pub use state::AppState;
