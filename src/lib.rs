pub mod app;
pub mod clock;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod journey;
pub mod legacy;
pub mod membership;
pub mod models;
pub mod paywall;
pub mod state;
pub mod stats;
pub mod storage;
pub mod triggered;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::KvStore;
