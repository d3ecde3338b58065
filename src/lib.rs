pub use env_logger::Env;
pub use log::{debug, info};

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initializes the global logger once, honoring `RUST_LOG` and
/// defaulting to `info`. Safe to call from multiple places.
pub fn init_logger() {
  INIT_LOGGER.call_once(|| {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
  });
}

pub mod client_to_relay_communication;
pub mod dm;
pub mod event;
pub mod filter;
pub mod keys;
pub mod relay;
pub mod relay_to_client_communication;
pub mod schnorr;
