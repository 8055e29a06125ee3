pub mod api;
pub mod backoff;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod route;
pub mod session;
pub mod state;
pub mod sync;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use api::{ApiError, ChatApi, HttpChatApi};
pub use config::ClientConfig;
pub use error::ClientError;
pub use session::SessionStore;
pub use state::AppState;
pub use sync::{MessageSyncLoop, MessageView, SyncConfig, SyncHandle, SyncHealth};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "penguin_client=debug,penguin_store=debug,info"
    } else {
        "penguin_client=info,penguin_store=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .try_init();
}
