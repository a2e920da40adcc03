mod app;
mod config;
mod fetch;
mod icons;
mod ipc;
mod markers;
mod panels;
mod popup;
mod projection;
mod readiness;
mod registry;
mod sidebar;
mod snapshot;
mod surface;
mod sync;
mod theme;
mod util;
mod views;

use tracing_subscriber::EnvFilter;

fn main() -> Result<(), iced_layershell::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("session_map=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    app::run()
}
