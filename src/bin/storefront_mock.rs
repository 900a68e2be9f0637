//!
//! storefront mock backend
//! -----------------------
//! Runs the in-memory shop API on localhost with seeded users, products and
//! orders, so the shell can be tried without the real server.

use anyhow::Result;
use std::env;

use storefront::config::{flag_value, has_flag, parse_port_env, DEFAULT_MOCK_PORT, ENV_MOCK_PORT};
use storefront::mock::{serve, MockOptions, SEED_PASSWORD, SEED_USERS};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let args: Vec<String> = env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("storefront mock backend\n\nUSAGE:\n  storefront_mock [--port N] [--page-size N]\n\nOPTIONS:\n  --port N        listen port (env: {}, default {})\n  --page-size N   items per listing page (default 10)\n", ENV_MOCK_PORT, DEFAULT_MOCK_PORT);
        return Ok(());
    }

    // Flags override environment, environment overrides defaults.
    let arg_port = flag_value(&args, "--port").and_then(|v| v.parse::<u16>().ok());
    let port = arg_port.or_else(|| parse_port_env(ENV_MOCK_PORT)).unwrap_or(DEFAULT_MOCK_PORT);
    let page_size = flag_value(&args, "--page-size").and_then(|v| v.parse::<usize>().ok()).unwrap_or(10);

    println!("storefront mock listening on http://127.0.0.1:{}/api", port);
    for (email, _, role) in SEED_USERS {
        println!("  {:<6} {} / {}", role.as_str(), email, SEED_PASSWORD);
    }
    tracing::info!(port, page_size, "starting mock backend");
    serve(MockOptions { port, page_size }).await
}
