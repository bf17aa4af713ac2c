//! Standalone mock commerce API for local runs
//!
//! Serves the same in-memory store the integration tests use, so the CLI
//! can be exercised without the real service:
//!
//!   mock_store [port]        (default port 8080)

use std::net::SocketAddr;

use storecheck::common::logging;
use storecheck::mock;

#[tokio::main]
async fn main() {
    logging::init();

    let port = std::env::args()
        .nth(1)
        .map(|arg| match arg.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                eprintln!("Invalid port '{arg}'");
                std::process::exit(2);
            }
        })
        .unwrap_or(8080);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let server = match mock::start(addr).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("Mock store listening on {}", server.base_url());
    println!("Press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.ok();
}
