use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use room::RoomStore;

mod logger;
mod routes;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// HTTP api port
    #[clap(short, long, env = "APP_PORT", default_value_t = 3000)]
    port: u16,
    /// websocket port
    #[clap(short, long, env = "APP_WS_PORT", default_value_t = 3001)]
    ws_port: u16,
    #[clap(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init(args.debug);

    let launch_time = tokio::time::Instant::now();
    let store = RoomStore::new();

    let listener = match TcpListener::bind(("0.0.0.0", args.ws_port)).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(port = args.ws_port, %err, "failed to bind websocket port");
            std::process::exit(1);
        }
    };
    tokio::spawn(room::server::serve(listener, store.clone()));

    info!(
        port = args.port,
        ws_port = args.ws_port,
        elapsed_us = launch_time.elapsed().as_micros() as u64,
        "hall ready"
    );
    warp::serve(routes::api(store)).run(([0, 0, 0, 0], args.port)).await;
}
