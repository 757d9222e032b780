use tokio_util::sync::CancellationToken;

mod api;
mod config;
mod handler;
mod manager;

fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .filter_module("ff_publisher", log::LevelFilter::Debug)
        .filter_module("stream_router", log::LevelFilter::Debug)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() -> ! {
    init_logging();
    let config = config::config();

    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    api::start_api_server(config.api_addr(), cancel_clone);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            },
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
            },
        }
    }

    manager::stop_all().await;
    std::process::exit(0);
}
