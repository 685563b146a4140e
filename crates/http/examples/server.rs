use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use micro_framing::aggregate::AggregatorConfig;
use micro_framing::codec::DecoderConfig;
use micro_framing::connection::HttpConnection;
use micro_framing::handler::make_handler;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match AggregatorConfig::new(64 * 1024) {
        Ok(config) => config.with_close_on_expectation_failed(true),
        Err(e) => {
            error!(cause = %e, "invalid aggregator config");
            return;
        }
    };

    info!(port = 8080, "start listening");
    let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
        Ok(tcp_listener) => tcp_listener,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    let handler = Arc::new(make_handler(echo));

    loop {
        let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let handler = handler.clone();

        tokio::spawn(async move {
            let connection = HttpConnection::with_config(tcp_stream, config, DecoderConfig::default());
            match connection.process(handler).await {
                Ok(()) => info!(%remote_addr, "finished process, connection shutdown"),
                Err(e) => error!(%remote_addr, cause = %e, "service has error, connection shutdown"),
            }
        });
    }
}

/// Replies with the aggregated request body, or a greeting for empty requests
async fn echo(request: Request<Bytes>) -> Result<Response<Full<Bytes>>, Infallible> {
    info!(method = %request.method(), path = request.uri().path(), body_len = request.body().len(), "receiving request");

    let body = if request.body().is_empty() { Bytes::from_static(b"Hello World!\r\n") } else { request.into_body() };
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = StatusCode::OK;
    Ok(response)
}
