use binance_wsapi::core::kernel::codec::{decode_message, WsApiMessage};
use binance_wsapi::websocket_api::request_handler::Params;
use binance_wsapi::{ClientConfig, WebSocketApiClient};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // BINANCE_API_KEY / BINANCE_SECRET_KEY enable the signed account request below
    let config = ClientConfig::from_env("BINANCE").unwrap_or_else(|e| {
        info!("Running without credentials: {}", e);
        ClientConfig::read_only()
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut client = WebSocketApiClient::from_config(config);
    client.connect_with(
        |connection_id| info!("Connection {} open", connection_id),
        move |message| {
            let _ = tx.send(message);
        },
        |reason| warn!("Connection closing: {}", reason),
        |failure| error!("Connection failed: {}", failure),
    )?;

    let mut pending = vec![
        client.general()?.ping(Params::new())?,
        client.general()?.server_time(Params::new())?,
    ];

    let mut depth_params = Params::new();
    depth_params.insert("limit".to_string(), 5.into());
    pending.push(client.market()?.order_book("BTCUSDT", depth_params)?);

    if client.config().can_sign() {
        pending.push(client.account()?.account_status(Params::new())?);
    }

    while !pending.is_empty() {
        let text = match timeout(Duration::from_secs(10), rx.recv()).await {
            Ok(Some(text)) => text,
            Ok(None) => break,
            Err(_) => {
                warn!("Timed out waiting for {} response(s)", pending.len());
                break;
            }
        };

        match decode_message(&text) {
            Ok(WsApiMessage::Response(response)) => {
                let id = response.id.clone().unwrap_or_default();
                pending.retain(|pending_id| *pending_id != id);
                match response.into_result() {
                    Ok(result) => println!("[{}] {}", id, result),
                    Err(e) => println!("[{}] error: {}", id, e),
                }
            }
            Ok(WsApiMessage::Event(event)) => println!("event: {}", event),
            Err(e) => warn!("Undecodable message: {}", e),
        }
    }

    client.close();
    Ok(())
}
