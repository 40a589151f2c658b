//! WebSocket client session management.

use dengon_server::infrastructure::dto::WireCodec;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};

use crate::{domain::parse_input, error::ClientError, formatter::FrameFormatter};

use super::ui::redisplay_prompt;

/// How one session ended without a connection error
#[derive(Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// The input channel closed (Ctrl+C / Ctrl+D)
    UserExit,
}

/// Run one WebSocket session until the user exits or the connection drops.
///
/// `input_rx` is shared across sessions so that reconnecting does not start a
/// second readline thread.
pub async fn run_client_session(
    url: &str,
    user_id: &str,
    input_rx: &mut mpsc::UnboundedReceiver<String>,
) -> Result<SessionEnd, ClientError> {
    let url = format!("{}?user_id={}", url, user_id);

    let (ws_stream, _response) = match connect_async(&url).await {
        Ok(result) => result,
        Err(tungstenite::Error::Http(response)) if response.status().as_u16() == 400 => {
            return Err(ClientError::InvalidUserId(user_id.to_string()));
        }
        Err(e) => return Err(ClientError::ConnectionError(e.to_string())),
    };

    tracing::info!("Connected to dengon server!");
    println!(
        "\nYou are '{}'. Type '@recipient message' and press Enter to send. Press Ctrl+C to exit.\n",
        user_id
    );

    let (mut write, mut read) = ws_stream.split();

    let user_id_for_read = user_id.to_string();
    let mut read_task = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let formatted = match WireCodec::decode_server(text.as_str()) {
                        Ok(frame) => FrameFormatter::format_frame(&frame),
                        Err(e) => {
                            tracing::debug!("Undecodable frame: {}", e);
                            FrameFormatter::format_raw_message(text.as_str())
                        }
                    };
                    print!("{}", formatted);
                    redisplay_prompt(&user_id_for_read);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    let mut next_ref: u64 = 0;
    loop {
        tokio::select! {
            _ = &mut read_task => {
                return Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
            line = input_rx.recv() => {
                let Some(line) = line else {
                    break;
                };

                let chat = match parse_input(&line) {
                    Ok(chat) => chat,
                    Err(e) => {
                        println!("{}", e);
                        redisplay_prompt(user_id);
                        continue;
                    }
                };

                next_ref += 1;
                let frame = chat.into_frame(format!("c-{}", next_ref));
                let json = match WireCodec::encode_client(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("Failed to encode frame: {}", e);
                        continue;
                    }
                };

                if let Err(e) = write.send(Message::Text(json.into())).await {
                    read_task.abort();
                    return Err(ClientError::ConnectionError(e.to_string()));
                }
            }
        }
    }

    read_task.abort();
    let _ = write.close().await;
    Ok(SessionEnd::UserExit)
}
