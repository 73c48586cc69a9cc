use crate::capability::{MediaDevices, NegotiationFactory, SignalingOutput};
use crate::config::SessionConfig;
use crate::session::{CallEvent, CallSession, CallSessionHandle};
use anyhow::{Context, Result};
use duet_core::{ClientMessage, ServerMessage};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

impl SignalingOutput for mpsc::UnboundedSender<ClientMessage> {
    fn send(&self, message: ClientMessage) -> bool {
        mpsc::UnboundedSender::send(self, message).is_ok()
    }
}

/// Signaling connection to a duet server over WebSocket.
///
/// Outbound frames are queued on an unbounded channel drained by a writer
/// task; inbound frames are parsed by a reader task and handed to whoever
/// holds the receiver returned by `connect`, normally a `CallSession`.
#[derive(Debug, Clone)]
pub struct WsSignaling {
    outbound: mpsc::UnboundedSender<ClientMessage>,
}

impl WsSignaling {
    pub async fn connect(
        url: &str,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<ServerMessage>)> {
        let (ws_stream, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to signaling server at {}", url))?;
        info!("Signaling WebSocket connected to {}", url);

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<ServerMessage>();

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize {}: {}", message.kind(), e);
                        continue;
                    }
                };
                if ws_write.send(Message::Text(json.into())).await.is_err() {
                    debug!("Signaling socket closed while sending");
                    return;
                }
            }
            let _ = ws_write.send(Message::Close(None)).await;
        });

        tokio::spawn(async move {
            while let Some(frame) = ws_read.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Signaling socket error: {}", e);
                        break;
                    }
                };

                match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(message) => {
                        if inbound_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Unparseable server frame: {}", e),
                }
            }
            info!("Signaling WebSocket closed");
        });

        Ok((Arc::new(Self { outbound }), inbound_rx))
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

impl SignalingOutput for WsSignaling {
    fn send(&self, message: ClientMessage) -> bool {
        self.outbound.send(message).is_ok()
    }
}

/// Connects to a signaling server and starts a call session on top of it.
pub async fn connect_session(
    url: &str,
    config: SessionConfig,
    media: Arc<dyn MediaDevices>,
    factory: Arc<dyn NegotiationFactory>,
) -> Result<(CallSessionHandle, mpsc::UnboundedReceiver<CallEvent>)> {
    let (signaling, inbound) = WsSignaling::connect(url).await?;
    Ok(CallSession::spawn(config, signaling, inbound, media, factory))
}
