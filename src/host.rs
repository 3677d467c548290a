//! Line-delimited JSON transport between a host framework and the plugin.
//!
//! The host registers one [`BatteryPlugin`] on a method channel
//! and an event channel, then feeds it requests read from `reader`.
//! Responses and stream events are written to `writer`, one JSON object per line.

use crate::clients::upower::Connector;
use crate::codec::{MethodCall, MethodResponse};
use crate::config::Config;
use crate::plugin::BatteryPlugin;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const UNKNOWN_CHANNEL: &str = "unknown_channel";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    MethodCall {
        id: u64,
        channel: String,
        method: String,
        #[serde(default)]
        args: Value,
    },
    Listen {
        id: u64,
        channel: String,
    },
    Cancel {
        id: u64,
        channel: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Response { id: u64, response: MethodResponse },
    Event { channel: String, event: Value },
}

pub struct Host<C: Connector> {
    plugin: BatteryPlugin<C>,
    method_channel: String,
    event_channel: String,
}

impl<C: Connector> Host<C> {
    pub fn new(plugin: BatteryPlugin<C>, config: &Config) -> Self {
        Self {
            plugin,
            method_channel: config.method_channel.clone(),
            event_channel: config.event_channel.clone(),
        }
    }

    /// Serves requests until `reader` reaches end of input.
    ///
    /// Requests are handled one at a time.
    /// Pending stream events are always written before the next request is read.
    /// The plugin is disposed before returning.
    pub async fn run<R, W>(mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            "Serving '{}' and '{}'",
            self.method_channel, self.event_channel
        );

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut lines = reader.lines();

        loop {
            tokio::select! {
                biased;

                Some(event) = event_rx.recv() => {
                    let message = Message::Event {
                        channel: self.event_channel.clone(),
                        event,
                    };
                    write_message(&mut writer, &message).await?;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };

                    if line.trim().is_empty() {
                        continue;
                    }

                    // FIXME: malformed requests carry no id, so the sender never gets a reply
                    match serde_json::from_str::<Request>(&line) {
                        Ok(request) => {
                            debug!("Received request: {request:?}");
                            let message = self.handle_request(request, &event_tx).await;
                            write_message(&mut writer, &message).await?;
                        }
                        Err(err) => warn!("Ignoring malformed request: {err}"),
                    }
                }
            }
        }

        info!("Input closed, shutting down");
        self.plugin.dispose();
        writer.flush().await?;

        Ok(())
    }

    async fn handle_request(
        &mut self,
        request: Request,
        events: &mpsc::UnboundedSender<Value>,
    ) -> Message {
        match request {
            Request::MethodCall {
                id,
                channel,
                method,
                args,
            } => {
                let response = if channel == self.method_channel {
                    let call = MethodCall { method, args };
                    self.plugin.handle_method_call(&call).await
                } else {
                    debug!("No method handler registered on '{channel}'");
                    MethodResponse::NotImplemented
                };

                Message::Response { id, response }
            }
            Request::Listen { id, channel } => {
                let response = if channel == self.event_channel {
                    match self.plugin.listen(events.clone()).await {
                        Ok(()) => MethodResponse::success(Value::Null),
                        Err(err) => {
                            warn!("Failed to listen for battery state: {err}");
                            err.into()
                        }
                    }
                } else {
                    unknown_channel(&channel)
                };

                Message::Response { id, response }
            }
            Request::Cancel { id, channel } => {
                let response = if channel == self.event_channel {
                    self.plugin.cancel();
                    MethodResponse::success(Value::Null)
                } else {
                    unknown_channel(&channel)
                };

                Message::Response { id, response }
            }
        }
    }
}

fn unknown_channel(channel: &str) -> MethodResponse {
    MethodResponse::error(
        UNKNOWN_CHANNEL,
        &format!("No stream handler registered on '{channel}'"),
    )
}

async fn write_message<W>(writer: &mut W, message: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = serde_json::to_vec(message)?;
    buf.push(b'\n');

    writer.write_all(&buf).await?;
    writer.flush().await?;

    Ok(())
}
