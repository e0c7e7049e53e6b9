// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram messaging gateway for peerwarden.
//!
//! Implements [`MessagingGateway`] for the Telegram Bot API via teloxide.
//! Long polling runs on its own task and feeds messages and button presses
//! into a bounded queue drained by [`MessagingGateway::receive`].

pub mod handler;

use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use peerwarden_core::{
    AdapterType, HealthStatus, InboundEvent, MessagingGateway, OutboundMessage, PeerwardenError,
    PluginAdapter,
};
use teloxide::dispatching::ShutdownToken;
use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, MessageId, ParseMode};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

/// Inbound events buffered between the poller and the dispatch loop.
const INBOUND_CAPACITY: usize = 100;

fn channel_error(what: &str, e: teloxide::RequestError) -> PeerwardenError {
    PeerwardenError::Channel {
        message: format!("{what}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Telegram gateway implementing [`MessagingGateway`].
pub struct TelegramGateway {
    bot: Bot,
    inbound_rx: Mutex<mpsc::Receiver<InboundEvent>>,
    /// Handed to the poller on connect. Once the poller stops, the queue
    /// closes and `receive` fails.
    inbound_tx: Option<mpsc::Sender<InboundEvent>>,
    shutdown: StdMutex<Option<ShutdownToken>>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramGateway {
    /// Creates a gateway for `token`. Nothing is contacted until
    /// [`MessagingGateway::connect`].
    pub fn new(token: &str) -> Result<Self, PeerwardenError> {
        if token.trim().is_empty() {
            return Err(PeerwardenError::Config(
                "bot.token cannot be empty".into(),
            ));
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        Ok(Self {
            bot: Bot::new(token),
            inbound_rx: Mutex::new(inbound_rx),
            inbound_tx: Some(inbound_tx),
            shutdown: StdMutex::new(None),
            polling_handle: None,
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

async fn forward(tx: &mpsc::Sender<InboundEvent>, event: Option<InboundEvent>) {
    if let Some(event) = event {
        if tx.send(event).await.is_err() {
            warn!("inbound queue closed, dropping update");
        }
    }
}

#[async_trait]
impl PluginAdapter for TelegramGateway {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, PeerwardenError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    /// Stops long polling. Events already queued can still be received.
    async fn shutdown(&self) -> Result<(), PeerwardenError> {
        let token = self
            .shutdown
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        let Some(token) = token else {
            return Ok(());
        };
        match token.shutdown() {
            Ok(stopped) => {
                stopped.await;
                info!("Telegram polling stopped");
            }
            Err(e) => debug!(error = %e, "Telegram polling was not running"),
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn connect(&mut self) -> Result<(), PeerwardenError> {
        let Some(tx) = self.inbound_tx.take() else {
            return Ok(()); // Already connected
        };

        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| channel_error("Telegram getMe failed", e))?;
        info!(username = ?me.username, "starting Telegram long polling");

        let message_tx = tx.clone();
        let callback_tx = tx;
        let updates = dptree::entry()
            .branch(Update::filter_message().endpoint(move |msg: Message| {
                let tx = message_tx.clone();
                async move {
                    forward(&tx, handler::to_inbound_message(&msg)).await;
                    respond(())
                }
            }))
            .branch(
                Update::filter_callback_query().endpoint(move |query: CallbackQuery| {
                    let tx = callback_tx.clone();
                    async move {
                        forward(&tx, handler::to_callback_event(&query)).await;
                        respond(())
                    }
                }),
            );

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), updates)
            .default_handler(|_| async {})
            .build();
        *self
            .shutdown
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(dispatcher.shutdown_token());

        self.polling_handle = Some(tokio::spawn(async move {
            dispatcher.dispatch().await;
        }));
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<i32, PeerwardenError> {
        let mut request = self.bot.send_message(ChatId(msg.chat_id), msg.text);
        if msg.html {
            request = request.parse_mode(ParseMode::Html);
        }
        if !msg.keyboard.is_empty() {
            request = request.reply_markup(handler::keyboard_markup(&msg.keyboard));
        }
        let sent = request
            .await
            .map_err(|e| channel_error("failed to send message", e))?;
        Ok(sent.id.0)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), PeerwardenError> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(|e| channel_error("failed to delete message", e))?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), PeerwardenError> {
        self.bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()))
            .await
            .map_err(|e| channel_error("failed to answer callback", e))?;
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, PeerwardenError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| PeerwardenError::channel("Telegram inbound queue closed"))
    }
}
