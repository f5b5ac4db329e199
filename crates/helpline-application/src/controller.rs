//! Chat session controller.
//!
//! Binds the session state to the realtime channel and the draft store,
//! and exposes the operations the presentation layer calls plus the
//! inbound handler the channel drives. One controller instance manages
//! exactly one conversation at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use helpline_core::channel::RealtimeChannel;
use helpline_core::protocol::{
    ClientEvent, InboundBot, OutboundChat, RESOLUTION_CONFIRMED_TEXT, RESOLUTION_DECLINED_TEXT,
    ServerEvent,
};
use helpline_core::session::{ChatMessage, ChatSession, DraftRepository, IntakeRecord};

/// Controller configuration.
#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    /// Retract a pending placeholder after this long with no response.
    ///
    /// `None` (the default) matches the browser client: a placeholder
    /// with no response stays until the next send or a reload.
    pub placeholder_timeout: Option<Duration>,
}

/// Orchestrates one support conversation.
///
/// All state mutations happen on delivery of a discrete event (a caller
/// operation or an inbound channel event), and every mutation is followed
/// by an explicit write-through snapshot into the draft store.
///
/// Failures stay inside this boundary: validation rejections are silent,
/// malformed payloads degrade to defaults, and store/channel errors are
/// logged and swallowed. Nothing here surfaces an error dialog.
pub struct ChatController {
    session: Arc<RwLock<ChatSession>>,
    channel: Arc<dyn RealtimeChannel>,
    drafts: Arc<dyn DraftRepository>,
    config: ControllerConfig,
    /// Bumped on every placeholder-affecting change so a stale retraction
    /// watchdog does nothing.
    placeholder_epoch: Arc<AtomicU64>,
}

impl ChatController {
    /// Creates a controller, recovering the draft slot when possible.
    ///
    /// Construction never fails: an absent, empty, or unreadable draft
    /// yields the same fresh default state.
    pub async fn new(
        channel: Arc<dyn RealtimeChannel>,
        drafts: Arc<dyn DraftRepository>,
        config: ControllerConfig,
    ) -> Self {
        let session = match drafts.load().await {
            Ok(Some(session)) => {
                info!(session_id = %session.id, messages = session.messages.len(), "Recovered draft session");
                session
            }
            Ok(None) => ChatSession::new(),
            Err(e) => {
                warn!(error = %e, "Draft load failed; starting fresh");
                ChatSession::new()
            }
        };

        Self {
            session: Arc::new(RwLock::new(session)),
            channel,
            drafts,
            config,
            placeholder_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts the conversation from the intake form.
    ///
    /// Silently rejects an invalid record (missing name or subject): no
    /// state change, no error. On success the log is seeded with the
    /// greeting and the lifecycle moves to started, one-way.
    pub async fn start_session(&self, intake: IntakeRecord) {
        if !intake.is_valid() {
            debug!("Ignoring intake submission with missing required fields");
            return;
        }

        {
            let mut session = self.session.write().await;
            if session.started {
                // Started is one-way; a duplicate submission must not
                // reseed the log.
                debug!(session_id = %session.id, "Session already started");
                return;
            }
            let greeting = format!(
                "Hello, {}! How can I help you with \"{}\"?",
                intake.name, intake.subject
            );
            session.intake = intake;
            session.begin(ChatMessage::assistant(greeting));
            info!(session_id = %session.id, "Session started");
        }
        self.persist().await;
    }

    /// Sends one customer message.
    ///
    /// No-op on blank text. Appends the user message and a fresh
    /// placeholder, persists, then emits the outbound event. The emit is
    /// not gated on connectivity; a failed send leaves the placeholder in
    /// place until a response or reload.
    pub async fn send_message(&self, text: &str, is_related_suggestion: bool) {
        // Typed sends clear the compose box; suggestion clicks leave it.
        self.dispatch(text, is_related_suggestion, !is_related_suggestion)
            .await;
    }

    /// Sends the canned resolution acknowledgement.
    ///
    /// Used when the latest assistant message carries a resolution prompt;
    /// goes through the same path as `send_message` without touching the
    /// compose box.
    pub async fn confirm_resolution(&self, confirmed: bool) {
        let text = if confirmed {
            RESOLUTION_CONFIRMED_TEXT
        } else {
            RESOLUTION_DECLINED_TEXT
        };
        self.dispatch(text, false, false).await;
    }

    async fn dispatch(&self, text: &str, related_flag: bool, clear_input: bool) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let payload = {
            let mut session = self.session.write().await;
            // A new send supersedes any still-pending placeholder; at most
            // one is outstanding at a time.
            session.remove_placeholders();
            session.append_message(ChatMessage::user(text));
            session.append_message(ChatMessage::placeholder());
            if clear_input {
                session.set_pending_input("");
            }
            OutboundChat::from_session(&session, text, related_flag)
        };
        self.bump_epoch();
        self.persist().await;

        if let Err(e) = self.channel.send(ClientEvent::ChatMessage(payload)).await {
            // Connectivity is status, not failure; the transport keeps
            // reconnecting and the placeholder stays visible.
            warn!(error = %e, "Outbound send failed");
        }
        self.arm_placeholder_watchdog();
    }

    /// Inbound handler for events delivered by the channel.
    pub async fn handle_server_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::BotMessage(bot) => self.on_assistant_message(bot).await,
        }
    }

    /// Forwards subscribed channel events into the inbound handler until
    /// the channel closes.
    pub async fn run(&self) {
        let mut events = self.channel.subscribe();
        loop {
            match events.recv().await {
                Ok(event) => self.handle_server_event(event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Inbound event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn on_assistant_message(&self, bot: InboundBot) {
        {
            let mut session = self.session.write().await;
            session.resolve_placeholders(bot.into_message());
        }
        self.bump_epoch();
        self.persist().await;
    }

    /// Replaces the intake record. Ignored once the session is started;
    /// from then on the record is frozen as sent metadata.
    pub async fn set_intake(&self, intake: IntakeRecord) {
        {
            let mut session = self.session.write().await;
            if session.started {
                debug!("Ignoring intake edit after session start");
                return;
            }
            session.intake = intake;
        }
        self.persist().await;
    }

    /// Replaces the unsent compose-box text.
    pub async fn set_pending_input(&self, text: &str) {
        {
            let mut session = self.session.write().await;
            session.set_pending_input(text);
        }
        self.persist().await;
    }

    /// Ends the conversation: erases the draft slot and resets to fresh
    /// defaults with a new identity.
    ///
    /// Interactive confirmation is the caller's responsibility.
    pub async fn end_session(&self) {
        if let Err(e) = self.drafts.clear().await {
            warn!(error = %e, "Draft clear failed");
        }
        {
            let mut session = self.session.write().await;
            let old_id = session.id.clone();
            session.reset();
            info!(old_session_id = %old_id, session_id = %session.id, "Session ended");
        }
        self.bump_epoch();
    }

    /// Whether tearing the controller down would lose customer work.
    pub async fn has_unsaved_work(&self) -> bool {
        self.session.read().await.has_unsaved_work()
    }

    /// Snapshot of the current session state.
    pub async fn session(&self) -> ChatSession {
        self.session.read().await.clone()
    }

    /// The current session identity.
    pub async fn session_id(&self) -> String {
        self.session.read().await.id.clone()
    }

    /// Connectivity status of the underlying channel.
    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Write-through snapshot after a mutation. Store failures are logged
    /// and swallowed.
    async fn persist(&self) {
        let snapshot = self.session.read().await.clone();
        if let Err(e) = self.drafts.save(&snapshot).await {
            warn!(error = %e, "Draft save failed");
        }
    }

    fn bump_epoch(&self) {
        self.placeholder_epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Spawns the optional retraction watchdog for the placeholder just
    /// appended. Does nothing unless a timeout is configured.
    fn arm_placeholder_watchdog(&self) {
        let Some(timeout) = self.config.placeholder_timeout else {
            return;
        };
        let armed_epoch = self.placeholder_epoch.load(Ordering::SeqCst);
        let epoch = self.placeholder_epoch.clone();
        let session = self.session.clone();
        let drafts = self.drafts.clone();

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if epoch.load(Ordering::SeqCst) != armed_epoch {
                // A response arrived or another send superseded us.
                return;
            }
            let retracted = {
                let mut session = session.write().await;
                let had = session.has_placeholder();
                if had {
                    session.remove_placeholders();
                }
                had
            };
            if retracted {
                epoch.fetch_add(1, Ordering::SeqCst);
                warn!("No response within {:?}; retracting placeholder", timeout);
                let snapshot = session.read().await.clone();
                if let Err(e) = drafts.save(&snapshot).await {
                    warn!(error = %e, "Draft save failed");
                }
            }
        });
    }
}
