//! Chat session controller.
//!
//! Single owner of the channel lifecycle, outbound framing, inbound
//! dispatch, and the externally observable session state: connection status,
//! the message log, typing flags and the verification status. The embedding
//! layer talks to a running session through a command queue and observes it
//! through a [`SessionEvent`] stream; nothing in here renders anything.

use crate::channel::{Action, Channel, ChannelEvent, Connection, Frame};
use crate::error::{ErrorKind, Result};
use crate::identity::{IdentityClaim, CHALLENGE_PHRASE};
use crate::network::Network;
use crate::rendezvous::SessionId;
use crate::signer::{DeviceEvent, SignerCapability, SignerPresence};
use crate::typing::{TypingIndicatorTimer, TypingSignal};
use crate::verify::{VerificationStateMachine, VerificationStatus, VerifyEvent};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How long a transient error banner stays up before auto-clearing.
pub const ERROR_BANNER_CLEAR: Duration = Duration::from_secs(5);

/// Granularity of the session's internal timer polling.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    Local,
    Remote,
}

/// One entry in the append-only message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub author: Author,
    pub text: String,
}

/// Connection status of the session's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    /// Get a human-readable string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State changes emitted to the embedding layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The channel connection status moved.
    ConnectionChanged(ConnectionStatus),
    /// A message was appended to the log.
    MessageAppended(ChatMessage),
    /// The remote party started or stopped typing.
    RemoteTypingChanged(bool),
    /// The guest verification status moved.
    VerificationChanged(VerificationStatus),
    /// An error surfaced. Transient kinds auto-clear via [`SessionEvent::BannerCleared`].
    Error { kind: ErrorKind, message: String },
    /// The transient error banner timed out.
    BannerCleared,
    /// Interaction must block until the signing device returns (or may
    /// resume again).
    SignerBlocked(bool),
}

/// Commands accepted by a running session.
#[derive(Debug)]
pub enum Command {
    /// Send a chat message.
    SendText(String),
    /// The local input field changed; drives typing signals.
    InputChanged(String),
    /// Tear the session down.
    Close,
}

/// The session controller. See the module docs.
pub struct ChatSession<S> {
    claim: IdentityClaim,
    network: Network,
    signer: S,
    verification: VerificationStateMachine,
    typing: TypingIndicatorTimer,
    remote_typing: bool,
    messages: Vec<ChatMessage>,
    connection: ConnectionStatus,
    presence: SignerPresence,
    blocked: bool,
    banner_deadline: Option<Instant>,
    events: mpsc::Sender<SessionEvent>,
}

impl<S: SignerCapability> ChatSession<S> {
    /// Open the session's channel and perform the initial protocol step.
    ///
    /// The joiner dials `target` with its claim attached as metadata; the
    /// host waits for the joiner to arrive. Once open, each side asks the
    /// peer to identify itself. A transport failure is surfaced as an error
    /// event and returned; it is not retried.
    pub async fn start<C: Channel>(
        claim: IdentityClaim,
        target: SessionId,
        signer: S,
        channel: &mut C,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<(Self, Connection)> {
        let mut session = Self {
            network: claim.network(),
            claim,
            signer,
            verification: VerificationStateMachine::new(),
            typing: TypingIndicatorTimer::new(),
            remote_typing: false,
            messages: Vec::new(),
            connection: ConnectionStatus::Disconnected,
            presence: SignerPresence::Present,
            blocked: false,
            banner_deadline: None,
            events,
        };

        session.set_connection(ConnectionStatus::Connecting).await;

        let connecting = if session.claim.is_initiator {
            info!(target = %target, "connecting to chat session");
            channel.connect(&target, session.claim.clone()).await
        } else {
            info!(id = %session.claim.session_id, "waiting for a peer to join");
            channel.accept().await
        };

        let conn = match connecting {
            Ok(conn) => conn,
            Err(err) => {
                session.set_connection(ConnectionStatus::Disconnected).await;
                session
                    .report_error(ErrorKind::Channel, err.to_string())
                    .await;
                return Err(err);
            }
        };

        session.set_connection(ConnectionStatus::Connected).await;

        // Identification is pull-based: each side asks and answers, so
        // channel readiness never waits on identity being known.
        if let Err(err) = conn.send(&Frame::Action(Action::RequestIdentification)).await {
            session
                .report_error(ErrorKind::Channel, err.to_string())
                .await;
        }

        Ok((session, conn))
    }

    /// Drive the session until it is closed.
    ///
    /// Reacts to UI commands, channel events, signer device events and the
    /// internal timer tick. Consumes the session; all observable state flows
    /// out through the event stream.
    pub async fn run(
        mut self,
        conn: Connection,
        mut commands: mpsc::Receiver<Command>,
        mut device_events: mpsc::Receiver<DeviceEvent>,
    ) {
        let mut conn = Some(conn);
        let mut tick = tokio::time::interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                maybe_command = commands.recv() => match maybe_command {
                    Some(Command::SendText(text)) => self.send_text(&mut conn, &text).await,
                    Some(Command::InputChanged(text)) => self.input_changed(&mut conn, &text).await,
                    Some(Command::Close) | None => {
                        self.shutdown(&mut conn).await;
                        break;
                    }
                },
                event = Self::next_channel_event(&mut conn) => {
                    self.on_channel_event(&mut conn, event).await;
                }
                Some(event) = device_events.recv() => {
                    self.on_device_event(event).await;
                }
                _ = tick.tick() => {
                    self.on_tick(&mut conn).await;
                }
            }
        }
    }

    /// The append-only message log.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Current channel connection status.
    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    /// Current guest verification status.
    pub fn verification_status(&self) -> VerificationStatus {
        self.verification.status()
    }

    /// Whether the remote party is currently typing.
    pub fn remote_typing(&self) -> bool {
        self.remote_typing
    }

    /// Whether interaction is blocked on the signing device returning.
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Resolves to the next event on an open connection, or never when the
    /// channel is gone.
    async fn next_channel_event(conn: &mut Option<Connection>) -> ChannelEvent {
        match conn.as_mut() {
            Some(conn) => match conn.recv().await {
                Some(event) => event,
                None => std::future::pending().await,
            },
            None => std::future::pending().await,
        }
    }

    async fn send_text(&mut self, conn: &mut Option<Connection>, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring empty outbound message");
            return;
        }
        if conn.is_none() {
            debug!("no open channel, dropping outbound message");
            return;
        }

        if !self
            .send_frame(conn, Frame::Message(text.to_string()))
            .await
        {
            return;
        }

        self.push_message(Author::Local, text).await;

        // The peer clears its typing indicator from this explicit signal,
        // not from the message itself; the debounce must not fire another.
        self.typing.clear();
        self.send_frame(conn, Frame::Action(Action::EndTyping)).await;
    }

    async fn input_changed(&mut self, conn: &mut Option<Connection>, text: &str) {
        if conn.is_none() {
            return;
        }

        if let Some(signal) = self.typing.input_changed(Instant::now(), !text.is_empty()) {
            self.send_frame(conn, Frame::Action(action_for(signal))).await;
        }
    }

    /// Send a frame if a channel is open. Returns whether the send went out;
    /// failures are reported as error events, never propagated.
    async fn send_frame(&mut self, conn: &mut Option<Connection>, frame: Frame) -> bool {
        let Some(open) = conn.as_ref() else {
            debug!(?frame, "no open channel, dropping frame");
            return false;
        };

        match open.send(&frame).await {
            Ok(()) => true,
            Err(err) => {
                self.report_error(ErrorKind::Channel, err.to_string()).await;
                false
            }
        }
    }

    async fn on_channel_event(&mut self, conn: &mut Option<Connection>, event: ChannelEvent) {
        match event {
            ChannelEvent::Frame(frame) => self.on_frame(conn, frame).await,
            ChannelEvent::Closed => {
                info!("peer closed the connection");
                conn.take();
                self.set_connection(ConnectionStatus::Disconnected).await;
                self.set_remote_typing(false).await;
                self.typing.clear();
            }
            ChannelEvent::Error(message) => {
                self.report_error(ErrorKind::Channel, message).await;
            }
        }
    }

    async fn on_frame(&mut self, conn: &mut Option<Connection>, frame: Frame) {
        match frame {
            Frame::Message(text) => {
                self.push_message(Author::Remote, &text).await;
            }
            Frame::Action(Action::StartTyping) => self.set_remote_typing(true).await,
            Frame::Action(Action::EndTyping) => self.set_remote_typing(false).await,
            Frame::Action(Action::RequestIdentification) => {
                debug!("peer requested identification");
                let own = Frame::Identification(self.claim.clone());
                self.send_frame(conn, own).await;
            }
            Frame::Identification(claim) => {
                info!(address = %claim.address, "received peer identification");
                let effects = self.verification.on_claim(claim, self.presence);
                self.apply_verify_events(effects).await;
            }
        }
    }

    /// Work through verification effects, running requested signer verify
    /// calls and feeding their results back into the machine.
    async fn apply_verify_events(&mut self, effects: Vec<VerifyEvent>) {
        let mut queue: VecDeque<VerifyEvent> = effects.into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                VerifyEvent::StatusChanged(status) => {
                    self.emit(SessionEvent::VerificationChanged(status)).await;
                }
                VerifyEvent::VerifyRequested(claim) => {
                    let result = self
                        .signer
                        .verify_message(
                            self.network,
                            &claim.address,
                            CHALLENGE_PHRASE,
                            &claim.signature,
                        )
                        .await;
                    queue.extend(self.verification.on_verify_result(result));
                }
                VerifyEvent::Mismatch(reason) => {
                    self.report_error(ErrorKind::VerificationMismatch, reason)
                        .await;
                }
                VerifyEvent::CallFailed(reason) => {
                    self.report_error(ErrorKind::Signer, reason).await;
                }
                VerifyEvent::ClaimRejected => {
                    // Already logged by the state machine.
                }
            }
        }
    }

    async fn on_device_event(&mut self, event: DeviceEvent) {
        let Some(own) = self.claim.device.clone() else {
            return;
        };
        if event.device().id != own.id {
            return;
        }

        match event {
            DeviceEvent::Connected(_) => {
                if self.presence == SignerPresence::Present {
                    return;
                }
                self.presence = SignerPresence::Present;
                info!(device = %own.id, "signing device reconnected");
                self.set_blocked(false).await;
                let effects = self.verification.on_presence_restored();
                self.apply_verify_events(effects).await;
            }
            DeviceEvent::Disconnected(_) => {
                if self.presence == SignerPresence::Absent {
                    return;
                }
                self.presence = SignerPresence::Absent;

                // After a settled verdict the device no longer matters; a
                // loss before that leaves verification inconclusive and
                // must read differently than an invalid signature.
                if !self.verification.status().is_terminal() {
                    self.set_blocked(true).await;
                    self.report_error(
                        ErrorKind::PresenceInterrupted,
                        "verification interrupted: signing device is absent",
                    )
                    .await;
                } else {
                    debug!(device = %own.id, "device detached after verdict, ignoring");
                }
            }
        }
    }

    async fn on_tick(&mut self, conn: &mut Option<Connection>) {
        let now = Instant::now();

        if let Some(signal) = self.typing.poll(now) {
            self.send_frame(conn, Frame::Action(action_for(signal))).await;
        }

        self.poll_banner(now).await;
    }

    async fn poll_banner(&mut self, now: Instant) {
        if let Some(deadline) = self.banner_deadline {
            if now >= deadline {
                self.banner_deadline = None;
                self.emit(SessionEvent::BannerCleared).await;
            }
        }
    }

    async fn shutdown(&mut self, conn: &mut Option<Connection>) {
        if let Some(mut open) = conn.take() {
            open.close();
        }
        self.typing.clear();
        self.set_connection(ConnectionStatus::Disconnected).await;
        info!("chat session closed");
    }

    async fn push_message(&mut self, author: Author, text: &str) {
        let message = ChatMessage {
            author,
            text: text.to_string(),
        };
        self.messages.push(message.clone());
        self.emit(SessionEvent::MessageAppended(message)).await;
    }

    async fn set_remote_typing(&mut self, value: bool) {
        if self.remote_typing != value {
            self.remote_typing = value;
            self.emit(SessionEvent::RemoteTypingChanged(value)).await;
        }
    }

    async fn set_connection(&mut self, status: ConnectionStatus) {
        if self.connection != status {
            self.connection = status;
            self.emit(SessionEvent::ConnectionChanged(status)).await;
        }
    }

    async fn set_blocked(&mut self, value: bool) {
        if self.blocked != value {
            self.blocked = value;
            self.emit(SessionEvent::SignerBlocked(value)).await;
        }
    }

    async fn report_error(&mut self, kind: ErrorKind, message: impl Into<String>) {
        let message = message.into();
        warn!(kind = %kind, %message, "session error");

        // Presence loss blocks until the device returns; everything else is
        // a transient banner.
        if kind != ErrorKind::PresenceInterrupted {
            self.banner_deadline = Some(Instant::now() + ERROR_BANNER_CLEAR);
        }

        self.emit(SessionEvent::Error { kind, message }).await;
    }

    async fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event).await;
    }
}

fn action_for(signal: TypingSignal) -> Action {
    match signal {
        TypingSignal::Start => Action::StartTyping,
        TypingSignal::End => Action::EndTyping,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity;
    use crate::signer::SoftSigner;

    fn attached_signer() -> SoftSigner {
        let signer = SoftSigner::new("test device");
        signer.attach();
        signer
    }

    async fn host_session(
        signer: SoftSigner,
    ) -> (ChatSession<SoftSigner>, mpsc::Receiver<SessionEvent>) {
        let claim = identity::identify_host(&signer, Network::Testnet, Some(signer.device()))
            .await
            .unwrap();
        let (events_tx, events_rx) = mpsc::channel(64);

        let session = ChatSession {
            network: claim.network(),
            claim,
            signer,
            verification: VerificationStateMachine::new(),
            typing: TypingIndicatorTimer::new(),
            remote_typing: false,
            messages: Vec::new(),
            connection: ConnectionStatus::Connected,
            presence: SignerPresence::Present,
            blocked: false,
            banner_deadline: None,
            events: events_tx,
        };
        (session, events_rx)
    }

    fn pipe() -> (Connection, Connection) {
        let (a_tx, a_rx) = mpsc::channel(64);
        let (b_tx, b_rx) = mpsc::channel(64);
        (
            Connection::new(None, a_tx, b_rx),
            Connection::new(None, b_tx, a_rx),
        )
    }

    async fn next_frame(conn: &mut Connection) -> Frame {
        match conn.recv().await {
            Some(ChannelEvent::Frame(frame)) => frame,
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_text_emits_message_then_end_typing() {
        let (mut session, _events) = host_session(attached_signer()).await;
        let (local, mut peer) = pipe();
        let mut conn = Some(local);

        session.send_text(&mut conn, "hi").await;

        assert_eq!(next_frame(&mut peer).await, Frame::Message("hi".to_string()));
        assert_eq!(
            next_frame(&mut peer).await,
            Frame::Action(Action::EndTyping)
        );

        assert_eq!(
            session.messages(),
            &[ChatMessage {
                author: Author::Local,
                text: "hi".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_send_text_trims_whitespace() {
        let (mut session, _events) = host_session(attached_signer()).await;
        let (local, mut peer) = pipe();
        let mut conn = Some(local);

        session.send_text(&mut conn, "  hi  ").await;

        assert_eq!(next_frame(&mut peer).await, Frame::Message("hi".to_string()));
    }

    #[tokio::test]
    async fn test_empty_send_is_a_noop() {
        let (mut session, _events) = host_session(attached_signer()).await;
        let (local, mut peer) = pipe();
        let mut conn = Some(local);

        session.send_text(&mut conn, "").await;
        session.send_text(&mut conn, "   ").await;

        assert!(session.messages().is_empty());
        conn.unwrap().close();
        assert_eq!(peer.recv().await, Some(ChannelEvent::Closed));
    }

    #[tokio::test]
    async fn test_send_without_channel_is_a_noop() {
        let (mut session, _events) = host_session(attached_signer()).await;
        let mut conn = None;

        session.send_text(&mut conn, "hi").await;

        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_remote_message_ordering_and_typing_flag() {
        let (mut session, mut events) = host_session(attached_signer()).await;
        let (local, _peer) = pipe();
        let mut conn = Some(local);

        session
            .on_frame(&mut conn, Frame::Action(Action::StartTyping))
            .await;
        assert!(session.remote_typing());
        assert_eq!(events.recv().await, Some(SessionEvent::RemoteTypingChanged(true)));

        // A message alone does not clear the flag; the explicit end signal
        // that follows it does.
        session
            .on_frame(&mut conn, Frame::Message("hello".to_string()))
            .await;
        assert!(session.remote_typing());

        session
            .on_frame(&mut conn, Frame::Action(Action::EndTyping))
            .await;
        assert!(!session.remote_typing());

        session.send_text(&mut conn, "hey").await;

        assert_eq!(
            session.messages(),
            &[
                ChatMessage {
                    author: Author::Remote,
                    text: "hello".to_string()
                },
                ChatMessage {
                    author: Author::Local,
                    text: "hey".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_identification_request_is_answered_with_own_claim() {
        let (mut session, _events) = host_session(attached_signer()).await;
        let (local, mut peer) = pipe();
        let mut conn = Some(local);

        session
            .on_frame(&mut conn, Frame::Action(Action::RequestIdentification))
            .await;

        match next_frame(&mut peer).await {
            Frame::Identification(claim) => {
                assert_eq!(claim.address, session.claim.address);
                assert!(claim.device.is_none());
            }
            other => panic!("expected identification, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_valid_identification_reaches_valid() {
        let (mut session, mut events) = host_session(attached_signer()).await;
        let guest_signer = attached_signer();
        let guest_claim =
            identity::identify_joiner(&guest_signer, &session.claim.session_id, None)
                .await
                .unwrap();
        let mut conn = None;

        session
            .on_frame(&mut conn, Frame::Identification(guest_claim))
            .await;

        assert_eq!(
            events.recv().await,
            Some(SessionEvent::VerificationChanged(VerificationStatus::Pending))
        );
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::VerificationChanged(VerificationStatus::Valid))
        );
        assert_eq!(session.verification_status(), VerificationStatus::Valid);
    }

    #[tokio::test]
    async fn test_tampered_identification_reaches_invalid() {
        let (mut session, mut events) = host_session(attached_signer()).await;
        let guest_signer = attached_signer();
        let mut guest_claim =
            identity::identify_joiner(&guest_signer, &session.claim.session_id, None)
                .await
                .unwrap();

        let mut bytes = hex::decode(&guest_claim.signature).unwrap();
        bytes[0] ^= 0x01;
        guest_claim.signature = hex::encode(bytes);

        let mut conn = None;
        session
            .on_frame(&mut conn, Frame::Identification(guest_claim))
            .await;

        assert_eq!(
            events.recv().await,
            Some(SessionEvent::VerificationChanged(VerificationStatus::Pending))
        );
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::VerificationChanged(VerificationStatus::Invalid))
        );
        match events.recv().await {
            Some(SessionEvent::Error { kind, .. }) => {
                assert_eq!(kind, ErrorKind::VerificationMismatch);
            }
            other => panic!("expected mismatch error, got {other:?}"),
        }
        assert!(session.banner_deadline.is_some());
    }

    #[tokio::test]
    async fn test_device_loss_blocks_then_reconnect_verifies() {
        let signer = attached_signer();
        let device = signer.device();
        let (mut session, mut events) = host_session(signer).await;

        // Device vanishes before any claim: interaction blocks.
        session
            .on_device_event(DeviceEvent::Disconnected(device.clone()))
            .await;
        assert_eq!(events.recv().await, Some(SessionEvent::SignerBlocked(true)));
        match events.recv().await {
            Some(SessionEvent::Error { kind, .. }) => {
                assert_eq!(kind, ErrorKind::PresenceInterrupted);
            }
            other => panic!("expected presence error, got {other:?}"),
        }

        // A claim arriving while the device is absent stays pending.
        let guest_signer = attached_signer();
        let guest_claim =
            identity::identify_joiner(&guest_signer, &session.claim.session_id, None)
                .await
                .unwrap();
        let mut conn = None;
        session
            .on_frame(&mut conn, Frame::Identification(guest_claim))
            .await;
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::VerificationChanged(VerificationStatus::Pending))
        );
        assert_eq!(session.verification_status(), VerificationStatus::Pending);

        // Reconnection unblocks and verification proceeds to a verdict.
        session
            .on_device_event(DeviceEvent::Connected(device))
            .await;
        assert_eq!(events.recv().await, Some(SessionEvent::SignerBlocked(false)));
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::VerificationChanged(VerificationStatus::Valid))
        );
    }

    #[tokio::test]
    async fn test_unrelated_device_events_are_ignored() {
        let (mut session, mut events) = host_session(attached_signer()).await;
        let other = SoftSigner::new("someone else's device").device();

        session.on_device_event(DeviceEvent::Disconnected(other)).await;

        assert!(events.try_recv().is_err());
        assert!(!session.is_blocked());
    }

    #[tokio::test]
    async fn test_banner_auto_clears() {
        let (mut session, mut events) = host_session(attached_signer()).await;

        session
            .report_error(ErrorKind::Channel, "peer-unavailable")
            .await;
        let _ = events.recv().await; // the error event

        session.poll_banner(Instant::now()).await;
        assert!(events.try_recv().is_err());

        session
            .poll_banner(Instant::now() + ERROR_BANNER_CLEAR)
            .await;
        assert_eq!(events.recv().await, Some(SessionEvent::BannerCleared));
    }

    #[tokio::test]
    async fn test_presence_error_does_not_arm_banner() {
        let (mut session, mut events) = host_session(attached_signer()).await;

        session
            .report_error(
                ErrorKind::PresenceInterrupted,
                "verification interrupted: signing device is absent",
            )
            .await;
        let _ = events.recv().await;

        assert!(session.banner_deadline.is_none());
    }

    #[tokio::test]
    async fn test_peer_close_clears_connection_and_typing() {
        let (mut session, mut events) = host_session(attached_signer()).await;
        let (local, peer) = pipe();
        let mut conn = Some(local);

        session
            .on_frame(&mut conn, Frame::Action(Action::StartTyping))
            .await;
        let _ = events.recv().await;

        drop(peer);
        let event = conn.as_mut().unwrap().recv().await.unwrap();
        session.on_channel_event(&mut conn, event).await;

        assert!(conn.is_none());
        assert_eq!(session.connection(), ConnectionStatus::Disconnected);
        assert!(!session.remote_typing());
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::ConnectionChanged(ConnectionStatus::Disconnected))
        );
        assert_eq!(events.recv().await, Some(SessionEvent::RemoteTypingChanged(false)));
    }

    #[tokio::test]
    async fn test_shutdown_closes_channel_once() {
        let (mut session, _events) = host_session(attached_signer()).await;
        let (local, mut peer) = pipe();
        let mut conn = Some(local);

        session.shutdown(&mut conn).await;
        session.shutdown(&mut conn).await; // second close is inert

        assert_eq!(peer.recv().await, Some(ChannelEvent::Closed));
        assert_eq!(peer.recv().await, None);
    }
}
