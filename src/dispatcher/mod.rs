//! Message dispatcher
//!
//! Single entry point for content arriving from the call. It decodes the
//! content, advances the session state or the transcript table, and notifies
//! every registered handler.
//!
//! One mutex guards the handler registry, the session state and the table.
//! Handlers are never called with the lock held: the dispatcher snapshots the
//! registry, releases the lock, then notifies. Handlers may therefore
//! register, unregister or dispatch from inside a callback.

mod handler;

pub use handler::{ChannelHandler, Diagnostic, LoggingHandler, SubtitlesEvent, SubtitlesEventHandler};

use crate::config::SubtitlesConfig;
use crate::error::{DecodeError, SubtitlesError};
use crate::protocol::{parse_content, CommandPayload, DecodeOptions, DecodedCommand, TextPayload};
use crate::session::SessionState;
use crate::transcript::{
    AccumulatorState, ChunkOrder, LayoutBounds, SpeakerSide, TranscriptMessage, TranscriptTable,
};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, warn};

/// Handle assigned to a registered handler
pub type ListenerId = u64;

#[derive(Clone)]
struct Registration {
    id: ListenerId,
    handler: Arc<dyn SubtitlesEventHandler>,
}

struct DispatcherState {
    listeners: Vec<Registration>,
    next_id: ListenerId,
    session: SessionState,
    transcripts: TranscriptTable,
}

/// What a dispatch did with the content
#[derive(Clone, Debug)]
pub enum DispatchOutcome {
    /// Speak-status event; carries the new state
    StateChanged(SessionState),
    /// ASR chunk applied; carries the updated line
    AsrMessage(TranscriptMessage),
    /// LLM chunk applied; carries the updated line
    LlmMessage(TranscriptMessage),
    /// Chunk refused by the transcript table
    Rejected {
        side: SpeakerSide,
        error: SubtitlesError,
    },
    /// Content did not decode and was forwarded raw
    RawForwarded(DecodeError),
}

/// Everything observable about one `handle_content` call
#[derive(Clone, Debug)]
pub struct DispatchReport {
    pub outcome: DispatchOutcome,
    pub diagnostics: Vec<Diagnostic>,
    /// Handler callbacks that returned an error or panicked
    pub failures: Vec<SubtitlesError>,
    /// Number of handlers in the notified snapshot
    pub listeners: usize,
}

impl DispatchReport {
    fn new(outcome: DispatchOutcome, listeners: usize) -> Self {
        Self {
            outcome,
            diagnostics: Vec::new(),
            failures: Vec::new(),
            listeners,
        }
    }

    /// Check if the content decoded into a command
    pub fn is_decoded(&self) -> bool {
        !matches!(self.outcome, DispatchOutcome::RawForwarded(_))
    }
}

/// Decodes call content and fans it out to handlers
pub struct MessageDispatcher {
    decode_options: DecodeOptions,
    state: Mutex<DispatcherState>,
}

static SHARED: OnceLock<MessageDispatcher> = OnceLock::new();

impl MessageDispatcher {
    pub fn new(config: SubtitlesConfig) -> Self {
        Self {
            decode_options: config.decode_options(),
            state: Mutex::new(DispatcherState {
                listeners: Vec::new(),
                next_id: 1,
                session: SessionState::Uninitialized,
                transcripts: TranscriptTable::new(config.table_options()),
            }),
        }
    }

    /// Process-wide dispatcher with default configuration, created on first use
    pub fn shared() -> &'static MessageDispatcher {
        SHARED.get_or_init(|| MessageDispatcher::new(SubtitlesConfig::default()))
    }

    /// Register a handler. Registering the same `Arc` again returns its existing id.
    pub fn register(&self, handler: Arc<dyn SubtitlesEventHandler>) -> ListenerId {
        let mut state = self.state.lock();
        if let Some(existing) = state
            .listeners
            .iter()
            .find(|r| same_handler(&r.handler, &handler))
        {
            return existing.id;
        }

        let id = state.next_id;
        state.next_id += 1;
        state.listeners.push(Registration { id, handler });
        debug!("Registered listener {} ({} total)", id, state.listeners.len());
        id
    }

    /// Unregister a handler; returns false if it was not registered
    pub fn unregister<H>(&self, handler: &Arc<H>) -> bool
    where
        H: SubtitlesEventHandler + ?Sized,
    {
        let target = Arc::as_ptr(handler) as *const ();
        self.remove_where(|r| Arc::as_ptr(&r.handler) as *const () == target)
    }

    /// Unregister by the id `register` returned
    pub fn unregister_id(&self, id: ListenerId) -> bool {
        self.remove_where(|r| r.id == id)
    }

    fn remove_where(&self, pred: impl Fn(&Registration) -> bool) -> bool {
        let mut state = self.state.lock();
        match state.listeners.iter().position(pred) {
            Some(index) => {
                let removed = state.listeners.remove(index);
                debug!("Unregistered listener {}", removed.id);
                true
            }
            None => false,
        }
    }

    /// Handle one JSON-encoded envelope from the call's content channel
    ///
    /// Never fails: undecodable content is forwarded verbatim to
    /// `on_raw_content`, and handler failures are collected in the report.
    pub fn handle_content(&self, content: &str) -> DispatchReport {
        match parse_content(content, &self.decode_options) {
            Ok(command) => self.dispatch(command),
            Err(err) => self.forward_raw(content, err),
        }
    }

    /// Dispatch an already decoded command
    pub fn dispatch(&self, command: DecodedCommand) -> DispatchReport {
        let kind = if command.command_type().is_status() {
            "status"
        } else {
            "text"
        };
        debug!(
            "Dispatching {} {} seq={} round={}",
            kind,
            command.command_type(),
            command.seq_id,
            command.round
        );
        let order = ChunkOrder::new(command.round, command.seq_id);

        let (listeners, outcome, diagnostics) = {
            let mut state = self.state.lock();
            let (outcome, diagnostics) = match &command.payload {
                CommandPayload::UserSpeakStatus(p) => {
                    let next = SessionState::next(SpeakerSide::User, p.speak_status);
                    state.session = next;
                    (DispatchOutcome::StateChanged(next), Vec::new())
                }
                CommandPayload::AgentSpeakStatus(p) => {
                    let next = SessionState::next(SpeakerSide::Agent, p.speak_status);
                    state.session = next;
                    (DispatchOutcome::StateChanged(next), Vec::new())
                }
                CommandPayload::AsrText(p) => {
                    apply_text(&mut state.transcripts, SpeakerSide::User, &command, order, p)
                }
                CommandPayload::LlmText(p) => {
                    apply_text(&mut state.transcripts, SpeakerSide::Agent, &command, order, p)
                }
            };
            (state.listeners.clone(), outcome, diagnostics)
        };

        let mut report = DispatchReport::new(outcome, listeners.len());
        match &report.outcome {
            DispatchOutcome::StateChanged(state) => {
                let next = *state;
                debug!("Session state -> {}", next);
                notify(&listeners, &mut report.failures, "session_state_change", |h| {
                    h.on_session_state_change(next)
                });
            }
            DispatchOutcome::AsrMessage(message) => {
                notify(&listeners, &mut report.failures, "asr_message", |h| {
                    h.on_asr_message(message)
                });
            }
            DispatchOutcome::LlmMessage(message) => {
                notify(&listeners, &mut report.failures, "llm_message", |h| {
                    h.on_llm_message(message)
                });
            }
            DispatchOutcome::Rejected { .. } | DispatchOutcome::RawForwarded(_) => {}
        }

        for diagnostic in &diagnostics {
            warn!("{}", diagnostic);
            notify(&listeners, &mut report.failures, "diagnostic", |h| {
                h.on_diagnostic(diagnostic)
            });
        }
        report.diagnostics = diagnostics;
        report
    }

    fn forward_raw(&self, content: &str, err: DecodeError) -> DispatchReport {
        warn!("Forwarding undecodable content: {}", err);
        let listeners = self.state.lock().listeners.clone();
        let diagnostic = Diagnostic::DecodeFailure(err.clone());

        let mut report = DispatchReport::new(DispatchOutcome::RawForwarded(err), listeners.len());
        notify(&listeners, &mut report.failures, "raw_content", |h| {
            h.on_raw_content(content)
        });
        notify(&listeners, &mut report.failures, "diagnostic", |h| {
            h.on_diagnostic(&diagnostic)
        });
        report.diagnostics.push(diagnostic);
        report
    }

    /// Clear session state and transcripts; handlers stay registered
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.session = SessionState::Uninitialized;
        state.transcripts.clear();
        debug!("Dispatcher reset");
    }

    pub fn session_state(&self) -> SessionState {
        self.state.lock().session
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Snapshot of one transcript line
    pub fn transcript(&self, side: SpeakerSide, message_id: &str) -> Option<TranscriptMessage> {
        self.state
            .lock()
            .transcripts
            .get(side, message_id)
            .map(|acc| acc.message().clone())
    }

    /// Number of lines still waiting for their final chunk
    pub fn streaming_count(&self) -> usize {
        self.state.lock().transcripts.streaming_count()
    }

    pub fn accumulator_state(&self, side: SpeakerSide, message_id: &str) -> AccumulatorState {
        self.state.lock().transcripts.state(side, message_id)
    }

    /// Snapshots of all retained lines, in the order they were opened
    pub fn transcripts(&self) -> Vec<TranscriptMessage> {
        self.state.lock().transcripts.messages()
    }

    /// Record UI layout for a line; false if the line is unknown
    pub fn set_layout_bounds(
        &self,
        side: SpeakerSide,
        message_id: &str,
        bounds: LayoutBounds,
    ) -> bool {
        self.state
            .lock()
            .transcripts
            .set_layout_bounds(side, message_id, bounds)
    }
}

impl Default for MessageDispatcher {
    fn default() -> Self {
        Self::new(SubtitlesConfig::default())
    }
}

fn apply_text(
    table: &mut TranscriptTable,
    side: SpeakerSide,
    command: &DecodedCommand,
    order: ChunkOrder,
    payload: &TextPayload,
) -> (DispatchOutcome, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    match table.apply(side, command.timestamp, order, payload) {
        Ok(applied) => {
            if let Some(regression) = applied.regression {
                diagnostics.push(Diagnostic::OutOfOrder {
                    side,
                    message_id: payload.message_id.clone(),
                    regression,
                });
            }
            for line in &applied.evicted {
                diagnostics.push(Diagnostic::StreamingEvicted {
                    side: line.side(),
                    message_id: line.message_id.clone(),
                });
            }
            let outcome = match side {
                SpeakerSide::User => DispatchOutcome::AsrMessage(applied.message),
                SpeakerSide::Agent => DispatchOutcome::LlmMessage(applied.message),
            };
            (outcome, diagnostics)
        }
        Err(error) => {
            if let SubtitlesError::SealedAccumulatorWrite { message_id } = &error {
                diagnostics.push(Diagnostic::SealedWrite {
                    side,
                    message_id: message_id.clone(),
                });
            }
            (DispatchOutcome::Rejected { side, error }, diagnostics)
        }
    }
}

fn same_handler(a: &Arc<dyn SubtitlesEventHandler>, b: &Arc<dyn SubtitlesEventHandler>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Call every handler in order; failures are recorded, never propagated
fn notify<F>(listeners: &[Registration], failures: &mut Vec<SubtitlesError>, event: &str, f: F)
where
    F: Fn(&dyn SubtitlesEventHandler) -> anyhow::Result<()>,
{
    for registration in listeners {
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(registration.handler.as_ref())));
        let cause = match result {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => format!("{:#}", e),
            Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
        };
        error!(
            "Listener {} failed on {}: {}",
            registration.id, event, cause
        );
        failures.push(SubtitlesError::ListenerCallbackFailure {
            listener: registration.id,
            cause,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
