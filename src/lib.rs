//! bevy_code_analyzer: paste a snippet, stream a model's review of it, render it as it arrives.
//!
//! - `prompt` builds the fixed analysis instruction around the snippet.
//! - `client` turns (model, prompt) into a stream of text fragments; the `llm`
//!   crate backs it in production, anything implementing `FragmentSource` works.
//! - `render` converts the accumulated markdown to html (or plain text) on
//!   every fragment.
//! - `state` is the whole ui as a value (Idle | Requesting) with pure transitions.
//! - this file wires those into bevy: a click event starts a request, the
//!   stream runs off the main thread, an inbox brings fragments back.
//!
//! never blocks the main thread: on native requests run on a tiny tokio
//! runtime; on wasm they run on bevy's async pool, which yields to the browser.

use bevy::prelude::*;
use bevy::tasks::AsyncComputeTaskPool;
use flume::{Receiver, Sender, TryRecvError};
use std::sync::Arc;

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod prompt;
pub mod render;
pub mod state;

pub use client::{FragmentSource, FragmentStream, LlmFragmentSource, UnavailableSource};
pub use config::{AnalyzerConfig, DEFAULT_MODEL};
pub use controller::{Outcome, StreamEvent, run_analysis, stream_analysis};
pub use error::AnalyzeError;
pub use prompt::{LANGUAGES, build_prompt};
pub use render::{ANALYSIS_FAILED_MESSAGE, IncrementalRenderer, MarkupFormat};
pub use state::{AnalysisRequest, AnalyzerState, Phase};

/// re-export the llm types the client is built from.
pub use llm::{
    LLMProvider,
    builder::{LLMBackend, LLMBuilder},
    chat::{ChatMessage, ChatProvider},
    error::LLMError,
};

/// the injected client: where fragments come from and which model to ask.
#[derive(Resource, Clone)]
pub struct AnalysisClient {
    pub source: Arc<dyn FragmentSource>,
    pub model: String,
}

impl AnalysisClient {
    pub fn new(source: Arc<dyn FragmentSource>, model: impl Into<String>) -> Self {
        Self { source, model: model.into() }
    }

    /// builds the `llm` source from `config`. if that fails the error is
    /// logged and every request reports it instead.
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let source: Arc<dyn FragmentSource> = match LlmFragmentSource::from_config(config) {
            Ok(s) => Arc::new(s),
            Err(err) => {
                error!(target: "bevy_code_analyzer", "AnalysisClient: provider unavailable: {}", err);
                Arc::new(UnavailableSource { reason: err.to_string() })
            }
        };
        Self::new(source, config.model.clone())
    }
}

/// on native we keep a tiny tokio runtime to drive `llm` futures.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Resource, Clone)]
pub struct TokioRt(pub Arc<tokio::runtime::Runtime>);

#[cfg(not(target_arch = "wasm32"))]
impl TokioRt {
    pub fn new() -> std::io::Result<Self> {
        info!(target: "bevy_code_analyzer", "AnalyzerPlugin: initializing Tokio multi-thread runtime (native)");
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        Ok(Self(Arc::new(rt)))
    }
}

/// system ordering so uis can run after we emit events
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum AnalyzerSet {
    /// analyzer events are emitted here (in `Update`)
    Drain,
}

/// send this when the user activates the trigger. ignored unless the
/// trigger is enabled.
#[derive(Event, Debug, Default, Clone, Copy)]
pub struct AnalyzeRequested;

#[derive(Event, Debug, Clone)]
pub struct AnalysisStarted {
    pub request: u64,
    pub language: String,
}
/// the display region was re-rendered; `markup` is its full new content.
#[derive(Event, Debug, Clone)]
pub struct AnalysisRendered {
    pub request: u64,
    pub markup: String,
}
#[derive(Event, Debug, Clone)]
pub struct AnalysisCompleted {
    pub request: u64,
    /// raw markdown of the whole response.
    pub response: String,
}
#[derive(Event, Debug, Clone)]
pub struct AnalysisFailed {
    pub request: u64,
    /// operator-facing detail; the display only shows the fixed message.
    pub error: String,
}

#[derive(Debug)]
enum InboxMsg {
    Fragment { request: u64, text: String },
    Done { request: u64 },
    Err { request: u64, error: String },
}

/// cross-thread inbox; the request task sends, the main thread drains.
/// unbounded so fragments are never dropped: each one must be rendered.
#[derive(Resource, Clone)]
struct AnalysisInbox {
    tx: Sender<InboxMsg>,
    rx: Receiver<InboxMsg>,
}

impl Default for AnalysisInbox {
    fn default() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }
}

/// send to inbox (the receiver lives as long as the app)
fn push_inbox(tx: &Sender<InboxMsg>, msg: InboxMsg) {
    let _ = tx.send(msg);
}

/// bevy plugin: wires systems, events, resources.
/// requires an `AnalysisClient` resource; inserts a default `AnalyzerState`
/// (html output) if none is present.
pub struct AnalyzerPlugin;

impl Plugin for AnalyzerPlugin {
    fn build(&self, app: &mut App) {
        info!(target: "bevy_code_analyzer", "AnalyzerPlugin: build()");
        app.init_resource::<AnalysisInbox>()
            .init_resource::<AnalyzerState>()
            .add_event::<AnalyzeRequested>()
            .add_event::<AnalysisStarted>()
            .add_event::<AnalysisRendered>()
            .add_event::<AnalysisCompleted>()
            .add_event::<AnalysisFailed>()
            .configure_sets(Update, AnalyzerSet::Drain)
            .add_systems(Update, spawn_analysis.before(AnalyzerSet::Drain))
            .add_systems(Update, drain_analysis_inbox.in_set(AnalyzerSet::Drain));

        #[cfg(not(target_arch = "wasm32"))]
        if app.world().get_resource::<TokioRt>().is_none() {
            match TokioRt::new() {
                Ok(rt) => {
                    app.insert_resource(rt);
                }
                Err(err) => {
                    error!(target: "bevy_code_analyzer", "AnalyzerPlugin: tokio runtime failed: {}", err);
                }
            }
        }
    }
}

/// starts a request for the first trigger activation this frame.
fn spawn_analysis(
    mut requests: EventReader<AnalyzeRequested>,
    mut state: ResMut<AnalyzerState>,
    client: Res<AnalysisClient>,
    inbox: Res<AnalysisInbox>,
    mut ev_start: EventWriter<AnalysisStarted>,
    mut ev_render: EventWriter<AnalysisRendered>,

    #[cfg(not(target_arch = "wasm32"))] rt: Option<Res<TokioRt>>,
) {
    // a second activation in the same frame would see a disabled trigger anyway
    if requests.read().count() == 0 {
        return;
    }
    let Some(request) = state.begin_request() else {
        debug!(target: "bevy_code_analyzer", "spawn_analysis: trigger disabled, ignoring");
        return;
    };

    info!(
        target: "bevy_code_analyzer",
        "spawn_analysis: request={} model={} language={} input_len={}",
        request.id, client.model, request.language, state.input().len()
    );
    ev_start.write(AnalysisStarted { request: request.id, language: request.language.clone() });
    // the display was just cleared; mirrors must see that before any fragment
    ev_render.write(AnalysisRendered { request: request.id, markup: state.display().to_string() });

    let source = client.source.clone();
    let model = client.model.clone();
    let tx = inbox.tx.clone();
    let panic_tx = inbox.tx.clone();
    let id = request.id;
    let prompt = request.prompt;

    let run = async move {
        stream_analysis(source.as_ref(), &model, &prompt, |event| {
            let msg = match event {
                StreamEvent::Fragment(text) => InboxMsg::Fragment { request: id, text },
                StreamEvent::Completed => InboxMsg::Done { request: id },
                StreamEvent::Failed(err) => InboxMsg::Err { request: id, error: err.to_string() },
            };
            push_inbox(&tx, msg);
        })
        .await;
    };

    let pool = AsyncComputeTaskPool::get();

    #[cfg(target_arch = "wasm32")]
    pool.spawn(async move {
        use futures_lite::FutureExt;
        if std::panic::AssertUnwindSafe(run).catch_unwind().await.is_err() {
            error!(target: "bevy_code_analyzer", "request {} panicked", id);
            push_inbox(&panic_tx, InboxMsg::Err { request: id, error: "request task panicked".into() });
        }
    })
    .detach();

    #[cfg(not(target_arch = "wasm32"))]
    match rt {
        Some(rt) => {
            let rt = rt.0.clone();
            // hand off to tokio so bevy pools stay free
            pool.spawn(async move {
                if let Err(join_err) = rt.spawn(run).await {
                    error!(target: "bevy_code_analyzer", "request {} aborted: {}", id, join_err);
                    push_inbox(&panic_tx, InboxMsg::Err { request: id, error: join_err.to_string() });
                }
            })
            .detach();
        }
        None => {
            error!(target: "bevy_code_analyzer", "spawn_analysis: no tokio runtime, failing request {}", id);
            push_inbox(&panic_tx, InboxMsg::Err { request: id, error: "no async runtime".into() });
        }
    }
}

/// drains the inbox in arrival order: one render per fragment, then the
/// terminal transition.
fn drain_analysis_inbox(
    inbox: Res<AnalysisInbox>,
    mut state: ResMut<AnalyzerState>,
    mut ev_render: EventWriter<AnalysisRendered>,
    mut ev_done: EventWriter<AnalysisCompleted>,
    mut ev_err: EventWriter<AnalysisFailed>,
) {
    // drain up to a cap per frame to avoid long frames on bursty streams
    const MAX_PER_FRAME: usize = 512;
    for _ in 0..MAX_PER_FRAME {
        let msg = match inbox.rx.try_recv() {
            Ok(m) => m,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        };
        match msg {
            InboxMsg::Fragment { request, text } => {
                if state.apply_fragment(request, &text) {
                    ev_render.write(AnalysisRendered { request, markup: state.display().to_string() });
                } else {
                    debug!(target: "bevy_code_analyzer", "dropping stale fragment for request {}", request);
                }
            }
            InboxMsg::Done { request } => {
                if state.complete(request) {
                    info!(target: "bevy_code_analyzer", "request {} completed: final_len={}", request, state.response().len());
                    ev_done.write(AnalysisCompleted { request, response: state.response().to_string() });
                }
            }
            InboxMsg::Err { request, error } => {
                if state.fail(request) {
                    error!(target: "bevy_code_analyzer", "request {} failed: {}", request, error);
                    ev_render.write(AnalysisRendered { request, markup: state.display().to_string() });
                    ev_err.write(AnalysisFailed { request, error });
                }
            }
        }
    }
}
