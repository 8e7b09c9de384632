//! the request-handling flow, shared by the bevy plugin and headless callers.

use bevy::log::{debug, error, info};
use futures_lite::StreamExt;

use crate::client::FragmentSource;
use crate::error::AnalyzeError;
use crate::state::AnalyzerState;

/// what the flow reports while it runs.
#[derive(Debug)]
pub enum StreamEvent {
    Fragment(String),
    Completed,
    Failed(AnalyzeError),
}

/// how a `run_analysis` call ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// the trigger was disabled; the service was not called.
    Skipped,
    Completed { fragments: usize },
    Failed { fragments: usize },
}

/// opens one stream and forwards every fragment, then exactly one of
/// `Completed` / `Failed`. failures are logged here with full detail.
pub async fn stream_analysis<F>(source: &dyn FragmentSource, model: &str, prompt: &str, mut sink: F)
where
    F: FnMut(StreamEvent) + Send,
{
    let mut stream = match source.stream(model, prompt).await {
        Ok(s) => s,
        Err(err) => {
            error!(target: "bevy_code_analyzer", "error analyzing code: {}", err);
            sink(StreamEvent::Failed(err));
            return;
        }
    };

    let mut received = 0usize;
    let mut total_len = 0usize;
    while let Some(item) = stream.next().await {
        match item {
            Ok(text) => {
                received += 1;
                total_len += text.len();
                debug!(target: "bevy_code_analyzer", "fragment #{} (len={})", received, text.len());
                sink(StreamEvent::Fragment(text));
            }
            Err(err) => {
                error!(
                    target: "bevy_code_analyzer",
                    "error analyzing code after {} fragment(s): {}", received, err
                );
                sink(StreamEvent::Failed(err));
                return;
            }
        }
    }

    info!(
        target: "bevy_code_analyzer",
        "analysis stream completed: fragments={} final_len={}", received, total_len
    );
    sink(StreamEvent::Completed);
}

/// begin -> stream -> render each fragment -> back to idle, all against `state`.
pub async fn run_analysis(
    source: &dyn FragmentSource,
    model: &str,
    state: &mut AnalyzerState,
) -> Outcome {
    let Some(request) = state.begin_request() else {
        return Outcome::Skipped;
    };
    info!(
        target: "bevy_code_analyzer",
        "run_analysis: request={} language={} prompt_len={}",
        request.id, request.language, request.prompt.len()
    );

    let mut fragments = 0usize;
    let mut failed = false;
    stream_analysis(source, model, &request.prompt, |event| match event {
        StreamEvent::Fragment(text) => {
            fragments += 1;
            state.apply_fragment(request.id, &text);
        }
        StreamEvent::Completed => {
            state.complete(request.id);
        }
        StreamEvent::Failed(_) => {
            failed = true;
            state.fail(request.id);
        }
    })
    .await;

    if failed {
        Outcome::Failed { fragments }
    } else {
        Outcome::Completed { fragments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FragmentStream;
    use crate::render::{ANALYSIS_FAILED_MESSAGE, MarkupFormat};
    use crate::state::Phase;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// replays fixed fragments, optionally failing before any or after some.
    #[derive(Default)]
    struct ScriptedSource {
        fragments: Vec<&'static str>,
        fail_open: bool,
        fail_after: Option<usize>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedSource {
        fn new(fragments: &[&'static str]) -> Self {
            Self { fragments: fragments.to_vec(), ..Default::default() }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl FragmentSource for ScriptedSource {
        async fn stream(&self, model: &str, prompt: &str) -> Result<FragmentStream, AnalyzeError> {
            self.calls.lock().unwrap().push((model.to_string(), prompt.to_string()));
            if self.fail_open {
                return Err(AnalyzeError::Stream("rejected".into()));
            }
            let mut items: Vec<Result<String, AnalyzeError>> = Vec::new();
            for (i, f) in self.fragments.iter().enumerate() {
                if self.fail_after == Some(i) {
                    items.push(Err(AnalyzeError::Stream("connection reset".into())));
                    break;
                }
                items.push(Ok(f.to_string()));
            }
            Ok(Box::pin(futures_lite::stream::iter(items)))
        }
    }

    fn state_with(input: &str, format: MarkupFormat) -> AnalyzerState {
        let mut s = AnalyzerState::new(format);
        s.edit_input(input);
        s.select_language("English");
        s
    }

    const INPUT: &str = "for i in range(10): print(i)";
    const FRAGMENTS: [&str; 3] = ["# Ana", "lysis\n\nThis ", "code loops 10 times."];

    #[test]
    fn streamed_fragments_render_to_final_markup() {
        let source = ScriptedSource::new(&FRAGMENTS);
        let mut state = state_with(INPUT, MarkupFormat::Html);

        let outcome = pollster::block_on(run_analysis(&source, "gemini-2.5-flash", &mut state));

        assert_eq!(outcome, Outcome::Completed { fragments: 3 });
        assert_eq!(
            state.display(),
            MarkupFormat::Html.convert("# Analysis\n\nThis code loops 10 times.")
        );
        assert_eq!(state.renders(), 3);
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.trigger_enabled());
        assert!(!state.loading());

        let calls = source.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "gemini-2.5-flash");
        assert!(calls[0].1.contains(&format!("```\n{INPUT}\n```")));
        assert!(calls[0].1.contains("in English:"));
    }

    #[test]
    fn rejection_before_any_fragment_shows_error() {
        let source = ScriptedSource { fail_open: true, ..ScriptedSource::new(&FRAGMENTS) };
        let mut state = state_with(INPUT, MarkupFormat::Html);

        let outcome = pollster::block_on(run_analysis(&source, "m", &mut state));

        assert_eq!(outcome, Outcome::Failed { fragments: 0 });
        assert_eq!(state.display(), MarkupFormat::Html.error_markup());
        assert!(state.trigger_enabled());
        assert!(!state.loading());
    }

    #[test]
    fn mid_stream_failure_overwrites_partial_render() {
        let source = ScriptedSource { fail_after: Some(2), ..ScriptedSource::new(&FRAGMENTS) };
        let mut state = state_with(INPUT, MarkupFormat::Text);

        let outcome = pollster::block_on(run_analysis(&source, "m", &mut state));

        assert_eq!(outcome, Outcome::Failed { fragments: 2 });
        assert_eq!(state.display(), ANALYSIS_FAILED_MESSAGE);
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn blank_input_never_calls_the_service() {
        let source = ScriptedSource::new(&FRAGMENTS);
        let mut state = state_with("  \n ", MarkupFormat::Html);

        let outcome = pollster::block_on(run_analysis(&source, "m", &mut state));

        assert_eq!(outcome, Outcome::Skipped);
        assert!(source.calls().is_empty());
        assert_eq!(state.display(), "");
    }

    #[test]
    fn identical_runs_render_identically() {
        let run = || {
            let source = ScriptedSource::new(&FRAGMENTS);
            let mut state = state_with(INPUT, MarkupFormat::Html);
            pollster::block_on(run_analysis(&source, "m", &mut state));
            state.display().to_string()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn sink_sees_fragments_then_one_terminal_event() {
        let source = ScriptedSource::new(&FRAGMENTS);
        let mut seen = Vec::new();
        pollster::block_on(stream_analysis(&source, "m", "p", |ev| seen.push(ev)));
        assert_eq!(seen.len(), 4);
        assert!(matches!(seen[0], StreamEvent::Fragment(ref t) if t == "# Ana"));
        assert!(matches!(seen[3], StreamEvent::Completed));
    }
}
