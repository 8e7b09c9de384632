//! headless analyzer: snippet on stdin, rendered review on stdout. native only.
//!
//! env:
//!   API_KEY (or GEMINI_API_KEY)
//!
//! usage: cat main.py | cargo run --example headless -- [language] [--text]
//!        [--model <id>] [--base-url <url>]

#[cfg(not(target_arch = "wasm32"))]
use std::io::Read;
#[cfg(not(target_arch = "wasm32"))]
use std::process::ExitCode;

#[cfg(not(target_arch = "wasm32"))]
use bevy::log::{error, info, tracing_subscriber};
#[cfg(not(target_arch = "wasm32"))]
use bevy_code_analyzer::{
    AnalysisClient, AnalyzerConfig, AnalyzerState, LANGUAGES, MarkupFormat, Outcome, run_analysis,
};

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let mut config = AnalyzerConfig::from_env();
    let mut language = LANGUAGES[0].to_string();
    let mut format = MarkupFormat::Html;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--text" => format = MarkupFormat::Text,
            "--model" | "--base-url" => {
                let Some(value) = args.next() else {
                    eprintln!("{arg} needs a value");
                    return ExitCode::FAILURE;
                };
                config = if arg == "--model" {
                    config.with_model(value)
                } else {
                    config.with_base_url(value)
                };
            }
            _ => language = arg,
        }
    }

    let mut code = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut code) {
        error!(target: "headless", "reading stdin: {}", err);
        return ExitCode::FAILURE;
    }

    let client = AnalysisClient::from_config(&config);
    let mut state = AnalyzerState::new(format);
    state.edit_input(code);
    state.select_language(language);

    let outcome = run_analysis(client.source.as_ref(), &client.model, &mut state).await;
    info!(target: "headless", "outcome: {:?} (renders={})", outcome, state.renders());

    match outcome {
        Outcome::Skipped => {
            eprintln!("nothing to analyze: stdin was empty");
            ExitCode::FAILURE
        }
        Outcome::Completed { .. } => {
            println!("{}", state.display());
            ExitCode::SUCCESS
        }
        Outcome::Failed { .. } => {
            println!("{}", state.display());
            ExitCode::FAILURE
        }
    }
}

// browsers have no stdin; use the `analyzer` example there
#[cfg(target_arch = "wasm32")]
fn main() {}
