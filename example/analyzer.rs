//! code analyzer window: type (or load) a snippet, pick a reply language,
//! press analyze, watch the review stream in.
//!
//! - `AnalyzerState` decides everything; the systems here only project it
//!   onto widgets and forward keyboard/mouse input back into it.
//! - native shows the flattened text render; on wasm the html render is also
//!   mirrored into the page's `#results` element and `#spinner` follows the
//!   loading flag.
//!
//! env:
//!   API_KEY (or GEMINI_API_KEY)
//!
//! usage: cargo run --example analyzer -- [path/to/snippet]

use bevy::input::keyboard::{KeyCode, KeyboardInput};
use bevy::prelude::*;
use bevy_code_analyzer::prompt::{next_language, prev_language};
use bevy_code_analyzer::{
    AnalysisClient, AnalysisFailed, AnalyzeRequested, AnalyzerConfig,
    AnalyzerPlugin, AnalyzerState, MarkupFormat,
};

// ---------------------- ui tags ----------------------

#[derive(Component)]
struct CodeText;
#[derive(Component)]
struct LanguageText;
#[derive(Component)]
struct ResultsText;
#[derive(Component)]
struct AnalyzeLabel;
#[derive(Component)]
struct Spinner;

#[derive(Component)]
struct BtnAnalyze;
#[derive(Component)]
struct BtnPrevLanguage;
#[derive(Component)]
struct BtnNextLanguage;

const BTN_IDLE: Color = Color::srgb(0.2, 0.2, 0.25);
const BTN_HOVER: Color = Color::srgb(0.25, 0.25, 0.3);
const BTN_PRESSED: Color = Color::srgb(0.3, 0.3, 0.35);
const BTN_DISABLED: Color = Color::srgb(0.12, 0.12, 0.14);

// ---------------------- main ----------------------

fn main() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    // the credential is read once, here
    let config = AnalyzerConfig::from_env();

    #[cfg(target_arch = "wasm32")]
    let format = MarkupFormat::Html;
    #[cfg(not(target_arch = "wasm32"))]
    let format = MarkupFormat::Text;

    let mut state = AnalyzerState::new(format);
    if let Some(path) = std::env::args().nth(1) {
        match std::fs::read_to_string(&path) {
            Ok(code) => state.edit_input(code),
            Err(err) => eprintln!("could not read {path}: {err}"),
        }
    }

    let mut app = App::new();
    app.insert_resource(ClearColor(Color::srgb_u8(18, 18, 20)))
        .insert_resource(AnalysisClient::from_config(&config))
        .insert_resource(state)
        .add_plugins(DefaultPlugins)
        .add_plugins(AnalyzerPlugin)
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            (
                handle_text_input,
                btn_analyze,
                btn_prev_language,
                btn_next_language,
            ),
        )
        // projection runs after the analyzer applied this frame's fragments
        .add_systems(
            Update,
            (project_state, log_failures).after(bevy_code_analyzer::AnalyzerSet::Drain),
        );

    #[cfg(target_arch = "wasm32")]
    app.add_systems(
        Update,
        mirror_to_dom.after(bevy_code_analyzer::AnalyzerSet::Drain),
    );

    app.run();
}

// ---------------------- setup ui ----------------------

fn button_node(width: f32) -> Node {
    Node {
        width: Val::Px(width),
        height: Val::Px(28.0),
        align_items: AlignItems::Center,
        justify_content: JustifyContent::Center,
        ..default()
    }
}

fn setup(mut commands: Commands) {
    commands.spawn(Camera2d);

    let style_16 = TextFont {
        font_size: 16.0,
        ..default()
    };
    let style_14 = TextFont {
        font_size: 14.0,
        ..default()
    };

    commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(8.0),
                padding: UiRect::all(Val::Px(12.0)),
                ..default()
            },
            BackgroundColor(Color::NONE),
        ))
        .with_children(|p| {
            // --- code input ---
            p.spawn((
                Node {
                    width: Val::Percent(100.0),
                    min_height: Val::Px(160.0),
                    padding: UiRect::all(Val::Px(8.0)),
                    ..default()
                },
                BackgroundColor(Color::srgb(0.10, 0.10, 0.12)),
            ))
            .with_children(|c| {
                c.spawn((
                    Text::new(""),
                    style_14.clone(),
                    TextColor(Color::WHITE),
                    CodeText,
                ));
            });

            // --- row: [<] language [>] [analyze] spinner ---
            p.spawn((
                Node {
                    width: Val::Percent(100.0),
                    height: Val::Auto,
                    column_gap: Val::Px(8.0),
                    flex_direction: FlexDirection::Row,
                    align_items: AlignItems::Center,
                    ..default()
                },
                BackgroundColor(Color::NONE),
            ))
            .with_children(|row| {
                row.spawn((Button, button_node(28.0), BackgroundColor(BTN_IDLE), BtnPrevLanguage))
                    .with_children(|b| {
                        b.spawn((Text::new("<"), style_14.clone(), TextColor(Color::WHITE)));
                    });
                row.spawn((
                    Text::new(""),
                    style_14.clone(),
                    TextColor(Color::WHITE),
                    LanguageText,
                ));
                row.spawn((Button, button_node(28.0), BackgroundColor(BTN_IDLE), BtnNextLanguage))
                    .with_children(|b| {
                        b.spawn((Text::new(">"), style_14.clone(), TextColor(Color::WHITE)));
                    });
                row.spawn((Button, button_node(140.0), BackgroundColor(BTN_DISABLED), BtnAnalyze))
                    .with_children(|b| {
                        b.spawn((
                            Text::new(""),
                            style_14.clone(),
                            TextColor(Color::WHITE),
                            AnalyzeLabel,
                        ));
                    });
                row.spawn((
                    Text::new("..."),
                    style_14.clone(),
                    TextColor(Color::srgb_u8(200, 200, 200)),
                    Visibility::Hidden,
                    Spinner,
                ));
            });

            // --- results ---
            p.spawn((
                Node {
                    width: Val::Percent(100.0),
                    height: Val::Percent(100.0),
                    padding: UiRect::axes(Val::Px(8.0), Val::Px(12.0)),
                    overflow: Overflow::clip(),
                    ..default()
                },
                BackgroundColor(Color::NONE),
            ))
            .with_children(|c| {
                c.spawn((
                    Text::new(""),
                    style_16.clone(),
                    TextColor(Color::srgb_u8(220, 220, 220)),
                    ResultsText,
                ));
            });
        });
}

// ---------------------- input & buttons ----------------------

fn handle_text_input(
    mut ev_kbd: EventReader<KeyboardInput>,
    keys: Res<ButtonInput<KeyCode>>,
    mut state: ResMut<AnalyzerState>,
    mut ev_analyze: EventWriter<AnalyzeRequested>,
) {
    let ctrl = keys.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]);

    // ctrl+enter is the keyboard trigger
    if ctrl && keys.just_pressed(KeyCode::Enter) {
        if state.trigger_enabled() {
            ev_analyze.write(AnalyzeRequested);
        }
        ev_kbd.clear();
        return;
    }

    let mut text = state.input().to_string();
    let before = text.len();
    let mut edited = false;

    for ev in ev_kbd.read() {
        if !ev.state.is_pressed() || ctrl {
            continue;
        }
        match ev.key_code {
            KeyCode::Enter | KeyCode::NumpadEnter => text.push('\n'),
            KeyCode::Tab => text.push_str("    "),
            KeyCode::Backspace => {
                edited |= text.pop().is_some();
            }
            _ => {
                if let Some(t) = &ev.text {
                    text.extend(t.chars().filter(|c| !c.is_control()));
                }
            }
        }
    }

    if edited || text.len() != before {
        state.edit_input(text);
    }
}

fn btn_analyze(
    mut q: Query<(&Interaction, &mut BackgroundColor), (Changed<Interaction>, With<BtnAnalyze>)>,
    state: Res<AnalyzerState>,
    mut ev_analyze: EventWriter<AnalyzeRequested>,
) {
    for (i, mut bg) in &mut q {
        if !state.trigger_enabled() {
            bg.0 = BTN_DISABLED;
            continue;
        }
        match *i {
            Interaction::Pressed => {
                bg.0 = BTN_PRESSED;
                info!(target: "analyzer", "analyze clicked (input_len={})", state.input().len());
                ev_analyze.write(AnalyzeRequested);
            }
            Interaction::Hovered => bg.0 = BTN_HOVER,
            Interaction::None => bg.0 = BTN_IDLE,
        }
    }
}

fn btn_prev_language(
    mut q: Query<(&Interaction, &mut BackgroundColor), (Changed<Interaction>, With<BtnPrevLanguage>)>,
    mut state: ResMut<AnalyzerState>,
) {
    for (i, mut bg) in &mut q {
        match *i {
            Interaction::Pressed => {
                bg.0 = BTN_PRESSED;
                let lang = prev_language(state.language());
                info!(target: "analyzer", "prev language -> '{}'", lang);
                state.select_language(lang);
            }
            Interaction::Hovered => bg.0 = BTN_HOVER,
            Interaction::None => bg.0 = BTN_IDLE,
        }
    }
}

fn btn_next_language(
    mut q: Query<(&Interaction, &mut BackgroundColor), (Changed<Interaction>, With<BtnNextLanguage>)>,
    mut state: ResMut<AnalyzerState>,
) {
    for (i, mut bg) in &mut q {
        match *i {
            Interaction::Pressed => {
                bg.0 = BTN_PRESSED;
                let lang = next_language(state.language());
                info!(target: "analyzer", "next language -> '{}'", lang);
                state.select_language(lang);
            }
            Interaction::Hovered => bg.0 = BTN_HOVER,
            Interaction::None => bg.0 = BTN_IDLE,
        }
    }
}

// ---------------------- projection ----------------------

fn project_state(
    state: Res<AnalyzerState>,
    mut sets: ParamSet<(
        Query<&mut Text, With<CodeText>>,
        Query<&mut Text, With<LanguageText>>,
        Query<&mut Text, With<AnalyzeLabel>>,
        Query<&mut Text, With<ResultsText>>,
    )>,
    mut q_btn: Query<(&Interaction, &mut BackgroundColor), With<BtnAnalyze>>,
    mut q_spinner: Query<&mut Visibility, With<Spinner>>,
) {
    if !state.is_changed() {
        return;
    }
    if let Ok(mut t) = sets.p0().single_mut() {
        t.0 = format!("{} |", state.input());
    }
    if let Ok(mut t) = sets.p1().single_mut() {
        t.0 = format!("language: {}", state.language());
    }
    if let Ok(mut t) = sets.p2().single_mut() {
        t.0 = state.trigger_label().to_string();
    }
    if let Ok(mut t) = sets.p3().single_mut() {
        t.0 = state.display().to_string();
    }
    if let Ok((i, mut bg)) = q_btn.single_mut() {
        bg.0 = match (state.trigger_enabled(), i) {
            (false, _) => BTN_DISABLED,
            (true, Interaction::Hovered) => BTN_HOVER,
            (true, _) => BTN_IDLE,
        };
    }
    if let Ok(mut v) = q_spinner.single_mut() {
        *v = if state.loading() { Visibility::Inherited } else { Visibility::Hidden };
    }
}

fn log_failures(mut ev: EventReader<AnalysisFailed>) {
    for AnalysisFailed { request, error } in ev.read() {
        error!(target: "analyzer", "Error analyzing code (request={}): {}", request, error);
    }
}

#[cfg(target_arch = "wasm32")]
fn mirror_to_dom(mut ev: EventReader<bevy_code_analyzer::AnalysisRendered>, state: Res<AnalyzerState>) {
    use bevy_code_analyzer::AnalysisRendered;
    use wasm_bindgen::JsCast;

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    if let Some(AnalysisRendered { markup, .. }) = ev.read().last() {
        if let Some(el) = document.get_element_by_id("results") {
            el.set_inner_html(markup);
        }
    }
    if state.is_changed() {
        if let Some(spinner) = document
            .get_element_by_id("spinner")
            .and_then(|el| el.dyn_into::<web_sys::HtmlElement>().ok())
        {
            spinner.set_hidden(!state.loading());
        }
    }
}
