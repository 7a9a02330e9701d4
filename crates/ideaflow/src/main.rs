//! A terminal front end for the `ideaflow` studio.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::time::Duration;

use ideaflow::core::{
    Activity, ConversationSession, SessionStage, Speaker, Transcript,
};
use ideaflow::{Studio, StudioBuilder};
use ideaflow_gemini_model::{GeminiConfigBuilder, GeminiProvider};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::select;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";
const FLOW_HELP: &str = "/generate, /export [dir], /log or /quit";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(api_key) = env::var("GEMINI_API_KEY") else {
        eprintln!("GEMINI_API_KEY environment variable is not set");
        return;
    };
    let mut config_builder = GeminiConfigBuilder::with_api_key(api_key);
    if let Ok(model) = env::var("GEMINI_MODEL") {
        config_builder = config_builder.with_model(model);
    }
    if let Ok(base_url) = env::var("GEMINI_BASE_URL") {
        config_builder = config_builder.with_base_url(base_url);
    }
    let model_provider = GeminiProvider::new(config_builder.build());

    let mut studio_builder = StudioBuilder::with_model_provider(model_provider);
    if let Ok(value) = env::var("IDEAFLOW_REVEAL_INTERVAL_MS") {
        match value.parse() {
            Ok(ms) => {
                studio_builder = studio_builder
                    .with_reveal_interval(Duration::from_millis(ms));
            }
            Err(err) => {
                warn!("invalid IDEAFLOW_REVEAL_INTERVAL_MS {value:?}: {err}");
            }
        }
    }
    let mut studio = studio_builder.build();

    println!(
        "{} {}",
        "ideaflow".bright_cyan().bold(),
        "Brainstorm an app idea, then map its user flow.".bright_white()
    );
    if let Err(err) = run(&mut studio).await {
        error!("studio stopped: {err}");
    }
}

async fn run(studio: &mut Studio) -> Result<(), ideaflow::StudioError> {
    studio.begin_brainstorm()?;
    let mut lines = BufReader::new(io::stdin()).lines();

    let Some(app_name) = prompt_non_blank(&mut lines, "App name: ").await
    else {
        return Ok(());
    };
    let Some(app_idea) = prompt_non_blank(&mut lines, "App idea: ").await
    else {
        return Ok(());
    };
    println!(
        "{}",
        "Chat about your idea. Type /end when you're done.".dimmed()
    );

    let mut printer = ReplyPrinter::default();
    studio.start(app_name, app_idea)?;
    stream_reply(studio.session(), &mut printer, 0).await;

    loop {
        print!("> ");
        flush_stdout();
        let Some(line) = read_line(&mut lines).await else {
            return Ok(());
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => return Ok(()),
            "/end" => break,
            _ => {}
        }

        let turns = studio.session().snapshot().transcript().len();
        studio.send_message(line)?;
        stream_reply(studio.session(), &mut printer, turns).await;
    }

    match studio.end_brainstorm().await {
        Ok(stage) => println!(
            "\n{} Brainstorm ended after {} messages. Commands: {FLOW_HELP}",
            "✔".bright_green(),
            stage.transcript().len()
        ),
        Err(err) => {
            println!("{} {err}", "✘".bright_red());
            return Ok(());
        }
    }

    loop {
        print!("flow> ");
        flush_stdout();
        let Some(line) = read_line(&mut lines).await else {
            return Ok(());
        };
        let mut args = line.split_whitespace();
        match args.next() {
            None => continue,
            Some("/quit") => return Ok(()),
            Some("/generate") => generate(studio).await,
            Some("/export") => {
                let dir = args.next().unwrap_or(".");
                match studio.export_flow(dir).await {
                    Ok(path) => println!(
                        "{} Saved to {}",
                        "✔".bright_green(),
                        path.display().bright_white()
                    ),
                    Err(err) => println!("{} {err}", "✘".bright_red()),
                }
            }
            Some("/log") => {
                if let Some(stage) = studio.diagram() {
                    print_log(stage.transcript());
                }
            }
            Some(_) => println!("Commands: {FLOW_HELP}"),
        }
    }
}

async fn generate(studio: &mut Studio) {
    let progress_bar = spinner("🧭 Drawing the user flow...");
    let result = studio.generate_flow().await;
    progress_bar.finish_and_clear();

    match result {
        Ok(source) => {
            println!("{}", "```mermaid".dimmed());
            println!("{}", source.as_str().bright_white());
            println!("{}", "```".dimmed());
        }
        Err(err) => {
            println!("{} {err}", "✘".bright_red());
            println!("{}", "Run /generate to try again.".dimmed());
        }
    }
}

/// Prints assistant turns as they grow, until the reply for the turns after
/// `turns_before` has been fully revealed.
async fn stream_reply(
    session: &ConversationSession,
    printer: &mut ReplyPrinter,
    turns_before: usize,
) {
    let mut rx = session.subscribe();
    let mut progress_bar: Option<ProgressBar> = None;

    loop {
        let snapshot = rx.borrow_and_update().clone();
        if snapshot.activity() == Activity::AwaitingCompletion {
            progress_bar
                .get_or_insert_with(|| spinner("🤔 Thinking..."))
                .inc(1);
        } else {
            // Finish the progress bar before printing anything else.
            if let Some(progress_bar) = progress_bar.take() {
                progress_bar.finish_and_clear();
            }
            printer.update(snapshot.transcript());
        }

        // One user turn and at least one reply turn.
        let answered = snapshot.transcript().len() >= turns_before + 2;
        if snapshot.stage() == SessionStage::Ended
            || (answered && !snapshot.is_busy())
        {
            printer.finish();
            return;
        }

        select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    printer.finish();
                    return;
                }
            }
            _ = sleep(Duration::from_millis(100)) => {}
        }
    }
}

/// Tracks how much of the transcript has been written to the terminal.
#[derive(Default)]
struct ReplyPrinter {
    turn: usize,
    printed: usize,
    open: bool,
}

impl ReplyPrinter {
    fn update(&mut self, transcript: &Transcript) {
        while let Some(turn) = transcript.get(self.turn) {
            if turn.speaker() == Speaker::User {
                self.turn += 1;
                continue;
            }
            if !self.open {
                print!("{}🤖 ", BAR_CHAR.bright_cyan());
                self.open = true;
            }
            let text = turn.text();
            print!("{}", (&text[self.printed..]).bright_white());
            self.printed = text.len();

            // Turns only grow while they are last.
            if self.turn + 1 == transcript.len() {
                break;
            }
            self.close_turn();
        }
        flush_stdout();
    }

    fn finish(&mut self) {
        if self.open {
            self.close_turn();
        }
    }

    fn close_turn(&mut self) {
        println!();
        self.turn += 1;
        self.printed = 0;
        self.open = false;
    }
}

fn print_log(transcript: &Transcript) {
    for turn in transcript.iter() {
        let label = match turn.speaker() {
            Speaker::User => "you".bright_yellow().to_string(),
            Speaker::Assistant => "ai".bright_cyan().to_string(),
        };
        println!(
            "{BAR_CHAR}{label} {}\n{}\n",
            turn.created_at().format("%H:%M:%S").dimmed(),
            turn.text()
        );
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let progress_bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {wide_msg}") {
        progress_bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    progress_bar.set_message(message);
    progress_bar.enable_steady_tick(Duration::from_millis(100));
    progress_bar
}

async fn prompt_non_blank<R: AsyncBufRead + Unpin>(
    lines: &mut Lines<R>,
    label: &str,
) -> Option<String> {
    loop {
        print!("{label}");
        flush_stdout();
        let line = read_line(lines).await?;
        let line = line.trim();
        if !line.is_empty() {
            return Some(line.to_owned());
        }
    }
}

#[inline]
fn flush_stdout() {
    if let Err(err) = std::io::stdout().flush() {
        debug!("failed to flush stdout: {err}");
    }
}

/// Reads the next line, or `None` once the input is closed.
async fn read_line<R: AsyncBufRead + Unpin>(
    lines: &mut Lines<R>,
) -> Option<String> {
    match lines.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
