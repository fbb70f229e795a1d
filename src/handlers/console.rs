//! Line-oriented front end: a sidebar of notes, an editor view, and a status badge.
//!
//! Each input line is one UI event. Autosave timers and finished saves are
//! multiplexed into the same loop, so the store is only ever touched from here.

use chrono::{DateTime, Utc};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    time::{Instant, timeout},
};

use std::{fmt::Write as _, time::Duration};

use crate::{
    config::Config,
    models::{Note, NotePatch},
    service::{DEFAULT_TITLE, NoteService, SaveOutcome},
};

const HELP: &str = "\
Commands:
  list               show the sidebar
  refresh            reload notes from the server
  new [title]        create a note and select it
  select <id>        open a note
  title <text>       rename the open note
  write <text>       replace the open note's content
  append <text>      add a line to the open note
  search [query]     filter the sidebar, empty query clears
  delete [id]        delete a note, the open one by default
  show               show the open note
  status             show the save status
  help               this text
  quit               save pending edits and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Refresh,
    New(Option<String>),
    Select(String),
    Title(String),
    Write(String),
    Append(String),
    Search(String),
    Delete(Option<String>),
    Show,
    Status,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Nothing to do")]
    Empty,

    #[error("Unknown command '{0}', type 'help' for a list")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim_start().trim_end_matches(['\r', '\n']);
        let (name, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(name, rest)| (name, rest.trim_start()));

        let optional = |rest: &str| {
            let rest = rest.trim();
            (!rest.is_empty()).then(|| rest.to_string())
        };
        let required = |label: &'static str, rest: &str| {
            if rest.trim().is_empty() {
                Err(ParseError::MissingArgument(label))
            } else {
                Ok(rest.to_string())
            }
        };

        match name {
            "" => Err(ParseError::Empty),
            "list" | "ls" => Ok(Self::List),
            "refresh" => Ok(Self::Refresh),
            "new" => Ok(Self::New(optional(rest))),
            "select" | "open" => required("select", rest).map(|id| Self::Select(id.trim().to_string())),
            "title" => Ok(Self::Title(rest.to_string())),
            "write" => Ok(Self::Write(rest.to_string())),
            "append" => Ok(Self::Append(rest.to_string())),
            "search" => Ok(Self::Search(rest.to_string())),
            "delete" | "rm" => Ok(Self::Delete(optional(rest))),
            "show" => Ok(Self::Show),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

/// "3 minutes ago" style distance between `then` and `now`.
pub fn format_distance(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    fn plural(n: i64, unit: &str) -> String {
        if n == 1 {
            format!("1 {unit} ago")
        } else {
            format!("{n} {unit}s ago")
        }
    }

    let elapsed = now.signed_duration_since(then);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "just now".to_string()
    } else if hours < 1 {
        plural(minutes, "minute")
    } else if days < 1 {
        plural(hours, "hour")
    } else if days < 30 {
        plural(days, "day")
    } else if days < 365 {
        plural(days / 30, "month")
    } else {
        plural(days / 365, "year")
    }
}

fn preview(text: &str, width: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > width {
        let cut: String = line.chars().take(width.saturating_sub(1)).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}

pub fn render_sidebar(
    notes: &[&Note],
    selected: Option<&str>,
    loading: bool,
    width: usize,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();

    let count = notes.len();
    if loading {
        out.push_str("Loading…\n");
    } else {
        let _ = writeln!(out, "{count} note{}", if count == 1 { "" } else { "s" });
    }

    if notes.is_empty() {
        out.push_str(if loading {
            "  Loading notes…\n"
        } else {
            "  No notes found.\n"
        });
        return out;
    }

    for note in notes {
        let marker = if selected == Some(note.id.as_str()) { '>' } else { ' ' };
        let title = if note.title.is_empty() {
            DEFAULT_TITLE
        } else {
            note.title.as_str()
        };
        let body = if note.content.is_empty() {
            "No content".to_string()
        } else {
            preview(&note.content, width)
        };

        let _ = writeln!(out, "{marker} [{}] {}", note.id, preview(title, width));
        let _ = writeln!(out, "      {body}");
        let _ = writeln!(out, "      Updated {}", format_distance(note.updated_at, now));
    }

    out
}

pub fn render_editor(note: Option<&Note>) -> String {
    note.map_or_else(
        || "No note selected\nCreate a new note or select one from the sidebar.\n".to_string(),
        |note| {
            let rule = "-".repeat(note.title.chars().count().clamp(8, 60));
            format!("# {}\n{rule}\n{}\n", note.title, note.content)
        },
    )
}

fn render_status(service: &NoteService) -> String {
    let mut out = format!("[{}]", service.save_state().label());
    if let Some(id) = service.last_saved_id() {
        let _ = write!(out, " last save: note {id}");
    }
    out
}

fn render_banner(service: &NoteService) -> Option<String> {
    service.error().map(|e| format!("! {e}"))
}

fn print_sidebar(service: &NoteService, cfg: &Config) {
    if let Some(banner) = render_banner(service) {
        println!("{banner}");
    }
    let visible = service.visible_notes();
    if !service.search_query().trim().is_empty() {
        println!(
            "search: {} ({} of {})",
            service.search_query().trim(),
            visible.len(),
            service.notes().len()
        );
    }
    print!(
        "{}",
        render_sidebar(
            &visible,
            service.selected_id(),
            service.is_loading(),
            cfg.preview_width,
            Utc::now(),
        )
    );
}

fn loading_view(service: &NoteService, cfg: &Config) -> String {
    render_sidebar(
        &service.visible_notes(),
        service.selected_id(),
        true,
        cfg.preview_width,
        Utc::now(),
    )
}

/// Shows the loading sidebar while notes are fetched, then the result.
async fn load(service: &mut NoteService, cfg: &Config) {
    print!("{}", loading_view(service, cfg));
    service.list().await;
    print_sidebar(service, cfg);
}

fn print_editor(service: &NoteService) {
    if let Some(banner) = render_banner(service) {
        println!("{banner}");
    }
    print!("{}", render_editor(service.selected()));
}

fn appended(content: &str, line: &str) -> String {
    if content.is_empty() {
        line.to_string()
    } else {
        format!("{content}\n{line}")
    }
}

fn edit_selected(service: &mut NoteService, patch: &NotePatch) {
    if !service.update_selected(patch) {
        println!("No note selected");
    }
}

async fn execute(service: &mut NoteService, command: Command, cfg: &Config) {
    match command {
        Command::List => print_sidebar(service, cfg),
        Command::Refresh => load(service, cfg).await,
        Command::New(title) => {
            service
                .create(title.as_deref().unwrap_or(DEFAULT_TITLE), "")
                .await;
            print_editor(service);
        }
        Command::Select(id) => {
            if service.select(&id) {
                print_editor(service);
            } else {
                println!("No note with id '{id}'");
            }
        }
        Command::Title(title) => edit_selected(service, &NotePatch::title(title)),
        Command::Write(content) => edit_selected(service, &NotePatch::content(content)),
        Command::Append(line) => {
            let content = service.selected().map(|n| appended(&n.content, &line));
            match content {
                Some(content) => edit_selected(service, &NotePatch::content(content)),
                None => println!("No note selected"),
            }
        }
        Command::Search(query) => {
            service.set_search(&query);
            print_sidebar(service, cfg);
        }
        Command::Delete(id) => {
            let target = id.or_else(|| service.selected_id().map(str::to_string));
            match target {
                Some(id) => {
                    service.delete(&id).await;
                    print_sidebar(service, cfg);
                }
                None => println!("No note selected"),
            }
        }
        Command::Show => print_editor(service),
        Command::Status => println!("{}", render_status(service)),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Sends pending edits and waits a bounded time for in-flight saves, then
/// detaches the service from anything still outstanding.
async fn shutdown(
    service: &mut NoteService,
    saves: &mut mpsc::UnboundedReceiver<SaveOutcome>,
    wait: Duration,
) {
    service.flush();
    while service.saves_in_flight() > 0 {
        match timeout(wait, saves.recv()).await {
            Ok(Some(outcome)) => service.finish_save(outcome),
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(
                    "Gave up waiting for {} save(s) after {:?}",
                    service.saves_in_flight(),
                    wait
                );
                break;
            }
        }
    }
    service.leave();
}

pub async fn run(
    mut service: NoteService,
    mut saves: mpsc::UnboundedReceiver<SaveOutcome>,
    cfg: &Config,
) -> std::io::Result<()> {
    println!("Note Keeper ({}), type 'help' for commands", cfg.api_base_url);
    load(&mut service, cfg).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let deadline = service.next_deadline();
        let before = service.save_state();

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(&mut service, command, cfg).await,
                    Err(ParseError::Empty) => {}
                    Err(e) => println!("{e}"),
                }
            }
            Some(outcome) = saves.recv() => service.finish_save(outcome),
            () = sleep_until(deadline) => service.tick(),
            _ = &mut ctrl_c => break,
        }

        if service.save_state() != before {
            println!("{}", render_status(&service));
        }
    }

    shutdown(&mut service, &mut saves, cfg.request_timeout).await;
    println!("{}", render_status(&service));
    Ok(())
}
