use std::io::BufRead;
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::time::Duration;

use futures::channel::{mpsc, oneshot};
use iced::Task;

use crate::app::Message;
use crate::config::DashboardConfig;
use crate::fetch;
use crate::icons::{HttpIconSource, IconOutcome};
use crate::popup::{IconJob, IconUpdate};
use crate::readiness::CancelFlag;
use crate::snapshot::SessionId;

const ICON_WORKERS: usize = 4;

pub(crate) fn socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join("session-map.sock")
}

/// Map one control line to a message.
pub(crate) fn parse_command(line: &str) -> Option<Message> {
    let line = line.trim();
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (line, None),
    };
    match (cmd, arg) {
        ("toggle", None) => Some(Message::ToggleVisibility),
        ("focus", None) => Some(Message::ToggleFocus),
        ("focus", Some(id)) => Some(Message::FocusSession(SessionId::parse(id))),
        ("populate", Some(id)) => Some(Message::PopulatePopup(SessionId::parse(id))),
        ("panel", None) => Some(Message::TogglePanel),
        ("panel-close", None) => Some(Message::ClosePanel),
        ("refresh", None) => Some(Message::Refresh),
        ("clear", None) => Some(Message::ClearMarkers),
        ("popup-close", None) => Some(Message::ClosePopup),
        ("theme-toggle", None) => Some(Message::ThemeToggle),
        ("logout", None) => Some(Message::Logout),
        _ => None,
    }
}

pub(crate) fn socket_listener() -> impl futures::Stream<Item = Message> {
    let (tx, rx) = mpsc::unbounded();
    std::thread::spawn(move || {
        let path = socket_path();
        let _ = std::fs::remove_file(&path);
        let listener = match UnixListener::bind(&path) {
            Ok(l) => l,
            Err(e) => {
                tracing::error!("failed to bind socket {path:?}: {e}");
                return;
            }
        };
        tracing::info!("listening on {path:?}");
        for stream in listener.incoming().flatten() {
            let mut buf = String::new();
            if std::io::BufReader::new(stream).read_line(&mut buf).is_err() {
                continue;
            }
            let Some(msg) = parse_command(&buf) else {
                tracing::warn!("unknown command: {:?}", buf.trim());
                continue;
            };
            if tx.unbounded_send(msg).is_err() {
                break;
            }
        }
    });
    rx
}

pub(crate) fn tick_stream(ms: &u64) -> mpsc::UnboundedReceiver<Message> {
    let ms = *ms;
    let (tx, rx) = mpsc::unbounded();
    std::thread::spawn(move || loop {
        std::thread::sleep(Duration::from_millis(ms));
        if tx.unbounded_send(Message::Tick).is_err() {
            break;
        }
    });
    rx
}

/// Deliver `message` after `after`. A set `cancel` flag swallows it.
pub(crate) fn delayed(after: Duration, cancel: Option<CancelFlag>, message: Message) -> Task<Message> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        std::thread::sleep(after);
        if cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return;
        }
        let _ = tx.send(message);
    });
    Task::future(rx).then(|res| match res {
        Ok(msg) => Task::done(msg),
        Err(_) => Task::none(),
    })
}

/// Run the sessions request on a worker thread. The result carries `epoch`.
pub(crate) fn fetch_sessions(
    config: DashboardConfig,
    token: Option<String>,
    epoch: u64,
) -> Task<Message> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let result = fetch::fetch_sessions(&config, token.as_deref()).map_err(|e| e.to_string());
        let _ = tx.send(result);
    });
    Task::future(rx).then(move |res| {
        let result = res.unwrap_or_else(|_| Err("fetch worker stopped".to_string()));
        Task::done(Message::SessionsFetched(epoch, result))
    })
}

/// Walk icon candidate chains on a few worker threads, streaming results back.
pub(crate) fn resolve_icons(jobs: Vec<IconJob>) -> Task<Message> {
    if jobs.is_empty() {
        return Task::none();
    }
    let (tx, rx) = mpsc::unbounded();
    let mut shards: Vec<Vec<IconJob>> = (0..ICON_WORKERS).map(|_| Vec::new()).collect();
    for (i, job) in jobs.into_iter().enumerate() {
        shards[i % ICON_WORKERS].push(job);
    }
    for shard in shards.into_iter().filter(|s| !s.is_empty()) {
        let tx = tx.clone();
        std::thread::spawn(move || {
            let source = match HttpIconSource::new() {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!("icon client unavailable: {e}");
                    None
                }
            };
            for job in shard {
                let update = match &source {
                    Some(source) => job.run(source),
                    None => IconUpdate {
                        outcome: IconOutcome::Fallback(job.badge.clone()),
                        session_id: job.session_id,
                        generation: job.generation,
                        key: job.key,
                    },
                };
                if tx.unbounded_send(update).is_err() {
                    return;
                }
            }
        });
    }
    Task::run(rx, Message::IconResolved)
}

/// Put `content` on the Wayland clipboard.
pub(crate) fn copy_to_clipboard(content: String) {
    std::thread::spawn(move || {
        match std::process::Command::new("wl-copy").arg(&content).status() {
            Ok(s) if s.success() => tracing::info!("copied {} bytes to clipboard", content.len()),
            Ok(s) => tracing::warn!("wl-copy exited: {s}"),
            Err(e) => tracing::warn!("wl-copy failed: {e}"),
        }
    });
}
