use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process;

fn socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join("session-map.sock")
}

/// Whether the daemon understands `args`.
fn is_known(args: &[String]) -> bool {
    match args {
        [cmd] => matches!(
            cmd.as_str(),
            "toggle"
                | "focus"
                | "panel"
                | "panel-close"
                | "refresh"
                | "clear"
                | "popup-close"
                | "theme-toggle"
                | "logout"
        ),
        // Ids may contain spaces; everything after the command is the id.
        [cmd, _, ..] => matches!(cmd.as_str(), "focus" | "populate"),
        _ => false,
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
        process::exit(1);
    }

    let cmd = args.join(" ");
    if !is_known(&args) {
        eprintln!("unknown command: {cmd}");
        usage();
        process::exit(1);
    }

    let path = socket_path();
    let mut stream = match UnixStream::connect(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("session-map not running ({path:?}): {e}");
            process::exit(1);
        }
    };

    if let Err(e) = writeln!(stream, "{cmd}") {
        eprintln!("failed to send command: {e}");
        process::exit(1);
    }
}

fn usage() {
    eprintln!("usage: session-map-ctl <command>");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  toggle           toggle map visibility");
    eprintln!("  focus            toggle map focus/interactivity");
    eprintln!("  focus <id>       pan to a session and open its popup");
    eprintln!("  populate <id>    re-render a session's popup");
    eprintln!("  panel            toggle the session list (fetches when opened)");
    eprintln!("  panel-close      hide the session list");
    eprintln!("  refresh          fetch sessions now");
    eprintln!("  clear            remove all markers");
    eprintln!("  popup-close      close the session popup");
    eprintln!("  theme-toggle     switch between dark and light");
    eprintln!("  logout           forget the stored token and clear everything");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn accepts_daemon_commands() {
        assert!(is_known(&args("toggle")));
        assert!(is_known(&args("focus 12")));
        assert!(is_known(&args("populate bot-1")));
        assert!(is_known(&args("logout")));
    }

    #[test]
    fn ids_with_spaces_are_forwarded_whole() {
        assert!(is_known(&args("focus my bot")));
        assert!(is_known(&args("populate a b c")));
        assert!(!is_known(&args("panel a b")));
    }

    #[test]
    fn rejects_unknown_or_misshapen() {
        assert!(!is_known(&args("populate")));
        assert!(!is_known(&args("refresh now")));
        assert!(!is_known(&args("demo")));
    }
}
