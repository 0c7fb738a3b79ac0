/// Terminal output helpers for commands
use std::fmt::Display;
use std::io::IsTerminal;

/// `[repo2cwl]` tag, bright cyan when stderr is a TTY
pub fn repo2cwl_prefix() -> &'static str {
    if std::io::stderr().is_terminal() {
        "\x1b[96m[repo2cwl]\x1b[0m"
    } else {
        "[repo2cwl]"
    }
}

/// Print a user-facing notice on stderr, outside the log stream
pub fn notice(message: impl Display) {
    eprintln!("{} {}", repo2cwl_prefix(), message);
}
