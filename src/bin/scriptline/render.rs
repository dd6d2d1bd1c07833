use scriptline::SessionEvent;
use std::io::{self, Write};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Write one session event the way the console shows it.
pub(crate) fn render_event(
    event: &SessionEvent,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<()> {
    match event {
        SessionEvent::Print(text) => write!(out, "{text}")?,
        SessionEvent::PrintLine(text) => writeln!(out, "{text}")?,
        SessionEvent::Prompt(message) if message.is_empty() => write!(out, "? ")?,
        SessionEvent::Prompt(message) => write!(out, "{message} ")?,
        SessionEvent::ClearConsole => write!(out, "{CLEAR_SCREEN}")?,
        SessionEvent::Result(text) => writeln!(out, "=> {text}")?,
        SessionEvent::EvaluateError(message) => writeln!(err, "error: {message}")?,
        SessionEvent::SourceLoadError(message) => writeln!(err, "load error: {message}")?,
        SessionEvent::Interrupted => writeln!(err, "interrupted")?,
        SessionEvent::Initialized | SessionEvent::SourceRunStart | SessionEvent::SourceRunEnd => {}
    }
    out.flush()?;
    err.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(event: SessionEvent) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        render_event(&event, &mut out, &mut err).unwrap();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn output_events_go_to_stdout() {
        assert_eq!(rendered(SessionEvent::Print("a".into())).0, "a");
        assert_eq!(rendered(SessionEvent::PrintLine("b".into())).0, "b\n");
        assert_eq!(rendered(SessionEvent::Result("2".into())).0, "=> 2\n");
        assert_eq!(rendered(SessionEvent::Prompt("name?".into())).0, "name? ");
        assert_eq!(rendered(SessionEvent::ClearConsole).0, CLEAR_SCREEN);
    }

    #[test]
    fn failures_go_to_stderr() {
        let (out, err) = rendered(SessionEvent::EvaluateError("boom".into()));
        assert!(out.is_empty());
        assert_eq!(err, "error: boom\n");
        assert_eq!(rendered(SessionEvent::Interrupted).1, "interrupted\n");
    }

    #[test]
    fn lifecycle_events_are_silent() {
        assert_eq!(rendered(SessionEvent::Initialized), (String::new(), String::new()));
        assert_eq!(rendered(SessionEvent::SourceRunEnd), (String::new(), String::new()));
    }
}
