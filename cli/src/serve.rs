//! Line-based stand-in for a chat transport.
//!
//! Each input line is `<participant> <command> [args]`. The reply is the
//! participant's screen: status text, then one `[label] payload` line per
//! action, then a blank line. Rejected commands are prefixed with `! <reason>`.

use std::io::{self, BufRead, Write};

use tally_core::{Dispatcher, SessionStore};
use tally_store::PollStore;
use tally_types::ParticipantId;

/// Run until `input` is exhausted. Returns the number of commands handled.
pub fn serve<S, Z, R, W>(dispatcher: &mut Dispatcher<S, Z>, input: R, mut output: W) -> io::Result<usize>
where
    S: PollStore,
    Z: SessionStore,
    R: BufRead,
    W: Write,
{
    let mut handled = 0;
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (who, raw) = line.split_once(char::is_whitespace).unwrap_or((line, "update"));
        let participant = ParticipantId::new(who);
        let outcome = dispatcher.handle(&participant, raw);
        handled += 1;

        if let Some(err) = outcome.error() {
            writeln!(output, "! {err}")?;
        }
        writeln!(output, "{}", dispatcher.screen(&participant))?;
        writeln!(output)?;
        output.flush()?;
    }
    Ok(handled)
}
