//! Operator confirmation before each entry (`--manual`).

use selene_motion::sequencer::{GateDecision, OperatorGate, WorklistEntry};
use std::io::{self, BufRead, StdinLock, Stdout, Write};
use tracing::warn;

pub const PROMPT: &str = "Press ENTER to continue or s to skip this position";

/// Asks the operator on a line-oriented terminal.
///
/// An `s` (any case) skips the entry; any other line proceeds. Closed or
/// failing input skips, so an unattended manual run never moves the rig.
pub struct StdinGate<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> StdinGate<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl StdinGate<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> OperatorGate for StdinGate<R, W> {
    fn decide(&mut self, index: usize, entry: &WorklistEntry) -> GateDecision {
        let prompt = write!(
            self.output,
            "Entry {index} (x={}, z={}): {PROMPT}: ",
            entry.x, entry.z
        )
        .and_then(|()| self.output.flush());
        if let Err(e) = prompt {
            warn!(error = %e, "Failed to write operator prompt");
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                warn!(index, "Operator input closed, skipping entry");
                GateDecision::Skip
            }
            Ok(_) if line.trim().eq_ignore_ascii_case("s") => GateDecision::Skip,
            Ok(_) => GateDecision::Proceed,
            Err(e) => {
                warn!(index, error = %e, "Failed to read operator input, skipping entry");
                GateDecision::Skip
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn gate(input: &str) -> StdinGate<Cursor<Vec<u8>>, Vec<u8>> {
        StdinGate::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn enter_proceeds_and_s_skips() {
        let mut gate = gate("\nS\n  s  \nyes\n");
        let entry = WorklistEntry::new(12.5, -3.0);
        assert_eq!(gate.decide(0, &entry), GateDecision::Proceed);
        assert_eq!(gate.decide(1, &entry), GateDecision::Skip);
        assert_eq!(gate.decide(2, &entry), GateDecision::Skip);
        assert_eq!(gate.decide(3, &entry), GateDecision::Proceed);

        let (_, output) = gate.into_parts();
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("Entry 0 (x=12.5, z=-3): "));
        assert_eq!(output.matches(PROMPT).count(), 4);
    }

    #[test]
    fn closed_input_skips() {
        let mut gate = gate("");
        assert_eq!(
            gate.decide(0, &WorklistEntry::new(0.0, 0.0)),
            GateDecision::Skip
        );
    }
}
