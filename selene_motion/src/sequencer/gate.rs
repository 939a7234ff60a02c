//! Operator gate: asked before each entry whether to run it.

use std::collections::VecDeque;

use super::results::WorklistEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Skip,
}

pub trait OperatorGate {
    fn decide(&mut self, index: usize, entry: &WorklistEntry) -> GateDecision;
}

impl<F: FnMut(usize, &WorklistEntry) -> GateDecision> OperatorGate for F {
    fn decide(&mut self, index: usize, entry: &WorklistEntry) -> GateDecision {
        self(index, entry)
    }
}

/// Unattended runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysProceed;

impl OperatorGate for AlwaysProceed {
    fn decide(&mut self, _index: usize, _entry: &WorklistEntry) -> GateDecision {
        GateDecision::Proceed
    }
}

/// Replays fixed decisions, then proceeds. Records which indices it was
/// asked about.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGate {
    decisions: VecDeque<GateDecision>,
    asked: Vec<usize>,
}

impl ScriptedGate {
    pub fn new(decisions: impl IntoIterator<Item = GateDecision>) -> Self {
        Self {
            decisions: decisions.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[usize] {
        &self.asked
    }
}

impl OperatorGate for ScriptedGate {
    fn decide(&mut self, index: usize, _entry: &WorklistEntry) -> GateDecision {
        self.asked.push(index);
        self.decisions.pop_front().unwrap_or(GateDecision::Proceed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_gate_replays_then_proceeds() {
        let entry = WorklistEntry::new(0.0, 0.0);
        let mut gate = ScriptedGate::new([GateDecision::Skip]);
        assert_eq!(gate.decide(3, &entry), GateDecision::Skip);
        assert_eq!(gate.decide(4, &entry), GateDecision::Proceed);
        assert_eq!(gate.asked(), &[3, 4]);
    }

    #[test]
    fn closure_gate() {
        let entry = WorklistEntry::new(1.0, 2.0);
        let mut skip_odd = |index: usize, _: &WorklistEntry| {
            if index % 2 == 1 {
                GateDecision::Skip
            } else {
                GateDecision::Proceed
            }
        };
        assert_eq!(skip_odd.decide(1, &entry), GateDecision::Skip);
        assert_eq!(AlwaysProceed.decide(1, &entry), GateDecision::Proceed);
    }
}
