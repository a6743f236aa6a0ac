//! Run-length debouncing of per-frame symbols.

use serde::Serialize;

use crate::gestures::Symbol;

pub const DEFAULT_COMMIT_FRAMES: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StabilityState {
    pub last_symbol: Option<Symbol>,
    pub run_length: u32,
}

#[derive(Debug)]
pub struct StabilityFilter {
    threshold: u32,
    state: StabilityState,
}

impl StabilityFilter {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            state: StabilityState::default(),
        }
    }

    /// Returns the symbol exactly once per run, on the frame the run reaches
    /// the threshold. `Symbol::None` runs are counted but never commit.
    pub fn observe(&mut self, symbol: Symbol) -> Option<Symbol> {
        if self.state.last_symbol == Some(symbol) {
            self.state.run_length = self.state.run_length.saturating_add(1);
        } else {
            self.state.last_symbol = Some(symbol);
            self.state.run_length = 1;
        }

        if self.state.run_length == self.threshold && symbol != Symbol::None {
            Some(symbol)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.state = StabilityState::default();
    }

    pub fn state(&self) -> StabilityState {
        self.state
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

impl Default for StabilityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_COMMIT_FRAMES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gestures::OperatorGesture;

    fn feed(f: &mut StabilityFilter, s: Symbol, n: usize) -> Vec<Symbol> {
        (0..n).filter_map(|_| f.observe(s)).collect()
    }

    #[test]
    fn below_threshold_never_commits() {
        let mut f = StabilityFilter::default();
        assert!(feed(&mut f, Symbol::Digit(3), 9).is_empty());
        assert_eq!(f.state().run_length, 9);
    }

    #[test]
    fn commits_once_at_threshold() {
        let mut f = StabilityFilter::default();
        assert_eq!(feed(&mut f, Symbol::Digit(3), 10), vec![Symbol::Digit(3)]);
    }

    #[test]
    fn long_run_commits_only_once() {
        let mut f = StabilityFilter::default();
        assert_eq!(feed(&mut f, Symbol::Digit(2), 37), vec![Symbol::Digit(2)]);
    }

    #[test]
    fn change_restarts_the_run() {
        let mut f = StabilityFilter::new(3);
        let circle = Symbol::Operator(OperatorGesture::Circle);
        assert!(feed(&mut f, circle, 2).is_empty());
        assert!(f.observe(Symbol::Digit(1)).is_none());
        assert_eq!(f.state().run_length, 1);
        assert_eq!(feed(&mut f, circle, 3), vec![circle]);
        // a fresh run of the same symbol commits again
        f.observe(Symbol::Digit(1));
        assert_eq!(feed(&mut f, circle, 3), vec![circle]);
    }

    #[test]
    fn none_is_counted_but_never_commits() {
        let mut f = StabilityFilter::new(2);
        assert!(feed(&mut f, Symbol::None, 5).is_empty());
        assert_eq!(f.state().last_symbol, Some(Symbol::None));
        assert_eq!(f.state().run_length, 5);
    }
}
