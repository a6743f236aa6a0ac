//! Calculation capture: turns committed symbols (or manual requests) into a
//! first operand, an operator and a second operand, then evaluates.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt, str::FromStr};

use crate::error::EngineError;
use crate::evaluator::{Operator, evaluate};
use crate::gestures::Symbol;
use crate::timer::ResetTimer;

pub const DEFAULT_AUTO_RESET_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    AwaitingHand,
    Detecting,
    GotFirst,
    GotOperator,
    GotSecond,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    First,
    Operator,
    Second,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::First, Slot::Operator, Slot::Second];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::First => "first",
            Slot::Operator => "operator",
            Slot::Second => "second",
        }
    }

    fn reached(self) -> Stage {
        match self {
            Slot::First => Stage::GotFirst,
            Slot::Operator => Stage::GotOperator,
            Slot::Second => Stage::GotSecond,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Slot::First),
            "operator" => Ok(Slot::Operator),
            "second" => Ok(Slot::Second),
            _ => Err(EngineError::UnknownSlot(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationState {
    pub stage: Stage,
    pub first_operand: Option<u8>,
    pub operator: Option<Operator>,
    pub second_operand: Option<u8>,
    pub result: Option<f64>,
}

impl CalculationState {
    fn initial(stage: Stage) -> Self {
        Self {
            stage,
            first_operand: None,
            operator: None,
            second_operand: None,
            result: None,
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.first_operand.is_none()
            && self.operator.is_none()
            && self.second_operand.is_none()
            && self.result.is_none()
    }
}

/// Record handed to history and narration once a calculation completes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletedCalculation {
    pub first_operand: u8,
    pub operator: Operator,
    pub second_operand: u8,
    pub result: f64,
}

impl CompletedCalculation {
    pub fn is_divide_by_zero(&self) -> bool {
        self.operator == Operator::Divide && self.second_operand == 0
    }
}

#[derive(Debug)]
pub struct CaptureMachine {
    state: CalculationState,
    auto_reset: bool,
    auto_reset_ms: u64,
    reset_timer: ResetTimer,
    completed: VecDeque<CompletedCalculation>,
}

impl CaptureMachine {
    pub fn new(auto_reset_ms: u64) -> Self {
        Self {
            state: CalculationState::initial(Stage::AwaitingHand),
            auto_reset: true,
            auto_reset_ms,
            reset_timer: ResetTimer::default(),
            completed: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &CalculationState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn set_auto_reset_ms(&mut self, ms: u64) {
        self.auto_reset_ms = ms;
    }

    /// Whether reaching `Complete` schedules a reset, however it was reached.
    pub fn set_auto_reset(&mut self, enabled: bool) {
        self.auto_reset = enabled;
        if !enabled {
            self.reset_timer.cancel();
        }
    }

    pub fn reset_pending(&self) -> bool {
        self.reset_timer.is_pending()
    }

    /// Automatic advancement. The symbol goes to the first empty slot in
    /// capture order; symbols of the wrong kind are dropped. Returns whether
    /// the symbol was accepted.
    pub fn on_commit(&mut self, symbol: Symbol, now_ms: u64) -> bool {
        let next = self.pending_slots().first().copied();
        let applied = match (self.state.stage, next) {
            (Stage::Complete, _) | (_, None) => false,
            (_, Some(slot)) => self.fill(slot, symbol) && self.settle(slot),
        };

        if applied {
            self.after_change(now_ms);
            debug!("commit {symbol} -> {:?}", self.state.stage);
        } else {
            debug!("commit {symbol} ignored in {:?}", self.state.stage);
        }
        applied
    }

    /// Fills `slot` from `symbol` regardless of the current stage, as long as
    /// the symbol is the right kind for the slot. Slots may be filled in any
    /// order; once all three hold values the result is (re)computed.
    pub fn manual_capture(&mut self, slot: Slot, symbol: Symbol, now_ms: u64) -> bool {
        if !self.fill(slot, symbol) {
            return false;
        }
        self.settle(slot);
        self.after_change(now_ms);
        debug!("manual capture {slot} <- {symbol} -> {:?}", self.state.stage);
        true
    }

    /// Writes the value for `slot`; no mutation when the kind is wrong.
    fn fill(&mut self, slot: Slot, symbol: Symbol) -> bool {
        match (slot, symbol.operand(), symbol.operator()) {
            (Slot::First, Some(d), _) => self.state.first_operand = Some(d),
            (Slot::Operator, _, Some(op)) => self.state.operator = Some(op),
            (Slot::Second, Some(d), _) => self.state.second_operand = Some(d),
            _ => return false,
        }
        true
    }

    /// Completes once every slot holds a value, otherwise moves to the stage
    /// of the slot just filled.
    fn settle(&mut self, filled: Slot) -> bool {
        if self.pending_slots().is_empty() {
            return self.complete();
        }
        self.state.result = None;
        self.state.stage = filled.reached();
        true
    }

    fn after_change(&mut self, now_ms: u64) {
        self.reset_timer.cancel();
        if self.auto_reset && self.state.stage == Stage::Complete {
            self.reset_timer.schedule(now_ms, self.auto_reset_ms);
        }
    }

    /// Evaluates the three values. Only the transition into `Complete` emits a
    /// record; later corrections just recompute the result.
    fn complete(&mut self) -> bool {
        let (Some(a), Some(op), Some(b)) = (
            self.state.first_operand,
            self.state.operator,
            self.state.second_operand,
        ) else {
            return false;
        };
        let result = evaluate(a.into(), op, b.into());
        self.state.result = Some(result);
        if self.state.stage == Stage::Complete {
            debug!("recomputed: {a} {op} {b} = {result}");
            return true;
        }
        self.state.stage = Stage::Complete;

        info!("calculation complete: {a} {op} {b} = {result}");
        self.completed.push_back(CompletedCalculation {
            first_operand: a,
            operator: op,
            second_operand: b,
            result,
        });
        true
    }

    /// Clears every value and returns to `Detecting`; cancels a pending
    /// automatic reset.
    pub fn reset(&mut self) {
        self.reset_timer.cancel();
        self.state = CalculationState::initial(Stage::Detecting);
    }

    /// Presence only toggles between `AwaitingHand` and `Detecting`.
    pub fn set_hand_present(&mut self, present: bool) {
        match (present, self.state.stage) {
            (false, Stage::Detecting) => self.state.stage = Stage::AwaitingHand,
            (true, Stage::AwaitingHand) => self.state.stage = Stage::Detecting,
            _ => {}
        }
    }

    /// Runs the automatic reset if it is due. Returns true when it fired.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if self.reset_timer.fire(now_ms) {
            debug!("auto reset after completion");
            self.state = CalculationState::initial(Stage::Detecting);
            true
        } else {
            false
        }
    }

    pub fn pending_slots(&self) -> Vec<Slot> {
        Slot::ALL
            .into_iter()
            .filter(|slot| match slot {
                Slot::First => self.state.first_operand.is_none(),
                Slot::Operator => self.state.operator.is_none(),
                Slot::Second => self.state.second_operand.is_none(),
            })
            .collect()
    }

    pub fn drain_completed(&mut self) -> Vec<CompletedCalculation> {
        self.completed.drain(..).collect()
    }
}

impl Default for CaptureMachine {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_RESET_MS)
    }
}
