//! Per-tick pipeline: classify, debounce, capture.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::capture::{
    CalculationState, CaptureMachine, CompletedCalculation, DEFAULT_AUTO_RESET_MS, Slot, Stage,
};
use crate::error::EngineError;
use crate::gestures::{ClassifierConfig, Symbol, classify_input};
use crate::landmarks::{FrameInput, FrameMessage, Landmark, LandmarkFrame};
use crate::stability::{DEFAULT_COMMIT_FRAMES, StabilityFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Auto,
    Manual,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Auto => "auto",
            Mode::Manual => "manual",
        })
    }
}

impl FromStr for Mode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "automatic" => Ok(Mode::Auto),
            "manual" => Ok(Mode::Manual),
            _ => Err(EngineError::UnknownMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub commit_frames: u32,
    pub classifier: ClassifierConfig,
    pub auto_reset_ms: u64,
    pub mode: Mode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            commit_frames: DEFAULT_COMMIT_FRAMES,
            classifier: ClassifierConfig::default(),
            auto_reset_ms: DEFAULT_AUTO_RESET_MS,
            mode: Mode::Auto,
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub symbol: Symbol,
    pub committed: Option<Symbol>,
    pub completed: Vec<CompletedCalculation>,
}

/// Read-only view for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub mode: Mode,
    pub last_symbol: Symbol,
    pub run_length: u32,
    pub commit_frames: u32,
    pub calculation: CalculationState,
    pub pending_slots: Vec<Slot>,
    pub divide_by_zero: bool,
}

#[derive(Debug)]
pub struct Engine {
    cfg: EngineConfig,
    filter: StabilityFilter,
    machine: CaptureMachine,
    last_symbol: Symbol,
    now_ms: u64,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Self {
        let mut machine = CaptureMachine::new(cfg.auto_reset_ms);
        machine.set_auto_reset(cfg.mode == Mode::Auto);
        Self {
            cfg,
            filter: StabilityFilter::new(cfg.commit_frames),
            machine,
            last_symbol: Symbol::None,
            now_ms: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.cfg.mode
    }

    pub fn last_symbol(&self) -> Symbol {
        self.last_symbol
    }

    pub fn state(&self) -> &CalculationState {
        self.machine.state()
    }

    pub fn stage(&self) -> Stage {
        self.machine.stage()
    }

    pub fn pending_slots(&self) -> Vec<Slot> {
        self.machine.pending_slots()
    }

    /// Runs one tick. Commits only drive the calculation in `Mode::Auto`.
    pub fn process(&mut self, input: &FrameInput, now_ms: u64) -> Tick {
        self.now_ms = now_ms;
        self.machine.poll(now_ms);

        let symbol = classify_input(input, &self.cfg.classifier);
        self.last_symbol = symbol;
        self.machine.set_hand_present(symbol != Symbol::None);

        let committed = self.filter.observe(symbol);
        if let Some(s) = committed {
            match self.cfg.mode {
                Mode::Auto => {
                    self.machine.on_commit(s, now_ms);
                }
                Mode::Manual => debug!("stable {s} (manual mode, not applied)"),
            }
        }

        Tick {
            symbol,
            committed,
            completed: self.machine.drain_completed(),
        }
    }

    /// Like [`Engine::process`] but starting from raw tracker output. A frame
    /// with the wrong number of points is treated as no hand.
    pub fn process_raw(&mut self, landmarks: Option<Vec<Landmark>>, now_ms: u64) -> Tick {
        let input = match landmarks.map(LandmarkFrame::try_from) {
            Some(Ok(frame)) => FrameInput::Hand(frame),
            Some(Err(e)) => {
                warn!("{e}; treating tick as no hand");
                FrameInput::NoHand
            }
            None => FrameInput::NoHand,
        };
        self.process(&input, now_ms)
    }

    /// Feeds one line of the frame stream: the frame first, then any in-band
    /// capture request it carries.
    pub fn process_message(&mut self, msg: FrameMessage, now_ms: u64) -> Tick {
        let mut tick = self.process_raw(msg.landmarks, now_ms);
        if let Some(slot) = msg.capture {
            if !self.manual_capture(slot) {
                warn!("capture {slot}: '{}' does not fit this slot", self.last_symbol);
            }
            tick.completed.extend(self.machine.drain_completed());
        }
        tick
    }

    /// Applies the most recently observed symbol to `slot`, stamped with the
    /// latest tick time.
    pub fn manual_capture(&mut self, slot: Slot) -> bool {
        self.machine.manual_capture(slot, self.last_symbol, self.now_ms)
    }

    /// Runs pending timers without a new frame.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        self.now_ms = now_ms;
        self.machine.poll(now_ms)
    }

    pub fn reset(&mut self) {
        self.machine.reset();
    }

    /// Switching mode abandons the calculation in progress.
    pub fn set_mode(&mut self, mode: Mode) {
        self.cfg.mode = mode;
        self.filter.reset();
        self.machine.reset();
        self.machine.set_auto_reset(mode == Mode::Auto);
    }

    /// New thresholds take effect on the next tick. The calculation survives;
    /// the current run only restarts when `commit_frames` changed.
    pub fn reconfigure(&mut self, cfg: EngineConfig) {
        if cfg.mode != self.cfg.mode {
            self.set_mode(cfg.mode);
        }
        if cfg.commit_frames != self.filter.threshold() {
            self.filter = StabilityFilter::new(cfg.commit_frames);
        }
        self.cfg = cfg;
        self.machine.set_auto_reset_ms(cfg.auto_reset_ms);
    }

    pub fn drain_completed(&mut self) -> Vec<CompletedCalculation> {
        self.machine.drain_completed()
    }

    pub fn snapshot(&self) -> EngineStatus {
        let calc = self.machine.state().clone();
        let divide_by_zero = calc.result.is_some_and(f64::is_nan);
        EngineStatus {
            mode: self.cfg.mode,
            last_symbol: self.last_symbol,
            run_length: self.filter.state().run_length,
            commit_frames: self.filter.threshold(),
            pending_slots: self.machine.pending_slots(),
            calculation: calc,
            divide_by_zero,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
