//! Offline run of a recorded frame stream through a fresh engine.

use anyhow::Result;
use log::{info, warn};

use handcalc::config::DaemonConfigState;
use handcalc::history::History;
use handcalc::narrate::format_result;
use handcalc::{Engine, EngineConfig, Mode};

use crate::input::{FrameSource, read_frames};

/// Nominal spacing for frames without a timestamp (~30 fps).
const FRAME_INTERVAL_MS: u64 = 33;

pub struct ReplayOptions {
    pub source: FrameSource,
    pub mode: Option<Mode>,
    pub json: bool,
}

pub fn run(opts: ReplayOptions) -> Result<()> {
    let (mut cfg, history_limit) = match DaemonConfigState::load_or_install_default() {
        Ok(st) => (st.profile.engine_config(), st.profile.output.history_limit),
        Err(e) => {
            warn!("using built-in defaults: {e}");
            (EngineConfig::default(), handcalc::history::DEFAULT_HISTORY_LIMIT)
        }
    };
    if let Some(mode) = opts.mode {
        cfg.mode = mode;
    }

    let mut engine = Engine::new(cfg);
    let mut history = History::new(history_limit);
    let mut frames = 0u64;

    info!("replaying {} in {} mode", opts.source.describe(), engine.mode());
    for (idx, msg) in read_frames(opts.source.open()?).enumerate() {
        let now = msg.t_ms.unwrap_or(idx as u64 * FRAME_INTERVAL_MS);
        frames += 1;
        let tick = engine.process_message(msg, now);
        for calc in tick.completed {
            let entry = history.record(calc);
            if opts.json {
                println!("{}", serde_json::to_string(entry)?);
            } else {
                println!(
                    "{} {} {} = {}    ({})",
                    calc.first_operand,
                    calc.operator,
                    calc.second_operand,
                    format_result(calc.result),
                    entry.sentence
                );
            }
        }
    }
    info!(
        "replay done: {frames} frames, {} calculation(s)",
        history.len()
    );
    if !opts.json {
        let status = engine.snapshot();
        println!(
            "final stage: {:?}, pending: {:?}",
            status.calculation.stage, status.pending_slots
        );
    }
    Ok(())
}
