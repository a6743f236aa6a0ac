use log::{error, info, warn};
use std::{
    sync::mpsc::{Receiver, RecvTimeoutError, Sender},
    thread,
    time::{Duration, Instant},
};

use handcalc::config::Profile;
use handcalc::history::History;
use handcalc::{Engine, FrameMessage, Mode, Slot};

use super::dispatch::{dispatch_completion, handle_command};
use crate::input::{FrameSource, read_frames};

/// Timers still need to run when no frames arrive.
const IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy)]
pub enum EngineCommand {
    State,
    Capture(Slot),
    Reset,
    SetMode(Mode),
    History,
}

pub enum EngineMsg {
    Frame(FrameMessage),
    SourceClosed,
    Command(EngineCommand, Sender<serde_json::Value>),
    Reconfigure(Box<Profile>),
    Shutdown,
}

/// Reads frames on its own thread and forwards them in order.
pub fn spawn_reader(source: FrameSource, tx: Sender<EngineMsg>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let reader = match source.open() {
            Ok(r) => r,
            Err(e) => {
                error!("{e}");
                let _ = tx.send(EngineMsg::SourceClosed);
                return;
            }
        };
        info!("reading frames from {}", source.describe());
        for msg in read_frames(reader) {
            if tx.send(EngineMsg::Frame(msg)).is_err() {
                return;
            }
        }
        let _ = tx.send(EngineMsg::SourceClosed);
    })
}

/// Owns the engine. Every frame and every control command goes through this
/// one loop, so engine state is never touched from two threads.
pub fn run_engine(profile: Profile, rx: Receiver<EngineMsg>) {
    let start = Instant::now();
    let now_ms = || start.elapsed().as_millis() as u64;

    let mut engine = Engine::new(profile.engine_config());
    let mut history = History::new(profile.output.history_limit);
    let mut narrate = profile.output.narrate;

    loop {
        match rx.recv_timeout(IDLE_POLL) {
            Ok(EngineMsg::Frame(msg)) => {
                let tick = engine.process_message(msg, now_ms());
                if let Some(s) = tick.committed {
                    info!("stable gesture: {s} (stage {:?})", engine.stage());
                }
                for calc in tick.completed {
                    dispatch_completion(calc, &mut history, narrate);
                }
            }
            Ok(EngineMsg::SourceClosed) => {
                warn!("frame source closed; engine keeps serving commands");
            }
            Ok(EngineMsg::Command(cmd, reply)) => {
                let resp = handle_command(cmd, &mut engine, &mut history, narrate);
                let _ = reply.send(resp);
            }
            Ok(EngineMsg::Reconfigure(p)) => {
                engine.reconfigure(p.engine_config());
                history.set_limit(p.output.history_limit);
                narrate = p.output.narrate;
                info!("engine reconfigured (mode {})", engine.mode());
            }
            Ok(EngineMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {
                engine.poll(now_ms());
            }
        }
    }
}
