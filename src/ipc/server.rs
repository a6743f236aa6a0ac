use anyhow::{Result, anyhow};
use log::{debug, error, info, warn};
use notify::{EventKind, RecursiveMode, Watcher};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    io::{BufRead, BufReader, Write},
    os::unix::net::{UnixListener, UnixStream},
    path::{Path, PathBuf},
    sync::mpsc::{self, Sender},
    thread,
    time::Duration,
};

use handcalc::config::DaemonConfigState;
use handcalc::{Mode, Slot};

use super::pipeline::{EngineCommand, EngineMsg, run_engine, spawn_reader};
use super::runtime::socket_path;
use crate::input::FrameSource;

const ENGINE_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

pub fn run_daemon() -> Result<()> {
    // socket
    let sock = socket_path()?;
    if sock.exists() {
        let _ = std::fs::remove_file(&sock);
    }
    let listener = UnixListener::bind(&sock)?;
    info!("daemon: listening on {}", sock.display());

    // state
    let mut state = DaemonState::new()?;
    info!("daemon: active profile '{}'", state.cfg.active_name);

    // channels
    let (tx_req, rx_req) = mpsc::channel::<IpcMsg>();
    let (tx_engine, rx_engine) = mpsc::channel::<EngineMsg>();

    // engine + frame reader
    let profile = state.cfg.profile.clone();
    let engine_thread = thread::spawn(move || run_engine(profile, rx_engine));
    let source = FrameSource::from_config(&state.cfg.profile.input);
    spawn_reader(source, tx_engine.clone());

    let _watcher = watch_profiles(&state.cfg, tx_req.clone())?;
    watch_signals(tx_req.clone())?;

    // accept loop
    listener.set_nonblocking(true)?;
    loop {
        if let Ok((stream, _)) = listener.accept() {
            let tx = tx_req.clone();
            let tx_eng = tx_engine.clone();
            let st_snapshot = state.clone_shallow();
            thread::spawn(move || {
                if let Err(e) = handle_client(stream, st_snapshot, tx, tx_eng) {
                    error!("ipc client error: {e}");
                }
            });
        }

        // one write usually raises several events; reload once per batch
        let mut reload = false;
        while let Ok(msg) = rx_req.try_recv() {
            match msg {
                IpcMsg::Reload => reload = true,
                IpcMsg::ProfileChanged(path) => {
                    if is_active_profile(&path, &state.cfg.active_profile_path()) {
                        reload = true;
                    } else {
                        debug!("ignoring change to {}", path.display());
                    }
                }
                IpcMsg::UseProfile(name) => match state.cfg.set_active(&name) {
                    Ok(()) => {
                        let _ = tx_engine
                            .send(EngineMsg::Reconfigure(Box::new(state.cfg.profile.clone())));
                        info!("switched active profile to {}", state.cfg.active_name);
                    }
                    Err(e) => error!("use profile failed: {e}"),
                },
                IpcMsg::Shutdown => {
                    info!("daemon: shutting down");
                    let _ = tx_engine.send(EngineMsg::Shutdown);
                    let _ = engine_thread.join();
                    let _ = std::fs::remove_file(&sock);
                    return Ok(());
                }
            }
        }
        if reload {
            match state.cfg.reload() {
                Ok(()) => {
                    let _ = tx_engine
                        .send(EngineMsg::Reconfigure(Box::new(state.cfg.profile.clone())));
                    info!("profile reloaded");
                }
                Err(e) => error!("reload failed, keeping previous profile: {e}"),
            }
        }

        thread::sleep(Duration::from_millis(5));
    }
}

fn handle_client(
    mut stream: UnixStream,
    st: DaemonState,
    tx_req: Sender<IpcMsg>,
    tx_engine: Sender<EngineMsg>,
) -> Result<()> {
    stream.set_nonblocking(false)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim().is_empty() {
        return Ok(());
    }
    let req: serde_json::Value = serde_json::from_str(&line)?;
    let op = req.get("op").and_then(|v| v.as_str()).unwrap_or("");

    let resp = match op {
        "status" => serde_json::json!({"ok": true, "data": {
            "enabled": st.enabled,
            "active_profile": st.cfg.active_name,
            "socket": socket_path()?,
            "frame_source": st.cfg.profile.input.source,
            "mode": st.cfg.profile.capture.mode,
        }}),
        "reload" => {
            let _ = tx_req.send(IpcMsg::Reload);
            serde_json::json!({"ok": true, "data": {"active_profile": st.cfg.active_name}})
        }
        "use" => {
            let name = req.get("profile").and_then(|v| v.as_str()).unwrap_or("");
            let _ = tx_req.send(IpcMsg::UseProfile(name.to_string()));
            serde_json::json!({"ok": true, "data": {"active_profile": name}})
        }
        "list" => {
            let list = st.cfg.list_profiles();
            serde_json::json!({"ok": true, "data": {"profiles": list, "active": st.cfg.active_name}})
        }
        "doctor" => {
            let mut report = st.cfg.doctor_report();
            report["socket"] = serde_json::json!(socket_path()?);
            serde_json::json!({"ok": true, "data": report})
        }
        "state" => ask_engine(&tx_engine, EngineCommand::State),
        "reset" => ask_engine(&tx_engine, EngineCommand::Reset),
        "history" => ask_engine(&tx_engine, EngineCommand::History),
        "capture" => {
            let slot = req.get("slot").and_then(|v| v.as_str()).unwrap_or("");
            match slot.parse::<Slot>() {
                Ok(slot) => ask_engine(&tx_engine, EngineCommand::Capture(slot)),
                Err(e) => serde_json::json!({"ok": false, "error": e.to_string()}),
            }
        }
        "mode" => {
            let mode = req.get("mode").and_then(|v| v.as_str()).unwrap_or("");
            match mode.parse::<Mode>() {
                Ok(mode) => ask_engine(&tx_engine, EngineCommand::SetMode(mode)),
                Err(e) => serde_json::json!({"ok": false, "error": e.to_string()}),
            }
        }
        "shutdown" => serde_json::json!({"ok": true, "data": "shutting down"}),
        _ => serde_json::json!({"ok": false, "error": format!("unknown op: {op}")}),
    };

    writeln!(stream, "{resp}")?;
    // answer first: the daemon exits as soon as the main loop sees this
    if op == "shutdown" {
        let _ = tx_req.send(IpcMsg::Shutdown);
    }
    Ok(())
}

fn ask_engine(tx_engine: &Sender<EngineMsg>, cmd: EngineCommand) -> serde_json::Value {
    let (reply_tx, reply_rx) = mpsc::channel();
    if tx_engine.send(EngineMsg::Command(cmd, reply_tx)).is_err() {
        return serde_json::json!({"ok": false, "error": "engine is not running"});
    }
    reply_rx
        .recv_timeout(ENGINE_REPLY_TIMEOUT)
        .unwrap_or_else(|e| serde_json::json!({"ok": false, "error": format!("engine did not answer: {e}")}))
}

fn is_active_profile(changed: &Path, active: &Path) -> bool {
    changed.file_name().is_some() && changed.file_name() == active.file_name()
}

/// Reports profile files that change on disk.
fn watch_profiles(
    cfg: &DaemonConfigState,
    tx_req: Sender<IpcMsg>,
) -> Result<notify::RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(ev) if matches!(ev.kind, EventKind::Modify(_) | EventKind::Create(_)) => {
                for path in ev.paths {
                    if path.extension().is_some_and(|ext| ext == "toml") {
                        let _ = tx_req.send(IpcMsg::ProfileChanged(path));
                    }
                }
            }
            Ok(_) => {}
            Err(e) => warn!("profile watch error: {e}"),
        }
    })?;
    watcher.watch(&cfg.paths.profiles_dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn watch_signals(tx_req: Sender<IpcMsg>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("daemon: received signal {sig}");
            let _ = tx_req.send(IpcMsg::Shutdown);
        }
    });
    Ok(())
}

struct DaemonState {
    pub enabled: bool,
    pub cfg: DaemonConfigState,
}

impl DaemonState {
    fn new() -> Result<Self> {
        let cfg = DaemonConfigState::load_or_install_default()?;
        Ok(Self { enabled: true, cfg })
    }
    fn clone_shallow(&self) -> Self {
        Self {
            enabled: self.enabled,
            cfg: self.cfg.clone(),
        }
    }
}

enum IpcMsg {
    Reload,
    ProfileChanged(PathBuf),
    UseProfile(String),
    Shutdown,
}

// client helper
pub fn client_request(req: serde_json::Value) -> Result<serde_json::Value> {
    let sock = socket_path()?;
    if !sock.exists() {
        return Err(anyhow!(
            "handcalc daemon is not running (socket missing at {})",
            sock.display()
        ));
    }
    let mut stream = UnixStream::connect(sock)?;
    let line = serde_json::to_string(&req)? + "\n";
    stream.write_all(line.as_bytes())?;
    let mut reader = BufReader::new(stream);
    let mut resp = String::new();
    reader.read_line(&mut resp)?;
    let v: serde_json::Value = serde_json::from_str(&resp)?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_active_profile_triggers_reload() {
        let active = Path::new("/home/u/.config/handcalc/profiles/default.toml");
        assert!(is_active_profile(
            Path::new("/home/u/.config/handcalc/profiles/default.toml"),
            active
        ));
        assert!(!is_active_profile(
            Path::new("/home/u/.config/handcalc/profiles/slow.toml"),
            active
        ));
        assert!(!is_active_profile(Path::new("/"), Path::new("/")));
    }
}
