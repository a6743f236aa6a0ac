use anyhow::{Result, anyhow};
use pico_args::Arguments;
use std::{env, process::Command};

use handcalc::{Mode, Slot};

use crate::input::FrameSource;
use crate::ipc;
use crate::replay::{self, ReplayOptions};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // Hidden daemon mode (spawned by `start`)
    if pargs.contains("--daemon") {
        return ipc::run_daemon();
    }

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("start") => {
            let exe = std::env::current_exe()?;
            let child = Command::new(exe).arg("--daemon").spawn()?;
            println!("handcalc: started daemon (pid={})", child.id());
            Ok(())
        }

        // Foreground daemon, e.g. `tracker | handcalc run`
        Some("run") => ipc::run_daemon(),

        Some("stop") => request(serde_json::json!({"op":"shutdown"})),
        Some("status") => request(serde_json::json!({"op":"status"})),
        Some("reload") => request(serde_json::json!({"op":"reload"})),
        Some("list") => request(serde_json::json!({"op":"list"})),
        Some("doctor") => request(serde_json::json!({"op":"doctor"})),
        Some("state") => request(serde_json::json!({"op":"state"})),
        Some("reset") => request(serde_json::json!({"op":"reset"})),
        Some("history") => request(serde_json::json!({"op":"history"})),

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: handcalc use <profile_name>"))?;
            request(serde_json::json!({"op":"use","profile":name}))
        }

        Some("capture") => {
            let slot: Slot = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: handcalc capture <first|operator|second>"))?;
            request(serde_json::json!({"op":"capture","slot":slot.as_str()}))
        }

        Some("mode") => {
            let mode: Mode = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: handcalc mode <auto|manual>"))?;
            request(serde_json::json!({"op":"mode","mode":mode.to_string()}))
        }

        Some("replay") => {
            let manual = pargs.contains("--manual");
            let json = pargs.contains("--json");
            let path: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: handcalc replay <file|-> [--manual] [--json]"))?;
            replay::run(ReplayOptions {
                source: FrameSource::from_arg(&path),
                mode: manual.then_some(Mode::Manual),
                json,
            })
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn request(req: serde_json::Value) -> Result<()> {
    let r = ipc::client_request(req)?;
    print_response(&r);
    Ok(())
}

fn print_help() {
    println!(
        r#"handcalc — hand-gesture calculator daemon

USAGE:
  handcalc help [command]                   Show general or command-specific help
  handcalc start                            Start the daemon in the background
  handcalc run                              Run the daemon in the foreground
  handcalc stop                             Stop the daemon
  handcalc status                           Show daemon state
  handcalc reload                           Reload active profile
  handcalc use <name>                       Switch active profile
  handcalc list                             List profiles
  handcalc doctor                           Diagnose configuration and frame source
  handcalc state                            Show the calculation in progress
  handcalc capture <first|operator|second>  Capture the current gesture into a slot
  handcalc reset                            Start a new calculation
  handcalc mode <auto|manual>               Switch capture mode
  handcalc history                          Show recent calculations
  handcalc replay <file|-> [--manual]       Run a recorded frame stream offline

GESTURES:
  1-5 fingers   operand        circle (thumb+index touch)  +
  fist + thumb  −              victory (index+middle)      ×
  thumbs up     ÷

TIPS:
  - Frames: one JSON object per line, {{"t_ms":..,"landmarks":[21 x {{"x","y","z"}}]}}
  - Profiles: ~/.config/handcalc/profiles
  - Active profile pointer: ~/.config/handcalc/active
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "start" => println!("usage: handcalc start\nStarts the background daemon."),
        "run" => println!(
            "usage: handcalc run\nRuns the daemon in the foreground; frames come from the profile's [input] source."
        ),
        "stop" => println!("usage: handcalc stop\nStops the running daemon."),
        "status" => println!(
            "usage: handcalc status\nShows enabled flag, active profile, frame source, socket."
        ),
        "reload" => println!(
            "usage: handcalc reload\nReloads the current profile; keeps last good on error."
        ),
        "use" => {
            println!("usage: handcalc use <name>\nSwitches active profile to <name> and reloads.")
        }
        "list" => println!("usage: handcalc list\nLists available profiles."),
        "doctor" => println!(
            "usage: handcalc doctor\nReports profile, thresholds and whether the frame source exists."
        ),
        "state" => println!(
            "usage: handcalc state\nShows stage, captured values, last gesture and pending slots."
        ),
        "capture" => println!(
            "usage: handcalc capture <first|operator|second>\nFills one slot from the most recent gesture, skipping the stability wait."
        ),
        "reset" => println!("usage: handcalc reset\nClears the calculation in progress."),
        "mode" => println!(
            "usage: handcalc mode <auto|manual>\nauto: stable gestures fill slots in order. manual: use `capture`."
        ),
        "history" => println!("usage: handcalc history\nShows the most recent calculations."),
        "replay" => println!(
            "usage: handcalc replay <file|-> [--manual] [--json]\nFeeds recorded frames through a fresh engine and prints each result."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
