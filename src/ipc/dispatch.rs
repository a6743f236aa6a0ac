use log::info;
use serde_json::json;

use handcalc::history::History;
use handcalc::{CompletedCalculation, Engine};

use super::pipeline::EngineCommand;

/// Hands a finished calculation to history and, if enabled, narration.
pub fn dispatch_completion(calc: CompletedCalculation, history: &mut History, narrate: bool) {
    let entry = history.record(calc);
    if narrate {
        info!("say: {}", entry.sentence);
    }
}

pub fn handle_command(
    cmd: EngineCommand,
    engine: &mut Engine,
    history: &mut History,
    narrate: bool,
) -> serde_json::Value {
    match cmd {
        EngineCommand::State => json!({"ok": true, "data": engine.snapshot()}),
        EngineCommand::Capture(slot) => {
            let symbol = engine.last_symbol();
            if engine.manual_capture(slot) {
                for calc in engine.drain_completed() {
                    dispatch_completion(calc, history, narrate);
                }
                json!({"ok": true, "data": engine.snapshot()})
            } else {
                json!({
                    "ok": false,
                    "error": format!("cannot capture {slot} from '{symbol}'; make a valid gesture for this step"),
                })
            }
        }
        EngineCommand::Reset => {
            engine.reset();
            json!({"ok": true, "data": engine.snapshot()})
        }
        EngineCommand::SetMode(mode) => {
            engine.set_mode(mode);
            info!("capture mode set to {mode}");
            json!({"ok": true, "data": engine.snapshot()})
        }
        EngineCommand::History => {
            let entries: Vec<_> = history.entries().collect();
            json!({"ok": true, "data": {"calculations": entries}})
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handcalc::landmarks::{FINGER_TIPS, LANDMARK_COUNT, THUMB_TIP};
    use handcalc::{EngineConfig, FrameInput, Landmark, LandmarkFrame, Mode, Slot};

    /// Index+middle raised is victory; other counts raise tips in order.
    fn hand(raised: usize) -> FrameInput {
        let mut pts = [Landmark::new(0.5, 0.5); LANDMARK_COUNT];
        for (i, tip) in FINGER_TIPS.into_iter().enumerate() {
            pts[tip] = if i < raised {
                Landmark::new(0.3 + 0.1 * i as f32, 0.3)
            } else {
                Landmark::new(0.4, 0.6)
            };
        }
        pts[THUMB_TIP] = Landmark::new(0.52, 0.55);
        FrameInput::Hand(LandmarkFrame::new(pts))
    }

    fn manual_engine() -> Engine {
        Engine::new(EngineConfig {
            mode: Mode::Manual,
            ..EngineConfig::default()
        })
    }

    fn show_and_capture(
        engine: &mut Engine,
        history: &mut History,
        raised: usize,
        slot: Slot,
    ) -> serde_json::Value {
        engine.process(&hand(raised), 0);
        handle_command(EngineCommand::Capture(slot), engine, history, false)
    }

    #[test]
    fn capture_of_wrong_kind_is_refused() {
        let mut engine = manual_engine();
        let mut history = History::default();
        let resp = show_and_capture(&mut engine, &mut history, 3, Slot::Operator);
        assert_eq!(resp["ok"], false);
        let msg = resp["error"].as_str().unwrap();
        assert!(msg.contains("cannot capture operator from '3'"), "{msg}");
        assert!(msg.contains("make a valid gesture"));
        assert!(engine.state().is_cleared());
    }

    #[test]
    fn capture_that_completes_lands_in_history() {
        let mut engine = manual_engine();
        let mut history = History::default();
        show_and_capture(&mut engine, &mut history, 4, Slot::First);
        show_and_capture(&mut engine, &mut history, 2, Slot::Operator);
        assert!(history.is_empty());
        let resp = show_and_capture(&mut engine, &mut history, 3, Slot::Second);
        assert_eq!(resp["ok"], true);
        assert_eq!(resp["data"]["calculation"]["stage"], "COMPLETE");
        assert_eq!(resp["data"]["calculation"]["result"], 12.0);
        assert_eq!(history.len(), 1);

        let resp = handle_command(EngineCommand::History, &mut engine, &mut history, false);
        let calcs = resp["data"]["calculations"].as_array().unwrap();
        assert_eq!(calcs.len(), 1);
        assert_eq!(calcs[0]["id"], 1);
        assert_eq!(calcs[0]["first_operand"], 4);
        assert_eq!(calcs[0]["operator"], "×");
        assert_eq!(calcs[0]["second_operand"], 3);
        assert_eq!(calcs[0]["divide_by_zero"], false);
        assert_eq!(calcs[0]["sentence"], "4 times 3 equals 12");
        assert!(calcs[0]["timestamp"].is_string());
    }

    #[test]
    fn set_mode_abandons_the_calculation() {
        let mut engine = Engine::default();
        let mut history = History::default();
        for t in 0..10 {
            engine.process(&hand(1), t * 33);
        }
        assert_eq!(engine.state().first_operand, Some(1));

        let resp = handle_command(
            EngineCommand::SetMode(Mode::Manual),
            &mut engine,
            &mut history,
            false,
        );
        assert_eq!(resp["ok"], true);
        assert_eq!(resp["data"]["mode"], "manual");
        assert!(resp["data"]["calculation"]["first_operand"].is_null());
        assert_eq!(resp["data"]["calculation"]["stage"], "DETECTING");
    }

    #[test]
    fn empty_history_is_an_empty_list() {
        let mut engine = Engine::default();
        let mut history = History::default();
        let resp = handle_command(EngineCommand::History, &mut engine, &mut history, false);
        assert_eq!(resp, json!({"ok": true, "data": {"calculations": []}}));
    }
}
