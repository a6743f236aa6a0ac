/// A single pending deadline on the tick clock. Scheduling replaces whatever
/// was pending, so at most one deadline is ever live.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ResetTimer {
    due_ms: Option<u64>,
}

impl ResetTimer {
    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64) {
        self.due_ms = Some(now_ms.saturating_add(delay_ms));
    }

    pub fn cancel(&mut self) {
        self.due_ms = None;
    }

    pub fn is_pending(&self) -> bool {
        self.due_ms.is_some()
    }

    /// Consumes the deadline if it has passed.
    pub fn fire(&mut self, now_ms: u64) -> bool {
        match self.due_ms {
            Some(due) if now_ms >= due => {
                self.due_ms = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_deadline() {
        let mut t = ResetTimer::default();
        t.schedule(100, 50);
        assert!(!t.fire(149));
        assert!(t.fire(150));
        assert!(!t.fire(500));
    }

    #[test]
    fn reschedule_replaces_pending_deadline() {
        let mut t = ResetTimer::default();
        t.schedule(0, 100);
        t.schedule(80, 100);
        assert!(!t.fire(120));
        assert!(t.fire(180));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut t = ResetTimer::default();
        t.schedule(0, 10);
        t.cancel();
        assert!(!t.fire(1_000));
    }
}
