// ==============================================================================
// schedule.rs — CANCELLABLE REPEATING TASKS (FRAME-CLOCK DRIVEN)
// ------------------------------------------------------------------------------
// A TaskSlot holds at most one repeating task. Starting a task replaces (and so
// cancels) whatever was running in the slot and hands back a fresh TaskToken.
// Cancelling with a stale token is a no-op, so a callback that was superseded
// can never stop its successor.
//
// advance(dt) returns how many firings fell due this frame:
// - the first firing happens after `delay`
// - then every `period` seconds
// - period == 0.0 means "once per frame"
// The owner runs its callback that many times, re-checking is_active() between
// runs because the callback may cancel itself.
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskToken(u64);

#[derive(Debug, Clone, Copy)]
struct RepeatingTask {
    token: TaskToken,
    period: f32,     // s
    until_next: f32, // s
}

#[derive(Debug, Default)]
pub struct TaskSlot {
    next_id: u64,
    task: Option<RepeatingTask>,
}

// Bound on catch-up firings after a long frame stall.
const MAX_FIRINGS_PER_ADVANCE: u32 = 8;

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, delay: f32, period: f32) -> TaskToken {
        self.next_id += 1;
        let token = TaskToken(self.next_id);
        self.task = Some(RepeatingTask {
            token,
            period: period.max(0.0),
            until_next: delay.max(0.0),
        });
        token
    }

    /// Cancel whatever is scheduled. Returns the token that was cancelled.
    pub fn cancel(&mut self) -> Option<TaskToken> {
        self.task.take().map(|t| t.token)
    }

    /// Cancel only if `token` still identifies the running task.
    pub fn cancel_token(&mut self, token: TaskToken) -> bool {
        match self.task {
            Some(t) if t.token == token => {
                self.task = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    pub fn advance(&mut self, dt: f32) -> u32 {
        let Some(task) = self.task.as_mut() else {
            return 0;
        };

        if task.period <= 0.0 {
            task.until_next = 0.0;
            return 1;
        }

        task.until_next -= dt;
        let mut fires = 0;
        while task.until_next <= 0.0 && fires < MAX_FIRINGS_PER_ADVANCE {
            fires += 1;
            task.until_next += task.period;
        }
        if task.until_next <= 0.0 {
            // drop the backlog rather than spiral
            task.until_next = task.period;
        }
        fires
    }
}
