//! Cooperative fixed-period scheduler.
//!
//! The main loop calls [`Scheduler::run`] once per iteration. Each task in the table is polled
//! in order and runs only if its period has elapsed since it last ran. Nothing here blocks; a
//! task that cannot make progress returns and is polled again next tick.

/// Task body. Receives the shared context and the tick's timestamp.
pub type TaskFn<C> = fn(&mut C, u32);

/// One entry of the schedule.
pub struct Task<C> {
    name: &'static str,
    /// 0 runs on every tick
    period_ms: u32,
    last_run_ms: u32,
    runs: u32,
    action: TaskFn<C>,
}

impl<C> Task<C> {
    pub const fn new(name: &'static str, period_ms: u32, action: TaskFn<C>) -> Self {
        Self {
            name,
            period_ms,
            last_run_ms: 0,
            runs: 0,
            action,
        }
    }

    pub fn is_due(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.last_run_ms) >= self.period_ms
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    pub fn last_run_ms(&self) -> u32 {
        self.last_run_ms
    }

    /// Times this task has run.
    pub fn runs(&self) -> u32 {
        self.runs
    }
}

/// Ordered task table, highest priority first.
pub struct Scheduler<C, const N: usize> {
    tasks: [Task<C>; N],
    ticks: u32,
}

impl<C, const N: usize> Scheduler<C, N> {
    /// Every task's period is counted from `now_ms`.
    pub fn new(mut tasks: [Task<C>; N], now_ms: u32) -> Self {
        for task in tasks.iter_mut() {
            task.last_run_ms = now_ms;
        }
        Self { tasks, ticks: 0 }
    }

    /// One pass over the table. Returns how many tasks ran.
    pub fn run(&mut self, ctx: &mut C, now_ms: u32) -> usize {
        let mut ran = 0;
        for task in self.tasks.iter_mut() {
            if !task.is_due(now_ms) {
                continue;
            }
            task.last_run_ms = now_ms;
            task.runs = task.runs.wrapping_add(1);
            (task.action)(ctx, now_ms);
            ran += 1;
        }
        self.ticks = self.ticks.wrapping_add(1);
        ran
    }

    pub fn tasks(&self) -> &[Task<C>] {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Option<&Task<C>> {
        self.tasks.iter().find(|task| task.name == name)
    }

    /// Passes made so far.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    #[derive(Default)]
    struct Trace {
        log: Vec<(&'static str, u32), 64>,
    }

    fn fast(t: &mut Trace, now: u32) {
        t.log.push(("fast", now)).unwrap();
    }

    fn slow(t: &mut Trace, now: u32) {
        t.log.push(("slow", now)).unwrap();
    }

    fn every(t: &mut Trace, now: u32) {
        t.log.push(("every", now)).unwrap();
    }

    #[test]
    fn test_tasks_run_in_table_order_when_due() {
        let mut trace = Trace::default();
        let mut scheduler = Scheduler::new(
            [
                Task::new("every", 0, every),
                Task::new("fast", 1, fast),
                Task::new("slow", 5, slow),
            ],
            0,
        );

        for now in 0..=5 {
            scheduler.run(&mut trace, now);
        }

        let names: std::vec::Vec<_> = trace.log.iter().filter(|(_, t)| *t == 5).collect();
        assert_eq!(names, [&("every", 5), &("fast", 5), &("slow", 5)]);
        assert_eq!(scheduler.task("every").unwrap().runs(), 6);
        assert_eq!(scheduler.task("fast").unwrap().runs(), 5);
        assert_eq!(scheduler.task("slow").unwrap().runs(), 1);
        assert_eq!(scheduler.ticks(), 6);
    }

    #[test]
    fn test_period_measured_from_last_run() {
        let mut trace = Trace::default();
        let mut scheduler = Scheduler::new([Task::new("slow", 100, slow)], 0);

        assert_eq!(scheduler.run(&mut trace, 99), 0);
        assert_eq!(scheduler.run(&mut trace, 150), 1);
        assert_eq!(scheduler.run(&mut trace, 249), 0);
        assert_eq!(scheduler.run(&mut trace, 250), 1);
        assert_eq!(scheduler.task("slow").unwrap().last_run_ms(), 250);
    }

    #[test]
    fn test_due_check_survives_millisecond_wrap() {
        let mut trace = Trace::default();
        let start = u32::MAX - 2;
        let mut scheduler = Scheduler::new([Task::new("slow", 5, slow)], start);

        assert_eq!(scheduler.run(&mut trace, u32::MAX), 0);
        assert_eq!(scheduler.run(&mut trace, 1), 0);
        assert_eq!(scheduler.run(&mut trace, 2), 1);
        assert_eq!(trace.log[0], ("slow", 2));
    }
}
