//! Tick-based task scheduling for the engine's own periodic work

use std::collections::BTreeMap;

/// Work the engine schedules for itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Start a despawn pass over every loaded world
    RequestScan,
    /// Advance the running despawn pass
    ScanStep,
}

#[derive(Debug, Clone)]
struct Repeating {
    task: Task,
    interval: u64,
    next_due: u64,
}

/// One-shot and repeating tasks keyed by due tick
#[derive(Debug, Default)]
pub struct TickScheduler {
    once: BTreeMap<u64, Vec<Task>>,
    repeating: Vec<Repeating>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once, `delay` ticks after `now` (at least one tick later)
    pub fn schedule_after(&mut self, now: u64, delay: u64, task: Task) {
        self.once.entry(now + delay.max(1)).or_default().push(task);
    }

    /// Run `task` after `delay` ticks, then every `interval` ticks
    pub fn schedule_repeating(&mut self, now: u64, delay: u64, interval: u64, task: Task) {
        self.repeating.push(Repeating {
            task,
            interval: interval.max(1),
            next_due: now + delay.max(1),
        });
    }

    /// Tasks due at or before `now`, in due order. Repeating tasks that fell
    /// behind run once and are rescheduled from `now`.
    pub fn take_due(&mut self, now: u64) -> Vec<Task> {
        let later = self.once.split_off(&(now + 1));
        let due = std::mem::replace(&mut self.once, later);

        let mut tasks: Vec<(u64, Task)> = due
            .into_iter()
            .flat_map(|(tick, entries)| entries.into_iter().map(move |task| (tick, task)))
            .collect();

        for repeating in self.repeating.iter_mut().filter(|r| r.next_due <= now) {
            tasks.push((repeating.next_due, repeating.task));
            let missed = (now - repeating.next_due) / repeating.interval;
            repeating.next_due += (missed + 1) * repeating.interval;
        }

        tasks.sort_by_key(|(tick, _)| *tick);
        tasks.into_iter().map(|(_, task)| task).collect()
    }

    /// Drop every pending instance of `task`, returning how many
    pub fn cancel_task(&mut self, task: Task) -> usize {
        let before = self.len();
        self.repeating.retain(|r| r.task != task);
        for entries in self.once.values_mut() {
            entries.retain(|t| *t != task);
        }
        self.once.retain(|_, entries| !entries.is_empty());
        before - self.len()
    }

    pub fn len(&self) -> usize {
        self.repeating.len() + self.once.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_runs_once() {
        let mut scheduler = TickScheduler::new();
        scheduler.schedule_after(10, 5, Task::ScanStep);

        assert!(scheduler.take_due(14).is_empty());
        assert_eq!(scheduler.take_due(15), vec![Task::ScanStep]);
        assert!(scheduler.take_due(16).is_empty());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_zero_delay_runs_next_tick() {
        let mut scheduler = TickScheduler::new();
        scheduler.schedule_after(3, 0, Task::ScanStep);
        assert!(scheduler.take_due(3).is_empty());
        assert_eq!(scheduler.take_due(4), vec![Task::ScanStep]);
    }

    #[test]
    fn test_repeating() {
        let mut scheduler = TickScheduler::new();
        scheduler.schedule_repeating(0, 10, 10, Task::RequestScan);

        let runs: Vec<u64> = (0..=50)
            .filter(|tick| !scheduler.take_due(*tick).is_empty())
            .collect();
        assert_eq!(runs, vec![10, 20, 30, 40, 50]);
    }

    #[test]
    fn test_repeating_catches_up_once() {
        let mut scheduler = TickScheduler::new();
        scheduler.schedule_repeating(0, 10, 10, Task::RequestScan);
        assert_eq!(scheduler.take_due(95), vec![Task::RequestScan]);
        assert!(scheduler.take_due(99).is_empty());
        assert_eq!(scheduler.take_due(100), vec![Task::RequestScan]);
    }

    #[test]
    fn test_due_order() {
        let mut scheduler = TickScheduler::new();
        scheduler.schedule_after(0, 7, Task::ScanStep);
        scheduler.schedule_repeating(0, 3, 100, Task::RequestScan);
        assert_eq!(
            scheduler.take_due(10),
            vec![Task::RequestScan, Task::ScanStep]
        );
    }

    #[test]
    fn test_cancel_task() {
        let mut scheduler = TickScheduler::new();
        scheduler.schedule_after(0, 1, Task::ScanStep);
        scheduler.schedule_after(0, 2, Task::ScanStep);
        scheduler.schedule_repeating(0, 1, 1, Task::RequestScan);

        assert_eq!(scheduler.cancel_task(Task::ScanStep), 2);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.take_due(10), vec![Task::RequestScan]);

        assert_eq!(scheduler.cancel_task(Task::RequestScan), 1);
        assert!(scheduler.is_empty());
        assert!(scheduler.take_due(20).is_empty());
    }
}
