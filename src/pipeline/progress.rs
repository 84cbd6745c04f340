use serde::{Deserialize, Serialize};

/// Progress of a multi-step operation: `completed` of `total` steps done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// Fraction in [0, 1]. An empty operation counts as complete.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            (self.completed.min(self.total) as f32) / (self.total as f32)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Optional progress sink, invoked synchronously after each step.
pub type ProgressFn<'a> = Option<&'a dyn Fn(Progress)>;

pub(crate) fn report(progress_fn: ProgressFn<'_>, completed: usize, total: usize) {
    if let Some(f) = progress_fn {
        f(Progress::new(completed, total));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_of_steps() {
        assert_eq!(Progress::new(1, 4).fraction(), 0.25);
        assert_eq!(Progress::new(4, 4).fraction(), 1.0);
    }

    #[test]
    fn empty_total_is_complete() {
        let p = Progress::new(0, 0);
        assert_eq!(p.fraction(), 1.0);
        assert!(p.is_complete());
    }

    #[test]
    fn report_without_sink_is_noop() {
        report(None, 1, 2);
    }

    #[test]
    fn report_invokes_sink() {
        let seen = std::cell::RefCell::new(Vec::new());
        let sink = |p: Progress| seen.borrow_mut().push(p.fraction());
        report(Some(&sink), 1, 2);
        report(Some(&sink), 2, 2);
        assert_eq!(*seen.borrow(), vec![0.5, 1.0]);
    }
}
