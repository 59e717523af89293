//! Change Detection Scheduler
//!
//! Batches mutation bursts into single flush passes. Every mutation marks a
//! pending root and receives a flow-tagged handle; whichever handle from the
//! burst is invoked first runs the flush, and stale or duplicate invocations
//! from an already-flushed burst are no-ops. Event dispatch opens a burst so
//! that `set_state` calls inside one handler invocation only mark.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Result;
use crate::reference::BindingReference;

#[derive(Default)]
struct SchedulerState {
    /// Pending roots: never contains both an ancestor and one of its
    /// descendants.
    pending: Vec<BindingReference>,
    /// Monotonically increasing flow id.
    flow: u64,
    /// Highest flow id covered by a completed flush.
    last_flushed: u64,
    burst_depth: u32,
    flushing: bool,
}

/// Process-wide (per engine) scheduler. Cheap to clone; all clones share
/// state.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerState>>,
}

/// Flow-tagged flush trigger returned by `mark_change_detection`.
#[derive(Clone)]
pub struct FlushHandle {
    scheduler: Option<Scheduler>,
    flow: u64,
    cancelled: Rc<RefCell<bool>>,
}

impl FlushHandle {
    fn noop() -> Self {
        FlushHandle {
            scheduler: None,
            flow: 0,
            cancelled: Rc::new(RefCell::new(false)),
        }
    }

    /// Permanently disarm this handle.
    pub fn cancel(&self) {
        *self.cancelled.borrow_mut() = true;
    }

    /// Trigger the flush for this handle's burst. Exactly one invocation per
    /// burst flushes; the rest are no-ops.
    pub fn invoke(&self) -> Result<()> {
        let scheduler = match &self.scheduler {
            Some(scheduler) => scheduler,
            None => return Ok(()),
        };
        if *self.cancelled.borrow() {
            return Ok(());
        }
        {
            let state = scheduler.inner.borrow();
            if state.flushing || state.burst_depth > 0 {
                return Ok(());
            }
            if self.flow <= state.last_flushed {
                return Ok(()); // Stale or duplicate within a flushed burst.
            }
        }
        scheduler.flush()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    /// Register a pending root and return its flush handle. During a flush,
    /// nested mutations are already covered by the running pass and get a
    /// no-op handle.
    pub fn mark_change_detection(&self, reference: &BindingReference) -> FlushHandle {
        let mut state = self.inner.borrow_mut();
        if state.flushing {
            return FlushHandle::noop();
        }
        state.flow += 1;
        let flow = state.flow;

        // Ancestor subsumption: an already-pending ancestor absorbs the
        // registration; registering an ancestor evicts its descendants.
        let already_covered = state
            .pending
            .iter()
            .any(|pending| pending.is_same_or_ancestor_of(reference));
        if !already_covered {
            state
                .pending
                .retain(|pending| !reference.is_same_or_ancestor_of(pending));
            state.pending.push(reference.clone());
        }

        FlushHandle {
            scheduler: Some(self.clone()),
            flow,
            cancelled: Rc::new(RefCell::new(false)),
        }
    }

    /// Open a burst: `set_state` inside only marks, deferring the flush to
    /// the outermost trigger.
    pub fn enter_burst(&self) {
        self.inner.borrow_mut().burst_depth += 1;
    }

    pub fn leave_burst(&self) {
        let mut state = self.inner.borrow_mut();
        state.burst_depth = state.burst_depth.saturating_sub(1);
    }

    pub fn in_burst(&self) -> bool {
        self.inner.borrow().burst_depth > 0
    }

    pub fn is_flushing(&self) -> bool {
        self.inner.borrow().flushing
    }

    pub fn pending_len(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    pub fn reset(&self) {
        let mut state = self.inner.borrow_mut();
        state.pending.clear();
        state.burst_depth = 0;
        state.flushing = false;
        state.last_flushed = state.flow;
    }

    /// Run detection on every pending root in registration order, then clear
    /// pending state. A throwing root aborts the remainder of the pass.
    fn flush(&self) -> Result<()> {
        let roots = {
            let mut state = self.inner.borrow_mut();
            if state.flushing {
                return Ok(());
            }
            state.flushing = true;
            state.last_flushed = state.flow;
            std::mem::take(&mut state.pending)
        };
        log::trace!("flush: {} pending root(s)", roots.len());

        let mut result = Ok(());
        for root in roots {
            result = root.detect_changes(true);
            if result.is_err() {
                break;
            }
        }
        self.inner.borrow_mut().flushing = false;
        result
    }
}
