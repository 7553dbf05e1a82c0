use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

/// Observable state of GPU single-stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuStepState {
    Disabled,
    Armed { flag: i32, data: u32 },
    /// A step was requested but no visible display list panel has acknowledged it yet.
    PendingRearm { data: u32 },
}

/// The stepping flag/data handoff between the UI thread and the GPU path.
///
/// Only [`GpuStep::set`] writes, and it is only called from the UI thread. Only
/// [`GpuStep::acknowledge_pending`] mutates on read, and it is only called from the GPU path.
/// Nothing here takes a lock, so the GPU path never stalls on the UI.
#[derive(Debug)]
pub struct GpuStep {
    stepping: AtomicBool,
    flag: AtomicI32,
    data: AtomicU32,
}

impl GpuStep {
    pub const PENDING_REARM: i32 = -1;

    pub const fn new() -> Self {
        Self {
            stepping: AtomicBool::new(false),
            flag: AtomicI32::new(0),
            data: AtomicU32::new(0),
        }
    }

    /// Overwrites all three fields, nothing is merged with the previous state.
    pub fn set(&self, stepping: bool, flag: i32, data: u32) {
        self.flag.store(flag, Ordering::Relaxed);
        self.data.store(data, Ordering::Relaxed);
        // Published last so a reader that sees `stepping` also sees the flag and data with it.
        self.stepping.store(stepping, Ordering::Release);
    }

    pub fn state(&self) -> GpuStepState {
        if !self.stepping.load(Ordering::Acquire) {
            return GpuStepState::Disabled;
        }

        let data = self.data.load(Ordering::Relaxed);
        match self.flag.load(Ordering::Relaxed) {
            Self::PENDING_REARM => GpuStepState::PendingRearm { data },
            flag => GpuStepState::Armed { flag, data },
        }
    }

    /// One-shot: turns a pending re-arm into an armed step with flag 0. Returns whether it did.
    pub fn acknowledge_pending(&self) -> bool {
        self.stepping.load(Ordering::Acquire)
            && self
                .flag
                .compare_exchange(Self::PENDING_REARM, 0, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
    }
}

impl Default for GpuStep {
    fn default() -> Self {
        Self::new()
    }
}
