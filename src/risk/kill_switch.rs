//! Kill switch (spec §4.5): a single atomic flag checked before every entry
//! and on every tick, settable from any thread without locking the
//! risk layer's single-writer state.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct KillSwitch(AtomicBool);

impl KillSwitch {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
