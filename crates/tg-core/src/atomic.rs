//! Lock-free float cell for parameters shared between the UI and clock threads.

use core::sync::atomic::{AtomicU32, Ordering};

/// An `f32` stored as its bit pattern in an `AtomicU32`.
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_loads() {
        let cell = AtomicF32::new(120.0);
        assert_eq!(cell.load(), 120.0);
        cell.store(-0.25);
        assert_eq!(cell.load(), -0.25);
    }

    #[test]
    fn default_is_zero() {
        assert_eq!(AtomicF32::default().load(), 0.0);
    }
}
