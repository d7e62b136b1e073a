/// Smallest kernel that still hides a face.
pub const MIN_KERNEL: u32 = 5;
pub const DEFAULT_STRENGTH: u32 = 50;

/// Odd-sized smoothing kernel derived from a user supplied strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Kernel(u32);

impl Kernel {
    /// Smallest odd size that is `>= max(5, strength)`.
    pub fn from_strength(strength: u32) -> Kernel {
        let size = strength.max(MIN_KERNEL);
        if size % 2 == 0 {
            Kernel(size + 1)
        } else {
            Kernel(size)
        }
    }

    pub fn size(&self) -> u32 {
        self.0
    }

    /// Gaussian sigma matching a kernel of this size.
    pub fn sigma(&self) -> f32 {
        0.3 * ((self.0 as f32 - 1.) * 0.5 - 1.) + 0.8
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::from_strength(DEFAULT_STRENGTH)
    }
}
