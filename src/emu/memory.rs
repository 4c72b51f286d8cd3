use super::{EResult, EmuError};

/// Size of both the program and the data address space.
pub const MEMORY_SIZE: usize = 0x10000;

/// A flat 64 KiB address space. Addresses are `u16`, so every access is in
/// bounds and wraps naturally.
#[derive(Clone)]
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Memory {
    /// Creates a new [`Memory`] instance, allocating and initializing it to [0u8; 65536].
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.bytes[addr as usize]
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.bytes[addr as usize] = value;
    }

    /// Copies `image` to the start of memory, leaving the rest untouched.
    ///
    /// # Errors
    ///
    /// This function will return an error if `image` is larger than the address space.
    pub fn load(&mut self, image: &[u8]) -> EResult<()> {
        if image.len() > MEMORY_SIZE {
            return Err(EmuError::ProgramTooLarge { len: image.len() });
        }
        self.bytes[..image.len()].copy_from_slice(image);
        Ok(())
    }

    /// Zeroes every byte.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
