//! The four-line interrupt controller.
//!
//! Lines are latched by external stimuli and serviced one per step, highest
//! priority first: vblank, button, keyboard, serial.

use std::fmt;

bitflags::bitflags! {
    /// Pending interrupt lines.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Pending: u8 {
        const VBLANK = 1 << 0;
        const BUTTON = 1 << 1;
        const KEYBOARD = 1 << 2;
        const SERIAL = 1 << 3;
    }
}

/// An interrupt source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interrupt {
    VBlank,
    Button,
    Keyboard,
    Serial,
}

impl Interrupt {
    /// Every line, highest priority first.
    pub const PRIORITY: [Interrupt; 4] = [
        Self::VBlank,
        Self::Button,
        Self::Keyboard,
        Self::Serial,
    ];

    /// Program-memory address execution is redirected to when this line is serviced.
    pub const fn vector(self) -> u16 {
        match self {
            Self::VBlank => 0x0010,
            Self::Button => 0x0020,
            Self::Keyboard => 0x0030,
            Self::Serial => 0x0040,
        }
    }

    pub const fn line(self) -> Pending {
        match self {
            Self::VBlank => Pending::VBLANK,
            Self::Button => Pending::BUTTON,
            Self::Keyboard => Pending::KEYBOARD,
            Self::Serial => Pending::SERIAL,
        }
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VBlank => "vblank",
            Self::Button => "button",
            Self::Keyboard => "keyboard",
            Self::Serial => "serial",
        };
        f.write_str(name)
    }
}

/// Pending-line latch with fixed-priority arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptController {
    pending: Pending,
}

impl InterruptController {
    pub const fn new() -> Self {
        Self {
            pending: Pending::empty(),
        }
    }

    pub fn raise(&mut self, irq: Interrupt) {
        self.pending.insert(irq.line());
    }

    pub fn pending(&self) -> Pending {
        self.pending
    }

    pub fn is_pending(&self, irq: Interrupt) -> bool {
        self.pending.contains(irq.line())
    }

    pub fn any_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Removes and returns the highest-priority pending line, leaving the rest latched.
    pub fn take_next(&mut self) -> Option<Interrupt> {
        let irq = Interrupt::PRIORITY
            .into_iter()
            .find(|irq| self.pending.contains(irq.line()))?;
        self.pending.remove(irq.line());
        Some(irq)
    }

    pub fn clear(&mut self) {
        self.pending = Pending::empty();
    }
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}
