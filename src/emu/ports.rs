//! The 8-bit I/O port space, serviced by application-supplied callbacks.

use rustc_hash::FxHashMap;

/// Reads a byte from a device.
pub type ReadFn = Box<dyn FnMut() -> u8>;
/// Writes a byte to a device.
pub type WriteFn = Box<dyn FnMut(u8)>;

/// The callback pair behind one port. Either half defaults to inert: reads
/// return 0 and writes are discarded.
pub struct IoHandler {
    read: ReadFn,
    write: WriteFn,
}

impl IoHandler {
    pub fn new(read: impl FnMut() -> u8 + 'static, write: impl FnMut(u8) + 'static) -> Self {
        Self {
            read: Box::new(read),
            write: Box::new(write),
        }
    }

    pub fn read_only(read: impl FnMut() -> u8 + 'static) -> Self {
        Self {
            read: Box::new(read),
            ..Self::default()
        }
    }

    pub fn write_only(write: impl FnMut(u8) + 'static) -> Self {
        Self {
            write: Box::new(write),
            ..Self::default()
        }
    }
}

impl Default for IoHandler {
    fn default() -> Self {
        Self {
            read: Box::new(|| 0),
            write: Box::new(|_| {}),
        }
    }
}

impl std::fmt::Debug for IoHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoHandler").finish_non_exhaustive()
    }
}

/// Sparse port table. Unbound ports behave like an inert [`IoHandler`].
#[derive(Debug, Default)]
pub struct PortTable {
    handlers: FxHashMap<u8, IoHandler>,
}

impl PortTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handler` on `port`, replacing any previous binding.
    pub fn bind(&mut self, port: u8, handler: IoHandler) {
        self.handlers.insert(port, handler);
    }

    /// Replaces the read half of `port`, keeping its write half.
    pub fn bind_read(&mut self, port: u8, read: impl FnMut() -> u8 + 'static) {
        self.handlers.entry(port).or_default().read = Box::new(read);
    }

    /// Replaces the write half of `port`, keeping its read half.
    pub fn bind_write(&mut self, port: u8, write: impl FnMut(u8) + 'static) {
        self.handlers.entry(port).or_default().write = Box::new(write);
    }

    pub fn unbind(&mut self, port: u8) -> Option<IoHandler> {
        self.handlers.remove(&port)
    }

    pub fn is_bound(&self, port: u8) -> bool {
        self.handlers.contains_key(&port)
    }

    pub fn read(&mut self, port: u8) -> u8 {
        match self.handlers.get_mut(&port) {
            Some(handler) => (handler.read)(),
            None => 0,
        }
    }

    pub fn write(&mut self, port: u8, value: u8) {
        if let Some(handler) = self.handlers.get_mut(&port) {
            (handler.write)(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[test]
    fn test_unbound_port_is_inert() {
        let mut ports = PortTable::new();
        assert_eq!(ports.read(0x42), 0);
        ports.write(0x42, 0xFF);
        assert!(!ports.is_bound(0x42));
    }

    #[test]
    fn test_bound_port() {
        let written = Rc::new(RefCell::new(Vec::new()));
        let sink = written.clone();
        let mut ports = PortTable::new();
        ports.bind(
            0x10,
            IoHandler::new(|| 0x5A, move |v| sink.borrow_mut().push(v)),
        );
        assert_eq!(ports.read(0x10), 0x5A);
        ports.write(0x10, 1);
        ports.write(0x10, 2);
        ports.write(0x11, 3);
        assert_eq!(*written.borrow(), [1, 2]);
    }

    #[test]
    fn test_half_bindings() {
        let mut ports = PortTable::new();
        ports.bind(0x01, IoHandler::write_only(|_| {}));
        ports.bind_read(0x01, || 0x77);
        assert_eq!(ports.read(0x01), 0x77);

        let mut counter = 0u8;
        ports.bind(
            0x02,
            IoHandler::read_only(move || {
                counter += 1;
                counter
            }),
        );
        assert_eq!(ports.read(0x02), 1);
        assert_eq!(ports.read(0x02), 2);

        assert!(ports.unbind(0x02).is_some());
        assert_eq!(ports.read(0x02), 0);
    }
}
