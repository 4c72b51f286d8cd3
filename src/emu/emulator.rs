use std::{cell::Cell, rc::Rc};

use crate::plat::{Instruction, Register};

use super::{
    alu::{self, AluMode, AluStatus},
    interrupts::{Interrupt, InterruptController, Pending},
    memory::Memory,
    ports::PortTable,
    registers::{Flags, Registers},
    EResult,
};

/// Once wired, writing nonzero enables interrupts and writing 0 disables them.
/// Reads return 1 while interrupts are enabled.
pub const INTERRUPT_ENABLE_PORT: u8 = 0x00;
/// Once wired, reads return the pending lines as a [`Pending`] bit set. Writes are discarded.
pub const INTERRUPT_PENDING_PORT: u8 = 0x01;
/// Port returning the payload of the last [`Mcu::assert_button`], once wired.
pub const BUTTON_STATE_PORT: u8 = 0x02;
/// Port returning the payload of the last [`Mcu::assert_keyboard`], once wired.
pub const KEYBOARD_STATE_PORT: u8 = 0x03;
/// Initial stack pointer: the stack is empty and grows down from the top of data memory.
pub const STACK_TOP: u16 = 0xFFFF;

/// The processor's execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum McuState {
    /// Fetching and executing instructions.
    Running,
    /// Entered by `sleep`. Nothing is fetched until an enabled interrupt is serviced.
    Sleeping,
    /// Entered by `stop`. Every step is a no-op until [`Mcu::reset`].
    Stopped,
}

/// The MCU8 processor: register file, flags, both memories, the stack,
/// the interrupt controller and the port table.
#[derive(Debug)]
pub struct Mcu {
    pub(super) pc: u16,
    pub(super) sp: u16,
    registers: Registers,
    flags: Flags,
    interrupts: InterruptController,
    state: McuState,
    pub(super) program: Memory,
    program_len: usize,
    pub(super) data: Memory,
    ports: PortTable,
    button_state: Rc<Cell<u8>>,
    keyboard_state: Rc<Cell<u8>>,
    control_ports: bool,
}

impl Mcu {
    /// Creates a processor in its reset state with empty program memory.
    pub fn new() -> Self {
        Self {
            pc: 0x0000,
            sp: STACK_TOP,
            registers: Registers::default(),
            flags: Flags::empty(),
            interrupts: InterruptController::new(),
            state: McuState::Running,
            program: Memory::new(),
            program_len: 0,
            data: Memory::new(),
            ports: PortTable::new(),
            button_state: Rc::new(Cell::new(0)),
            keyboard_state: Rc::new(Cell::new(0)),
            control_ports: false,
        }
    }

    /// Copies a raw binary to the start of program memory. Byte `i` lands at address `i`.
    ///
    /// Data memory, registers and flags are left alone.
    ///
    /// # Errors
    ///
    /// This function will return an error if the binary is larger than 65536 bytes.
    pub fn load_program(&mut self, binary: &[u8]) -> EResult<()> {
        self.program.load(binary)?;
        self.program_len = binary.len();
        log::debug!("loaded {} byte program", binary.len());
        Ok(())
    }

    /// Returns the processor to its power-on state. Program memory and port
    /// bindings survive; everything else is cleared.
    pub fn reset(&mut self) {
        self.pc = 0x0000;
        self.sp = STACK_TOP;
        self.registers.clear();
        self.data.clear();
        self.flags = Flags::empty();
        self.interrupts.clear();
        self.button_state.set(0);
        self.keyboard_state.set(0);
        self.set_state(McuState::Running);
    }

    /// Steps `n` times, stopping early only on error.
    ///
    /// # Errors
    ///
    /// This function will return an error if an illegal opcode is fetched.
    pub fn steps(&mut self, n: u32) -> EResult<()> {
        for _ in 0..n {
            self.step()?;
        }
        Ok(())
    }

    /// Services at most one pending interrupt, then fetches and executes one
    /// instruction unless the processor is stopped or sleeping.
    ///
    /// Returns the executed instruction, or `None` if nothing was fetched.
    ///
    /// # Errors
    ///
    /// This function will return an error if the byte at `pc` is not an assigned
    /// opcode. Only that byte is consumed.
    pub fn step(&mut self) -> EResult<Option<Instruction>> {
        if self.state == McuState::Stopped {
            return Ok(None);
        }

        if self.flags.contains(Flags::INTERRUPT) {
            if let Some(irq) = self.interrupts.take_next() {
                self.service(irq);
            }
        }

        if self.state == McuState::Sleeping {
            return Ok(None);
        }

        let addr = self.pc;
        let instr = self.fetch().map_err(|e| {
            log::warn!("{e} at {addr:#06x}");
            e
        })?;
        log::trace!("{addr:04X}: {instr}");
        self.execute(instr);
        Ok(Some(instr))
    }

    fn service(&mut self, irq: Interrupt) {
        log::debug!("servicing {irq} interrupt, pc={:#06x}", self.pc);
        if self.state == McuState::Sleeping {
            self.set_state(McuState::Running);
        }
        self.flags.remove(Flags::INTERRUPT);
        self.push_u16(self.pc);
        self.pc = irq.vector();
    }

    fn fetch(&mut self) -> EResult<Instruction> {
        let program = &self.program;
        let pc = &mut self.pc;
        let instr = Instruction::decode(|| {
            let byte = program.read(*pc);
            *pc = pc.wrapping_add(1);
            byte
        })?;
        Ok(instr)
    }

    fn execute(&mut self, instr: Instruction) {
        match instr {
            Instruction::Nop | Instruction::Break => {}
            Instruction::Stop => self.set_state(McuState::Stopped),
            Instruction::Sleep => self.set_state(McuState::Sleeping),
            Instruction::Ei => self.flags.insert(Flags::INTERRUPT),
            Instruction::Di => self.flags.remove(Flags::INTERRUPT),
            Instruction::Sec => self.flags.insert(Flags::CARRY),
            Instruction::Sez => self.flags.insert(Flags::ZERO),
            Instruction::Clc => self.flags.remove(Flags::CARRY),
            Instruction::Clz => self.flags.remove(Flags::ZERO),

            Instruction::Add(dst, src) => self.alu(AluMode::Add, dst, self.registers[src]),
            Instruction::Addc(dst, src) => self.alu(AluMode::AddCarry, dst, self.registers[src]),
            Instruction::Sub(dst, src) => self.alu(AluMode::Sub, dst, self.registers[src]),
            Instruction::Subc(dst, src) => self.alu(AluMode::SubCarry, dst, self.registers[src]),
            Instruction::Inc(dst) => self.alu(AluMode::Add, dst, 1),
            Instruction::Dec(dst) => self.alu(AluMode::Sub, dst, 1),
            Instruction::And(dst, src) => self.alu(AluMode::And, dst, self.registers[src]),
            Instruction::Or(dst, src) => self.alu(AluMode::Or, dst, self.registers[src]),
            Instruction::Xor(dst, src) => self.alu(AluMode::Xor, dst, self.registers[src]),
            Instruction::Cmp(r0, r1) => self.compare(self.registers[r0], self.registers[r1]),
            Instruction::Cmpi(reg, imm) => self.compare(self.registers[reg], imm),

            Instruction::Jmp(addr) => self.pc = addr,
            Instruction::Call(addr) => {
                self.push_u16(self.pc);
                self.pc = addr;
            }
            Instruction::Ret => self.pc = self.pop_u16(),
            Instruction::Reti => {
                self.flags.insert(Flags::INTERRUPT);
                self.pc = self.pop_u16();
            }
            Instruction::Brc(addr) => self.branch_if(self.flags.contains(Flags::CARRY), addr),
            Instruction::Brnc(addr) => self.branch_if(!self.flags.contains(Flags::CARRY), addr),
            Instruction::Brz(addr) => self.branch_if(self.flags.contains(Flags::ZERO), addr),
            Instruction::Brnz(addr) => self.branch_if(!self.flags.contains(Flags::ZERO), addr),

            Instruction::Mov(dst, src) => self.registers[dst] = self.registers[src],
            Instruction::Ldi(dst, imm) => self.registers[dst] = imm,
            Instruction::Ld(dst, addr) => self.registers[dst] = self.data.read(addr),
            Instruction::St(src, addr) => self.data.write(addr, self.registers[src]),
            Instruction::Lpm(dst, addr) => self.registers[dst] = self.program.read(addr),
            Instruction::Ldd(dst, ptr) => {
                let addr = self.registers.address(ptr.high, ptr.low);
                self.registers[dst] = self.data.read(addr);
            }
            Instruction::Std(src, ptr) => {
                let addr = self.registers.address(ptr.high, ptr.low);
                self.data.write(addr, self.registers[src]);
            }
            Instruction::Lpmd(dst, ptr) => {
                let addr = self.registers.address(ptr.high, ptr.low);
                self.registers[dst] = self.program.read(addr);
            }
            Instruction::Push(src) => self.push_u8(self.registers[src]),
            Instruction::Pop(dst) => {
                let value = self.pop_u8();
                self.registers[dst] = value;
            }
            Instruction::In(dst, port) => {
                // unbound ports read as 0, so the destination is always overwritten
                let value = match self.control_read(port) {
                    Some(value) => value,
                    None => self.ports.read(port),
                };
                self.registers[dst] = value;
            }
            Instruction::Out(src, port) => {
                let value = self.registers[src];
                if !self.control_write(port, value) {
                    self.ports.write(port, value);
                }
            }
        }
    }

    fn control_read(&self, port: u8) -> Option<u8> {
        if !self.control_ports {
            return None;
        }
        match port {
            INTERRUPT_ENABLE_PORT => Some(self.interrupts_enabled() as u8),
            INTERRUPT_PENDING_PORT => Some(self.interrupts.pending().bits()),
            _ => None,
        }
    }

    fn control_write(&mut self, port: u8, value: u8) -> bool {
        if !self.control_ports {
            return false;
        }
        match port {
            INTERRUPT_ENABLE_PORT => {
                self.set_interrupts_enabled(value != 0);
                true
            }
            INTERRUPT_PENDING_PORT => true,
            _ => false,
        }
    }

    fn alu(&mut self, mode: AluMode, dst: Register, right: u8) {
        let carry_in = self.flags.contains(Flags::CARRY);
        let (result, status) = alu::compute(mode, self.registers[dst], right, carry_in);
        self.registers[dst] = result;
        self.set_status(status);
    }

    fn compare(&mut self, left: u8, right: u8) {
        let (_, status) = alu::compute(AluMode::Sub, left, right, false);
        self.set_status(status);
    }

    fn set_status(&mut self, status: AluStatus) {
        self.flags.set(Flags::CARRY, status.contains(AluStatus::CARRY));
        self.flags.set(Flags::ZERO, status.contains(AluStatus::ZERO));
    }

    fn branch_if(&mut self, cond: bool, addr: u16) {
        if cond {
            self.pc = addr;
        }
    }

    fn set_state(&mut self, state: McuState) {
        if self.state != state {
            log::debug!("{:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /* Stimuli */

    /// Latches an interrupt line. It is serviced once interrupts are enabled.
    pub fn raise(&mut self, irq: Interrupt) {
        self.interrupts.raise(irq);
    }

    pub fn assert_vblank(&mut self) {
        self.raise(Interrupt::VBlank);
    }

    /// Latches the button line and remembers `state` for [`BUTTON_STATE_PORT`].
    pub fn assert_button(&mut self, state: u8) {
        self.button_state.set(state);
        self.raise(Interrupt::Button);
    }

    /// Latches the keyboard line and remembers `key` for [`KEYBOARD_STATE_PORT`].
    pub fn assert_keyboard(&mut self, key: u8) {
        self.keyboard_state.set(key);
        self.raise(Interrupt::Keyboard);
    }

    pub fn assert_serial(&mut self) {
        self.raise(Interrupt::Serial);
    }

    /// Binds read handlers on [`BUTTON_STATE_PORT`] and [`KEYBOARD_STATE_PORT`]
    /// returning the last button and keyboard payloads, and routes
    /// [`INTERRUPT_ENABLE_PORT`] and [`INTERRUPT_PENDING_PORT`] to the
    /// interrupt controller. The control ports take precedence over any
    /// handler bound on the same port.
    pub fn wire_input_ports(&mut self) {
        self.control_ports = true;
        let button = Rc::clone(&self.button_state);
        self.ports.bind_read(BUTTON_STATE_PORT, move || button.get());
        let key = Rc::clone(&self.keyboard_state);
        self.ports.bind_read(KEYBOARD_STATE_PORT, move || key.get());
    }

    /* Accessors */

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn sp(&self) -> u16 {
        self.sp
    }

    pub fn register(&self, reg: Register) -> u8 {
        self.registers[reg]
    }

    pub fn set_register(&mut self, reg: Register, value: u8) {
        self.registers[reg] = value;
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn carry(&self) -> bool {
        self.flags.contains(Flags::CARRY)
    }

    pub fn zero(&self) -> bool {
        self.flags.contains(Flags::ZERO)
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.flags.contains(Flags::INTERRUPT)
    }

    pub fn set_interrupts_enabled(&mut self, enabled: bool) {
        self.flags.set(Flags::INTERRUPT, enabled);
    }

    pub fn pending(&self) -> Pending {
        self.interrupts.pending()
    }

    pub fn state(&self) -> McuState {
        self.state
    }

    /// Forces the stopped state, as if `stop` had executed.
    pub fn stop(&mut self) {
        self.set_state(McuState::Stopped);
    }

    pub fn program(&self) -> &Memory {
        &self.program
    }

    /// Length of the last loaded binary.
    pub fn program_len(&self) -> usize {
        self.program_len
    }

    pub fn data(&self) -> &Memory {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Memory {
        &mut self.data
    }

    pub fn ports(&self) -> &PortTable {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut PortTable {
        &mut self.ports
    }
}

impl Default for Mcu {
    fn default() -> Self {
        Self::new()
    }
}
