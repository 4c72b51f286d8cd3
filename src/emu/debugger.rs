use std::{cell::RefCell, fmt::Write};

use anyhow::{anyhow, Result};
use easy_repl::{command, repl::LoopStatus, CommandStatus, Repl};
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::{digit1, hex_digit1},
    combinator::{all_consuming, map_res},
    sequence::preceded,
    IResult,
};

use crate::plat::Register;

use super::emulator::{Mcu, McuState};

fn hex_literal(inp: &str) -> IResult<&str, u16> {
    map_res(
        preceded(alt((tag("$"), tag_no_case("0x"))), hex_digit1),
        |digits| u16::from_str_radix(digits, 16),
    )(inp)
}

fn dec_literal(inp: &str) -> IResult<&str, u16> {
    map_res(digit1, str::parse::<u16>)(inp)
}

/// Parses `$1F`, `0x1F` or `31`.
pub fn parse_address(inp: &str) -> Result<u16> {
    let (_, addr) = all_consuming(alt((hex_literal, dec_literal)))(inp.trim())
        .map_err(|e| anyhow!("invalid address {inp:?}: {e}"))?;
    Ok(addr)
}

/// Renders pc, sp, execution state, the register file and the flags.
pub fn format_state(mcu: &Mcu) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "pc={:04X} sp={:04X} state={:?}",
        mcu.pc(),
        mcu.sp(),
        mcu.state()
    );
    for row in Register::ALL.chunks(4) {
        let cells: Vec<String> = row
            .iter()
            .map(|r| format!("{:>3}={:02X}", r.to_string(), mcu.register(*r)))
            .collect();
        let _ = writeln!(out, "{}", cells.join("  "));
    }
    let _ = write!(
        out,
        "carry={} zero={} interrupt={}",
        mcu.carry(),
        mcu.zero(),
        mcu.interrupts_enabled()
    );
    out
}

/// Interactive debugger over a borrowed processor.
pub struct Debugger<'m> {
    pub mcu: RefCell<&'m mut Mcu>,
}

impl<'m> Debugger<'m> {
    pub fn new(mcu: &'m mut Mcu) -> Self {
        Self {
            mcu: RefCell::new(mcu),
        }
    }

    pub fn repl(&self) -> Result<()> {
        let mut repl = Repl::builder()
            .description("MCU8 Debug REPL")
            .add(
                "c",
                command! {
                    "Continue execution",
                    () => || Ok(CommandStatus::Quit)
                },
            )
            .add(
                "s",
                command! {
                    "Step one instruction",
                    () => || {
                        let mut mcu = self.mcu.borrow_mut();
                        match mcu.step()? {
                            Some(instr) => eprintln!("{instr}"),
                            None => eprintln!("({:?})", mcu.state()),
                        }
                        Ok(CommandStatus::Done)
                    }
                },
            )
            .add(
                "pr",
                command! {
                    "Print registers and flags",
                    () => || {
                        eprintln!("{}", format_state(&self.mcu.borrow()));
                        Ok(CommandStatus::Done)
                    }
                },
            )
            .add(
                "peek",
                command! {
                    "Peek a byte from data memory",
                    (addr:String) => |addr: String| {
                        let addr = parse_address(&addr)?;
                        let val = self.mcu.borrow().data().read(addr);
                        eprintln!("{addr:04X}={val:02X}");
                        Ok(CommandStatus::Done)
                    }
                },
            )
            .add(
                "dis",
                command! {
                    "Disassemble X instructions of program memory",
                    (addr:String, count:usize) => |addr: String, count: usize| {
                        let addr = parse_address(&addr)?;
                        for line in self.mcu.borrow().disassemble_count(addr, count)? {
                            eprintln!("{line}");
                        }
                        Ok(CommandStatus::Done)
                    }
                },
            )
            .add(
                "halt",
                command! {
                    "Stop the processor",
                    () => || {
                        self.mcu.borrow_mut().stop();
                        Ok(CommandStatus::Quit)
                    }
                },
            )
            .build()?;
        eprintln!("MCU8 Debug REPL");
        'repl: loop {
            eprintln!();
            {
                let mcu = self.mcu.borrow();
                match mcu.disassemble_count(mcu.pc(), 1) {
                    Ok(next) => {
                        for line in next {
                            eprintln!("Next instruction:\n{line}");
                        }
                    }
                    Err(e) => eprintln!("Next instruction: {e}"),
                }
            }

            let status = repl.next()?;
            if let LoopStatus::Break = status {
                break 'repl;
            }
            if self.mcu.borrow().state() == McuState::Stopped {
                break 'repl;
            }
        }
        Ok(())
    }
}
