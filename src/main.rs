use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use mcu8::{
    asm::ExternalAssembler,
    emu::{
        debugger::{format_state, Debugger},
        emulator::{Mcu, McuState},
    },
    Instruction,
};
use simplelog::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "mcu8")]
#[command(about = "Runs or disassembles an MCU8 program", long_about = None)]
struct Args {
    /// Raw binary to load, or assembly source when --assembler is given
    program: PathBuf,

    /// Assemble PROGRAM with this command first
    #[arg(long, env = "MCU8_ASSEMBLER")]
    assembler: Option<String>,

    /// Where the assembler writes the binary (default: PROGRAM with a .bin extension)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Run exactly this many steps instead of running until stopped
    #[arg(short = 'n', long)]
    steps: Option<u32>,

    /// Upper bound on steps when running until stopped
    #[arg(long, default_value_t = 1_000_000)]
    max_steps: u64,

    /// Print a listing of the loaded program and exit
    #[arg(short, long, action = ArgAction::SetTrue)]
    disassemble: bool,

    /// With --disassemble, walk all of program memory
    #[arg(long, action = ArgAction::SetTrue, requires = "disassemble")]
    full: bool,

    /// Enter the debugger whenever `break` executes
    #[arg(long, action = ArgAction::SetTrue)]
    debug: bool,

    /// More log output (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// No log output
    #[arg(short, long, action = ArgAction::SetTrue, conflicts_with = "verbose")]
    quiet: bool,
}

fn level(args: &Args) -> LevelFilter {
    if args.quiet {
        return LevelFilter::Off;
    }
    match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        #[cfg(debug_assertions)]
        _ => LevelFilter::Trace,
        #[cfg(not(debug_assertions))]
        _ => LevelFilter::Debug,
    }
}

fn load(mcu: &mut Mcu, args: &Args) -> Result<()> {
    match &args.assembler {
        Some(cmd) => {
            let mut words = cmd.split_whitespace();
            let program = words.next().context("empty assembler command")?;
            let asm = words.fold(ExternalAssembler::new(program), |asm, w| asm.arg(w));
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| args.program.with_extension("bin"));
            let len = asm
                .assemble_and_load(mcu, &args.program, &output)
                .with_context(|| format!("assembling {}", args.program.display()))?;
            log::info!("assembled {len} bytes into {}", output.display());
        }
        None => {
            let bin = std::fs::read(&args.program)
                .with_context(|| format!("reading {}", args.program.display()))?;
            mcu.load_program(&bin)
                .with_context(|| format!("loading {}", args.program.display()))?;
        }
    }
    Ok(())
}

fn step(mcu: &mut Mcu, debug: bool) -> Result<()> {
    let pc = mcu.pc();
    let executed = mcu
        .step()
        .with_context(|| format!("executing at {pc:04X}"))?;
    if debug && executed == Some(Instruction::Break) {
        Debugger::new(mcu).repl()?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    simplelog::TermLogger::init(
        level(&args),
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let mut mcu = Mcu::new();
    load(&mut mcu, &args)?;

    if args.disassemble {
        let listing = if args.full {
            mcu.disassemble()
        } else {
            mcu.disassemble_program()
        }
        .context("disassembling")?;
        for line in listing {
            println!("{line}");
        }
        return Ok(());
    }

    match args.steps {
        Some(n) => {
            for _ in 0..n {
                step(&mut mcu, args.debug)?;
            }
        }
        None => {
            let mut taken = 0u64;
            while mcu.state() != McuState::Stopped {
                if taken == args.max_steps {
                    log::warn!("step limit of {} reached", args.max_steps);
                    break;
                }
                if mcu.state() == McuState::Sleeping && mcu.pending().is_empty() {
                    log::info!("sleeping with no interrupt pending");
                    break;
                }
                step(&mut mcu, args.debug)?;
                taken += 1;
            }
        }
    }

    println!("{}", format_state(&mcu));
    Ok(())
}
