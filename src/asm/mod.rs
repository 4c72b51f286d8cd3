//! Bridge to an external MCU8 assembler.
//!
//! The assembler is any program invoked as `program [args..] <source> <output>`
//! that writes a raw binary to `output` and exits 0 on success.

use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

use thiserror::Error;

use crate::emu::{emulator::Mcu, EmuError};

/// An error for the assembler module of MCU8.
#[derive(Debug, Error)]
pub enum AsmError {
    #[error("could not start assembler: {0}")]
    Spawn(#[source] io::Error),
    #[error("assembler exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("assembler produced no readable output at {}", .0.display())]
    MissingOutput(PathBuf),
    #[error("assembled binary could not be loaded: {0}")]
    Load(#[from] EmuError),
}

/// A command line that turns assembly source into a raw binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalAssembler {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl ExternalAssembler {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
        }
    }

    /// Adds an argument placed before the source and output paths.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Runs the assembler on `source` and returns the bytes written to `output`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the command cannot be started,
    /// exits unsuccessfully, or leaves no readable file at `output`.
    pub fn assemble(&self, source: &Path, output: &Path) -> Result<Vec<u8>, AsmError> {
        log::debug!(
            "assembling {} -> {} with {:?}",
            source.display(),
            output.display(),
            self.program
        );
        let out = Command::new(&self.program)
            .args(&self.args)
            .arg(source)
            .arg(output)
            .output()
            .map_err(AsmError::Spawn)?;
        if !out.status.success() {
            return Err(AsmError::Failed {
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        std::fs::read(output).map_err(|_| AsmError::MissingOutput(output.to_path_buf()))
    }

    /// Assembles `source` and loads the result into `mcu`'s program memory.
    ///
    /// # Errors
    ///
    /// Same as [`ExternalAssembler::assemble`], plus [`AsmError::Load`] if the
    /// binary does not fit in program memory.
    pub fn assemble_and_load(
        &self,
        mcu: &mut Mcu,
        source: &Path,
        output: &Path,
    ) -> Result<usize, AsmError> {
        let bin = self.assemble(source, output)?;
        mcu.load_program(&bin)?;
        Ok(bin.len())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::plat::Register::R0;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mcu8-asm-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_copy_as_assembler() {
        let src = scratch("copy.s");
        let out = scratch("copy.bin");
        std::fs::write(&src, [0x31, 0x00, 0x2A, 0x01]).unwrap();

        let mut mcu = Mcu::new();
        let len = ExternalAssembler::new("cp")
            .assemble_and_load(&mut mcu, &src, &out)
            .unwrap();
        assert_eq!(len, 4);
        mcu.steps(2).unwrap();
        assert_eq!(mcu.register(R0), 0x2A);

        let _ = std::fs::remove_file(src);
        let _ = std::fs::remove_file(out);
    }

    #[test]
    fn test_nonzero_exit() {
        let err = ExternalAssembler::new("false")
            .assemble(&scratch("f.s"), &scratch("f.bin"))
            .unwrap_err();
        assert!(matches!(err, AsmError::Failed { .. }));
    }

    #[test]
    fn test_missing_output() {
        let out = scratch("never.bin");
        let err = ExternalAssembler::new("true")
            .assemble(&scratch("t.s"), &out)
            .unwrap_err();
        assert!(matches!(err, AsmError::MissingOutput(p) if p == out));
    }

    #[test]
    fn test_spawn_failure() {
        let err = ExternalAssembler::new("mcu8-no-such-assembler")
            .assemble(&scratch("x.s"), &scratch("x.bin"))
            .unwrap_err();
        assert!(matches!(err, AsmError::Spawn(_)));
    }

    #[test]
    fn test_leading_args() {
        let asm = ExternalAssembler::new("cp").arg("-f");
        assert_eq!(asm.args, [OsString::from("-f")]);
        let src = scratch("args.s");
        let out = scratch("args.bin");
        std::fs::write(&src, [0x00]).unwrap();
        assert_eq!(asm.assemble(&src, &out).unwrap(), [0x00]);
        let _ = std::fs::remove_file(src);
        let _ = std::fs::remove_file(out);
    }
}
