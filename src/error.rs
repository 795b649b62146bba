use miette::Diagnostic;
use thiserror::Error;

/// Failures while acquiring or placing a program image.
///
/// Every variant is raised before the first word is written, so a failed
/// load leaves machine state as it was.
#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("failed to read program image")]
    #[diagnostic(
        code(load::input_not_found),
        help("check that the file exists and is readable")
    )]
    InputNotFound(#[source] std::io::Error),

    #[error("program image of {words} words at origin 0x{origin:04x} exceeds memory space")]
    #[diagnostic(code(load::input_too_large))]
    InputTooLarge { origin: u16, words: usize },

    #[error("program image is shorter than its 2-byte origin header")]
    #[diagnostic(code(load::image_truncated))]
    ImageTruncated,
}

/// Faults raised during execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    #[error("attempted to execute unimplemented opcode 0b{opcode:04b} at 0x{pc:04x}")]
    #[diagnostic(
        code(run::unimplemented_opcode),
        help("RTI and the reserved opcode are not supported by this machine")
    )]
    UnimplementedOpcode { opcode: u16, pc: u16 },
}
