// Machine state
mod state;
pub use state::{CondFlag, VmState, MEMORY_MAX, PC_START};

// Program images
mod loader;
pub use loader::{load, load_file};

// Devices
mod device;
pub use device::{BufferConsole, Console, DDR, DSR, KBDR, KBSR, MCR, STATUS_BIT};
pub mod term;

// Execution
mod runtime;
pub use runtime::Vm;

mod error;
pub use error::{LoadError, RunError};
