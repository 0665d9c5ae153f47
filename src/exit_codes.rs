//! Process exit codes shared by every subcommand.

/// No violations, or a command that completed normally
pub const SUCCESS: i32 = 0;
/// At least one diagnostic was reported
pub const VIOLATIONS_FOUND: i32 = 1;
/// Configuration, I/O or usage failure
pub const TOOL_ERROR: i32 = 2;

pub mod exit {
    use super::*;

    pub fn violations_found() -> ! {
        std::process::exit(VIOLATIONS_FOUND)
    }

    pub fn tool_error() -> ! {
        std::process::exit(TOOL_ERROR)
    }
}
