// cli module — argument parsing and display plumbing for the zseek binary.

pub mod args;
pub mod constants;
