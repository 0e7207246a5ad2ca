//! Wall-clock access for the scheduler and commands.

pub mod source;
