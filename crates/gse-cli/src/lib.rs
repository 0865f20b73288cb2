pub mod case;
pub mod cli;
