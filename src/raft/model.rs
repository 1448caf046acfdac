pub mod log;
pub mod state;
pub mod state_machine;
