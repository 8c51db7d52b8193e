mod engine;
mod state_machine;
