mod state;
mod types;
