pub mod state;

pub use state::PlayerState;
