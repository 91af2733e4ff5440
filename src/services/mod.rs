pub mod board_state;
pub mod notifier;
pub mod remote_store;
pub mod renderer;
pub mod view_model;
