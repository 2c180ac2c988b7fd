//! Core types - pure abstractions shared across the codebase.

mod mode;
mod state;

pub use mode::BuildMode;
pub use state::{
    begin_update, end_update, is_busy, is_serving, is_shutdown, register_server, set_serving,
    setup_shutdown_handler, wait_while_busy,
};
