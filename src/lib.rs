pub mod error;
pub mod ipc;
pub mod logging;
pub mod selection;
pub mod settings;
