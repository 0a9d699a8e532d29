mod command_handler;
mod query_handler;

pub use command_handler::PresenceCommandHandler;
pub use query_handler::PresenceQueryHandler;
