pub mod builder;
pub mod handler;
pub mod shutdown;

pub use builder::ServerBuilder;
pub use handler::RequestHandler;
pub use shutdown::shutdown_signal;
