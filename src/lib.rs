// Library exports for the server binary and integration tests

pub mod config;
pub mod library;
pub mod server;
pub mod stream;

pub use config::Config;
pub use library::LibraryError;
pub use server::create_router;
