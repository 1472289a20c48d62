mod server;

pub use server::{DEFAULT_DB_FILE, DEFAULT_PORT, ServerConfig};
