// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod clock;
pub mod config;
pub mod decipher;
pub mod layout;
pub mod level;
pub mod matcher;
pub mod note;
pub mod runtime;
