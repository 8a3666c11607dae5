//! Library surface of the irobf CLI; the binary in `main.rs` is a thin
//! wrapper over [`commands`].

pub mod commands;
