//! Request and response payloads.
//!
//! Registration uses small JSON documents. Game fields are served as plain
//! text bodies by the server; the parsers for those live in [`game`].

pub mod game;
pub mod session;
