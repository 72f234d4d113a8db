//! Voice interview support: room-name parsing and interviewer context.
//! The voice transport itself lives elsewhere; this module only answers
//! "which application is this room for, and what should the interviewer say".

pub mod context;
pub mod handlers;
pub mod prompts;
pub mod room;
