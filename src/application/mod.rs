//! # Application Layer
//!
//! Contains the core business logic and orchestration of the bot.
//! This includes the applicant dialog, reviewer fan-out, command routing and the
//! connection supervisor.

pub mod conversation;
pub mod logging;
pub mod review;
pub mod router;
pub mod state;
pub mod supervisor;
pub mod sweeper;
