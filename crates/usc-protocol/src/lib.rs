//! USC Command Protocol
//!
//! This crate decodes and encodes the compact text protocol used to address
//! devices and their components over a byte-oriented link such as a serial
//! bus. Decoding is streaming: one byte at a time, no blocking and no
//! backtracking, with all storage in a buffer sized at construction.
//!
//! # Protocol Overview
//!
//! ```text
//! command  := "!" device [":" component] ["/" action] ["?" params] ["|" checksum] "$"
//! response := "@" escaped-body "$"
//! ```
//!
//! - **Device**: one to four decimal octets separated by `.`, `-` or `_`,
//!   packed eight bits each. Device `0` is broadcast.
//! - **Component**: up to five decimal digits, `0` when absent.
//! - **Action**: alphanumerics, `-`, `_`, `.` and single `/` separators.
//! - **Params**: `key[=value]` pairs joined by `&`. Values may escape
//!   `\r \n \t \b \\ \& \$ \= \|` with a backslash.
//! - **Checksum**: decimal XOR of every byte from `!` up to the `|`.
//!
//! # Example
//!
//! ```rust,ignore
//! use usc_protocol::{Command, CommandConfig, Status};
//!
//! let mut command = Command::new(CommandConfig::with_address(1));
//! for &byte in b"!1:10/b?t=10$" {
//!     if command.process(byte)? == Status::Complete {
//!         for kv in command.params() {
//!             println!("{} = {:?}", kv.key(), kv.value_str());
//!         }
//!     }
//! }
//! ```

pub mod ascii;
mod codec;
mod command;
mod config;
mod encode;
mod error;
mod handler;
mod keyval;
mod message;
mod params;
mod state;

pub use codec::*;
pub use command::*;
pub use config::*;
pub use encode::*;
pub use error::*;
pub use handler::*;
pub use keyval::*;
pub use message::*;
pub use params::*;
pub use state::*;
