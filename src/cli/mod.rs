//! # CLI Module
//!
//! Command-line front end for the handler discovery pipeline.
//!
//! ## Commands
//!
//! ### `generate`
//!
//! Run discovery, validation and generation for a program model:
//!
//! ```bash
//! handlergen generate --model handlers.yaml --output src/generated/dispatch.rs
//! ```
//!
//! Options:
//! - `--model <FILE>` - Program model, YAML or JSON (required)
//! - `--output <FILE>` - Where to write the generated source (stdout when omitted)
//! - `--config <FILE>` - Generator configuration, TOML
//! - `--dry-run` - Print the generated source instead of writing it
//! - `--fail-on-error` - Exit 1 and write nothing when any error is reported
//!
//! ### `check`
//!
//! Report diagnostics only; exits 1 when errors are present:
//!
//! ```bash
//! handlergen check --model handlers.yaml --errors-only
//! handlergen check --model handlers.yaml --json
//! ```
//!
//! ### `inspect`
//!
//! Print every request type, its handlers in dispatch order and the chosen shape:
//!
//! ```bash
//! handlergen inspect --model handlers.yaml
//! ```

mod commands;


pub use commands::{execute, render_inspection, run_cli, Cli, Commands};
