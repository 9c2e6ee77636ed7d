//! Core library for batchpilot, a batch runner for AI coding-assistant
//! CLIs.
//!
//! A task set (`<name>.tasks.json`) holds tasks with batch/priority
//! ordering, optional dependencies, and durable status. The engine
//! schedules them, renders each task into a prompt file, runs the
//! configured CLI tool under a PTY supervisor with timeout and
//! cancellation handling, sanitizes the captured log, and persists state
//! after every transition.

pub mod config;
pub mod engine;
pub mod error;
pub mod render;
pub mod runner;
pub mod runtime;
pub mod sanitize;
pub mod scheduler;
pub mod task;
