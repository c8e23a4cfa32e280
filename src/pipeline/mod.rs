//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! Each submodule implements one step. Only [`runner`] spawns processes,
//! and it does so behind the [`runner::ProcessRunner`] trait so every other
//! stage can be tested with a scripted fake.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ probe ──▶ fonts ──▶ invocation ──▶ runner
//! (paths)  (--version) (fc-list)  (pure argv)   (pandoc + verify)
//! ```
//!
//! 1. [`input`]  — validate the Markdown input and the output path
//! 2. [`probe`]  — confirm the converter and engine start, record versions
//! 3. [`fonts`]  — choose the CJK font preset for engines that load system fonts
//! 4. [`invocation`] — build the exact, deterministic argument list
//! 5. [`runner`] — run it, classify the outcome, verify the PDF exists
//!
//! [`demo`] holds the built-in Japanese sample document.

pub mod demo;
pub mod fonts;
pub mod input;
pub mod invocation;
pub mod probe;
pub mod runner;
