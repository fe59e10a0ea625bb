//! Pipeline stages for splitting a document and rendering its fragments.
//!
//! Each submodule owns exactly one concern, and no two stages write the
//! same file.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ split ──▶ fragment files ──▶ invoke ──▶ artifacts + manifest
//! (read)   (regex)     (split/*.txt)     (renderer)  (processed/, ledgers)
//! ```
//!
//! 1. [`input`]:     read the source document, mapping I/O failures to typed errors
//! 2. [`split`]:     cut the text on a multi-line regex and publish fragments atomically
//! 3. [`fragment`]:  fragment naming, artifact identifiers, ordinal-sorted discovery
//! 4. [`manifest`]:  append-only record of completed artifact pairs
//! 5. [`renderer`]:  the `Renderer` capability and its external-process implementation
//! 6. [`invoke`]:    render pending fragments one at a time, bounded by a timeout
//! 7. [`failures`]:  NDJSON ledger of renders that did not succeed

pub mod failures;
pub mod fragment;
pub mod input;
pub mod invoke;
pub mod manifest;
pub mod renderer;
pub mod split;
