//! Compact source-location tables for an embedded ECMAScript bytecode VM.
//!
//! The bytecode emitter feeds a [`LineInfoRecorder`] with one event per
//! position-affecting emission. When a function finishes compiling,
//! [`finalize`] reconciles the recorded events against the emitter's
//! post-compaction [`OffsetTable`] and packs them into an exact-size,
//! immutable [`LineInfo`] buffer. At runtime, [`locate`] maps any bytecode
//! offset back to its `(line, column)` without allocating.
//!
//! ```
//! use ecma_lineinfo::{finalize, LineInfoRecorder, OffsetTable};
//!
//! let mut recorder = LineInfoRecorder::new();
//! recorder.append(0, 1, 1);
//! recorder.append(12, 2, 5);
//! let info = finalize(recorder, &OffsetTable::identity());
//! assert_eq!(info.locate(3), (1, 1));
//! assert_eq!(info.locate(13), (2, 5));
//! ```

pub mod difference;
pub mod dump;
pub mod error;
pub mod layout;
pub mod pack;
pub mod recorder;
pub mod table;
pub mod vlq;

pub use error::LineInfoError;
pub use layout::OffsetTable;
pub use pack::finalize;
pub use recorder::LineInfoRecorder;
pub use table::{locate, LineInfo, COLUMN_DEFAULT};
