/* 📖 # Why have foldex_base as a core library?
foldex_base holds the error type, the tracing setup and the store abstraction (PAL)
that the engine and the CLI share, so neither depends on the other for them.
*/

pub mod error;
mod error_tests;
pub mod pal;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, FoldexError, FoldexResult, ResultExt};
pub use pal::{
    DirEntry, EntryKind, FileChangeCallback, FileChangeEvent, FilePath, MockPal, Pal, PalHandle,
    RealPal, WatchRegistration,
};
