/* 📖 # What is the Platform Abstraction Layer?

The PAL is the trait-based store the index engine reads and writes through.
MockPal gives deterministic in-memory tests, RealPal works on a directory tree
and reports changes through `notify`.
*/

mod file_path;
pub mod mock;
pub mod real_pal;
mod traits;

pub use file_path::FilePath;
pub use mock::MockPal;
pub use real_pal::RealPal;
pub use traits::{
    DirEntry, EntryKind, FileChangeCallback, FileChangeEvent, Pal, PalHandle, ReadSeek,
    WatchRegistration,
};
