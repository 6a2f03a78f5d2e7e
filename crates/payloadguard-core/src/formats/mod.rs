//! Archive format walkers.

pub mod gzip;
pub mod rar;
pub mod tar;
pub mod traits;
pub mod zip;

// Re-export main types for convenience
pub use gzip::GzipWalker;
pub use rar::RarWalker;
pub use tar::TarWalker;
pub use traits::ArchiveWalker;
pub use zip::ZipWalker;
