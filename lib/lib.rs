//! media-scan shared library.

/// Caching primitives for media-scan.
pub mod cache;
/// Filesystem abstractions and the metadata cache facade.
pub mod fs;
/// Multi-threaded library-scan driver.
pub mod scan;
