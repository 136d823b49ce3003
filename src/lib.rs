//! Discovers RSS/Atom feeds behind arbitrary URLs and merges them into a
//! single time-ordered RSS 2.0 document.

pub mod config;
pub mod feed;
