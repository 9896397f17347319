//! Name normalization and bounded data exports for species pages.
pub mod cli;
pub mod csv_handler;
pub mod details;
pub mod error;
pub mod export;
pub mod locale;
pub mod taxon;
