//! Output generation and delivery.
//!
//! # Submodules
//!
//! - [`digest`]: renders a [`Digest`](crate::models::Digest) into subject + text body
//! - [`json`]: writes a JSON snapshot of the digest
//! - [`dispatch`]: delivers the rendered digest (file or stdout)
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 2025-05-06_morning.txt   # To/Subject envelope + digest body
//! └── 2025-05-06_morning.json  # articles and per-source counters
//! ```

pub mod digest;
pub mod dispatch;
pub mod json;
