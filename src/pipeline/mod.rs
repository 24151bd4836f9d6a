//! Pipeline stages for crawling pages and transforming their images.
//!
//! Each submodule implements one step so it can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//!  pages ──▶ fetch ──▶ extract ──┐            (crawl phase, tokio)
//!                                ▼
//!                        HashSet<ImageUrl>
//!                                │
//!  fetch ──▶ transform ──▶ store ◀┘            (download phase)
//!  (tokio)   (rayon pool)  (tokio::fs)
//! ```
//!
//! 1. [`fetch`]     — shared HTTP clients and the GET helpers for both phases
//! 2. [`extract`]   — regex over page text → fully-qualified image URLs
//! 3. [`crawl`]     — concurrent fetch + extract over all pages, unioned
//! 4. [`transform`] — decode, resize, grayscale, encode on a CPU pool
//! 5. [`store`]     — file naming and whole-file writes
//! 6. [`download`]  — concurrent fetch → transform → store over all images

pub mod crawl;
pub mod download;
pub mod extract;
pub mod fetch;
pub mod store;
pub mod transform;
