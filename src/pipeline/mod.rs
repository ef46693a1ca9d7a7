//! Pipeline stages for catalog updates.
//!
//! Each submodule implements exactly one transformation step, keeping every
//! stage independently testable and the service boundary mockable.
//!
//! ## Data Flow
//!
//! ```text
//! urls.txt ──▶ resolve ──▶ download ─┐
//!                                    ├─▶ classify ──▶ catalog ──▶ publish
//! uploads/ ──▶ normalize ────────────┘
//! ```
//!
//! 1. [`intake`]    — discover pending work (URL lines, upload snapshot)
//!    and consume it (truncate list, move on success)
//! 2. [`resolve`]   — turn an arbitrary URL into an image address
//!    (extension fast-path or `og:image` extraction)
//! 3. [`normalize`] — decode, bound, and JPEG-re-encode uploads for the site
//! 4. [`classify`]  — the only external-service stage: image in, parsed
//!    tags out, every failure soft

pub mod classify;
pub mod intake;
pub mod normalize;
pub mod resolve;
