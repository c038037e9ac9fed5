//! Diagnostic events, zero-cost when the `tracing` feature is disabled.
//!
//! The pipeline reports progress as flat events (one per view, level, or
//! merge) rather than spans, so a single macro covers every call site. With
//! the feature off the field values are still evaluated and discarded, which
//! keeps disabled builds warning-free without conditional compilation at the
//! call sites.

/// Emit an info-level diagnostic event with optional fields.
#[cfg(feature = "tracing")]
macro_rules! diag {
    ($name:expr $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(name: $name $(, $key = $value)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! diag {
    ($name:expr $(, $key:ident = $value:expr)* $(,)?) => {{
        let _ = ($($value,)*);
    }};
}

pub(crate) use diag;
