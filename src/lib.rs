// Trellis - composable htmx views for Rust
//
// Views declare their inputs once; trellis binds them from the request,
// lets views call each other within one request, wraps their output in
// htmx-aware containers and merges out-of-band fragments into the final
// response.

// Re-export core functionality
pub use trellis_core::*;

// Re-export optional crates
#[cfg(feature = "testing")]
pub use trellis_testing;
