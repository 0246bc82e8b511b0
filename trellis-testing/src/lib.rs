//! Testing utilities for trellis views.
//!
//! - **RequestFactory** - build requests, optionally marked as routed to a view
//! - **MemoryStore** - in-memory data access for model parameters
//! - **CallRecorder** - record the order things happened in
//! - **Assertions** - inspect rendered fragments and responses
//!
//! ## Quick Start
//!
//! ```
//! use trellis_core::prelude::*;
//! use trellis_testing::*;
//!
//! let view = View::builder("app::hello")
//!     .signature(Signature::new().param(Param::query("name")))
//!     .element()
//!     .build(|_, args| Ok(Reply::html(format!("Hi {}", args.get::<String>("name")?))))
//!     .unwrap();
//!
//! let request = RequestFactory::new().get("/").query("name", "Ada").build();
//! let response = view.handle(request).unwrap();
//!
//! assert_status(&response, 200);
//! assert_eq!(root_attr(&response.body_str(), 0, "id").as_deref(), Some("hello"));
//! ```

mod assertions;
mod request_factory;
mod store;

pub use assertions::{
    assert_body_contains, assert_header, assert_json, assert_oob, assert_status, root_attr,
    root_elements, root_ids,
};
pub use request_factory::{RequestFactory, TestRequestBuilder};
pub use store::{CallRecorder, MemoryStore};
