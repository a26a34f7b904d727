//! Integration tests for [`KubeStore`](cr_status::KubeStore)
//!
//! # Test Organization
//!
//! - `status_writes`: Stories about writing status through the API server,
//!   including resourceVersion conflicts and deleted resources
//!
//! # Running These Tests
//!
//! ```bash
//! cargo test --test kind -- --ignored --nocapture
//! ```

mod helpers;
mod status_writes;
