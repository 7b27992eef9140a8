//! Container runtime collaborators for the lifestress harness.
//!
//! The harness only ever talks to a [`backend::ContainerRuntime`]: it
//! acquires a [`backend::ContainerHandle`] by identifier, performs one
//! lifecycle operation on it, and releases it again.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod error;
