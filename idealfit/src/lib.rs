//! In-process cache and live-version notification core for the IdealFit
//! Shopify app.
//!
//! The data plane serves recomputable resources (analytics, billing, the
//! USD/INR rate) read-through from a TTL store. The control plane carries
//! change signals: webhooks invalidate shop caches and bump a per-shop live
//! version that dashboards poll or stream.

pub mod clock;
pub mod domain;
pub mod events;
pub mod keys;
pub mod planes;
pub mod ports;

#[cfg(test)]
mod test_support;
