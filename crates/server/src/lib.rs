//! HTTP surface for vodpipe: media API, signed blob uploads, live
//! processing updates over server-sent events and Prometheus metrics.

pub mod api;
pub mod metrics;
pub mod state;
