pub mod blobs;
pub mod error;
pub mod events;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod routes;

pub use routes::create_router;
