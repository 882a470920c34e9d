pub mod handlers;
pub mod routes;
pub mod search;
pub mod stream;
pub mod swarms;

pub use routes::create_router;
