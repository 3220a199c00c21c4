// HTTP surface: read-only JSON API over the store, the cache hub and the
// refresher's live snapshot.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use server::ApiServer;
