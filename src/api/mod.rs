pub mod rest;
pub mod websocket;

pub use rest::{create_rest_router, AppState};
pub use websocket::holders_ws_handler;
