//! HTTP handlers.

mod health;
mod images;
mod requests;
mod ws;

pub use health::health_check;
pub use images::{get_image, upload_image};
pub use requests::{create_request, get_request, submit_response, wait_request};
pub use ws::ws_handler;
