mod form;
mod handlers;
mod models;
mod response;
mod state;
mod translate;
mod upload;

pub use handlers::{build_router, run_server};
pub use response::{OUTPUT_FILENAME, REQUEST_ID_HEADER};
pub use state::AppState;
