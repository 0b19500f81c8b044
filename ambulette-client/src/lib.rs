pub mod app_config;
pub mod http;
pub mod session;

pub use app_config::Config;
pub use http::ApiClient;
pub use session::AdminSession;
