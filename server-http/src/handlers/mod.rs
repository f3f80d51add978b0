pub mod dashboard;
pub mod health;
pub mod live;
pub mod webhooks;

pub use dashboard::{get_analytics, get_billing, get_exchange_rate};
pub use health::health_check;
pub use live::{live_status, stream_live};
pub use webhooks::receive_webhook;
