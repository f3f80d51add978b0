pub mod live_feed;
pub mod live_versions;
pub mod webhooks;

pub use live_feed::LiveFeed;
pub use live_versions::LiveVersions;
pub use webhooks::{WebhookDispatcher, WebhookOutcome, WebhookTopic};
