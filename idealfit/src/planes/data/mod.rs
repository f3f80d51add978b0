pub mod analytics;
pub mod billing;
pub mod cache_operations;
pub mod exchange;

pub use analytics::AnalyticsService;
pub use billing::BillingService;
pub use cache_operations::MerchantCache;
pub use exchange::ExchangeRateService;
