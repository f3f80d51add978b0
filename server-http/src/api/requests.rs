use idealfit::domain::AnalyticsFilter;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ShopQuery {
    pub shop: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub shop: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
    pub refresh: Option<String>,
}

impl AnalyticsQuery {
    pub fn force_refresh(&self) -> bool {
        matches!(self.refresh.as_deref(), Some("true" | "1"))
    }

    /// Blank parameters are treated as absent
    pub fn filter(&self) -> AnalyticsFilter {
        let param = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        AnalyticsFilter {
            date_from: param(&self.date_from),
            date_to: param(&self.date_to),
            month: param(&self.month),
            year: param(&self.year),
        }
    }
}
