//! Time-to-live selection for cached results.
//!
//! The base TTL comes from the query's shape (complex > aggregation > simple > standard)
//! and is scaled by the business-hours or off-hours factor for the local hour.

use chrono::{Local, Timelike};
use sluice_common::config::TtlSettings;
use sluice_sql::{classify, QueryClass};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct TtlPolicy {
    settings: TtlSettings,
}

impl TtlPolicy {
    pub fn new(settings: TtlSettings) -> Self {
        Self { settings }
    }

    /// Unscaled TTL for a query shape.
    pub fn base_for(&self, class: QueryClass) -> Duration {
        let secs = match class {
            QueryClass::Complex => self.settings.complex_secs,
            QueryClass::Aggregation => self.settings.aggregation_secs,
            QueryClass::Simple => self.settings.simple_secs,
            QueryClass::Standard => self.settings.base_secs,
        };
        Duration::from_secs(secs)
    }

    pub fn is_business_hour(&self, hour: u32) -> bool {
        (self.settings.business_start_hour..self.settings.business_end_hour).contains(&hour)
    }

    /// TTL for `sql` as if it ran during local `hour` (0-23).
    pub fn ttl_at(&self, sql: &str, hour: u32) -> Duration {
        let factor = if self.is_business_hour(hour) {
            self.settings.business_hours_factor
        } else {
            self.settings.off_hours_factor
        };
        let base = self.base_for(classify(sql));
        // NaN, negative or overflowing products mean no caching
        Duration::try_from_secs_f64(base.as_secs_f64() * factor).unwrap_or(Duration::ZERO)
    }

    /// TTL for `sql` at the current local time.
    pub fn ttl_for(&self, sql: &str) -> Duration {
        self.ttl_at(sql, Local::now().hour())
    }
}
