//! Document and clock fixtures

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use lake_core::{DateResolver, NaturalDateParser};
use serde_json::{Value, json};

/// Wednesday 2030-05-15 08:30 UTC, far enough ahead that "future" checks
/// against the system clock would also pass
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 5, 15, 8, 30, 0)
        .single()
        .expect("valid reference time")
}

/// Date resolver pinned to [`reference_time`]
pub fn fixed_dates() -> Arc<dyn DateResolver> {
    Arc::new(NaturalDateParser::at(reference_time()))
}

/// A minimal `article` document
pub fn article(id: &str, title: &str) -> Value {
    json!({
        "_id": id,
        "_type": "article",
        "title": title,
    })
}
