//! Dashboard snapshot value and its wire representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time business metrics pushed to dashboard subscribers.
///
/// Built once per tick and never mutated afterwards; subscribers share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessSnapshot {
    #[serde(rename = "updated_at", with = "wire_timestamp")]
    pub generated_at: DateTime<Utc>,
    #[serde(rename = "daily_snapshot")]
    pub daily: DailySnapshot,
    pub inventory_alerts: Vec<InventoryAlert>,
    pub top_performers: Vec<TopPerformer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub today_sales: f64,
    pub yesterday_sales: f64,
    /// Percent change from yesterday, one decimal; 0 without a baseline.
    pub growth: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAlert {
    pub product: String,
    pub current_stock: i64,
    pub min_required: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPerformer {
    pub product: String,
    pub units_sold: i64,
    pub revenue: f64,
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
mod wire_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> BusinessSnapshot {
        BusinessSnapshot {
            generated_at: Utc.with_ymd_and_hms(2024, 5, 2, 14, 3, 9).unwrap(),
            daily: DailySnapshot { today_sales: 40.0, yesterday_sales: 10.0, growth: 300.0 },
            inventory_alerts: vec![InventoryAlert {
                product: "A".to_string(),
                current_stock: 5,
                min_required: 10,
            }],
            top_performers: vec![TopPerformer {
                product: "A".to_string(),
                units_sold: 2,
                revenue: 20.0,
            }],
        }
    }

    #[test]
    fn serializes_to_dashboard_payload() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["updated_at"], "2024-05-02 14:03:09");
        assert_eq!(value["daily_snapshot"]["today_sales"], 40.0);
        assert_eq!(value["daily_snapshot"]["growth"], 300.0);
        assert_eq!(value["inventory_alerts"][0]["product"], "A");
        assert_eq!(value["inventory_alerts"][0]["min_required"], 10);
        assert_eq!(value["top_performers"][0]["units_sold"], 2);
        assert!(value.get("generated_at").is_none());
    }

    #[test]
    fn parses_payload_back() {
        let json = serde_json::to_string(&sample()).unwrap();
        let parsed: BusinessSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample());
    }
}
