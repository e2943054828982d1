//! Boundary decoding of raw backend payloads
//!
//! The backend returns loosely typed JSON. These functions convert it into
//! the strict shapes in `sightline-core` before anything downstream sees
//! it. Absent count fields decode as zero (the backend omits empty
//! buckets); a present field of the wrong type is a validation error.

use serde_json::{Map, Value};
use sightline_core::{
    AiAccuracy, ConsolidatedMetrics, InspectionCounts, RegionalMetric, RevenueMetrics,
    TimeAnalytics, TimeRange, TrendPoint, TrendSeries, UserMetrics, ValidationError,
};

type DecodeResult<T> = Result<T, ValidationError>;

/// Decode the consolidated dashboard metrics payload.
pub fn decode_consolidated(payload: &Value) -> DecodeResult<ConsolidatedMetrics> {
    let root = as_object(payload, "consolidated")?;

    let counts = section(root, "inspection_counts")?;
    let time = section(root, "time_analytics")?;
    let ai = section(root, "ai_metrics")?;
    let users = section(root, "user_metrics")?;
    let revenue = section(root, "revenue_metrics")?;

    Ok(ConsolidatedMetrics {
        inspections: InspectionCounts {
            total: count_field(counts, "inspection_counts.total")?,
            completed: count_field(counts, "inspection_counts.completed")?,
            in_progress: count_field(counts, "inspection_counts.in_progress")?,
            pending: count_field(counts, "inspection_counts.pending")?,
            cancelled: count_field(counts, "inspection_counts.cancelled")?,
        },
        time: TimeAnalytics {
            avg_completion_hours: float_field(time, "time_analytics.avg_completion_hours")?,
            avg_duration_minutes: float_field(time, "time_analytics.avg_duration_minutes")?,
            on_time: count_field(time, "time_analytics.on_time")?,
            late: count_field(time, "time_analytics.late")?,
        },
        ai: AiAccuracy {
            suggestions_total: count_field(ai, "ai_metrics.suggestions_total")?,
            suggestions_accepted: count_field(ai, "ai_metrics.suggestions_accepted")?,
        },
        users: UserMetrics {
            total: count_field(users, "user_metrics.total")?,
            active_last_30d: count_field(users, "user_metrics.active_last_30d")?,
            inspectors: count_field(users, "user_metrics.inspectors")?,
            admins: count_field(users, "user_metrics.admins")?,
        },
        revenue: RevenueMetrics {
            total_cents: cents_field(revenue, "revenue_metrics.total_cents")?,
            this_month_cents: cents_field(revenue, "revenue_metrics.this_month_cents")?,
            outstanding_cents: cents_field(revenue, "revenue_metrics.outstanding_cents")?,
        },
    })
}

/// Decode a trend series payload for the requested range.
///
/// When the payload names a range it must match the requested one; a
/// mismatch means the backend answered a different question.
pub fn decode_trends(payload: &Value, requested: TimeRange) -> DecodeResult<TrendSeries> {
    let root = as_object(payload, "trends")?;

    if let Some(range_value) = root.get("range") {
        let range_str = range_value
            .as_str()
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "trends.range".to_string(),
                reason: "expected string".to_string(),
            })?;
        let parsed = TimeRange::parse(range_str).ok_or_else(|| ValidationError::InvalidValue {
            field: "trends.range".to_string(),
            reason: format!("unknown range {range_str}"),
        })?;
        if parsed != requested {
            return Err(ValidationError::InvalidValue {
                field: "trends.range".to_string(),
                reason: format!("requested {} but got {}", requested.as_str(), range_str),
            });
        }
    }

    let points_value = root
        .get("points")
        .ok_or_else(|| ValidationError::RequiredFieldMissing {
            field: "trends.points".to_string(),
        })?;
    let points_array = points_value
        .as_array()
        .ok_or_else(|| ValidationError::InvalidValue {
            field: "trends.points".to_string(),
            reason: "expected array".to_string(),
        })?;

    let mut points = Vec::with_capacity(points_array.len());
    for (i, point) in points_array.iter().enumerate() {
        let obj = as_object(point, "trends.points[]")?;
        let day = obj
            .get("day")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::RequiredFieldMissing {
                field: format!("trends.points[{i}].day"),
            })?
            .to_string();
        points.push(TrendPoint {
            day,
            inspections: count_field(obj, "trends.points[].inspections")?,
            revenue_cents: cents_field(obj, "trends.points[].revenue_cents")?,
            satisfaction: float_field(obj, "trends.points[].satisfaction")?,
        });
    }

    Ok(TrendSeries {
        range: requested,
        points,
    })
}

/// Decode the regional breakdown payload. Accepts either a bare array or
/// an object with a `regions` array.
pub fn decode_regional(payload: &Value) -> DecodeResult<Vec<RegionalMetric>> {
    let rows = match payload {
        Value::Array(rows) => rows,
        Value::Object(root) => root
            .get("regions")
            .and_then(Value::as_array)
            .ok_or_else(|| ValidationError::RequiredFieldMissing {
                field: "regional.regions".to_string(),
            })?,
        _ => {
            return Err(ValidationError::NotAnObject {
                endpoint: "regional".to_string(),
            })
        }
    };

    let mut out = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = as_object(row, "regional.regions[]")?;
        let region = obj
            .get("region")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::RequiredFieldMissing {
                field: format!("regional.regions[{i}].region"),
            })?
            .to_string();
        out.push(RegionalMetric {
            region,
            inspection_count: count_field(obj, "regional.regions[].inspection_count")?,
            revenue_cents: cents_field(obj, "regional.regions[].revenue_cents")?,
            growth_pct: float_field(obj, "regional.regions[].growth_pct")?,
        });
    }
    Ok(out)
}

// ============================================================================
// FIELD HELPERS
// ============================================================================

fn as_object<'a>(value: &'a Value, endpoint: &str) -> DecodeResult<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| ValidationError::NotAnObject {
        endpoint: endpoint.to_string(),
    })
}

fn section<'a>(root: &'a Map<String, Value>, name: &str) -> DecodeResult<&'a Map<String, Value>> {
    match root.get(name) {
        // An absent section decodes as all zeros.
        None => Ok(EMPTY.get_or_init(Map::new)),
        Some(value) => as_object(value, name),
    }
}

static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();

/// Non-negative count, absent means zero.
fn count_field(obj: &Map<String, Value>, field: &str) -> DecodeResult<u64> {
    let name = field.rsplit('.').next().unwrap_or(field);
    match obj.get(name) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value.as_u64().ok_or_else(|| ValidationError::InvalidValue {
            field: field.to_string(),
            reason: "expected non-negative integer".to_string(),
        }),
    }
}

/// Signed cents amount, absent means zero.
fn cents_field(obj: &Map<String, Value>, field: &str) -> DecodeResult<i64> {
    let name = field.rsplit('.').next().unwrap_or(field);
    match obj.get(name) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value.as_i64().ok_or_else(|| ValidationError::InvalidValue {
            field: field.to_string(),
            reason: "expected integer".to_string(),
        }),
    }
}

/// Float, absent means zero.
fn float_field(obj: &Map<String, Value>, field: &str) -> DecodeResult<f64> {
    let name = field.rsplit('.').next().unwrap_or(field);
    match obj.get(name) {
        None | Some(Value::Null) => Ok(0.0),
        Some(value) => value.as_f64().ok_or_else(|| ValidationError::InvalidValue {
            field: field.to_string(),
            reason: "expected number".to_string(),
        }),
    }
}
