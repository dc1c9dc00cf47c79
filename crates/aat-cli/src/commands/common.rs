use aat_core::document::{PushAck, RecordCount};
use aat_core::local::{LocalSnapshot, PullSummary};
use aat_core::merge::parse_timestamp;
use aat_core::models::{Booking, Collection, Entity, Service, User};
use aat_core::sync::{SyncStats, SyncStatus};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PullReport {
    pub version: u64,
    pub last_modified: String,
    pub device_id: String,
    pub inserted: usize,
    pub updated: usize,
    pub saved: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub device_id: String,
    pub backend: String,
    #[serde(flatten)]
    pub status: SyncStatus,
}

pub fn format_record_count(count: &RecordCount) -> String {
    format!(
        "{} bookings, {} services, {} users",
        count.bookings, count.services, count.users
    )
}

pub fn format_push_lines(ack: &PushAck) -> Vec<String> {
    let mut lines = vec![
        format!("{} (version {})", ack.message, ack.version),
        format!("Cloud now holds {}", format_record_count(&ack.record_count)),
    ];
    if ack.skipped > 0 {
        lines.push(format!("Skipped {} entities without an id", ack.skipped));
    }
    lines
}

pub fn format_pull_lines(report: &PullReport, summary: &PullSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Pulled version {} from {} ({})",
        report.version,
        report.device_id,
        format_sync_time(&report.last_modified, Utc::now().timestamp_millis())
    )];

    if !summary.changed() {
        lines.push("Local snapshot already up to date".to_string());
        return lines;
    }

    for (name, update) in [
        ("bookings", summary.bookings),
        ("services", summary.services),
        ("users", summary.users),
    ] {
        if update.changed() {
            lines.push(format!(
                "  {name}: {} new, {} updated",
                update.inserted, update.updated
            ));
        }
    }
    if !report.saved {
        lines.push("Dry run: local snapshot left unchanged".to_string());
    }
    lines
}

pub fn format_status_lines(report: &StatusReport) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    let status = &report.status;
    let mut lines = vec![
        format!("Device:     {}", report.device_id),
        format!("Backend:    {}", report.backend),
        format!("Connected:  {}", yes_no(status.is_connected)),
        format!(
            "Last sync:  {}",
            status
                .last_sync
                .as_deref()
                .map_or_else(|| "never".to_string(), |raw| format_sync_time(raw, now_ms))
        ),
    ];
    if status.sync_in_progress {
        lines.push("Sync in progress".to_string());
    }
    if let Some(error) = &status.error {
        lines.push(format!("Error:      {error}"));
    }
    lines
}

pub fn format_stats_lines(stats: &SyncStats) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    vec![
        format!("Records:    {}", stats.total_records),
        format!("Version:    {}", stats.cloud_version),
        format!(
            "Modified:   {}",
            stats
                .last_sync_time
                .as_deref()
                .map_or_else(|| "unknown".to_string(), |raw| format_sync_time(raw, now_ms))
        ),
    ]
}

pub fn format_snapshot_lines(snapshot: &LocalSnapshot) -> Vec<String> {
    if snapshot.is_empty() {
        return vec!["Local snapshot is empty".to_string()];
    }
    vec![format!(
        "Local snapshot: {}",
        format_record_count(&snapshot.record_count())
    )]
}

/// One line per entity, grouped by collection. Entities that do not decode
/// into their typed view are listed by id only.
pub fn format_entity_lines(snapshot: &LocalSnapshot) -> Vec<String> {
    let mut lines = Vec::new();
    for collection in Collection::ALL {
        let entities = snapshot.collection(collection);
        if entities.is_empty() {
            continue;
        }
        lines.push(format!("{collection} ({}):", entities.len()));
        for entity in entities {
            let line = describe_entity(collection, entity)
                .unwrap_or_else(|| format!("{} (unreadable)", entity.id().unwrap_or("<no id>")));
            lines.push(format!("  {line}"));
        }
    }
    lines
}

fn describe_entity(collection: Collection, entity: &Entity) -> Option<String> {
    match collection {
        Collection::Bookings => {
            let booking: Booking = entity.decode().ok()?;
            Some(format!(
                "{} {} on {} [{:?}] total {:.2}, due {:.2}",
                booking.id,
                booking.guest_name,
                booking.booking_date,
                booking.status,
                booking.total_amount,
                booking.balance_due()
            ))
        }
        Collection::Services => {
            let service: Service = entity.decode().ok()?;
            Some(format!(
                "{} {} {:.2} {}",
                service.id,
                service.name,
                service.price,
                service.currency_code()
            ))
        }
        Collection::Users => {
            let user: User = entity.decode().ok()?;
            Some(format!(
                "{} {} <{}> [{:?}]",
                user.id, user.name, user.email, user.role
            ))
        }
    }
}

/// `raw` followed by a relative age when it parses as a timestamp.
pub fn format_sync_time(raw: &str, now_ms: i64) -> String {
    parse_timestamp(raw).map_or_else(
        || raw.to_string(),
        |timestamp_ms| format!("{raw}, {}", format_relative_time(timestamp_ms, now_ms)),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}

pub const fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
