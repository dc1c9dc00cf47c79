//! Last-writer-wins merge of entity collections.
//!
//! Both sides of the protocol use the same rule: concatenate the collections
//! (older side first), then keep one entity per `id`, replacing the kept copy
//! only when a later one has a strictly greater effective timestamp.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::document::{CloudDocument, PushPayload, INITIAL_VERSION, UNKNOWN_DEVICE_ID};
use crate::models::Entity;
use crate::util::{iso_timestamp, normalize_text_option};

/// Effective timestamp of an entity with no usable `updatedAt`/`createdAt`.
pub const MISSING_TIMESTAMP: i64 = i64::MIN;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO-8601 date or date-time into milliseconds since the epoch.
///
/// Values without an offset are read as UTC; a bare date is UTC midnight.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.timestamp_millis());
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc().timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
}

/// `updatedAt` when parseable, else `createdAt` when parseable, else
/// [`MISSING_TIMESTAMP`].
pub fn effective_timestamp(entity: &Entity) -> i64 {
    entity
        .updated_at()
        .and_then(parse_timestamp)
        .or_else(|| entity.created_at().and_then(parse_timestamp))
        .unwrap_or(MISSING_TIMESTAMP)
}

/// Result of deduplicating one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deduped {
    pub entities: Vec<Entity>,
    /// Entities dropped for lacking a usable `id`
    pub skipped: usize,
}

/// Keep one entity per `id`, in first-seen order.
///
/// A later entity replaces the kept one only when its effective timestamp is
/// strictly greater, so ties (including two untimestamped copies) keep the
/// entity seen first.
pub fn dedupe_by_id(entities: impl IntoIterator<Item = Entity>) -> Deduped {
    let mut kept: Vec<(Entity, i64)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0;

    for entity in entities {
        let Some(id) = entity.id().map(str::to_owned) else {
            skipped += 1;
            continue;
        };
        let timestamp = effective_timestamp(&entity);

        match positions.entry(id) {
            Entry::Occupied(slot) => {
                let current = &mut kept[*slot.get()];
                if timestamp > current.1 {
                    *current = (entity, timestamp);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(kept.len());
                kept.push((entity, timestamp));
            }
        }
    }

    Deduped {
        entities: kept.into_iter().map(|(entity, _)| entity).collect(),
        skipped,
    }
}

/// A merged document ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub document: CloudDocument,
    pub skipped: usize,
}

/// Merge a pushed payload into the stored document (if any).
///
/// Existing entities come first, so an incoming copy only wins when it is
/// strictly newer. The version restarts at 1 when nothing was stored.
pub fn merge_document(
    existing: Option<CloudDocument>,
    payload: &PushPayload,
    now: DateTime<Utc>,
) -> MergeOutcome {
    let version = existing
        .as_ref()
        .map_or(INITIAL_VERSION, |document| document.version.saturating_add(1));
    let (bookings, services, users) = existing
        .map(|document| (document.bookings, document.services, document.users))
        .unwrap_or_default();

    let bookings = dedupe_by_id(bookings.into_iter().chain(payload.bookings.iter().cloned()));
    let services = dedupe_by_id(services.into_iter().chain(payload.services.iter().cloned()));
    let users = dedupe_by_id(users.into_iter().chain(payload.users.iter().cloned()));
    let skipped = bookings.skipped + services.skipped + users.skipped;

    let device_id = normalize_text_option(payload.device_id.clone())
        .unwrap_or_else(|| UNKNOWN_DEVICE_ID.to_string());

    MergeOutcome {
        document: CloudDocument {
            bookings: bookings.entities,
            services: services.entities,
            users: users.entities,
            last_modified: iso_timestamp(now),
            version,
            device_id,
        },
        skipped,
    }
}

/// How a pulled collection changed the local one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionUpdate {
    /// Cloud records that did not exist locally
    pub inserted: usize,
    /// Local records replaced by a newer cloud copy
    pub updated: usize,
    /// Records dropped for lacking a usable `id`
    pub skipped: usize,
}

impl CollectionUpdate {
    pub const fn changed(&self) -> bool {
        self.inserted > 0 || self.updated > 0
    }
}

/// Merge pulled cloud entities into a local collection (upsert).
pub fn merge_pulled(local: Vec<Entity>, cloud: &[Entity]) -> (Vec<Entity>, CollectionUpdate) {
    let before: HashMap<String, Entity> = local
        .iter()
        .filter_map(|entity| entity.id().map(|id| (id.to_owned(), entity.clone())))
        .collect();

    let merged = dedupe_by_id(local.into_iter().chain(cloud.iter().cloned()));

    let mut update = CollectionUpdate {
        skipped: merged.skipped,
        ..CollectionUpdate::default()
    };
    for entity in &merged.entities {
        let Some(id) = entity.id() else { continue };
        match before.get(id) {
            None => update.inserted += 1,
            Some(previous) if previous != entity => update.updated += 1,
            Some(_) => {}
        }
    }

    (merged.entities, update)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn booking(id: &str, updated_at: &str, amount: i64) -> Entity {
        Entity::new(id)
            .with_field("updatedAt", updated_at)
            .with_field("totalAmount", amount)
    }

    fn ids(entities: &[Entity]) -> Vec<&str> {
        entities.iter().filter_map(Entity::id).collect()
    }

    #[test]
    fn parse_timestamp_accepts_dates_and_datetimes() {
        let midnight = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-01"), Some(midnight.timestamp_millis()));
        assert_eq!(
            parse_timestamp("2024-01-01T00:00:00.000Z"),
            Some(midnight.timestamp_millis())
        );
        assert_eq!(
            parse_timestamp("2024-01-01T01:00:00+01:00"),
            Some(midnight.timestamp_millis())
        );
        assert_eq!(
            parse_timestamp("2024-01-01T00:00:00"),
            Some(midnight.timestamp_millis())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn effective_timestamp_falls_back_to_created_at() {
        let created_only = Entity::new("s1").with_field("createdAt", "2024-01-02");
        assert_eq!(
            effective_timestamp(&created_only),
            parse_timestamp("2024-01-02").unwrap()
        );

        let garbage_updated = Entity::new("s1")
            .with_field("updatedAt", "not a date")
            .with_field("createdAt", "2024-01-02");
        assert_eq!(
            effective_timestamp(&garbage_updated),
            parse_timestamp("2024-01-02").unwrap()
        );

        assert_eq!(effective_timestamp(&Entity::new("s1")), MISSING_TIMESTAMP);
    }

    #[test]
    fn dedupe_keeps_latest_in_either_order() {
        let older = booking("b1", "2024-01-01T00:00:00Z", 10);
        let newer = booking("b1", "2024-01-02T00:00:00Z", 20);

        let forward = dedupe_by_id(vec![older.clone(), newer.clone()]);
        let backward = dedupe_by_id(vec![newer.clone(), older]);

        assert_eq!(forward.entities, vec![newer.clone()]);
        assert_eq!(backward.entities, vec![newer]);
    }

    #[test]
    fn dedupe_keeps_first_on_tie_and_when_untimestamped() {
        let first = booking("b1", "2024-01-01T00:00:00Z", 1);
        let second = booking("b1", "2024-01-01T00:00:00Z", 2);
        assert_eq!(dedupe_by_id(vec![first.clone(), second]).entities, vec![first]);

        let bare_a = Entity::new("b2").with_field("note", "a");
        let bare_b = Entity::new("b2").with_field("note", "b");
        assert_eq!(dedupe_by_id(vec![bare_a.clone(), bare_b]).entities, vec![bare_a]);
    }

    #[test]
    fn dedupe_compares_updated_at_with_created_at_fallback() {
        let created_only = Entity::new("s1")
            .with_field("createdAt", "2024-01-05")
            .with_field("name", "created");
        let updated_earlier = Entity::new("s1")
            .with_field("updatedAt", "2024-01-03T00:00:00Z")
            .with_field("name", "updated");

        assert_eq!(
            dedupe_by_id(vec![created_only.clone(), updated_earlier.clone()]).entities,
            vec![created_only.clone()]
        );
        assert_eq!(
            dedupe_by_id(vec![updated_earlier, created_only.clone()]).entities,
            vec![created_only.clone()]
        );

        let updated_later = Entity::new("s1").with_field("updatedAt", "2024-01-10");
        assert_eq!(
            dedupe_by_id(vec![created_only, updated_later.clone()]).entities,
            vec![updated_later]
        );
    }

    #[test]
    fn dedupe_keys_on_exact_id() {
        let result = dedupe_by_id(vec![Entity::new("b1"), Entity::new(" b1")]);
        assert_eq!(ids(&result.entities), vec!["b1", " b1"]);
        assert_eq!(result.skipped, 0);
    }

    #[test]
    fn dedupe_preserves_first_seen_order() {
        let result = dedupe_by_id(vec![
            booking("b1", "2024-01-01", 1),
            booking("b2", "2024-01-01", 1),
            booking("b1", "2024-02-01", 2),
            booking("b3", "2024-01-01", 1),
        ]);
        assert_eq!(ids(&result.entities), vec!["b1", "b2", "b3"]);
        assert_eq!(result.entities[0].get("totalAmount"), Some(&json!(2)));
    }

    #[test]
    fn dedupe_skips_entities_without_id() {
        let result = dedupe_by_id(vec![
            Entity::default().with_field("name", "orphan"),
            Entity::new("  "),
            Entity::new("u1"),
        ]);
        assert_eq!(ids(&result.entities), vec!["u1"]);
        assert_eq!(result.skipped, 2);
    }

    #[test]
    fn first_write_produces_version_one() {
        let payload = PushPayload {
            bookings: vec![Entity::new("b1")],
            device_id: Some("device_a".to_string()),
            ..PushPayload::default()
        };
        let now = at("2024-03-01T10:00:00Z");

        let outcome = merge_document(None, &payload, now);

        assert_eq!(outcome.document.version, 1);
        assert_eq!(outcome.document.device_id, "device_a");
        assert_eq!(outcome.document.last_modified, "2024-03-01T10:00:00.000Z");
        assert_eq!(outcome.skipped, 0);
    }

    #[test]
    fn newer_push_replaces_stored_booking_and_bumps_version() {
        let stored = CloudDocument {
            bookings: vec![booking("b1", "2024-01-01T00:00:00Z", 10)],
            services: Vec::new(),
            users: Vec::new(),
            last_modified: "2024-01-01T00:00:00.000Z".to_string(),
            version: 3,
            device_id: "device_a".to_string(),
        };
        let payload = PushPayload {
            bookings: vec![booking("b1", "2024-01-02T00:00:00Z", 20)],
            device_id: None,
            ..PushPayload::default()
        };

        let outcome = merge_document(Some(stored), &payload, at("2024-01-03T00:00:00Z"));

        assert_eq!(outcome.document.version, 4);
        assert_eq!(outcome.document.device_id, UNKNOWN_DEVICE_ID);
        assert_eq!(outcome.document.bookings.len(), 1);
        assert_eq!(
            outcome.document.bookings[0].get("totalAmount"),
            Some(&json!(20))
        );
    }

    #[test]
    fn untimestamped_push_loses_to_stored_copy() {
        let stored = CloudDocument {
            services: vec![Entity::new("s1")
                .with_field("createdAt", "2024-01-01")
                .with_field("price", 50)],
            bookings: Vec::new(),
            users: Vec::new(),
            last_modified: "2024-01-01T00:00:00.000Z".to_string(),
            version: 1,
            device_id: "device_a".to_string(),
        };
        let payload = PushPayload {
            services: vec![Entity::new("s1").with_field("price", 75)],
            ..PushPayload::default()
        };

        let outcome = merge_document(Some(stored), &payload, at("2024-01-02T00:00:00Z"));

        assert_eq!(outcome.document.services[0].get("price"), Some(&json!(50)));
    }

    #[test]
    fn timestamped_push_replaces_untimestamped_stored_copy() {
        let stored = CloudDocument {
            services: vec![Entity::new("s1").with_field("price", 50)],
            bookings: Vec::new(),
            users: Vec::new(),
            last_modified: "2024-01-01T00:00:00.000Z".to_string(),
            version: 2,
            device_id: "device_a".to_string(),
        };
        let payload = PushPayload {
            services: vec![Entity::new("s1")
                .with_field("createdAt", "2020-01-01")
                .with_field("price", 75)],
            ..PushPayload::default()
        };

        let outcome = merge_document(Some(stored), &payload, at("2024-01-02T00:00:00Z"));

        assert_eq!(outcome.document.services.len(), 1);
        assert_eq!(outcome.document.services[0].get("price"), Some(&json!(75)));
        assert_eq!(outcome.document.version, 3);
    }

    #[test]
    fn record_count_is_union_of_distinct_ids() {
        // A = 3 stored, B = 3 incoming, K = 2 shared
        let stored = CloudDocument {
            users: vec![Entity::new("u1"), Entity::new("u2"), Entity::new("u3")],
            bookings: Vec::new(),
            services: Vec::new(),
            last_modified: "2024-01-01T00:00:00.000Z".to_string(),
            version: 7,
            device_id: "device_a".to_string(),
        };
        let payload = PushPayload {
            users: vec![Entity::new("u2"), Entity::new("u3"), Entity::new("u4")],
            ..PushPayload::default()
        };

        let outcome = merge_document(Some(stored), &payload, Utc::now());

        assert_eq!(outcome.document.record_count().users, 4);
        assert_eq!(ids(&outcome.document.users), vec!["u1", "u2", "u3", "u4"]);
    }

    #[test]
    fn merge_pulled_upserts_and_counts() {
        let local = vec![
            booking("b1", "2024-01-01", 10),
            booking("b2", "2024-03-01", 5),
        ];
        let cloud = vec![
            booking("b1", "2024-02-01", 20),
            booking("b2", "2024-01-01", 1),
            booking("b3", "2024-01-01", 30),
        ];

        let (merged, update) = merge_pulled(local, &cloud);

        assert_eq!(ids(&merged), vec!["b1", "b2", "b3"]);
        assert_eq!(merged[0].get("totalAmount"), Some(&json!(20)));
        assert_eq!(merged[1].get("totalAmount"), Some(&json!(5)));
        assert_eq!(
            update,
            CollectionUpdate {
                inserted: 1,
                updated: 1,
                skipped: 0
            }
        );
        assert!(update.changed());
    }

    #[test]
    fn merge_pulled_without_changes_reports_nothing() {
        let local = vec![booking("b1", "2024-01-01", 10)];
        let (merged, update) = merge_pulled(local.clone(), &local);
        assert_eq!(merged, local);
        assert!(!update.changed());
    }
}
