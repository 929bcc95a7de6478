use crate::commands::db::{upsert_counters, upsert_traffic};
use crate::commands::fetcher::MetricsSource;
use crate::error::LedgerError;
use crate::models::entity::TrackedEntity;
use rusqlite::Connection;

#[derive(Debug, Clone)]
pub struct SyncProgress {
    pub current: usize,
    pub total: usize,
    pub entity: TrackedEntity,
}

#[derive(Debug)]
pub enum EntityOutcome {
    Synced {
        traffic_days: usize,
        snapshot_date: String,
    },
    Failed {
        error: LedgerError,
    },
}

#[derive(Debug, Default)]
pub struct SyncSummary {
    pub results: Vec<(TrackedEntity, EntityOutcome)>,
}

impl SyncSummary {
    pub fn succeeded(&self) -> Vec<&TrackedEntity> {
        self.results
            .iter()
            .filter(|(_, outcome)| matches!(outcome, EntityOutcome::Synced { .. }))
            .map(|(entity, _)| entity)
            .collect()
    }

    pub fn failed(&self) -> Vec<(&TrackedEntity, &LedgerError)> {
        self.results
            .iter()
            .filter_map(|(entity, outcome)| match outcome {
                EntityOutcome::Failed { error } => Some((entity, error)),
                EntityOutcome::Synced { .. } => None,
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.results
            .iter()
            .any(|(_, outcome)| matches!(outcome, EntityOutcome::Failed { .. }))
    }
}

/// Fetch and store every entity in order. A failing entity is recorded and
/// the run moves on to the next one.
pub fn sync_entities<S, F>(
    conn: &Connection,
    source: &S,
    entities: &[TrackedEntity],
    mut emit_progress: F,
) -> SyncSummary
where
    S: MetricsSource + ?Sized,
    F: FnMut(SyncProgress),
{
    let total = entities.len();
    let mut summary = SyncSummary::default();

    for (index, entity) in entities.iter().enumerate() {
        emit_progress(SyncProgress {
            current: index + 1,
            total,
            entity: entity.clone(),
        });

        let outcome = match sync_entity(conn, source, entity) {
            Ok(outcome) => outcome,
            Err(error) => {
                log::error!("{entity} failed: {error}");
                EntityOutcome::Failed { error }
            }
        };
        summary.results.push((entity.clone(), outcome));
    }

    let failed = summary.failed().len();
    log::info!("sync finished: {} succeeded, {failed} failed", total - failed);

    summary
}

fn sync_entity<S>(
    conn: &Connection,
    source: &S,
    entity: &TrackedEntity,
) -> Result<EntityOutcome, LedgerError>
where
    S: MetricsSource + ?Sized,
{
    // Traffic first, then counters.
    let traffic = source.fetch_traffic(entity)?;
    if traffic.is_empty() {
        log::info!("{entity}: upstream returned no traffic days");
    } else {
        upsert_traffic(conn, entity, &traffic)?;
        log::info!("{entity}: wrote {} traffic days", traffic.len());
    }

    let snapshot = source.fetch_counters(entity)?;
    upsert_counters(conn, entity, &snapshot)?;
    log::info!(
        "{entity}: snapshot {} stars={} forks={} watchers={}",
        snapshot.date,
        snapshot.stars,
        snapshot.forks,
        snapshot.watchers
    );

    Ok(EntityOutcome::Synced {
        traffic_days: traffic.len(),
        snapshot_date: snapshot.date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::db::{initialize_schema, latest_counts, load_traffic};
    use crate::models::counters::CounterSnapshot;
    use crate::models::traffic::DailyTrafficRecord;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeSource {
        traffic: HashMap<String, Vec<DailyTrafficRecord>>,
        failing: Vec<String>,
        calls: RefCell<Vec<String>>,
    }

    impl MetricsSource for FakeSource {
        fn fetch_traffic(
            &self,
            entity: &TrackedEntity,
        ) -> crate::error::Result<Vec<DailyTrafficRecord>> {
            self.calls.borrow_mut().push(format!("traffic {entity}"));
            if self.failing.contains(&entity.slug()) {
                return Err(LedgerError::Upstream {
                    status: 404,
                    path: format!("/repos/{entity}/traffic/views"),
                    body: "Not Found".to_string(),
                });
            }
            Ok(self.traffic.get(&entity.slug()).cloned().unwrap_or_default())
        }

        fn fetch_counters(&self, entity: &TrackedEntity) -> crate::error::Result<CounterSnapshot> {
            self.calls.borrow_mut().push(format!("counters {entity}"));
            Ok(CounterSnapshot {
                date: "2024-03-05".to_string(),
                stars: 1,
                forks: 2,
                watchers: 3,
            })
        }
    }

    fn memory_store() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        initialize_schema(&conn).expect("schema init");
        conn
    }

    fn entity(owner: &str, repo: &str) -> TrackedEntity {
        TrackedEntity::new(owner, repo).expect("valid entity")
    }

    #[test]
    fn fetches_traffic_before_counters_for_each_entity_in_order() {
        let conn = memory_store();
        let source = FakeSource::default();
        let entities = vec![entity("a", "one"), entity("b", "two")];

        let mut seen = Vec::new();
        let summary = sync_entities(&conn, &source, &entities, |p| seen.push((p.current, p.total)));

        assert_eq!(seen, vec![(1, 2), (2, 2)]);
        assert_eq!(
            *source.calls.borrow(),
            vec!["traffic a/one", "counters a/one", "traffic b/two", "counters b/two"]
        );
        assert!(!summary.has_failures());
    }

    #[test]
    fn empty_traffic_still_writes_snapshot_and_keeps_old_rows() {
        let conn = memory_store();
        let a = entity("a", "one");
        let old = DailyTrafficRecord {
            date: "2024-02-01".to_string(),
            views: 4,
            uniques: 2,
        };
        upsert_traffic(&conn, &a, &[old.clone()]).expect("seed");

        let summary = sync_entities(&conn, &FakeSource::default(), &[a.clone()], |_| {});

        assert_eq!(load_traffic(&conn, &a).expect("load"), vec![old]);
        assert_eq!(latest_counts(&conn).expect("latest").len(), 1);
        assert!(matches!(summary.results[0].1, EntityOutcome::Synced { traffic_days: 0, .. }));
    }

    #[test]
    fn failing_entity_is_isolated_and_reported() {
        let conn = memory_store();
        let a = entity("a", "one");
        let b = entity("b", "broken");
        let c = entity("c", "three");

        let mut source = FakeSource::default();
        source.failing.push(b.slug());
        source.traffic.insert(
            c.slug(),
            vec![DailyTrafficRecord {
                date: "2024-03-01".to_string(),
                views: 5,
                uniques: 2,
            }],
        );

        let summary = sync_entities(&conn, &source, &[a.clone(), b.clone(), c.clone()], |_| {});

        assert!(summary.has_failures());
        assert_eq!(summary.succeeded(), vec![&a, &c]);
        let failed = summary.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, &b);
        assert!(failed[0].1.is_remote());

        let latest: Vec<String> = latest_counts(&conn)
            .expect("latest")
            .into_iter()
            .map(|row| row.entity.slug())
            .collect();
        assert_eq!(latest, vec!["a/one", "c/three"]);
        assert!(load_traffic(&conn, &b).expect("load b").is_empty());
        assert_eq!(load_traffic(&conn, &c).expect("load c").len(), 1);
    }
}
