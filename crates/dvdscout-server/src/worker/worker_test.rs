use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dvdscout_core::{JobType, StoreSource};
use dvdscout_sources::{
    AccountInfo, CandidateStore, EmailCandidate, EmailProvider, ListingQuery, ListingSource,
    SourceError,
};

use super::*;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FakeListing {
    name: &'static str,
    candidates: Option<Vec<CandidateStore>>,
}

#[async_trait]
impl ListingSource for FakeListing {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, query: &ListingQuery) -> Result<Vec<CandidateStore>, SourceError> {
        match &self.candidates {
            Some(candidates) => Ok(candidates.iter().take(query.max_results).cloned().collect()),
            None => Err(SourceError::UnexpectedStatus {
                status: 503,
                url: format!("https://{}.test/search", self.name),
            }),
        }
    }
}

struct FakeEmail {
    by_domain: HashMap<&'static str, Vec<EmailCandidate>>,
    reject_key: bool,
}

#[async_trait]
impl EmailProvider for FakeEmail {
    async fn account(&self) -> Result<AccountInfo, SourceError> {
        Ok(AccountInfo {
            credits_remaining: 42,
            plan_name: "Test".to_owned(),
        })
    }

    async fn domain_search(
        &self,
        domain: &str,
        _limit: u32,
    ) -> Result<Vec<EmailCandidate>, SourceError> {
        if self.reject_key {
            return Err(SourceError::Unauthorized {
                service: "fake".to_owned(),
            });
        }
        Ok(self.by_domain.get(domain).cloned().unwrap_or_default())
    }
}

fn candidate(name: &str, city: &str, source: StoreSource) -> CandidateStore {
    CandidateStore {
        name: name.to_owned(),
        city: Some(city.to_owned()),
        source,
        ..CandidateStore::default()
    }
}

fn listing(name: &'static str, candidates: Option<Vec<CandidateStore>>) -> Arc<dyn ListingSource> {
    Arc::new(FakeListing { name, candidates })
}

fn sources(
    directories: Vec<Arc<dyn ListingSource>>,
    forum: Arc<dyn ListingSource>,
    email: Option<Arc<dyn EmailProvider>>,
) -> Arc<Sources> {
    Arc::new(Sources {
        directories,
        forum,
        email,
        email_delay: Duration::ZERO,
    })
}

fn query(max_results: usize) -> ListingQuery {
    ListingQuery {
        query: "DVD store".to_owned(),
        location: Some("Austin, TX".to_owned()),
        max_results,
    }
}

// ---------------------------------------------------------------------------
// Offline
// ---------------------------------------------------------------------------

#[test]
fn job_kind_maps_to_job_type() {
    assert_eq!(
        JobKind::Directory(query(10)).job_type(),
        JobType::DirectorySearch
    );
    assert_eq!(JobKind::Reddit(query(10)).job_type(), JobType::RedditSearch);
    assert_eq!(
        JobKind::Emails { store_ids: vec![] }.job_type(),
        JobType::EmailDiscovery
    );
}

#[test]
fn candidate_conversion_keeps_provenance_and_never_sets_email() {
    let store = candidate_to_new_store(CandidateStore {
        name: "Retro Flicks".to_owned(),
        state: Some("TX".to_owned()),
        website: Some("https://retroflicks.com".to_owned()),
        source: StoreSource::Directory,
        source_url: Some("https://www.yellowpages.com/search".to_owned()),
        ..CandidateStore::default()
    });

    assert_eq!(store.name, "Retro Flicks");
    assert_eq!(store.state.as_deref(), Some("TX"));
    assert_eq!(store.source, StoreSource::Directory);
    assert!(store.source_url.is_some());
    assert!(store.email.is_none());
}

#[test]
fn saturating_i32_caps_large_counts() {
    assert_eq!(saturating_i32(7), 7);
    assert_eq!(saturating_i32(u32::MAX), i32::MAX);
}

#[tokio::test]
async fn enqueue_fails_once_dispatcher_is_gone() {
    let (queue, rx) = JobQueue::detached();
    drop(rx);

    let result = queue.enqueue(JobRequest {
        job_id: Uuid::new_v4(),
        kind: JobKind::Reddit(query(10)),
    });
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Live (Postgres)
// ---------------------------------------------------------------------------

async fn start_job(pool: &PgPool, job_type: JobType) -> Uuid {
    dvdscout_db::create_search_job(pool, job_type, &serde_json::json!({}))
        .await
        .expect("create job")
        .public_id
}

fn context(pool: &PgPool, sources: Arc<Sources>) -> Arc<WorkerContext> {
    Arc::new(WorkerContext {
        pool: pool.clone(),
        sources,
    })
}

#[sqlx::test(migrations = "../../migrations")]
async fn reddit_job_inserts_new_stores_and_completes(pool: PgPool) {
    dvdscout_db::create_store(
        &pool,
        &NewStore {
            name: "Hollywood Video".to_owned(),
            city: Some("Austin".to_owned()),
            ..NewStore::default()
        },
    )
    .await
    .expect("seed store");

    let forum = listing(
        "reddit",
        Some(vec![
            candidate("Eastside DVD", "Austin", StoreSource::Reddit),
            candidate("hollywood video", "Austin", StoreSource::Reddit),
        ]),
    );
    let ctx = context(&pool, sources(vec![], forum, None));
    let job_id = start_job(&pool, JobType::RedditSearch).await;

    let outcome = run_job(
        Arc::clone(&ctx),
        JobRequest {
            job_id,
            kind: JobKind::Reddit(query(100)),
        },
    )
    .await;
    assert_eq!(outcome, Some(JobStatus::Completed));

    let outcome = run_job(
        ctx,
        JobRequest {
            job_id,
            kind: JobKind::Reddit(query(100)),
        },
    )
    .await;
    assert_eq!(outcome, None, "a finished job cannot be claimed again");

    let job = dvdscout_db::get_search_job(&pool, job_id)
        .await
        .expect("get job");
    assert_eq!(job.status, "completed");
    assert_eq!(job.stores_found, 1);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());
    let results = job.results.expect("results");
    assert_eq!(results["duplicates_skipped"], 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn reddit_job_fails_when_source_fails(pool: PgPool) {
    let ctx = context(&pool, sources(vec![], listing("reddit", None), None));
    let job_id = start_job(&pool, JobType::RedditSearch).await;

    run_job(
        ctx,
        JobRequest {
            job_id,
            kind: JobKind::Reddit(query(100)),
        },
    )
    .await;

    let job = dvdscout_db::get_search_job(&pool, job_id)
        .await
        .expect("get job");
    assert_eq!(job.status, "failed");
    assert!(job
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("reddit search failed")));
}

#[sqlx::test(migrations = "../../migrations")]
async fn job_already_claimed_is_left_alone(pool: PgPool) {
    let forum = listing(
        "reddit",
        Some(vec![candidate("Eastside DVD", "Austin", StoreSource::Reddit)]),
    );
    let ctx = context(&pool, sources(vec![], forum, None));
    let job_id = start_job(&pool, JobType::RedditSearch).await;
    dvdscout_db::transition_search_job(&pool, job_id, JobStatus::Running, &JobSummary::default())
        .await
        .expect("claim job");

    let outcome = run_job(
        Arc::clone(&ctx),
        JobRequest {
            job_id,
            kind: JobKind::Reddit(query(100)),
        },
    )
    .await;

    assert_eq!(outcome, None);
    let job = dvdscout_db::get_search_job(&pool, job_id)
        .await
        .expect("get job");
    assert_eq!(job.status, "running");
    assert_eq!(job.stores_found, 0);
    let counts = dvdscout_db::store_counts(&pool).await.expect("counts");
    assert_eq!(counts.total_stores, 0, "the source must not run");

    let missing = run_job(
        ctx,
        JobRequest {
            job_id: Uuid::new_v4(),
            kind: JobKind::Reddit(query(100)),
        },
    )
    .await;
    assert_eq!(missing, None);
}

#[sqlx::test(migrations = "../../migrations")]
async fn directory_job_survives_one_failing_source(pool: PgPool) {
    let ctx = context(
        &pool,
        sources(
            vec![
                listing(
                    "yellow_pages",
                    Some(vec![
                        candidate("Retro Flicks", "Austin", StoreSource::Directory),
                        candidate("Disc Depot", "Austin", StoreSource::Directory),
                        candidate("Tape Town", "Austin", StoreSource::Directory),
                    ]),
                ),
                listing("yelp", None),
            ],
            listing("reddit", Some(vec![])),
            None,
        ),
    );
    let job_id = start_job(&pool, JobType::DirectorySearch).await;

    run_job(
        ctx,
        JobRequest {
            job_id,
            kind: JobKind::Directory(query(4)),
        },
    )
    .await;

    let job = dvdscout_db::get_search_job(&pool, job_id)
        .await
        .expect("get job");
    assert_eq!(job.status, "completed");
    assert_eq!(job.stores_found, 2, "each source gets max_results / 2");
    let results = job.results.expect("results");
    assert!(results["sources"]["yelp"]["error"].is_string());
    assert_eq!(results["sources"]["yellow_pages"]["inserted"], 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn directory_job_fails_when_every_source_fails(pool: PgPool) {
    let ctx = context(
        &pool,
        sources(
            vec![listing("yellow_pages", None), listing("yelp", None)],
            listing("reddit", Some(vec![])),
            None,
        ),
    );
    let job_id = start_job(&pool, JobType::DirectorySearch).await;

    run_job(
        ctx,
        JobRequest {
            job_id,
            kind: JobKind::Directory(query(100)),
        },
    )
    .await;

    let job = dvdscout_db::get_search_job(&pool, job_id)
        .await
        .expect("get job");
    assert_eq!(job.status, "failed");
    assert_eq!(job.stores_found, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn email_job_without_provider_fails(pool: PgPool) {
    let ctx = context(&pool, sources(vec![], listing("reddit", Some(vec![])), None));
    let job_id = start_job(&pool, JobType::EmailDiscovery).await;

    run_job(
        ctx,
        JobRequest {
            job_id,
            kind: JobKind::Emails { store_ids: vec![] },
        },
    )
    .await;

    let job = dvdscout_db::get_search_job(&pool, job_id)
        .await
        .expect("get job");
    assert_eq!(job.status, "failed");
    assert_eq!(
        job.error_message.as_deref(),
        Some("email discovery provider is not configured")
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn email_job_applies_best_address_and_counts_credits(pool: PgPool) {
    let with_site = dvdscout_db::create_store(
        &pool,
        &NewStore {
            name: "Retro Flicks".to_owned(),
            website: Some("https://www.retroflicks.com/about".to_owned()),
            ..NewStore::default()
        },
    )
    .await
    .expect("seed store");
    let no_hits = dvdscout_db::create_store(
        &pool,
        &NewStore {
            name: "Quiet Video".to_owned(),
            website: Some("quietvideo.net".to_owned()),
            ..NewStore::default()
        },
    )
    .await
    .expect("seed store");

    let provider = FakeEmail {
        by_domain: HashMap::from([(
            "retroflicks.com",
            vec![EmailCandidate {
                value: "owner@retroflicks.com".to_owned(),
                confidence: 92,
            }],
        )]),
        reject_key: false,
    };
    let ctx = context(
        &pool,
        sources(vec![], listing("reddit", Some(vec![])), Some(Arc::new(provider))),
    );
    let job_id = start_job(&pool, JobType::EmailDiscovery).await;

    run_job(
        ctx,
        JobRequest {
            job_id,
            kind: JobKind::Emails {
                store_ids: vec![with_site.public_id, no_hits.public_id, Uuid::new_v4()],
            },
        },
    )
    .await;

    let job = dvdscout_db::get_search_job(&pool, job_id)
        .await
        .expect("get job");
    assert_eq!(job.status, "completed");
    assert_eq!(job.credits_used, 1);
    assert_eq!(job.stores_found, 1);

    let store = dvdscout_db::get_store(&pool, with_site.public_id)
        .await
        .expect("get store");
    assert_eq!(store.email.as_deref(), Some("owner@retroflicks.com"));
    assert_eq!(store.email_confidence, Some(0.92));
}

#[sqlx::test(migrations = "../../migrations")]
async fn email_job_fails_on_rejected_key(pool: PgPool) {
    let store = dvdscout_db::create_store(
        &pool,
        &NewStore {
            name: "Retro Flicks".to_owned(),
            website: Some("https://retroflicks.com".to_owned()),
            ..NewStore::default()
        },
    )
    .await
    .expect("seed store");

    let provider = FakeEmail {
        by_domain: HashMap::new(),
        reject_key: true,
    };
    let ctx = context(
        &pool,
        sources(vec![], listing("reddit", Some(vec![])), Some(Arc::new(provider))),
    );
    let job_id = start_job(&pool, JobType::EmailDiscovery).await;

    run_job(
        ctx,
        JobRequest {
            job_id,
            kind: JobKind::Emails {
                store_ids: vec![store.public_id],
            },
        },
    )
    .await;

    let job = dvdscout_db::get_search_job(&pool, job_id)
        .await
        .expect("get job");
    assert_eq!(job.status, "failed");
    assert!(job
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("rejected the API key")));
}

#[sqlx::test(migrations = "../../migrations")]
async fn dispatcher_runs_queued_jobs_to_a_terminal_state(pool: PgPool) {
    let forum = listing(
        "reddit",
        Some(vec![candidate("Eastside DVD", "Austin", StoreSource::Reddit)]),
    );
    let (queue, _handle) = spawn_dispatcher(pool.clone(), sources(vec![], forum, None));
    let job_id = start_job(&pool, JobType::RedditSearch).await;

    queue
        .enqueue(JobRequest {
            job_id,
            kind: JobKind::Reddit(query(100)),
        })
        .expect("enqueue");

    let mut status = String::new();
    for _ in 0..50 {
        status = dvdscout_db::get_search_job(&pool, job_id)
            .await
            .expect("get job")
            .status;
        if status == "completed" || status == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(status, "completed");
}
