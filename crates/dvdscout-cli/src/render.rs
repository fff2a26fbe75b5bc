//! Plain-text rendering of API responses.

use std::fmt::Write as _;

use crate::types::{JobStarted, SearchJob, Stats, Store};

const DASH: &str = "\u{2014}";

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(DASH)
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        format!("{}...", value.chars().take(max).collect::<String>())
    } else {
        value.to_owned()
    }
}

/// Dashboard: aggregate counts plus the most recent jobs.
pub fn dashboard(stats: &Stats) -> String {
    let mut out = String::new();
    let credits = stats
        .credits_remaining
        .map_or_else(|| "unavailable".to_owned(), |c| c.to_string());

    let _ = writeln!(out, "Total stores:        {}", stats.total_stores);
    let _ = writeln!(out, "Verified stores:     {}", stats.verified_stores);
    let _ = writeln!(out, "Stores with email:   {}", stats.stores_with_emails);
    let _ = writeln!(out, "Credits remaining:   {credits}");
    let _ = writeln!(out, "Active jobs:         {}", stats.active_jobs);

    if !stats.recent_jobs.is_empty() {
        out.push('\n');
        out.push_str("Recent jobs\n");
        out.push_str(&jobs_table(&stats.recent_jobs));
    }
    out
}

/// One row per store.
pub fn stores_table(stores: &[Store]) -> String {
    let mut out = format!(
        "{:<38}{:<32}{:<18}{:<7}{:<32}{:<10}{}\n",
        "ID", "NAME", "CITY", "STATE", "EMAIL", "SOURCE", "VERIFIED"
    );
    for store in stores {
        let _ = writeln!(
            out,
            "{:<38}{:<32}{:<18}{:<7}{:<32}{:<10}{}",
            store.id,
            truncate(&store.name, 28),
            truncate(or_dash(store.city.as_deref()), 15),
            or_dash(store.state.as_deref()),
            truncate(or_dash(store.email.as_deref()), 28),
            store.source,
            if store.verified { "yes" } else { "no" },
        );
    }
    out
}

/// Every field of one store.
pub fn store_detail(store: &Store) -> String {
    let confidence = store
        .email_confidence
        .map_or_else(|| DASH.to_owned(), |c| format!("{:.0}%", c * 100.0));
    let rows = [
        ("ID", store.id.to_string()),
        ("Name", store.name.clone()),
        ("Address", or_dash(store.address.as_deref()).to_owned()),
        ("City", or_dash(store.city.as_deref()).to_owned()),
        ("State", or_dash(store.state.as_deref()).to_owned()),
        ("Phone", or_dash(store.phone.as_deref()).to_owned()),
        ("Website", or_dash(store.website.as_deref()).to_owned()),
        ("Email", or_dash(store.email.as_deref()).to_owned()),
        ("Confidence", confidence),
        ("Source", store.source.clone()),
        ("Source URL", or_dash(store.source_url.as_deref()).to_owned()),
        ("Notes", or_dash(store.notes.as_deref()).to_owned()),
        ("Verified", if store.verified { "yes" } else { "no" }.to_owned()),
        (
            "Created",
            store.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        ),
        (
            "Updated",
            store.updated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        ),
    ];

    let mut out = String::new();
    for (label, value) in rows {
        let _ = writeln!(out, "{label:<12}{value}");
    }
    out
}

/// One row per job, most recent first as returned by the server.
pub fn jobs_table(jobs: &[SearchJob]) -> String {
    let mut out = format!(
        "{:<38}{:<18}{:<11}{:<8}{:<9}{:<18}{}\n",
        "ID", "TYPE", "STATUS", "FOUND", "CREDITS", "CREATED", "ERROR"
    );
    for job in jobs {
        let _ = writeln!(
            out,
            "{:<38}{:<18}{:<11}{:<8}{:<9}{:<18}{}",
            job.id,
            job.job_type,
            job.status,
            job.stores_found,
            job.credits_used,
            job.created_at.format("%Y-%m-%d %H:%M"),
            truncate(or_dash(job.error_message.as_deref()), 40),
        );
    }
    out
}

/// Job detail including its parameters and result summary.
pub fn job_detail(job: &SearchJob) -> String {
    let fmt_time = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map_or_else(
            || DASH.to_owned(),
            |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )
    };

    let mut out = String::new();
    let _ = writeln!(out, "{:<12}{}", "ID", job.id);
    let _ = writeln!(out, "{:<12}{}", "Type", job.job_type);
    let _ = writeln!(out, "{:<12}{}", "Status", job.status);
    let _ = writeln!(out, "{:<12}{}", "Found", job.stores_found);
    let _ = writeln!(out, "{:<12}{}", "Credits", job.credits_used);
    let _ = writeln!(out, "{:<12}{}", "Created", fmt_time(Some(job.created_at)));
    let _ = writeln!(out, "{:<12}{}", "Started", fmt_time(job.started_at));
    let _ = writeln!(out, "{:<12}{}", "Completed", fmt_time(job.completed_at));
    if let Some(message) = &job.error_message {
        let _ = writeln!(out, "{:<12}{message}", "Error");
    }
    let _ = writeln!(out, "{:<12}{}", "Parameters", job.parameters);
    if let Some(results) = &job.results {
        let _ = writeln!(out, "{:<12}{results}", "Results");
    }
    out
}

pub fn job_started(kind: &str, started: &JobStarted) -> String {
    match started.stores_to_process {
        Some(count) => format!(
            "{kind} job {} {} ({count} stores to process)",
            started.job_id, started.status
        ),
        None => format!("{kind} job {} {}", started.job_id, started.status),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn store(name: &str) -> Store {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        Store {
            id: Uuid::nil(),
            name: name.to_owned(),
            address: None,
            city: Some("Austin".to_owned()),
            state: Some("TX".to_owned()),
            phone: None,
            website: Some("https://retroflicks.com".to_owned()),
            email: Some("owner@retroflicks.com".to_owned()),
            email_confidence: Some(0.92),
            source: "directory".to_owned(),
            source_url: None,
            notes: None,
            verified: true,
            created_at: at,
            updated_at: at,
        }
    }

    fn job(status: &str, error: Option<&str>) -> SearchJob {
        SearchJob {
            id: Uuid::nil(),
            job_type: "reddit_search".to_owned(),
            status: status.to_owned(),
            parameters: json!({ "query": "DVD store recommendations" }),
            results: None,
            error_message: error.map(str::to_owned),
            stores_found: 4,
            credits_used: 0,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn dashboard_shows_unavailable_credits() {
        let stats = Stats {
            total_stores: 12,
            verified_stores: 3,
            stores_with_emails: 5,
            credits_remaining: None,
            active_jobs: 1,
            recent_jobs: vec![job("running", None)],
        };
        let out = dashboard(&stats);
        assert!(out.contains("Total stores:        12"));
        assert!(out.contains("Credits remaining:   unavailable"));
        assert!(out.contains("Recent jobs"));
        assert!(out.contains("reddit_search"));
    }

    #[test]
    fn stores_table_has_header_and_rows() {
        let out = stores_table(&[store("Retro Flicks"), store("Tape Town")]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].contains("Retro Flicks"));
        assert!(lines[1].contains("yes"));
    }

    #[test]
    fn long_names_are_truncated() {
        let out = stores_table(&[store(&"X".repeat(60))]);
        assert!(out.contains(&format!("{}...", "X".repeat(28))));
    }

    #[test]
    fn detail_formats_confidence_and_missing_fields() {
        let out = store_detail(&store("Retro Flicks"));
        assert!(out.contains("Confidence  92%"));
        assert!(out.contains(&format!("Address     {DASH}")));
    }

    #[test]
    fn job_detail_includes_error() {
        let out = job_detail(&job("failed", Some("reddit search failed")));
        assert!(out.contains("Status      failed"));
        assert!(out.contains("Error       reddit search failed"));
    }

    #[test]
    fn job_started_mentions_store_count_when_known() {
        let started = JobStarted {
            job_id: Uuid::nil(),
            status: "started".to_owned(),
            stores_to_process: Some(7),
        };
        assert!(job_started("email", &started).ends_with("(7 stores to process)"));
    }
}
