use crate::config::{Config, config_path, token_path};
use crate::integrations::timeflip::{self, SyncError};
use crate::models::DailyReport;
use crate::vault::{DailyNoteResolver, FrontmatterStore, NoteResolver, PropertyStore};
use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportScope {
    Today,
    All,
}

#[derive(Clone, Debug)]
pub enum SyncStatus {
    Started(String),
    Finished(String),
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DayOutcome {
    /// No note exists for the date; nothing to reconcile.
    Skipped,
    Applied { written: usize },
}

#[derive(Default, Debug)]
pub struct SyncReport {
    pub days_imported: usize,
    pub days_skipped: usize,
    pub properties_written: usize,
}

impl SyncReport {
    pub fn summary(&self) -> String {
        format!(
            "Days imported {} | Skipped (no note) {} | Properties written {}",
            self.days_imported, self.days_skipped, self.properties_written
        )
    }
}

/// Signs in with the configured credentials and stores the session token.
/// A failed sign-in leaves any previously stored token untouched.
pub fn run_sign_in(config: &Config) -> Result<String, SyncError> {
    if config.account.email.trim().is_empty() || config.account.password.trim().is_empty() {
        return Err(SyncError::Config(format!(
            "Set [account] email and password in {} first.",
            config_path().display()
        )));
    }

    let client = timeflip::build_client(config.api.timeout_seconds)?;
    let token = timeflip::sign_in(
        &client,
        &config.api.base_url,
        &config.account.email,
        &config.account.password,
    )?;
    timeflip::save_token(&token_path(), &token)?;
    Ok("Signed in and stored the session token.".to_string())
}

/// Runs one import on a worker thread. The receiver sees `Started` first,
/// then exactly one terminal signal, sent only after every note write has
/// completed.
pub fn spawn_import(config: Config, scope: ImportScope) -> Receiver<SyncStatus> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let label = match scope {
            ImportScope::Today => "Importing today's TimeFlip report...",
            ImportScope::All => "Importing all TimeFlip reports...",
        };
        let _ = sender.send(SyncStatus::Started(label.to_string()));
        let status =
            run_import(&config, scope).unwrap_or_else(|err| SyncStatus::Failed(err.message()));
        let _ = sender.send(status);
    });
    receiver
}

fn run_import(config: &Config, scope: ImportScope) -> Result<SyncStatus, SyncError> {
    let token = timeflip::load_token(&token_path())?;
    let client = timeflip::build_client(config.api.timeout_seconds)?;
    let resolver = DailyNoteResolver {
        vault: config.vault.clone(),
    };
    let store = FrontmatterStore;
    let delay = Duration::from_millis(config.sync.write_delay_ms);

    match scope {
        ImportScope::Today => {
            let today = Local::now().format("%Y-%m-%d").to_string();
            let reports = timeflip::fetch_daily_reports(
                &client,
                &config.api.base_url,
                &token,
                Some(&today),
                Some(&today),
            )?;
            reconcile_today(&reports, &today, &resolver, &store, delay)
        }
        ImportScope::All => {
            let reports =
                timeflip::fetch_daily_reports(&client, &config.api.base_url, &token, None, None)?;
            let (summary, first_error) = reconcile_all(&reports, &resolver, &store, delay);
            Ok(match first_error {
                None => SyncStatus::Finished(summary.summary()),
                Some(err) => SyncStatus::Failed(format!(
                    "{}. First failure: {}",
                    summary.summary(),
                    err.message()
                )),
            })
        }
    }
}

fn reconcile_today(
    reports: &HashMap<String, DailyReport>,
    today: &str,
    resolver: &dyn NoteResolver,
    store: &dyn PropertyStore,
    delay: Duration,
) -> Result<SyncStatus, SyncError> {
    let Some(report) = reports.get(today) else {
        return Ok(SyncStatus::Finished("No data for today.".to_string()));
    };
    let message = match apply_day(report, resolver, store, delay)? {
        DayOutcome::Skipped => format!("No daily note for {today}; nothing imported."),
        DayOutcome::Applied { written: 0 } => format!("{today} is already up to date."),
        DayOutcome::Applied { written } => {
            format!("Imported {written} task properties for {today}.")
        }
    };
    Ok(SyncStatus::Finished(message))
}

/// A failed day degrades only its own note; remaining days still run. The
/// first failure is reported alongside the aggregate counts.
fn reconcile_all(
    reports: &HashMap<String, DailyReport>,
    resolver: &dyn NoteResolver,
    store: &dyn PropertyStore,
    delay: Duration,
) -> (SyncReport, Option<SyncError>) {
    let mut summary = SyncReport::default();
    let mut first_error = None;

    for report in reports.values() {
        match apply_day(report, resolver, store, delay) {
            Ok(DayOutcome::Skipped) => summary.days_skipped += 1,
            Ok(DayOutcome::Applied { written }) => {
                summary.days_imported += 1;
                summary.properties_written += written;
            }
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    (summary, first_error)
}

/// Brings one note's task-minute properties in line with a daily report.
///
/// Cycles run strictly sequentially: the next task's read never starts
/// before the previous write has completed and the delay has elapsed. The
/// property store gives no same-note ordering guarantee of its own, and
/// overlapping edits corrupt the note's frontmatter.
pub fn apply_day(
    report: &DailyReport,
    resolver: &dyn NoteResolver,
    store: &dyn PropertyStore,
    write_delay: Duration,
) -> Result<DayOutcome, SyncError> {
    let date = NaiveDate::parse_from_str(&report.date_str, "%Y-%m-%d").map_err(|e| {
        SyncError::Malformed(format!("Bad report date {:?}: {e}", report.date_str))
    })?;
    let Some(note) = resolver.resolve(date) else {
        return Ok(DayOutcome::Skipped);
    };

    let active: Vec<_> = report.tasks.iter().filter(|task| task.is_active()).collect();
    let mut written = 0usize;

    for (idx, task) in active.iter().enumerate() {
        let prop_name = format!("{} (min)", task.name);
        let target = task.total_time_min as i64;

        match store.read_property(&note, &prop_name)? {
            Some(value) if value.trim().parse::<i64>().ok() == Some(target) => continue,
            Some(_) => store.update_property(&note, &prop_name, target)?,
            None => store.create_property(&note, &prop_name, target)?,
        }
        written += 1;

        if idx + 1 < active.len() && !write_delay.is_zero() {
            thread::sleep(write_delay);
        }
    }

    Ok(DayOutcome::Applied { written })
}
