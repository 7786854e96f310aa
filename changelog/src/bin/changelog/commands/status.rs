use anyhow::{Context, Result};
use changelog::{ChangelogEntry, ChangelogStore, ChangesetRef};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color as TableColor, Table};
use serde::Serialize;

use crate::context::ManifestContext;
use crate::printer::{Printer, Report, Tone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangesetState {
    Applied,
    Pending,
    Disabled,
    /// Recorded in the changelog but no longer listed in the manifest
    Unlisted,
}

impl ChangesetState {
    fn label(self) -> &'static str {
        match self {
            ChangesetState::Applied => "applied",
            ChangesetState::Pending => "pending",
            ChangesetState::Disabled => "disabled",
            ChangesetState::Unlisted => "unlisted",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRow {
    pub name: String,
    pub state: ChangesetState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_executed: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl StatusRow {
    fn from_entry(entry: &ChangelogEntry, state: ChangesetState) -> Self {
        Self {
            name: entry.name.clone(),
            state,
            author: Some(entry.author.clone()),
            date_executed: Some(entry.date_executed),
            fingerprint: Some(entry.fingerprint.clone()),
        }
    }

    fn unapplied(name: &str, state: ChangesetState) -> Self {
        Self {
            name: name.to_string(),
            state,
            author: None,
            date_executed: None,
            fingerprint: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub database: String,
    pub collection: String,
    pub changesets: Vec<StatusRow>,
}

impl StatusReport {
    /// Merge the manifest's ordered list with the persisted entries.
    ///
    /// Manifest changesets come first, in manifest order; entries the manifest
    /// no longer mentions follow in execution order.
    pub fn build(
        database: &str,
        collection: &str,
        manifest: &[ChangesetRef],
        mut entries: Vec<ChangelogEntry>,
    ) -> Self {
        entries.sort_by_key(|entry| entry.date_executed);

        let mut changesets: Vec<StatusRow> = manifest
            .iter()
            .map(|changeset| match entries.iter().find(|e| e.name == changeset.name) {
                Some(entry) => StatusRow::from_entry(entry, ChangesetState::Applied),
                None if changeset.enabled => StatusRow::unapplied(&changeset.name, ChangesetState::Pending),
                None => StatusRow::unapplied(&changeset.name, ChangesetState::Disabled),
            })
            .collect();

        changesets.extend(
            entries
                .iter()
                .filter(|entry| !manifest.iter().any(|c| c.name == entry.name))
                .map(|entry| StatusRow::from_entry(entry, ChangesetState::Unlisted)),
        );

        Self {
            database: database.to_string(),
            collection: collection.to_string(),
            changesets,
        }
    }

    pub fn count(&self, state: ChangesetState) -> usize {
        self.changesets.iter().filter(|row| row.state == state).count()
    }
}

impl Report for StatusReport {
    fn table(&self, printer: &Printer) -> Table {
        let mut table = printer.table(&["Changeset", "State", "Author", "Executed", "Fingerprint"]);

        for row in &self.changesets {
            let mut state = Cell::new(row.state.label());
            if printer.color {
                state = state.fg(match row.state {
                    ChangesetState::Applied => TableColor::Green,
                    ChangesetState::Pending => TableColor::Yellow,
                    ChangesetState::Disabled => TableColor::DarkGrey,
                    ChangesetState::Unlisted => TableColor::Magenta,
                });
            }

            table.add_row(vec![
                Cell::new(&row.name),
                state,
                Cell::new(row.author.as_deref().unwrap_or("")),
                Cell::new(
                    row.date_executed
                        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default(),
                ),
                Cell::new(row.fingerprint.as_deref().unwrap_or("")),
            ]);
        }

        table
    }

    fn compact(&self) -> String {
        format!(
            "applied={} pending={} disabled={} unlisted={}",
            self.count(ChangesetState::Applied),
            self.count(ChangesetState::Pending),
            self.count(ChangesetState::Disabled),
            self.count(ChangesetState::Unlisted)
        )
    }
}

pub async fn run(ctx: &ManifestContext, printer: &Printer) -> Result<()> {
    let configuration = ctx.configuration()?;
    let mut store = ctx.connect().await?;
    printer.debug(&format!("connected to `{}`", store.database()));

    let entries = store.list_entries(&ctx.collection).await;
    store.close().await.context("Failed to close Redis connection")?;
    let entries = entries.with_context(|| format!("Failed to read collection `{}`", ctx.collection))?;

    let manifest = ctx.manifest.changesets.as_deref().unwrap_or_default();
    let report = StatusReport::build(&configuration.database_name, &ctx.collection, manifest, entries);

    printer.title(&format!("{}/{}", report.database, report.collection));
    if report.changesets.is_empty() {
        printer.line(Tone::Info, "No changesets listed or applied");
        return Ok(());
    }
    printer.report(&report)?;

    match report.count(ChangesetState::Pending) {
        0 => printer.line(Tone::Ok, "Changelog is up to date"),
        pending => printer.line(Tone::Warn, &format!("{pending} changeset(s) pending")),
    }
    let unlisted = report.count(ChangesetState::Unlisted);
    if unlisted > 0 {
        printer.line(Tone::Info, &format!("{unlisted} applied changeset(s) are not in the manifest"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(name: &str, minute: u32) -> ChangelogEntry {
        ChangelogEntry {
            name: name.to_string(),
            author: "John".to_string(),
            date_executed: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap(),
            fingerprint: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
        }
    }

    #[test]
    fn test_report_merges_manifest_and_entries() {
        let manifest = [
            ChangesetRef::new("initDB"),
            ChangesetRef::new("addAppAdminUsers"),
            ChangesetRef::disabled("seedDemoData"),
        ];
        let entries = vec![entry("legacyImport", 5), entry("initDB", 1)];

        let report = StatusReport::build("app", "databasechangelog", &manifest, entries);

        let states: Vec<_> = report.changesets.iter().map(|r| (r.name.as_str(), r.state)).collect();
        assert_eq!(
            states,
            [
                ("initDB", ChangesetState::Applied),
                ("addAppAdminUsers", ChangesetState::Pending),
                ("seedDemoData", ChangesetState::Disabled),
                ("legacyImport", ChangesetState::Unlisted),
            ]
        );
        assert_eq!(report.compact(), "applied=1 pending=1 disabled=1 unlisted=1");
    }

    #[test]
    fn test_disabled_but_applied_reports_applied() {
        let manifest = [ChangesetRef::disabled("initDB")];
        let report = StatusReport::build("app", "databasechangelog", &manifest, vec![entry("initDB", 1)]);
        assert_eq!(report.count(ChangesetState::Applied), 1);
    }

    #[test]
    fn test_json_skips_missing_fields() {
        let manifest = [ChangesetRef::new("initDB")];
        let report = StatusReport::build("app", "databasechangelog", &manifest, Vec::new());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["changesets"][0], serde_json::json!({"name": "initDB", "state": "pending"}));
    }
}
