use anyhow::Result;
use changelog::{ChangelogError, ChangesetRef, is_configuration_valid};
use comfy_table::Table;
use serde::Serialize;

use crate::context::ManifestContext;
use crate::printer::{Printer, Report, Tone};

/// What a manifest would run, without touching the database
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub manifest: String,
    pub database: Option<String>,
    pub collection: String,
    pub changesets: Vec<ChangesetRef>,
    #[serde(skip)]
    problem: Option<ChangelogError>,
}

impl CheckReport {
    pub fn new(ctx: &ManifestContext) -> Self {
        let manifest = &ctx.manifest;
        // Same order as a run: configuration first, then the task list.
        let problem = if !is_configuration_valid(manifest.database.as_ref()) {
            Some(ChangelogError::IllegalConfiguration)
        } else if manifest.changesets.is_none() {
            Some(ChangelogError::IllegalTaskListFormat)
        } else {
            None
        };

        Self {
            manifest: ctx.manifest_path.display().to_string(),
            database: manifest.database.as_ref().map(|db| db.database_name.clone()),
            collection: ctx.collection.clone(),
            changesets: manifest.changesets.clone().unwrap_or_default(),
            problem,
        }
    }

    fn enabled(&self) -> usize {
        self.changesets.iter().filter(|c| c.enabled).count()
    }
}

impl Report for CheckReport {
    fn table(&self, printer: &Printer) -> Table {
        let mut table = printer.table(&["#", "Changeset", "Enabled"]);
        for (position, changeset) in self.changesets.iter().enumerate() {
            let enabled = if changeset.enabled { "yes" } else { "no" };
            table.add_row(vec![(position + 1).to_string(), changeset.name.clone(), enabled.to_string()]);
        }
        table
    }

    fn compact(&self) -> String {
        format!(
            "{} changeset(s), {} enabled, database={}",
            self.changesets.len(),
            self.enabled(),
            self.database.as_deref().unwrap_or("-")
        )
    }
}

pub fn run(ctx: &ManifestContext, printer: &Printer) -> Result<()> {
    let report = CheckReport::new(ctx);

    printer.field("Manifest", &report.manifest);
    printer.field("Database", report.database.as_deref().unwrap_or("(missing)"));
    printer.field("Collection", &report.collection);
    printer.report(&report)?;

    if let Some(problem) = report.problem {
        return Err(problem.into());
    }
    printer.line(
        Tone::Ok,
        &format!("{} of {} changeset(s) enabled", report.enabled(), report.changesets.len()),
    );
    Ok(())
}
