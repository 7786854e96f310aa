use anyhow::{Context, Result};
use changelog::{ChangelogEntry, ChangelogStore};
use comfy_table::{Attribute, Cell, Table};

use crate::context::ManifestContext;
use crate::printer::{Printer, Report, Tone};

impl Report for ChangelogEntry {
    fn table(&self, printer: &Printer) -> Table {
        let mut table = printer.table(&["Field", "Value"]);
        let rows = [
            ("Name", self.name.clone()),
            ("Author", self.author.clone()),
            ("Executed", self.date_executed.to_rfc3339()),
            ("Fingerprint", self.fingerprint.clone()),
        ];
        for (key, value) in rows {
            table.add_row(vec![Cell::new(key).add_attribute(Attribute::Bold), Cell::new(value)]);
        }
        table
    }

    fn compact(&self) -> String {
        format!(
            "{} author={} executed={} fingerprint={}",
            self.name,
            self.author,
            self.date_executed.to_rfc3339(),
            self.fingerprint
        )
    }
}

pub async fn run(ctx: &ManifestContext, name: &str, printer: &Printer) -> Result<()> {
    let mut store = ctx.connect().await?;
    printer.debug(&format!("connected to `{}`", store.database()));

    let found = store.find_by_name(&ctx.collection, name).await;
    store.close().await.context("Failed to close Redis connection")?;
    let found = found.with_context(|| format!("Failed to read collection `{}`", ctx.collection))?;

    let Some(entry) = found else {
        let listed = ctx
            .manifest
            .changesets
            .iter()
            .flatten()
            .any(|changeset| changeset.name == name);
        if listed {
            printer.line(Tone::Info, &format!("`{name}` is listed in {} but not applied", ctx.manifest_path.display()));
        }
        anyhow::bail!("changeset `{name}` has not been applied to `{}`", ctx.collection);
    };

    printer.title(&format!("Changeset {name}"));
    printer.report(&entry)
}
