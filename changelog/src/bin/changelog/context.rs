use anyhow::{Context, Result};
use changelog::{
    CHANGELOG_COLLECTION, ChangelogError, Configuration, Manifest, RedisStore, is_configuration_valid,
};
use std::path::{Path, PathBuf};

/// Manifest and collection the CLI operates on
pub struct ManifestContext {
    /// Where the manifest was read from
    pub manifest_path: PathBuf,
    /// Parsed manifest
    pub manifest: Manifest,
    /// Changelog collection, after `--collection` and the manifest override
    pub collection: String,
}

impl ManifestContext {
    /// Load the manifest at `explicit`, or `changelog.toml` in the working directory.
    pub fn load(explicit: Option<&Path>, collection: Option<&str>) -> Result<Self> {
        let manifest_path = Manifest::locate(explicit);
        let manifest = Manifest::load(&manifest_path)?;
        Ok(Self::from_manifest(manifest_path, manifest, collection))
    }

    pub fn from_manifest(manifest_path: PathBuf, manifest: Manifest, collection: Option<&str>) -> Self {
        let collection = collection
            .map(str::to_string)
            .or_else(|| manifest.collection.clone())
            .unwrap_or_else(|| CHANGELOG_COLLECTION.to_string());

        Self {
            manifest_path,
            manifest,
            collection,
        }
    }

    /// The manifest's database section, if it would pass validation.
    pub fn configuration(&self) -> Result<&Configuration> {
        let database = self.manifest.database.as_ref();
        if !is_configuration_valid(database) {
            return Err(ChangelogError::IllegalConfiguration)
                .with_context(|| format!("invalid [database] section in {}", self.manifest_path.display()));
        }
        database.context("missing [database] section")
    }

    /// Open a store on the configured database.
    pub async fn connect(&self) -> Result<RedisStore> {
        let configuration = self.configuration()?;
        let options = configuration.connection_options.clone().unwrap_or_default();
        RedisStore::connect(&configuration.connection_uri, &configuration.database_name, &options)
            .await
            .context("Failed to connect to Redis")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(manifest: &str, collection: Option<&str>) -> ManifestContext {
        let manifest = Manifest::parse(manifest).unwrap();
        ManifestContext::from_manifest(PathBuf::from("changelog.toml"), manifest, collection)
    }

    #[test]
    fn test_collection_precedence() {
        let manifest = r#"
            collection = "migrations"

            [database]
            connection_uri = "redis://127.0.0.1/"
            database_name = "app"
            connection_options = {}
        "#;

        assert_eq!(context(manifest, None).collection, "migrations");
        assert_eq!(context(manifest, Some("audit")).collection, "audit");
        assert_eq!(context("", None).collection, CHANGELOG_COLLECTION);
    }

    #[test]
    fn test_configuration_requires_options() {
        let manifest = r#"
            [database]
            connection_uri = "redis://127.0.0.1/"
            database_name = "app"
        "#;

        let err = context(manifest, None).configuration().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChangelogError>(),
            Some(ChangelogError::IllegalConfiguration)
        ));
    }
}
