//! Seed a Redis database through declared changesets.
//!
//! ```text
//! REDIS_URL=redis://127.0.0.1/ RUST_LOG=changelog=info cargo run --example seed
//! ```
//!
//! Running it twice reports every changeset as `ALREADY_APPLIED` the second time.

use anyhow::{Context, Result};
use changelog::{ChangesetRef, Configuration, ConnectionOptions, Manifest, changeset, redis};

const DATABASE: &str = "seed_example";

#[changeset(name = "initDB", author = "John")]
async fn init_db() -> Result<()> {
    let mut conn = connection().await?;
    let _: () = redis::cmd("SET")
        .arg(format!("{DATABASE}:settings:locale"))
        .arg("en-US")
        .query_async(&mut conn)
        .await?;
    Ok(())
}

#[changeset(name = "addAppAdminUsers", author = "Jane")]
async fn add_app_admin_users() -> Result<()> {
    let mut conn = connection().await?;
    let _: () = redis::cmd("SADD")
        .arg(format!("{DATABASE}:admins"))
        .arg("john@example.com")
        .arg("jane@example.com")
        .query_async(&mut conn)
        .await?;
    Ok(())
}

async fn connection() -> Result<changelog::ConnectionManager> {
    let client = redis::Client::open(redis_url()?)?;
    Ok(client.get_connection_manager().await?)
}

fn redis_url() -> Result<String> {
    std::env::var("REDIS_URL").context("REDIS_URL environment variable not set")
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let manifest = Manifest {
        database: Some(Configuration::new(redis_url()?, DATABASE).with_connection_options(ConnectionOptions {
            response_timeout_ms: Some(2_000),
            ..Default::default()
        })),
        changesets: Some(vec![ChangesetRef::new("initDB"), ChangesetRef::new("addAppAdminUsers")]),
        collection: None,
    };

    let statuses = changelog::deploy(&manifest).await?;
    for (name, status) in &statuses {
        println!("{name}: {status}");
    }
    Ok(())
}
