use redis::Script;
use std::sync::LazyLock;

pub const CHANGELOG_INSERT_SCRIPT_BODY: &str = include_str!("../../lua/changelog_insert.lua");

pub static CHANGELOG_INSERT_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(CHANGELOG_INSERT_SCRIPT_BODY));
