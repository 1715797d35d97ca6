// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "database.rs"]
pub mod database;

#[path = "crosspost/mod.rs"]
pub mod crosspost;

#[path = "settings/mod.rs"]
pub mod settings;

#[path = "warnings/mod.rs"]
pub mod warnings;
