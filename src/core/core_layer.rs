// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "access/mod.rs"]
pub mod access;

#[path = "crosspost/mod.rs"]
pub mod crosspost;

#[path = "page.rs"]
pub mod page;

#[path = "settings/mod.rs"]
pub mod settings;

#[path = "warnings/mod.rs"]
pub mod warnings;
