// Discord moderation adapters - crosspost handling, member access,
// button interactions and moderation log embeds.

pub mod crosspost_handler;
pub mod interactions;
pub mod member_access;
pub mod mod_log;
