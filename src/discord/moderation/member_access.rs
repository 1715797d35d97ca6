// Flatten a serenity member into the core `MemberAccess` snapshot.

use crate::core::access::MemberAccess;
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

/// Effective guild-level permissions plus role positions for `member`.
fn access_from_parts(
    guild_id: serenity::GuildId,
    owner_id: serenity::UserId,
    roles: &HashMap<serenity::RoleId, serenity::Role>,
    member: &serenity::Member,
) -> MemberAccess {
    // @everyone shares the guild's id.
    let everyone = serenity::RoleId::new(guild_id.get());
    let mut permissions = roles
        .get(&everyone)
        .map(|r| r.permissions)
        .unwrap_or_else(serenity::Permissions::empty);
    for role_id in &member.roles {
        if let Some(role) = roles.get(role_id) {
            permissions |= role.permissions;
        }
    }

    let is_owner = member.user.id == owner_id;
    let administrator = is_owner || permissions.contains(serenity::Permissions::ADMINISTRATOR);

    MemberAccess {
        administrator,
        moderate_members: administrator
            || permissions.contains(serenity::Permissions::MODERATE_MEMBERS),
        ban_members: administrator || permissions.contains(serenity::Permissions::BAN_MEMBERS),
        role_ids: member.roles.iter().map(|r| r.get()).collect(),
        guild_role_positions: roles
            .iter()
            .map(|(id, role)| (id.get(), role.position))
            .collect(),
    }
}

/// Fetch a member and resolve their access, preferring the cache.
pub async fn resolve_member_access(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> Result<MemberAccess, serenity::Error> {
    let member = guild_id.member(ctx, user_id).await?;

    // The cache guard must be dropped before any await.
    let cached = ctx
        .cache
        .guild(guild_id)
        .map(|guild| access_from_parts(guild_id, guild.owner_id, &guild.roles, &member));
    if let Some(access) = cached {
        return Ok(access);
    }

    let guild = guild_id.to_partial_guild(&ctx.http).await?;
    Ok(access_from_parts(
        guild_id,
        guild.owner_id,
        &guild.roles,
        &member,
    ))
}
