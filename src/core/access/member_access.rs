// Member access predicates - who is exempt, who moderates, who may warn.
//
// The Discord layer flattens a guild member into `MemberAccess`; everything
// here is a pure function over that snapshot and the guild's settings.

use crate::core::settings::GuildSettings;
use std::collections::HashMap;

/// Permission-relevant snapshot of a guild member.
#[derive(Debug, Clone, Default)]
pub struct MemberAccess {
    pub administrator: bool,
    pub moderate_members: bool,
    pub ban_members: bool,
    pub role_ids: Vec<u64>,
    /// Role id -> position for every role in the guild.
    pub guild_role_positions: HashMap<u64, u16>,
}

impl MemberAccess {
    fn has_role(&self, role_id: u64) -> bool {
        self.role_ids.contains(&role_id)
    }

    /// Position of the configured role, if it still exists in the guild.
    fn role_position(&self, role_id: u64) -> Option<u16> {
        self.guild_role_positions.get(&role_id).copied()
    }

    /// Whether any of the member's roles sits at or above `position`.
    fn reaches(&self, position: u16) -> bool {
        self.role_ids
            .iter()
            .filter_map(|id| self.guild_role_positions.get(id))
            .any(|p| *p >= position)
    }

    fn reaches_moderator_role(&self, settings: &GuildSettings) -> Option<bool> {
        let role_id = settings.moderator_role_id?;
        let position = self.role_position(role_id)?;
        Some(self.reaches(position))
    }
}

/// Staff are not checked for crossposting and cannot be warned.
pub fn is_exempt(member: &MemberAccess, settings: &GuildSettings) -> bool {
    if member.administrator {
        return true;
    }
    if member.reaches_moderator_role(settings) == Some(true) {
        return true;
    }
    settings
        .warn_role_id
        .map(|role| member.has_role(role))
        .unwrap_or(false)
}

pub fn is_moderator(member: &MemberAccess, settings: &GuildSettings) -> bool {
    if member.administrator {
        return true;
    }
    // No usable moderator role configured: fall back to the platform permission.
    member
        .reaches_moderator_role(settings)
        .unwrap_or(member.moderate_members)
}

/// Moderators and holders of the warn role (trial moderators).
pub fn can_warn(member: &MemberAccess, settings: &GuildSettings) -> bool {
    if is_moderator(member, settings) {
        return true;
    }
    settings
        .warn_role_id
        .map(|role| member.has_role(role))
        .unwrap_or(false)
}
