//! The nine tables of the moderation bot, in migration order.

use super::schema::{ColumnDefault as D, ColumnSpec as C, ColumnType as T, TableSpec};

const ID: T = T::VarChar(20);

const USERS: &[C] = &[
    C::new("discord_id", ID).not_null(),
    C::new("username", T::VarChar(100)).not_null(),
    C::new("discriminator", T::VarChar(10)),
    C::new("guild_id", ID).not_null(),
    C::new("permission_level", T::Integer).default(D::Integer(1)),
    C::new("joined_at", T::Timestamp).default(D::Now),
    C::new("created_at", T::Timestamp).default(D::Now),
    C::new("updated_at", T::Timestamp).default(D::Now),
];

const GUILD_SETTINGS: &[C] = &[
    C::new("guild_id", ID).not_null(),
    C::new("prefix", T::VarChar(10)).default(D::Text("!")),
    C::new("welcome_channel_id", ID),
    C::new("mod_log_channel_id", ID),
    C::new("auto_roles", T::Jsonb).default(D::Json("[]")),
    C::new("automod_enabled", T::Boolean).default(D::Boolean(true)),
    C::new("spam_threshold", T::Integer).default(D::Integer(5)),
    C::new("created_at", T::Timestamp).default(D::Now),
    C::new("updated_at", T::Timestamp).default(D::Now),
];

const WARNINGS: &[C] = &[
    C::new("user_id", ID).not_null(),
    C::new("guild_id", ID).not_null(),
    C::new("moderator_id", ID).not_null(),
    C::new("reason", T::Text).not_null(),
    C::new("active", T::Boolean).default(D::Boolean(true)),
    C::new("created_at", T::Timestamp).default(D::Now),
];

const MODERATION_LOGS: &[C] = &[
    C::new("action", T::VarChar(50)).not_null(),
    C::new("user_id", ID).not_null(),
    C::new("guild_id", ID).not_null(),
    C::new("moderator_id", ID).not_null(),
    C::new("reason", T::Text),
    C::new("duration", T::Integer),
    C::new("message_id", ID),
    C::new("channel_id", ID),
    C::new("created_at", T::Timestamp).default(D::Now),
];

const AUTOMOD_VIOLATIONS: &[C] = &[
    C::new("user_id", ID).not_null(),
    C::new("guild_id", ID).not_null(),
    C::new("violation_type", T::VarChar(50)).not_null(),
    C::new("message_content", T::Text),
    C::new("action_taken", T::VarChar(50)),
    C::new("severity", T::VarChar(20)).default(D::Text("low")),
    C::new("metadata", T::Jsonb),
    C::new("created_at", T::Timestamp).default(D::Now),
];

const MUTED_USERS: &[C] = &[
    C::new("user_id", ID).not_null(),
    C::new("guild_id", ID).not_null(),
    C::new("moderator_id", ID).not_null(),
    C::new("reason", T::Text),
    C::new("expires_at", T::Timestamp),
    C::new("created_at", T::Timestamp).default(D::Now),
];

const COMMAND_USAGE: &[C] = &[
    C::new("command_name", T::VarChar(100)).not_null(),
    C::new("user_id", ID).not_null(),
    C::new("guild_id", ID).not_null(),
    C::new("channel_id", ID),
    C::new("success", T::Boolean).default(D::Boolean(true)),
    C::new("execution_time", T::Integer),
    C::new("error_message", T::Text),
    C::new("used_at", T::Timestamp).default(D::Now),
];

const SECURITY_EVENTS: &[C] = &[
    C::new("event_type", T::VarChar(50)).not_null(),
    C::new("user_id", ID),
    C::new("guild_id", ID).not_null(),
    C::new("severity", T::VarChar(20)).not_null(),
    C::new("details", T::Jsonb).not_null(),
    C::new("action_taken", T::VarChar(100)),
    C::new("resolved", T::Boolean).default(D::Boolean(false)),
    C::new("resolved_by", ID),
    C::new("resolved_at", T::Timestamp),
    C::new("created_at", T::Timestamp).default(D::Now),
];

const USER_ACTIVITY: &[C] = &[
    C::new("user_id", ID).not_null(),
    C::new("guild_id", ID).not_null(),
    C::new("activity_type", T::VarChar(50)).not_null(),
    C::new("channel_id", ID),
    C::new("metadata", T::Jsonb),
    C::new("suspicion_score", T::Integer).default(D::Integer(0)),
    C::new("created_at", T::Timestamp).default(D::Now),
];

/// All tables, in the order they are provisioned and migrated.
pub static TABLES: &[TableSpec] = &[
    TableSpec {
        name: "users",
        unique_key: Some("discord_id"),
        columns: USERS,
    },
    TableSpec {
        name: "guild_settings",
        unique_key: Some("guild_id"),
        columns: GUILD_SETTINGS,
    },
    TableSpec {
        name: "warnings",
        unique_key: None,
        columns: WARNINGS,
    },
    TableSpec {
        name: "moderation_logs",
        unique_key: None,
        columns: MODERATION_LOGS,
    },
    TableSpec {
        name: "automod_violations",
        unique_key: None,
        columns: AUTOMOD_VIOLATIONS,
    },
    TableSpec {
        name: "muted_users",
        unique_key: None,
        columns: MUTED_USERS,
    },
    TableSpec {
        name: "command_usage",
        unique_key: None,
        columns: COMMAND_USAGE,
    },
    TableSpec {
        name: "security_events",
        unique_key: None,
        columns: SECURITY_EVENTS,
    },
    TableSpec {
        name: "user_activity",
        unique_key: None,
        columns: USER_ACTIVITY,
    },
];

/// Every catalog table.
pub fn all() -> &'static [TableSpec] {
    TABLES
}

/// Look up a table by name.
pub fn find(name: &str) -> Option<&'static TableSpec> {
    TABLES.iter().find(|t| t.name == name)
}

/// Table names in migration order.
pub fn names() -> Vec<&'static str> {
    TABLES.iter().map(|t| t.name).collect()
}
