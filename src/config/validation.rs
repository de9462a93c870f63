//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use crate::security::Ptype;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
    #[error("chat.default_page_size and chat.max_page_size must be positive")]
    ZeroPageSize,
    #[error("chat.default_page_size ({0}) exceeds chat.max_page_size ({1})")]
    PageSizeOrder(u32, u32),
    #[error("chat.typing_rate_per_second must be positive")]
    ZeroTypingRate,
    #[error("realtime.channel_capacity must be positive")]
    ZeroChannelCapacity,
    #[error("duplicate user id: {0}")]
    DuplicateUser(String),
    #[error("duplicate api_key for user {0}")]
    DuplicateApiKey(String),
    #[error("user {user} has api_key but no api_secret")]
    MissingApiSecret { user: String },
    #[error("user {user} references undeclared role {role}")]
    UnknownRole { user: String, role: String },
    #[error("project {project} references undeclared member {user}")]
    UnknownMember { project: String, user: String },
    #[error("role {role} grants unknown permission type {ptype}")]
    UnknownPtype { role: String, ptype: String },
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    // Database path validation
    let db_path = Path::new(&config.database.path);
    if config.database.path != ":memory:"
        && let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        errors.push(ValidationError::DatabasePathInvalid(config.database.path.clone()));
    }

    // Chat limits
    let chat = &config.chat;
    if chat.default_page_size == 0 || chat.max_page_size == 0 {
        errors.push(ValidationError::ZeroPageSize);
    } else if chat.default_page_size > chat.max_page_size {
        errors.push(ValidationError::PageSizeOrder(
            chat.default_page_size,
            chat.max_page_size,
        ));
    }
    if chat.typing_rate_per_second == 0 {
        errors.push(ValidationError::ZeroTypingRate);
    }
    if config.realtime.channel_capacity == 0 {
        errors.push(ValidationError::ZeroChannelCapacity);
    }

    // Roles
    let roles: HashSet<&str> = config.roles.iter().map(|r| r.name.as_str()).collect();
    for role in &config.roles {
        for ptype in role.grants.iter().flat_map(|g| g.ptypes.iter()) {
            if ptype.parse::<Ptype>().is_err() {
                errors.push(ValidationError::UnknownPtype {
                    role: role.name.clone(),
                    ptype: ptype.clone(),
                });
            }
        }
    }

    // Users
    let mut users = HashSet::new();
    let mut keys = HashSet::new();
    for user in &config.users {
        if !users.insert(user.id.as_str()) {
            errors.push(ValidationError::DuplicateUser(user.id.clone()));
        }
        if let Some(key) = user.api_key.as_deref() {
            if !keys.insert(key) {
                errors.push(ValidationError::DuplicateApiKey(user.id.clone()));
            }
            if user.api_secret.is_none() {
                errors.push(ValidationError::MissingApiSecret { user: user.id.clone() });
            }
        }
        for role in &user.roles {
            if !roles.contains(role.as_str()) {
                errors.push(ValidationError::UnknownRole {
                    user: user.id.clone(),
                    role: role.clone(),
                });
            }
        }
    }

    // Projects
    for project in &config.projects {
        for member in &project.members {
            if !users.contains(member.as_str()) {
                errors.push(ValidationError::UnknownMember {
                    project: project.name.clone(),
                    user: member.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
