//! Project chat operations: history, sending and typing status.

use super::pagination::{PageError, Paginator};
use super::sql::SqlChatStore;
use super::types::{AttachmentRef, MessagesPage, NewProjectMessage, ProjectMessage, format_timestamp};
use super::{AttachmentResolver, IdentityResolver, SourceError};
use crate::config::ChatConfig;
use crate::db::Database;
use crate::doctype;
use crate::error::ServiceError;
use crate::realtime::RealtimeHub;
use crate::security::{AccessError, AccessPolicy, CallerContext, Ptype, TypingLimiter};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const NEW_MESSAGE_EVENT: &str = "new_project_message";
pub const START_TYPING_EVENT: &str = "start_typing_project_chat";
pub const STOP_TYPING_EVENT: &str = "stop_typing_project_chat";

/// Distinct files one message may carry.
const MAX_ATTACHMENTS: usize = 100;

const SAVE_FAILED: &str = "An error occurred while saving the message. Please try again.";
const FETCH_FAILED: &str = "An error occurred while fetching messages.";

/// Result of a typing-status update. Never an error for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypingStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl TypingStatus {
    fn success() -> Self {
        Self { status: "success", reason: None }
    }

    fn ignored(reason: &'static str) -> Self {
        Self { status: "ignored", reason: Some(reason) }
    }

    fn error(reason: &'static str) -> Self {
        Self { status: "error", reason: Some(reason) }
    }
}

#[derive(Serialize)]
struct TypingPayload<'a> {
    user: &'a str,
    user_full_name: &'a str,
    project: &'a str,
}

pub struct ChatService {
    db: Database,
    policy: Arc<dyn AccessPolicy>,
    hub: Arc<RealtimeHub>,
    limiter: Arc<TypingLimiter>,
    paginator: Paginator,
    attachments: Arc<dyn AttachmentResolver>,
    identities: Arc<dyn IdentityResolver>,
    timestamp_format: String,
}

impl ChatService {
    pub fn new(
        db: Database,
        policy: Arc<dyn AccessPolicy>,
        hub: Arc<RealtimeHub>,
        config: &ChatConfig,
    ) -> Self {
        let store = Arc::new(SqlChatStore::new(db.clone()));
        let paginator = Paginator::new(store.clone(), store.clone(), store.clone())
            .with_page_sizes(config.default_page_size, config.max_page_size)
            .with_unit(config.pagination);

        Self {
            db,
            policy,
            hub,
            limiter: Arc::new(TypingLimiter::new(config.typing_rate_per_second)),
            paginator,
            attachments: store.clone(),
            identities: store,
            timestamp_format: config.timestamp_format.clone(),
        }
    }

    pub fn typing_limiter(&self) -> &Arc<TypingLimiter> {
        &self.limiter
    }

    /// Paginated history, newest first.
    pub async fn get_project_messages(
        &self,
        caller: &CallerContext,
        project: &str,
        limit: Option<i64>,
        start: Option<i64>,
    ) -> Result<MessagesPage, ServiceError> {
        require_project_name(project)?;
        let limit = limit.unwrap_or(0);
        let start = start.unwrap_or(0);

        if caller.is_guest() {
            return Err(ServiceError::denied("You must be logged in to view messages."));
        }
        let user = caller.user_id();

        if !self.can_read_project(user, project).await? {
            warn!(target: "security", user = %user, project = %project, "read of messages for inaccessible project");
            return Err(ServiceError::denied("User does not have read access to the project."));
        }
        if !self
            .policy
            .has_permission(user, doctype::PROJECT_MESSAGE, Ptype::Read, None)
            .await?
        {
            return Err(ServiceError::denied("User does not have permission to read messages."));
        }

        let page = self
            .paginator
            .fetch_page(project, limit, start)
            .await
            .map_err(|e| match e {
                PageError::EmptyConversation => {
                    ServiceError::invalid("Project Name must be a non-empty string.")
                }
                PageError::Source(SourceError::NotFound(_)) => project_not_found(project),
                PageError::Source(SourceError::Backend(e)) => {
                    error!(project = %project, start, limit, error = %e, "failed to fetch project messages");
                    ServiceError::internal(FETCH_FAILED)
                }
            })?;

        Ok(MessagesPage {
            has_more: page.has_more,
            messages: page
                .messages
                .into_iter()
                .map(|m| ProjectMessage::from_page_message(m, &self.timestamp_format))
                .collect(),
        })
    }

    /// Store a message with optional attachments and broadcast it to the project room.
    pub async fn send_project_message(
        &self,
        caller: &CallerContext,
        project: &str,
        content: Option<&str>,
        attachments: Option<Vec<AttachmentRef>>,
    ) -> Result<ProjectMessage, ServiceError> {
        require_project_name(project)?;

        let trimmed = content.map(str::trim).filter(|c| !c.is_empty());
        let attachments = attachments.unwrap_or_default();
        if trimmed.is_none() && attachments.is_empty() {
            return Err(ServiceError::invalid("Message cannot be empty without attachments."));
        }

        if caller.is_guest() {
            return Err(ServiceError::denied("You must be logged in to send messages."));
        }
        let user = caller.user_id();

        if !self.can_read_project(user, project).await? {
            warn!(target: "security", user = %user, project = %project, "send to inaccessible project");
            return Err(ServiceError::denied("User does not have read access to the project."));
        }
        if !self
            .policy
            .has_permission(user, doctype::PROJECT_MESSAGE, Ptype::Create, None)
            .await?
        {
            return Err(ServiceError::denied("User does not have permission to create messages."));
        }

        let files = if attachments.is_empty() {
            Vec::new()
        } else {
            self.accessible_files(user, project, attachments).await?
        };
        if trimmed.is_none() && files.is_empty() {
            return Err(ServiceError::invalid("No valid attachments could be added."));
        }

        let message = NewProjectMessage::new(caller, project, trimmed.map(str::to_string), files);
        if let Err(e) = self.db.messages().insert_message(&message.as_record()).await {
            error!(project = %project, user = %user, error = %e, "failed to insert project message");
            return Err(ServiceError::internal(SAVE_FAILED));
        }
        crate::metrics::record_message_sent();

        let sender_full_name = self.identities.display_name(&message.owner).await;
        let resolved = if message.attachments.is_empty() {
            HashMap::new()
        } else {
            self.attachments
                .resolve_many(&message.attachments)
                .await
                .unwrap_or_else(|e| {
                    warn!(project = %project, error = %e, "attachment resolution failed");
                    HashMap::new()
                })
        };

        let payload = ProjectMessage {
            timestamp: format_timestamp(message.timestamp, &self.timestamp_format),
            attachments: message
                .attachments
                .iter()
                .filter_map(|id| resolved.get(id).cloned().map(Into::into))
                .collect(),
            sender: message.owner.clone(),
            sender_full_name,
            name: message.name,
            project: message.project,
            message_content: message.message_content,
            owner: message.owner,
        };

        let room = RealtimeHub::doc_room(doctype::PROJECTS, project);
        match self.hub.publish(&room, NEW_MESSAGE_EVENT, &payload) {
            Ok(delivered) => {
                debug!(target: "realtime", room = %room, delivered, "published new_project_message")
            }
            Err(e) => {
                error!(target: "realtime", room = %room, error = %e, "failed to publish project message")
            }
        }

        Ok(payload)
    }

    /// Broadcast that `caller` started or stopped typing in a project.
    pub async fn update_typing_status(
        &self,
        caller: &CallerContext,
        project: &str,
        is_typing: Option<bool>,
    ) -> Result<TypingStatus, ServiceError> {
        require_project_name(project)?;
        let Some(is_typing) = is_typing else {
            return Err(ServiceError::invalid("Typing status must be true or false."));
        };

        if caller.is_guest() {
            return Ok(TypingStatus::ignored("User not logged in"));
        }
        let user = caller.user_id();

        let allowed = match self.can_read_project(user, project).await {
            Ok(allowed) => allowed,
            Err(ServiceError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };
        if !allowed {
            warn!(target: "security", user = %user, project = %project, "typing status for inaccessible project");
            return Ok(TypingStatus::error("Permission denied"));
        }

        if !self.limiter.check(user, project) {
            return Ok(TypingStatus::ignored("Rate limited"));
        }

        let event = if is_typing { START_TYPING_EVENT } else { STOP_TYPING_EVENT };
        let full_name = self.identities.display_name(user).await;
        let payload = TypingPayload {
            user,
            user_full_name: &full_name,
            project,
        };

        let room = RealtimeHub::doc_room(doctype::PROJECTS, project);
        match self.hub.publish(&room, event, &payload) {
            Ok(delivered) => {
                debug!(target: "realtime", room = %room, event = %event, user = %user, delivered, "published typing status");
                Ok(TypingStatus::success())
            }
            Err(e) => {
                error!(target: "realtime", room = %room, user = %user, error = %e, "failed to publish typing status");
                Ok(TypingStatus::error("Failed to broadcast status"))
            }
        }
    }

    /// `read` on the project document. A missing project is `NotFound`.
    async fn can_read_project(&self, user: &str, project: &str) -> Result<bool, ServiceError> {
        match self
            .policy
            .has_permission(user, doctype::PROJECTS, Ptype::Read, Some(project))
            .await
        {
            Ok(allowed) => Ok(allowed),
            Err(AccessError::DocumentNotFound { .. }) => Err(project_not_found(project)),
            Err(e) => Err(e.into()),
        }
    }

    /// Requested files the user may read, in request order without repeats.
    ///
    /// More than [`MAX_ATTACHMENTS`] distinct names is `InvalidArgument`.
    async fn accessible_files(
        &self,
        user: &str,
        project: &str,
        attachments: Vec<AttachmentRef>,
    ) -> Result<Vec<String>, ServiceError> {
        let mut seen = HashSet::new();
        let requested: Vec<String> = attachments
            .into_iter()
            .filter_map(|a| a.name)
            .filter(|n| !n.is_empty() && seen.insert(n.clone()))
            .collect();
        if requested.is_empty() {
            return Err(ServiceError::invalid("Invalid attachment data provided."));
        }
        if requested.len() > MAX_ATTACHMENTS {
            warn!(target: "security", user = %user, project = %project, count = requested.len(), "too many attachments");
            return Err(ServiceError::invalid(format!(
                "A message can have at most {MAX_ATTACHMENTS} attachments."
            )));
        }

        let unrestricted = self.policy.is_unrestricted(user).await?;
        let readable = match self
            .db
            .files()
            .readable_by(user, &requested, unrestricted)
            .await
        {
            Ok(readable) => readable,
            Err(e) => {
                error!(project = %project, user = %user, error = %e, "failed to check attachment access");
                return Err(ServiceError::internal(SAVE_FAILED));
            }
        };

        let mut files = Vec::with_capacity(requested.len());
        for name in requested {
            if !readable.contains(&name) {
                warn!(target: "security", user = %user, project = %project, file = %name, "attempted to attach inaccessible file");
                continue;
            }
            files.push(name);
        }
        Ok(files)
    }
}

fn require_project_name(project: &str) -> Result<(), ServiceError> {
    if project.is_empty() {
        return Err(ServiceError::invalid("Project Name must be a non-empty string."));
    }
    Ok(())
}

fn project_not_found(project: &str) -> ServiceError {
    ServiceError::NotFound(format!("Project '{project}' not found."))
}
