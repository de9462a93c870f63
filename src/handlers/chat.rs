//! Project chat endpoints.

use super::args::{GetMessagesArgs, SendMessageArgs, TypingArgs, body};
use super::{Caller, Envelope, GET_PROJECT_MESSAGES, SEND_PROJECT_MESSAGE, UPDATE_TYPING_STATUS, dispatch};
use crate::chat::{MessagesPage, ProjectMessage, TypingStatus};
use crate::error::ServiceError;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

pub async fn get_project_messages(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<GetMessagesArgs>, JsonRejection>,
) -> Result<Json<Envelope<MessagesPage>>, ServiceError> {
    dispatch(GET_PROJECT_MESSAGES, &caller, async {
        let args = body(payload)?;
        state
            .chat
            .get_project_messages(&caller, &args.project_name, args.limit, args.start)
            .await
    })
    .await
}

pub async fn send_project_message(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<SendMessageArgs>, JsonRejection>,
) -> Result<Json<Envelope<ProjectMessage>>, ServiceError> {
    dispatch(SEND_PROJECT_MESSAGE, &caller, async {
        let args = body(payload)?;
        let attachments = args.attachment_refs();
        state
            .chat
            .send_project_message(
                &caller,
                &args.project_name,
                args.message_content.as_deref(),
                attachments,
            )
            .await
    })
    .await
}

pub async fn update_typing_status(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<TypingArgs>, JsonRejection>,
) -> Result<Json<Envelope<TypingStatus>>, ServiceError> {
    dispatch(UPDATE_TYPING_STATUS, &caller, async {
        let args = body(payload)?;
        state
            .chat
            .update_typing_status(&caller, &args.project_name, args.is_typing())
            .await
    })
    .await
}
