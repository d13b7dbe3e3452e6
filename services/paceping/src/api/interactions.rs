//! Interaction webhook handler.
//!
//! # Purpose and responsibility
//! Receives every slash-command and autocomplete delivery from the platform,
//! verifies it, and answers synchronously with the interaction response.
//!
//! # Key invariants and assumptions
//! - The signature is checked on the raw body before anything is parsed.
//! - Command replies are always ephemeral.
//! - Role names are resolved only for commands gated by the access guard.
//! - A command gets [`COMMAND_DEADLINE`] to finish; past that the caller gets
//!   the failure reply while the platform is still waiting for an answer.
//!
//! # Security considerations
//! - Store and platform failure details stay in the logs; the caller only
//!   sees a generic failure reply.
use crate::api::error::{ApiError, api_unauthorized, api_validation_error};
use crate::app::AppState;
use crate::commands::PaceCommand;
use crate::discord::interaction::{Interaction, InteractionKind, InteractionResponse};
use crate::model::Caller;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use std::time::Duration;

pub const FAILURE_REPLY: &str = "Something went wrong while handling your command. Please try again later.";

/// Budget for one command; the platform drops responses after 3 seconds.
pub const COMMAND_DEADLINE: Duration = Duration::from_millis(2500);

pub(crate) async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InteractionResponse>, ApiError> {
    if let Err(err) = state.verifier.verify_headers(&headers, &body) {
        metrics::counter!("paceping_interaction_rejected_total").increment(1);
        tracing::warn!(error = %err, "interaction rejected");
        return Err(api_unauthorized("invalid request signature"));
    }
    let interaction: Interaction = serde_json::from_slice(&body).map_err(|err| {
        tracing::warn!(error = %err, "malformed interaction payload");
        api_validation_error("malformed interaction payload")
    })?;

    let response = match interaction.kind {
        InteractionKind::Ping => InteractionResponse::pong(),
        InteractionKind::ApplicationCommand => run_command(&state, &interaction).await,
        InteractionKind::Autocomplete => autocomplete(&state, &interaction).await,
        InteractionKind::MessageComponent | InteractionKind::ModalSubmit => {
            InteractionResponse::ephemeral("This interaction is not supported.")
        }
    };
    Ok(Json(response))
}

async fn run_command(state: &AppState, interaction: &Interaction) -> InteractionResponse {
    let (Some(data), Some(caller)) = (interaction.data.as_ref(), interaction.caller()) else {
        return InteractionResponse::ephemeral("This command is missing its payload.");
    };
    let command = match PaceCommand::from_data(data) {
        Ok(command) => command,
        Err(err) => {
            metrics::counter!(
                "paceping_commands_total",
                "command" => data.name.clone(),
                "outcome" => "rejected"
            )
            .increment(1);
            tracing::warn!(error = %err, user_id = %caller.user_id, "command rejected");
            return InteractionResponse::ephemeral(format!("Invalid command: {err}"));
        }
    };

    let name = command.name();
    let dispatched = dispatch(state, interaction, command, caller);
    match tokio::time::timeout(COMMAND_DEADLINE, dispatched).await {
        Ok(response) => response,
        Err(_) => {
            record_outcome(name, "timeout");
            tracing::error!(
                command = name,
                deadline_ms = COMMAND_DEADLINE.as_millis() as u64,
                "command timed out"
            );
            InteractionResponse::ephemeral(FAILURE_REPLY)
        }
    }
}

async fn dispatch(
    state: &AppState,
    interaction: &Interaction,
    command: PaceCommand,
    caller: Caller,
) -> InteractionResponse {
    let caller = if command.requires_roles() {
        match resolve_roles(state, interaction, caller).await {
            Some(caller) => caller,
            None => {
                record_outcome(command.name(), "error");
                return InteractionResponse::ephemeral(FAILURE_REPLY);
            }
        }
    } else {
        caller
    };

    tracing::info!(command = command.name(), user_id = %caller.user_id, "dispatching command");
    match command.execute(&state.service, &caller).await {
        Ok(reply) => {
            record_outcome(command.name(), reply.outcome.as_str());
            InteractionResponse::ephemeral(reply.content)
        }
        Err(err) => {
            record_outcome(command.name(), "error");
            tracing::error!(
                error = %err,
                command = command.name(),
                user_id = %caller.user_id,
                "command failed"
            );
            InteractionResponse::ephemeral(FAILURE_REPLY)
        }
    }
}

/// Attach role names to the caller; outside a guild the caller has none.
async fn resolve_roles(
    state: &AppState,
    interaction: &Interaction,
    caller: Caller,
) -> Option<Caller> {
    let Some(guild_id) = interaction.guild_id.as_deref() else {
        return Some(caller);
    };
    match state
        .platform
        .role_names(guild_id, interaction.role_ids())
        .await
    {
        Ok(names) => Some(caller.with_roles(names)),
        Err(err) => {
            tracing::error!(error = %err, guild_id, "role lookup failed");
            None
        }
    }
}

async fn autocomplete(state: &AppState, interaction: &Interaction) -> InteractionResponse {
    let partial = interaction
        .data
        .as_ref()
        .and_then(|data| data.focused_option())
        .and_then(|option| option.value.as_ref())
        .and_then(|value| value.as_str())
        .unwrap_or_default();
    InteractionResponse::autocomplete(state.service.suggest(partial).await)
}

fn record_outcome(command: &'static str, outcome: &'static str) {
    metrics::counter!("paceping_commands_total", "command" => command, "outcome" => outcome)
        .increment(1);
}
