//! Outbound follow-up wave
//!
//! Walks the lead list once, sending each lead a generated follow-up with a
//! pause between sends. Runs as a background task next to the webhook
//! server and shares its store, sender, and writer.

use std::time::Duration;

use crate::leads::load_leads;
use crate::storage::Direction;
use crate::AppState;

pub async fn send_wave(state: AppState) {
    let leads = load_leads(&state.config.leads_csv);
    let delay = Duration::from_secs(state.config.delay_sec);

    for lead in leads {
        tracing::info!(name = %lead.name, phone = %lead.phone, "processing lead");

        let message = state.writer.generate(&lead, &state.config.tone_sample).await;
        match state.sender.send(&lead.phone, &message).await {
            Ok(message_id) => {
                state
                    .store
                    .append(&lead.phone, &message, Direction::Outgoing, Some(&message_id))
                    .await;
            }
            Err(e) => {
                tracing::error!(phone = %lead.phone, error = %e, "wave send failed");
            }
        }

        tokio::time::sleep(delay).await;
    }

    tracing::info!("follow-up wave complete");
}
