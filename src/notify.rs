//! Hot-lead notification side channel
//!
//! Fire-and-forget: the reply flow never depends on this.

/// Flag an inbound reply so a human agent can jump in.
// TODO: wire this to email or Slack once an agent inbox exists.
pub fn notify_agent(from_number: &str, message: &str) {
    tracing::info!(target: "hot_lead", from_number, message, "lead replied");
}
