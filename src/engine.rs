use crate::commentary::{self, CommentaryProvider, CommentaryRequest, FALLBACK_COMMENTARY};
use crate::desk::Desk;
use crate::errors::DeskError;
use crate::state::*;
use portable_atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Commentary generator, if the host supplied one.
pub type Commentator = Option<Arc<dyn CommentaryProvider>>;

/// Desk engine loop. The only owner of the `Desk`; every mutation arrives as
/// an event, is applied and revalued in one go, then a fresh snapshot is
/// published. Commentary runs on spawned tasks and never blocks this loop.
pub async fn run_desk(
    state: Arc<AppState>,
    mut desk: Desk,
    commentator: Commentator,
    mut rx: mpsc::Receiver<DeskEvent>,
) {
    tracing::info!(
        model = desk.model_name(),
        commentator = commentator.as_ref().map(|c| c.name()).unwrap_or("none"),
        "desk engine started"
    );

    let mut commentary = CommentaryState::new(commentary::WELCOME_COMMENTARY);
    publish_snapshot(&state, &desk, &commentary);

    while let Some(event) = rx.recv().await {
        if matches!(event, DeskEvent::Shutdown) {
            tracing::info!("shutdown event received");
            break;
        }
        process_event(event, &mut desk, &mut commentary, &commentator, &state);
    }

    tracing::info!("desk engine shutting down");
}

/// Apply one event. Synchronous: nothing in here awaits.
pub fn process_event(
    event: DeskEvent,
    desk: &mut Desk,
    commentary: &mut CommentaryState,
    commentator: &Commentator,
    state: &Arc<AppState>,
) {
    match event {
        DeskEvent::Step { percent_change, reply } => {
            let result = desk.step(percent_change);
            match &result {
                Ok(step) => {
                    state.counters.steps_processed.fetch_add(1, Ordering::Relaxed);
                    state.counters.refreshes.fetch_add(1, Ordering::Relaxed);
                    tracing::info!(day = step.day, spot = step.price, percent_change, "price stepped");

                    state.broadcast(WsMessage::PriceStep {
                        day: step.day,
                        price: step.price,
                        percent_change: step.percent_change,
                        date: step.date.clone(),
                    });
                    broadcast_valuations(state, desk);

                    if commentary::is_due(step.day, state.config.commentary_every_days) {
                        request_commentary(desk, commentary, commentator, state);
                    }
                }
                Err(e) => reject(state, e),
            }
            publish_snapshot(state, desk, commentary);
            let _ = reply.send(result);
        }

        DeskEvent::AddContract { form, reply } => {
            let result = desk.add_contract(&form);
            match &result {
                Ok(contract) => {
                    state.counters.contracts_added.fetch_add(1, Ordering::Relaxed);
                    state.counters.refreshes.fetch_add(1, Ordering::Relaxed);
                    state.broadcast(WsMessage::ContractAdded {
                        id: contract.id.clone(),
                        strike: contract.strike,
                        kind: contract.kind,
                        expiry_day: contract.expiry_day,
                        inception_price: contract.inception_price,
                    });
                    broadcast_valuations(state, desk);
                }
                Err(e) => reject(state, e),
            }
            publish_snapshot(state, desk, commentary);
            let _ = reply.send(result);
        }

        DeskEvent::RemoveContract { id, reply } => {
            let removed = desk.remove_contract(&id);
            if removed {
                state.counters.contracts_removed.fetch_add(1, Ordering::Relaxed);
                state.counters.refreshes.fetch_add(1, Ordering::Relaxed);
                state.broadcast(WsMessage::ContractRemoved { id });
                broadcast_valuations(state, desk);
                publish_snapshot(state, desk, commentary);
            }
            let _ = reply.send(removed);
        }

        DeskEvent::Reset { reply } => {
            let result = desk.reset();
            match &result {
                Ok(()) => {
                    state.counters.refreshes.fetch_add(1, Ordering::Relaxed);
                    *commentary = CommentaryState::new(commentary::RESET_COMMENTARY);
                    state.broadcast(WsMessage::Reset {
                        spot: desk.sim().spot_price(),
                    });
                    broadcast_valuations(state, desk);
                }
                Err(e) => reject(state, e),
            }
            publish_snapshot(state, desk, commentary);
            let _ = reply.send(result);
        }

        DeskEvent::CommentaryReady { generation, day, text, failed } => {
            if generation != desk.generation() {
                tracing::debug!(generation, current = desk.generation(), "dropping stale commentary");
                return;
            }
            if failed {
                state.counters.commentary_failed.fetch_add(1, Ordering::Relaxed);
            }
            // A slower earlier request must not overwrite a newer one
            if day < commentary.day {
                return;
            }
            commentary.text = text;
            commentary.day = day;
            commentary.pending = day < commentary.requested_day;
            state.broadcast(WsMessage::Commentary {
                day,
                text: commentary.text.clone(),
                pending: commentary.pending,
            });
            publish_snapshot(state, desk, commentary);
        }

        DeskEvent::Shutdown => {}
    }
}

/// Fire-and-forget: the result comes back later as `CommentaryReady`.
fn request_commentary(
    desk: &Desk,
    commentary: &mut CommentaryState,
    commentator: &Commentator,
    state: &Arc<AppState>,
) {
    let Some(provider) = commentator.clone() else {
        return;
    };

    let request = CommentaryRequest::from_desk(&state.config.symbol, desk);
    let generation = desk.generation();
    let day = request.day;
    let tx = state.engine_tx.clone();

    state.counters.commentary_requested.fetch_add(1, Ordering::Relaxed);
    commentary.pending = true;
    commentary.requested_day = day;
    state.broadcast(WsMessage::Commentary {
        day,
        text: commentary.text.clone(),
        pending: true,
    });

    tokio::spawn(async move {
        let (text, failed) = match provider.generate(request).await {
            Ok(text) => (text, false),
            Err(e) => {
                tracing::warn!(error = %e, provider = provider.name(), "commentary failed, using fallback");
                (FALLBACK_COMMENTARY.to_string(), true)
            }
        };
        if tx
            .send(DeskEvent::CommentaryReady { generation, day, text, failed })
            .await
            .is_err()
        {
            tracing::debug!("desk engine gone, commentary discarded");
        }
    });
}

fn broadcast_valuations(state: &AppState, desk: &Desk) {
    state.broadcast(WsMessage::Valuations {
        day: desk.sim().elapsed_days(),
        spot: desk.sim().spot_price(),
        positions: desk.positions(),
    });
}

fn publish_snapshot(state: &AppState, desk: &Desk, commentary: &CommentaryState) {
    let snapshot = DeskSnapshot::capture(&state.config.symbol, desk, commentary);
    let _ = state.snapshot_tx.send(snapshot);
}

fn reject(state: &AppState, e: &DeskError) {
    state.counters.requests_rejected.fetch_add(1, Ordering::Relaxed);
    tracing::warn!(error = %e, "request rejected");
}
