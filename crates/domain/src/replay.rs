//! Replay engine: rebuilds aggregate state from an ordered event history.
//!
//! Replay only folds [`Aggregate::apply`], so it never fails on events that
//! were accepted at write time. Each event advances the version by one,
//! matching the 1-based numbering of stored streams.

use event_store::EventEnvelope;

use crate::aggregate::Aggregate;
use crate::error::DomainError;

fn step<A: Aggregate>(mut aggregate: A, event: A::Event) -> A {
    let next = aggregate.version().next();
    aggregate.apply(event);
    aggregate.set_version(next);
    aggregate
}

/// Folds `events` into a fresh aggregate, starting from the uninitialized state.
pub fn reconstruct<A: Aggregate>(events: impl IntoIterator<Item = A::Event>) -> A {
    events.into_iter().fold(A::default(), step)
}

/// Lazily yields the state after each event of `events`.
///
/// The iterator borrows the history and owns its fold state, so calling this
/// again on the same slice replays from scratch with identical results.
pub fn replay_states<A: Aggregate>(events: &[A::Event]) -> impl Iterator<Item = A> + '_ {
    events.iter().scan(A::default(), |state, event| {
        *state = step(std::mem::take(state), event.clone());
        Some(state.clone())
    })
}

/// Decodes stored envelopes and folds them into an aggregate.
///
/// The aggregate's version is taken from the envelopes. Only payload
/// decoding can fail.
pub fn replay_envelopes<A: Aggregate>(
    envelopes: impl IntoIterator<Item = EventEnvelope>,
) -> Result<A, DomainError> {
    let mut aggregate = A::default();
    for envelope in envelopes {
        let event: A::Event = serde_json::from_value(envelope.payload)?;
        aggregate.apply(event);
        aggregate.set_version(envelope.version);
    }
    Ok(aggregate)
}
