//! Queue behavior as the router drives it: pairing, the bot-fallback race,
//! and cleanup on disconnect.

use std::sync::Arc;

use fourline_lobby::{MatchQueue, Pairing};
use fourline_protocol::{HumanId, Participant};
use fourline_timer::ManualClock;

// =========================================================================
// Helpers
// =========================================================================

const ADA: HumanId = HumanId(1);
const BOB: HumanId = HumanId(2);
const CY: HumanId = HumanId(3);

fn queue() -> MatchQueue {
    MatchQueue::new(Arc::new(ManualClock::new(0)))
}

// =========================================================================
// Pairing
// =========================================================================

#[test]
fn test_try_pair_returns_first_two_in_order() {
    let mut q = queue();
    q.enqueue(ADA, "ada").unwrap();
    q.enqueue(BOB, "bob").unwrap();

    let pairing = q.try_pair().expect("two waiting");

    assert_eq!(
        pairing,
        Pairing {
            participants: [ADA.into(), BOB.into()],
            display_names: ["ada".to_owned(), "bob".to_owned()],
            is_bot: false,
        }
    );
    assert!(q.is_empty());
    assert_eq!(q.try_pair(), None);
}

#[test]
fn test_try_pair_leaves_third_waiting() {
    let mut q = queue();
    q.enqueue(ADA, "ada").unwrap();
    q.enqueue(BOB, "bob").unwrap();
    q.enqueue(CY, "cy").unwrap();

    let pairing = q.try_pair().unwrap();

    assert_eq!(pairing.participants, [ADA.into(), BOB.into()]);
    assert_eq!(q.len(), 1);
    assert!(q.contains(CY));
}

#[test]
fn test_enqueue_order_is_arrival_order_not_id_order() {
    let mut q = queue();
    q.enqueue(CY, "cy").unwrap();
    q.enqueue(ADA, "ada").unwrap();

    let pairing = q.try_pair().unwrap();

    assert_eq!(pairing.participants, [CY.into(), ADA.into()]);
}

// =========================================================================
// Bot-fallback race
// =========================================================================

#[test]
fn test_match_with_bot_after_pairing_is_none() {
    let mut q = queue();
    q.enqueue(ADA, "ada").unwrap();
    q.enqueue(BOB, "bob").unwrap();
    q.try_pair().unwrap();

    // ADA's fallback timer fires late: nothing to do.
    assert_eq!(q.match_with_bot(ADA), None);
    assert_eq!(q.match_with_bot(BOB), None);
}

#[test]
fn test_match_with_bot_fires_once() {
    let mut q = queue();
    q.enqueue(ADA, "ada").unwrap();

    let first = q.match_with_bot(ADA);
    let second = q.match_with_bot(ADA);

    assert!(first.is_some_and(|p| p.participants[1] == Participant::Bot));
    assert_eq!(second, None);
}

#[test]
fn test_pairing_after_bot_fallback_skips_the_removed_participant() {
    let mut q = queue();
    q.enqueue(ADA, "ada").unwrap();
    q.match_with_bot(ADA).unwrap();
    q.enqueue(BOB, "bob").unwrap();

    assert_eq!(q.try_pair(), None);
    assert!(q.contains(BOB));
}

#[test]
fn test_removed_participant_never_gets_bot() {
    let mut q = queue();
    q.enqueue(ADA, "ada").unwrap();

    assert!(q.remove(ADA));

    assert_eq!(q.match_with_bot(ADA), None);
}
