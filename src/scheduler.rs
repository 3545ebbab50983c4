//! The sealing scheduler: delay computation and the cancellable seal task
//! (spec §4.8).
//!
//! Grounded on `fastClique.go`'s `Seal` (the parent-age delay, the spawned
//! goroutine with its `select { <-time.After(delay) | <-stop }`, and the
//! double recent-blocks recheck) and on `getOutOfTurnootWait`'s two-band
//! distribution. The `rand`-driven random band is grounded on the
//! paritytech clique-variant `Snapshot::calc_next_timestamp`, which is the
//! only file in the corpus that reaches for `rand::Rng::gen_range` for this
//! exact purpose.

use crate::config::{ChainHeaderReader, Clock, SignerFn};
use crate::constants::{
    DIFF_IN_TURN, DIFF_NO_TURN, EXTRA_SEAL_LENGTH, MAX_BLOCKS_OOT, OOT_LOWER, OOT_MAX, OOT_MIN,
    OOT_UPPER,
};
use crate::errors::PoaConsensusError;
use crate::header::clique_rlp;
use crate::snapshot::Snapshot;
use crate::types::{Address, Header};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Draw an out-of-turn wait duration from the normative two-band
/// distribution (spec §4.8). With probability 1/3 the draw is uniform over
/// `[OOT_MIN, OOT_MIN+OOT_LOWER)`; otherwise it is uniform over
/// `[OOT_MAX-OOT_UPPER, OOT_MAX)`.
pub fn oot_wait(rng: &mut impl Rng) -> Duration {
    if rng.gen_range(0..3) == 0 {
        Duration::from_millis(OOT_MIN + rng.gen_range(0..OOT_LOWER))
    } else {
        Duration::from_millis((OOT_MAX - OOT_UPPER) + rng.gen_range(0..OOT_UPPER))
    }
}

/// Recent-blocks-by-validator fold used by both seal verification and the
/// scheduler's own recheck (spec §4.6 step 2, §4.8 step 3/c).
pub fn recent_block_count(snapshot: &Snapshot, signer: &Address, current_block: u64) -> usize {
    let window = snapshot.signers.len() as u64 * 2;
    snapshot
        .recents
        .iter()
        .filter(|(blk, s)| *s == signer && current_block.saturating_sub(**blk) <= window)
        .count()
}

fn parent_age_delay(period_ms: u64, parent_time_ms: u64, now_ms: u64) -> Duration {
    let age = now_ms.saturating_sub(parent_time_ms);
    if age < period_ms {
        Duration::from_millis(period_ms - age)
    } else {
        Duration::ZERO
    }
}

/// Compute the delay before a local signer should emit block `header.number`,
/// without yet spawning the task (spec §4.8 step 4).
pub fn compute_delay(
    in_turn: bool,
    period_ms: u64,
    parent_time_ms: u64,
    now_ms: u64,
    rng: &mut impl Rng,
) -> Duration {
    let base = parent_age_delay(period_ms, parent_time_ms, now_ms);
    if in_turn {
        base
    } else {
        base + oot_wait(rng)
    }
}

/// Parameters for [`spawn_seal`].
pub struct SealRequest {
    pub header: Header,
    pub snapshot: Snapshot,
    pub signer: Address,
    pub delay: Duration,
    pub in_turn: bool,
}

/// Spawn the cancellable sealing task (spec §4.8 step 5).
///
/// Sleeps for `request.delay`, aborting immediately on `cancel`. If
/// out-of-turn and a competing block has already arrived, aborts silently.
/// Re-fetches the snapshot, rechecks the local signer's recent-block budget,
/// signs, and emits on `results` -- performing the arrival recheck once more
/// immediately before sending.
pub fn spawn_seal(
    request: SealRequest,
    chain: Arc<dyn ChainHeaderReader>,
    sign_fn: Arc<dyn SignerFn>,
    clock: Arc<dyn Clock>,
    results: mpsc::Sender<Header>,
    mut cancel: oneshot::Receiver<()>,
) {
    tokio::spawn(async move {
        let SealRequest { mut header, snapshot, signer, delay, in_turn } = request;
        let number = header.number;

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut cancel => return,
        }

        if !in_turn && block_has_arrived(chain.as_ref(), number) {
            debug!(number, "competing block arrived during seal delay, aborting");
            return;
        }

        let recheck_count = recent_block_count(&snapshot, &signer, number);
        if !in_turn && recheck_count + 1 >= MAX_BLOCKS_OOT as usize {
            debug!(number, "out-of-turn budget exhausted after delay, aborting");
            return;
        }

        let payload = match clique_rlp(&header) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(number, error = %e, "failed to encode header for signing, aborting");
                return;
            }
        };
        let signature = match sign_fn.sign(&signer, &payload) {
            Ok(sig) => sig,
            Err(e) => {
                debug!(number, error = %e, "signer callback failed, aborting");
                return;
            }
        };

        let mut extra = header.extra_data.to_vec();
        let tail_start = extra.len().saturating_sub(EXTRA_SEAL_LENGTH);
        extra.truncate(tail_start);
        extra.extend_from_slice(&signature);
        header.extra_data = extra.into();

        let _ = clock.now_ms();

        if !in_turn && block_has_arrived(chain.as_ref(), number) {
            debug!(number, "competing block arrived just before emit, aborting");
            return;
        }

        let _ = results.send(header).await;
    });
}

fn block_has_arrived(chain: &dyn ChainHeaderReader, target_number: u64) -> bool {
    chain.current_header().map(|h| h.number >= target_number).unwrap_or(false)
}

/// `calc_difficulty(snapshot, signer)` (spec §4.9).
pub fn calc_difficulty(snapshot: &Snapshot, signer: &Address) -> u64 {
    if snapshot.inturn(snapshot.number + 1, signer) {
        DIFF_IN_TURN
    } else {
        DIFF_NO_TURN
    }
}

/// Whether `signature` paired with `header`'s turn-ness yields the correct
/// difficulty (spec §4.6 step 5). Exposed so both `verify_seal` and tests
/// can share one source of truth.
pub fn difficulty_matches_turn(difficulty: u64, in_turn: bool) -> bool {
    if in_turn {
        difficulty == DIFF_IN_TURN
    } else {
        difficulty == DIFF_NO_TURN
    }
}

/// Surface a configuration-time failure synchronously (spec §7
/// "sealing returns configuration errors synchronously").
pub fn check_authorized(snapshot: &Snapshot, signer: &Address) -> Result<(), PoaConsensusError> {
    if snapshot.signers.contains(signer) {
        Ok(())
    } else {
        Err(PoaConsensusError::UnauthorizedSigner { signer: *signer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn oot_wait_stays_within_normative_bands() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let d = oot_wait(&mut rng).as_millis() as u64;
            let low_band = (OOT_MIN..OOT_MIN + OOT_LOWER).contains(&d);
            let high_band = ((OOT_MAX - OOT_UPPER)..OOT_MAX).contains(&d);
            assert!(low_band || high_band, "{d} not in either band");
        }
    }

    #[test]
    fn in_turn_delay_is_just_parent_age() {
        let mut rng = StdRng::seed_from_u64(1);
        let d = compute_delay(true, 1000, 800, 1000, &mut rng);
        assert_eq!(d, Duration::from_millis(800));
    }

    #[test]
    fn in_turn_delay_floors_at_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let d = compute_delay(true, 1000, 0, 5000, &mut rng);
        assert_eq!(d, Duration::ZERO);
    }

    #[test]
    fn out_of_turn_delay_adds_oot_wait() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = compute_delay(true, 1000, 800, 1000, &mut rng);
        let mut rng2 = StdRng::seed_from_u64(7);
        let oot = compute_delay(false, 1000, 800, 1000, &mut rng2);
        assert!(oot > base);
    }
}
