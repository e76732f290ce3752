//! Full-hand walkthroughs over the public engine API.
//!
//! Each test seats four players, plays whole hands through `GameRecord::apply`
//! and checks the table between steps.

use rand::{SeedableRng, rngs::StdRng};
use setback::game::{
    Action, ActionError, Card, GameRecord, Phase, Presence, SeatIndex, Suit,
    constants::{DECK_SIZE, HAND_SIZE, NUM_SEATS},
};
use std::collections::HashSet;

fn step(record: &GameRecord, seat: SeatIndex, action: Action, rng: &mut StdRng) -> GameRecord {
    let next = record
        .apply_with(Some(seat), &action, rng)
        .unwrap_or_else(|e| panic!("seat {seat} {action}: {e}"));
    assert_conserved(&next);
    next
}

fn assert_conserved(record: &GameRecord) {
    if record.phase == Phase::Lobby {
        return;
    }
    let cards = record.all_cards();
    assert_eq!(cards.len(), DECK_SIZE, "phase {}", record.phase);
    let unique: HashSet<Card> = cards.into_iter().collect();
    assert_eq!(unique.len(), DECK_SIZE);
}

fn seated(target_score: i32) -> GameRecord {
    let mut record = GameRecord::new(target_score);
    for seat in 0..NUM_SEATS {
        let join = Action::JoinSeat {
            seat,
            name: format!("p{seat}"),
        };
        record = record.apply(None, &join).unwrap();
    }
    record
}

/// Plays one hand from bidding to scoring. The first bidder bids 3 and
/// everyone else passes; the bid winner names `trump`.
fn play_hand(mut record: GameRecord, trump: Suit, rng: &mut StdRng) -> GameRecord {
    assert_eq!(record.phase, Phase::Bidding);
    let opener = record.seat_to_act;
    record = step(&record, opener, Action::PlaceBid { amount: 3 }, rng);
    while record.phase == Phase::Bidding {
        let seat = record.seat_to_act;
        record = step(&record, seat, Action::PlaceBid { amount: 0 }, rng);
    }
    assert_eq!(record.phase, Phase::Kitty);
    assert_eq!(record.bid_winner, Some(opener));

    record = step(&record, opener, Action::SelectTrump { suit: trump }, rng);
    let kitty = record.kitty.clone();
    record = step(&record, opener, Action::TakeKitty { cards: kitty }, rng);
    let hand = record.player(opener).unwrap().hand.clone();
    let extra = hand[HAND_SIZE..].to_vec();
    record = step(&record, opener, Action::Discard { cards: extra }, rng);

    while record.phase == Phase::Discard {
        let seat = record.seat_to_act;
        let hand = &record.player(seat).unwrap().hand;
        let cards = hand[..2].to_vec();
        record = step(&record, seat, Action::DiscardAndDraw { cards }, rng);
    }
    assert_eq!(record.phase, Phase::Playing);
    assert_eq!(record.seat_to_act, opener);
    for seat in 0..NUM_SEATS {
        assert_eq!(record.player(seat).unwrap().hand.len(), HAND_SIZE);
    }

    while record.phase == Phase::Playing {
        let seat = record.seat_to_act;
        let card = record.legal_plays(seat)[0];
        record = step(&record, seat, Action::PlayCard { card }, rng);
    }
    record
}

// === Hand Flow Tests ===

#[test]
fn test_hand_plays_through_to_scoring() {
    let mut rng = StdRng::seed_from_u64(7);
    let record = seated(52);
    let record = step(&record, 0, Action::StartGame, &mut rng);
    assert_eq!(record.seat_to_act, 1);

    let record = play_hand(record, Suit::Hearts, &mut rng);
    assert_eq!(record.phase, Phase::Scoring);
    assert_eq!(record.tricks_played, 6);
    assert!(record.current_trick.is_none());
    assert!(record.last_trick.is_some());
    assert!(record.seats.iter().flatten().all(|p| p.hand.is_empty()));
}

#[test]
fn test_settlement_applies_deltas_once() {
    let mut rng = StdRng::seed_from_u64(11);
    let record = seated(52);
    let record = step(&record, 0, Action::StartGame, &mut rng);
    let mut record = play_hand(record, Suit::Spades, &mut rng);

    let settlement = record.settle_hand().unwrap();
    let result = &settlement.breakdown;
    assert_eq!(result.bid_amount, 3);
    assert_eq!(record.teams[0].score, result.deltas[0]);
    assert_eq!(record.teams[1].score, result.deltas[1]);
    if result.bid_made {
        assert!(result.points[result.bidder_team] >= 3);
    } else {
        assert_eq!(result.deltas[result.bidder_team], -3);
    }
    assert!(record.settle_hand().is_none());
    assert_eq!(record.hand_result.as_ref(), Some(result));
}

#[test]
fn test_new_hand_rotates_dealer_and_keeps_scores() {
    let mut rng = StdRng::seed_from_u64(3);
    let record = seated(52);
    let record = step(&record, 0, Action::StartGame, &mut rng);
    let mut record = play_hand(record, Suit::Clubs, &mut rng);
    record.settle_hand();
    let scores = record.teams;

    let record = step(&record, 2, Action::NewHand, &mut rng);
    assert_eq!(record.phase, Phase::Bidding);
    assert_eq!(record.dealer, 1);
    assert_eq!(record.seat_to_act, 2);
    assert_eq!(record.teams, scores);
    assert!(record.hand_result.is_none());
    assert!(record.out_of_play.is_empty());
}

#[test]
fn test_game_runs_to_finish_and_restarts() {
    let mut rng = StdRng::seed_from_u64(42);
    let record = seated(1);
    let mut record = step(&record, 0, Action::StartGame, &mut rng);

    // Some team must reach 1 point within a handful of hands.
    for _ in 0..20 {
        record = play_hand(record, Suit::Diamonds, &mut rng);
        let settlement = record.settle_hand().unwrap();
        if let Some(team) = settlement.winner {
            assert_eq!(record.phase, Phase::Finished);
            assert_eq!(record.teams[team].games_won, 1);
            break;
        }
        record = step(&record, 0, Action::NewHand, &mut rng);
    }
    assert_eq!(record.phase, Phase::Finished);
    let games_won = record.teams.map(|t| t.games_won);

    let record = step(&record, 1, Action::NewHand, &mut rng);
    assert_eq!(record.phase, Phase::Lobby);
    assert_eq!(record.teams.map(|t| t.score), [0, 0]);
    assert_eq!(record.teams.map(|t| t.games_won), games_won);
    assert_eq!(record.seated_count(), NUM_SEATS);
    assert_eq!(record.house, Some(0));
}

// === Seat Takeover Tests ===

#[test]
fn test_vacated_seat_taken_over_mid_hand() {
    let mut rng = StdRng::seed_from_u64(5);
    let record = seated(52);
    let record = step(&record, 0, Action::StartGame, &mut rng);
    let hand = record.player(3).unwrap().hand.clone();
    let old_credential = record.player(3).unwrap().credential.clone().unwrap();

    let record = step(&record, 3, Action::LeaveSeat, &mut rng);
    let player = record.player(3).unwrap();
    assert_eq!(player.presence, Presence::Vacated);
    assert!(player.name.is_empty());
    assert_eq!(player.hand, hand);

    let record = record
        .apply_with(
            None,
            &Action::JoinSeat {
                seat: 3,
                name: "dee".to_string(),
            },
            &mut rng,
        )
        .unwrap();
    let player = record.player(3).unwrap();
    assert!(player.is_connected());
    assert_eq!(player.name, "dee");
    assert_eq!(player.hand, hand);
    assert!(!player.credential.as_ref().unwrap().matches(old_credential.as_str()));
}

#[test]
fn test_rejected_action_leaves_record_untouched() {
    let mut rng = StdRng::seed_from_u64(9);
    let record = seated(52);
    let record = step(&record, 0, Action::StartGame, &mut rng);
    let before = record.clone();

    let out_of_turn = record.apply_with(Some(3), &Action::PlaceBid { amount: 2 }, &mut rng);
    assert_eq!(out_of_turn.unwrap_err(), ActionError::NotYourTurn);
    let wrong_phase = record.apply_with(Some(1), &Action::PlayCard {
        card: record.player(1).unwrap().hand[0],
    }, &mut rng);
    assert!(matches!(wrong_phase, Err(ActionError::WrongPhase(Phase::Bidding))));
    assert_eq!(record, before);
}
