use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{SeedableRng, rngs::StdRng};
use setback::game::{
    Action, Deck, GameRecord, Phase, Suit,
    constants::{HAND_SIZE, NUM_SEATS},
    scoring::calculate,
};
use std::hint::black_box;

/// Helper to create a table with four seated players, dealt and ready to bid
fn setup_dealt_table(seed: u64) -> GameRecord {
    let mut record = GameRecord::default();
    for seat in 0..NUM_SEATS {
        let join = Action::JoinSeat {
            seat,
            name: format!("player{seat}"),
        };
        record = record.apply(None, &join).unwrap();
    }
    record
        .apply_with(Some(0), &Action::StartGame, &mut StdRng::seed_from_u64(seed))
        .unwrap()
}

/// Plays the dealt hand to the scoring phase, always taking the first legal card
fn play_to_scoring(mut record: GameRecord) -> GameRecord {
    let act = |record: &GameRecord, action: Action| {
        record.apply(Some(record.seat_to_act), &action).unwrap()
    };
    record = act(&record, Action::PlaceBid { amount: 2 });
    while record.phase == Phase::Bidding {
        record = act(&record, Action::PlaceBid { amount: 0 });
    }
    record = act(&record, Action::SelectTrump { suit: Suit::Spades });
    record = act(&record, Action::TakeKitty {
        cards: record.kitty.clone(),
    });
    let hand = record.player(record.seat_to_act).unwrap().hand.clone();
    record = act(&record, Action::Discard {
        cards: hand[HAND_SIZE..].to_vec(),
    });
    while record.phase == Phase::Discard {
        record = act(&record, Action::DiscardAndDraw { cards: Vec::new() });
    }
    while record.phase == Phase::Playing {
        let card = record.legal_plays(record.seat_to_act)[0];
        record = act(&record, Action::PlayCard { card });
    }
    record
}

/// Benchmark shuffling a full deck
fn bench_shuffle(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    c.bench_function("shuffle_deck", |b| {
        b.iter(|| {
            let mut deck = Deck::default();
            deck.shuffle_with(&mut rng);
            black_box(deck)
        });
    });
}

/// Benchmark starting a game (shuffle plus deal to four seats and the kitty)
fn bench_start_game(c: &mut Criterion) {
    c.bench_function("start_game", |b| {
        b.iter(|| black_box(setup_dealt_table(black_box(1))));
    });
}

/// Benchmark a whole hand from the first bid to scoring
fn bench_full_hand(c: &mut Criterion) {
    c.bench_function("full_hand", |b| {
        b.iter_batched(
            || setup_dealt_table(7),
            |record| black_box(play_to_scoring(record)),
            criterion::BatchSize::SmallInput,
        );
    });
}

/// Benchmark scoring a finished hand
fn bench_scoring(c: &mut Criterion) {
    let record = play_to_scoring(setup_dealt_table(3));
    let trump = record.trump.unwrap();
    let bidder = record.bid_winner.unwrap();

    c.bench_function("score_hand", |b| {
        b.iter(|| {
            calculate(
                black_box(&record.completed_tricks),
                black_box(&record.captured),
                trump,
                bidder,
                record.winning_bid,
            )
        });
    });
}

/// Benchmark view generation for each seat and a spectator
fn bench_view_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("view_generation");
    let record = setup_dealt_table(5);

    for seat in [None, Some(0)] {
        let label = seat.map_or("spectator".to_string(), |s| format!("seat_{s}"));
        group.bench_with_input(BenchmarkId::from_parameter(label), &seat, |b, &seat| {
            b.iter(|| black_box(record.view_for(seat)));
        });
    }

    group.bench_function("broadcast_all_seats", |b| {
        b.iter(|| {
            let state = record.table_view();
            (0..NUM_SEATS)
                .map(|seat| record.view_with(state.clone(), Some(seat)))
                .collect::<Vec<_>>()
        });
    });

    group.finish();
}

criterion_group!(deck_operations, bench_shuffle, bench_start_game);

criterion_group!(
    game_operations,
    bench_full_hand,
    bench_scoring,
    bench_view_generation,
);

criterion_main!(deck_operations, game_operations);
