/// Property-based tests for bracket generation and advancement using proptest
///
/// Brackets of random sizes are generated and played out with randomly
/// chosen winners; structural counts must hold whatever the results.
use bracket_engine::bracket::{
    Advancer, Board, Entrant, EntrantId, MatchReport, TournamentFormat, champion, generator,
    linker,
    ordering::{random_order, seeded_order},
    validate_bracket,
};
use chrono::Utc;
use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};
use std::collections::{HashMap, HashSet};

fn bracket(format: TournamentFormat, n: EntrantId) -> Board {
    let entrants: Vec<EntrantId> = (1..=n).collect();
    let mut board = Board::new(1, Vec::new()).unwrap();
    generator::generate(format, &mut board, &entrants, Utc::now()).unwrap();
    linker::link(&mut board, format).unwrap();
    Advancer::new(&mut board, format, Utc::now())
        .reseat_completed()
        .unwrap();
    board
}

// Play every ready match, slot A winning when the next coin is true
fn play_out(board: &mut Board, format: TournamentFormat, coins: &[bool]) {
    let mut flips = coins.iter().cycle();
    loop {
        let next = board.sorted_ids().into_iter().find(|id| {
            board
                .get(*id)
                .is_some_and(|m| !m.is_completed() && m.is_ready())
        });
        let Some(match_id) = next else { break };

        let m = board.get(match_id).unwrap();
        let (a, b) = (m.slot_a.entrant().unwrap(), m.slot_b.entrant().unwrap());
        let winner_id = if *flips.next().unwrap_or(&true) { a } else { b };

        Advancer::new(board, format, Utc::now())
            .report(&MatchReport {
                match_id,
                score_a: 1,
                score_b: 0,
                winner_id,
            })
            .unwrap();
    }
}

// Strategy for entrants with optional seeds and unique ids
fn entrants_strategy() -> impl Strategy<Value = Vec<Entrant>> {
    prop::collection::vec(prop::option::of(1u32..50), 0..40).prop_map(|seeds| {
        seeds
            .into_iter()
            .enumerate()
            .map(|(i, seed)| Entrant::new(i as EntrantId + 1, seed))
            .collect()
    })
}

proptest! {
    #[test]
    fn test_round_robin_schedules_each_pair_once(n in 2i64..40) {
        let board = bracket(TournamentFormat::RoundRobin, n);
        let expected = (n * (n - 1) / 2) as usize;

        prop_assert_eq!(board.len(), expected);
        let pairs: HashSet<_> = board.matches().filter_map(|m| m.pairing()).collect();
        prop_assert_eq!(pairs.len(), expected);
        prop_assert!(board.matches().all(|m| m.round == 1));
    }

    #[test]
    fn test_single_elimination_decisive_matches(
        n in 2i64..65,
        coins in prop::collection::vec(any::<bool>(), 1..64),
    ) {
        let format = TournamentFormat::SingleElimination;
        let mut board = bracket(format, n);
        prop_assert!(validate_bracket(&board, format).is_ok());
        play_out(&mut board, format, &coins);

        let decisive = board.matches().filter(|m| m.is_completed() && !m.is_bye()).count();
        prop_assert_eq!(decisive, n as usize - 1);
        prop_assert_eq!(board.matches().filter(|m| m.next.is_none()).count(), 1);
        prop_assert!(champion(&board, format).is_some());
    }

    #[test]
    fn test_double_elimination_needs_two_losses(
        n in 2i64..40,
        coins in prop::collection::vec(any::<bool>(), 1..64),
    ) {
        let format = TournamentFormat::DoubleElimination;
        let mut board = bracket(format, n);
        prop_assert!(validate_bracket(&board, format).is_ok());
        play_out(&mut board, format, &coins);

        let winner = champion(&board, format);
        prop_assert!(winner.is_some());

        let mut losses: HashMap<EntrantId, u32> = HashMap::new();
        for m in board.matches() {
            if let Some(loser) = m.loser_id() {
                *losses.entry(loser).or_default() += 1;
            }
        }
        for id in 1..=n {
            let count = losses.get(&id).copied().unwrap_or(0);
            if Some(id) == winner {
                prop_assert!(count <= 1);
            } else {
                prop_assert_eq!(count, 2);
            }
        }
    }

    #[test]
    fn test_seeded_order_sorts_by_seed(entrants in entrants_strategy()) {
        let ordered = seeded_order(&entrants);
        prop_assert_eq!(ordered.len(), entrants.len());

        let by_id: HashMap<EntrantId, Option<u32>> =
            entrants.iter().map(|e| (e.id, e.seed)).collect();
        let keys: Vec<(bool, Option<u32>)> = ordered
            .iter()
            .map(|id| (by_id[id].is_none(), by_id[id]))
            .collect();
        prop_assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_random_order_is_a_permutation(entrants in entrants_strategy(), seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ordered = random_order(&entrants, &mut rng);
        ordered.sort_unstable();

        let ids: Vec<EntrantId> = entrants.iter().map(|e| e.id).collect();
        prop_assert_eq!(ordered, ids);
    }
}
