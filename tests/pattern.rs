//! Fixture evaluator grounded on `PatternsIntoPatternHashMapsEvaluator.py`:
//! deduplicates small tile patterns into a canonical hash map, across a
//! reduced 2-bit flip space (`None`, `HFlip`).
//!
//! The original evaluator points back at a previously-ADDed `Pattern`
//! object via a `weakref`, since the solver deep-copies destinations across
//! forks and a strong reference would duplicate the whole object. This port
//! uses a stable numeric id assigned at source construction instead (Design
//! Note "Weak references across forks"): the engine never retains an
//! evaluator's own source past the subset's lifetime, so an id is simpler
//! and needs no special drop handling.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use retrograph_solver::{ConstraintSolver, Evaluator, Move, Score};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Flip {
    None,
    HFlip,
}

const ALL_FLIPS: [Flip; 2] = [Flip::None, Flip::HFlip];

const SCORE_PENALTY_PER_UNIQUE_HASH_OPTION: i64 = 10;
const SCORE_PENALTY_ADD_NEW_PATTERN: i64 = 10_000;
const SCORE_ADJUST_NO_FLIPPING: i64 = -1;

#[derive(Debug, Clone)]
struct Pattern {
    id: usize,
    width: usize,
    pixels: Vec<u8>,
    allow_hflip: bool,
}

impl Pattern {
    fn new(id: usize, width: usize, pixels: Vec<u8>, allow_hflip: bool) -> Self {
        Pattern { id, width, pixels, allow_hflip }
    }

    fn flipped_pixels(&self, flip: Flip) -> Vec<u8> {
        match flip {
            Flip::None => self.pixels.clone(),
            Flip::HFlip => {
                let height = self.pixels.len() / self.width;
                let mut out = Vec::with_capacity(self.pixels.len());
                for y in 0..height {
                    for x in (0..self.width).rev() {
                        out.push(self.pixels[y * self.width + x]);
                    }
                }
                out
            }
        }
    }

    /// Hash of this pattern's pixel content under `flip`, or `None` if the
    /// flip isn't permitted for this source.
    fn hash_for_flip(&self, flip: Flip) -> Option<u64> {
        if flip == Flip::HFlip && !self.allow_hflip {
            return None;
        }
        let mut hasher = DefaultHasher::new();
        self.flipped_pixels(flip).hash(&mut hasher);
        Some(hasher.finish())
    }

    fn unique_hash_count(&self) -> usize {
        let mut hashes: Vec<u64> = ALL_FLIPS.iter().filter_map(|&f| self.hash_for_flip(f)).collect();
        hashes.sort_unstable();
        hashes.dedup();
        hashes.len()
    }
}

/// `destination[hash] == pattern_id` that first claimed that hash. Always
/// instantiated, so `is_destination_empty` is unconditionally false.
type PatternMap = HashMap<u64, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChangeList {
    /// `Some(id)` if this move matches a pattern already present under that
    /// id's hash; `None` if it adds a new canonical entry.
    matched_id: Option<usize>,
    flip: Flip,
}

struct Candidate {
    change_list: ChangeList,
    base_score: i64,
}

struct PatternEvaluator {
    source_index: usize,
    source: Pattern,
    destination_to_candidates: BTreeMap<usize, Option<Vec<Candidate>>>,
}

impl Evaluator for PatternEvaluator {
    type Source = Pattern;
    type Destination = PatternMap;
    type ChangeList = ChangeList;

    fn make(source_index: usize, source: Pattern) -> Self {
        PatternEvaluator { source_index, source, destination_to_candidates: BTreeMap::new() }
    }

    fn update_moves_for_destination(&mut self, dest_index: usize, destination: &PatternMap) {
        if let Some(None) = self.destination_to_candidates.get(&dest_index) {
            return;
        }

        let mut candidates = Vec::new();
        for flip in ALL_FLIPS {
            let Some(hash_val) = self.source.hash_for_flip(flip) else { continue };
            let matched_id = destination.get(&hash_val).copied();
            let change_list = ChangeList { matched_id, flip };
            let base_score = score_for_changes(&self.source, &change_list);
            candidates.push(Candidate { change_list, base_score });
        }

        if candidates.is_empty() {
            self.destination_to_candidates.insert(dest_index, None);
        } else {
            self.destination_to_candidates.insert(dest_index, Some(candidates));
        }
    }

    fn best_moves(&self) -> (Score, Vec<Move<ChangeList>>) {
        let num_moves: usize =
            self.destination_to_candidates.values().flatten().map(|c| c.len()).sum();
        let only_one_move = num_moves == 1;

        let mut best_score = Score::PosInfinity;
        let mut best_moves = Vec::new();
        for (&dest_index, candidates) in self.destination_to_candidates.iter() {
            let Some(candidates) = candidates else { continue };
            for candidate in candidates {
                // We matched somebody, and have no other choices -- it's free.
                let score = if only_one_move && candidate.change_list.matched_id.is_some() {
                    Score::NegInfinity
                } else {
                    Score::Finite(candidate.base_score)
                };
                let mv = Move::new(self.source_index, dest_index, candidate.change_list);
                match score.cmp(&best_score) {
                    std::cmp::Ordering::Less => {
                        best_score = score;
                        best_moves.clear();
                        best_moves.push(mv);
                    }
                    std::cmp::Ordering::Equal => best_moves.push(mv),
                    std::cmp::Ordering::Greater => {}
                }
            }
        }
        (best_score, best_moves)
    }

    fn apply_changes(source: &Pattern, destination: &mut PatternMap, change_list: &ChangeList) {
        if change_list.matched_id.is_none() {
            if let Some(hash_val) = source.hash_for_flip(change_list.flip) {
                destination.entry(hash_val).or_insert(source.id);
            }
        }
    }

    fn is_destination_empty(_destination: &PatternMap) -> bool {
        false
    }
}

fn score_for_changes(source: &Pattern, change_list: &ChangeList) -> i64 {
    let mut score = 0i64;
    if change_list.matched_id.is_none() {
        // Prefer matching an existing pattern over adding a new one.
        score += SCORE_PENALTY_ADD_NEW_PATTERN;
    }
    if change_list.flip == Flip::None {
        score += SCORE_ADJUST_NO_FLIPPING;
    }
    score += source.unique_hash_count() as i64 * SCORE_PENALTY_PER_UNIQUE_HASH_OPTION;
    score
}

fn run_to_completion(solver: &mut ConstraintSolver<PatternEvaluator>) {
    let mut guard = 0;
    while !solver.is_exhausted() {
        solver.update();
        guard += 1;
        assert!(guard < 100_000, "search did not terminate");
    }
}

#[test]
fn dedups_a_horizontally_flipped_pattern_against_its_canonical_form() {
    // A's canonical (no-flip) pixel content.
    let a = Pattern::new(0, 2, vec![1, 2], false);
    // A_hflip's *unflipped* content is the mirror of A's; flipping it
    // horizontally reproduces A's canonical hash exactly.
    let a_hflip = Pattern::new(1, 2, vec![2, 1], true);
    // B shares no pixel content with either.
    let b = Pattern::new(2, 2, vec![3, 4], false);

    let sources = vec![a.clone(), a_hflip.clone(), b.clone()];
    let destinations: Vec<PatternMap> = vec![HashMap::new()];

    let mut solver = ConstraintSolver::<PatternEvaluator>::new(sources, destinations);
    run_to_completion(&mut solver);

    assert!(!solver.solutions().is_empty());

    for solution in solver.solutions() {
        let mut mapped: Vec<usize> = solution.iter().map(|mv| mv.source_index).collect();
        mapped.sort_unstable();
        assert_eq!(mapped, vec![0, 1, 2]);

        let move_for = |source_index: usize| {
            solution.iter().find(|mv| mv.source_index == source_index).expect("source mapped")
        };

        let a_move = move_for(0);
        assert_eq!(a_move.change_list.matched_id, None, "A is the canonical ADD");
        assert_eq!(a_move.change_list.flip, Flip::None);

        let a_hflip_move = move_for(1);
        assert_eq!(
            a_hflip_move.change_list.matched_id,
            Some(a.id),
            "A_hflip must MATCH A's canonical entry"
        );
        assert_eq!(a_hflip_move.change_list.flip, Flip::HFlip);

        let b_move = move_for(2);
        assert_eq!(b_move.change_list.matched_id, None, "B shares no content, must ADD");
        assert_eq!(b_move.change_list.flip, Flip::None);
    }
}

#[test]
fn pattern_dedup_is_deterministic_across_runs() {
    let sources = vec![
        Pattern::new(0, 2, vec![1, 2], false),
        Pattern::new(1, 2, vec![2, 1], true),
        Pattern::new(2, 2, vec![3, 4], false),
    ];

    let run = || {
        let destinations: Vec<PatternMap> = vec![HashMap::new()];
        let mut solver = ConstraintSolver::<PatternEvaluator>::new(sources.clone(), destinations);
        run_to_completion(&mut solver);
        solver.solutions().to_vec()
    };

    assert_eq!(run(), run());
}

#[test]
fn apply_changes_never_duplicates_an_existing_hash_entry() {
    let a = Pattern::new(0, 2, vec![1, 2], false);
    let a_hflip = Pattern::new(1, 2, vec![2, 1], true);

    let mut destination: PatternMap = HashMap::new();
    PatternEvaluator::apply_changes(&a, &mut destination, &ChangeList { matched_id: None, flip: Flip::None });
    assert_eq!(destination.len(), 1);

    PatternEvaluator::apply_changes(
        &a_hflip,
        &mut destination,
        &ChangeList { matched_id: Some(a.id), flip: Flip::HFlip },
    );
    // A MATCH never inserts: the hash already resolves to A's id.
    assert_eq!(destination.len(), 1);
    assert_eq!(destination.get(&a.hash_for_flip(Flip::None).unwrap()), Some(&a.id));
}
