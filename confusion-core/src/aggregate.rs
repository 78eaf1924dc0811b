//! Error aggregation across many alignments
//!
//! Each mismatched position of an aligned pair becomes one error event. Events
//! are tallied per distinct key and ranked by descending count. Keys with equal
//! counts keep the order in which they were first recorded, so a batch fed in
//! the same order always ranks the same way.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;

use serde::Serialize;

use crate::alignment::AlignedPair;

/// Classification of one mismatched aligned position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorEvent<T> {
    /// Reference token aligned against a gap
    Deletion(T),
    /// Hypothesis token aligned against a gap
    Insertion(T),
    /// (reference token, hypothesis token)
    Substitution(T, T),
}

impl<T: Clone> ErrorEvent<&T> {
    pub fn cloned(self) -> ErrorEvent<T> {
        match self {
            ErrorEvent::Deletion(token) => ErrorEvent::Deletion(token.clone()),
            ErrorEvent::Insertion(token) => ErrorEvent::Insertion(token.clone()),
            ErrorEvent::Substitution(r, h) => ErrorEvent::Substitution(r.clone(), h.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Tally {
    count: u64,
    first_seen: usize,
}

/// Occurrence counts per distinct key
#[derive(Debug, Clone)]
pub struct FrequencyTable<K> {
    tallies: HashMap<K, Tally>,
    next_order: usize,
}

impl<K: Eq + Hash> FrequencyTable<K> {
    pub fn new() -> Self {
        Self {
            tallies: HashMap::new(),
            next_order: 0,
        }
    }

    /// Record one occurrence of `key`
    pub fn add(&mut self, key: K) {
        self.add_count(key, 1);
    }

    pub fn add_count(&mut self, key: K, count: u64) {
        match self.tallies.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().count += count,
            Entry::Vacant(entry) => {
                entry.insert(Tally {
                    count,
                    first_seen: self.next_order,
                });
                self.next_order += 1;
            }
        }
    }

    /// Occurrences of `key`, 0 if never recorded
    pub fn count(&self, key: &K) -> u64 {
        self.tallies.get(key).map(|t| t.count).unwrap_or(0)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.tallies.values().map(|t| t.count).sum()
    }

    /// Entries by count descending, ties in first-recorded order
    pub fn ranked(&self) -> Vec<(&K, u64)> {
        let mut entries: Vec<_> = self.tallies.iter().collect();
        entries.sort_by_key(|(_, t)| (Reverse(t.count), t.first_seen));
        entries.into_iter().map(|(k, t)| (k, t.count)).collect()
    }

    /// Consuming form of [`FrequencyTable::ranked`]
    pub fn into_ranked(self) -> Vec<(K, u64)> {
        let mut entries: Vec<_> = self.tallies.into_iter().collect();
        entries.sort_by_key(|(_, t)| (Reverse(t.count), t.first_seen));
        entries.into_iter().map(|(k, t)| (k, t.count)).collect()
    }
}

impl<K: Eq + Hash> Default for FrequencyTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// One ranked substitution pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutionCount<T> {
    pub reference: T,
    pub hypothesis: T,
    pub count: u64,
}

/// One ranked deleted or inserted token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenCount<T> {
    pub token: T,
    pub count: u64,
}

/// Finalized, ranked error tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedErrors<T> {
    pub substitutions: Vec<SubstitutionCount<T>>,
    pub deletions: Vec<TokenCount<T>>,
    pub insertions: Vec<TokenCount<T>>,
}

impl<T> Default for RankedErrors<T> {
    fn default() -> Self {
        Self {
            substitutions: Vec::new(),
            deletions: Vec::new(),
            insertions: Vec::new(),
        }
    }
}

/// Position and token totals over every recorded pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub pairs: usize,
    pub reference_tokens: usize,
    pub hypothesis_tokens: usize,
    pub matches: usize,
    pub substitutions: usize,
    pub deletions: usize,
    pub insertions: usize,
}

impl Totals {
    pub fn errors(&self) -> usize {
        self.substitutions + self.deletions + self.insertions
    }

    /// Errors per reference token, micro-averaged over the batch
    ///
    /// Returns 0.0 when nothing was compared, and 1.0 when only insertions
    /// against empty references were seen.
    pub fn error_rate(&self) -> f64 {
        if self.reference_tokens == 0 {
            return if self.errors() == 0 { 0.0 } else { 1.0 };
        }
        self.errors() as f64 / self.reference_tokens as f64
    }
}

/// Accumulates error events from aligned pairs in the order they are recorded
#[derive(Debug, Clone)]
pub struct ErrorAggregator<T> {
    substitutions: FrequencyTable<(T, T)>,
    deletions: FrequencyTable<T>,
    insertions: FrequencyTable<T>,
    totals: Totals,
}

impl<T: Clone + Eq + Hash> ErrorAggregator<T> {
    pub fn new() -> Self {
        Self {
            substitutions: FrequencyTable::new(),
            deletions: FrequencyTable::new(),
            insertions: FrequencyTable::new(),
            totals: Totals::default(),
        }
    }

    /// Tally every mismatched position of one aligned pair
    pub fn record(&mut self, pair: &AlignedPair<T>) {
        let counts = pair.counts();
        self.totals.pairs += 1;
        self.totals.matches += counts.matches;
        self.totals.reference_tokens += counts.matches + counts.substitutions + counts.deletions;
        self.totals.hypothesis_tokens += counts.matches + counts.substitutions + counts.insertions;

        for event in pair.errors() {
            self.record_event(event.cloned());
        }
    }

    fn record_event(&mut self, event: ErrorEvent<T>) {
        match event {
            ErrorEvent::Deletion(token) => {
                self.totals.deletions += 1;
                self.deletions.add(token);
            }
            ErrorEvent::Insertion(token) => {
                self.totals.insertions += 1;
                self.insertions.add(token);
            }
            ErrorEvent::Substitution(reference, hypothesis) => {
                self.totals.substitutions += 1;
                self.substitutions.add((reference, hypothesis));
            }
        }
    }

    pub fn substitutions(&self) -> &FrequencyTable<(T, T)> {
        &self.substitutions
    }

    pub fn deletions(&self) -> &FrequencyTable<T> {
        &self.deletions
    }

    pub fn insertions(&self) -> &FrequencyTable<T> {
        &self.insertions
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Split into the raw (substitutions, deletions, insertions) tables
    pub fn into_tables(
        self,
    ) -> (
        FrequencyTable<(T, T)>,
        FrequencyTable<T>,
        FrequencyTable<T>,
    ) {
        (self.substitutions, self.deletions, self.insertions)
    }

    /// Rank all three tables
    pub fn finish(self) -> (Totals, RankedErrors<T>) {
        let totals = self.totals;
        let ranked = RankedErrors {
            substitutions: self
                .substitutions
                .into_ranked()
                .into_iter()
                .map(|((reference, hypothesis), count)| SubstitutionCount {
                    reference,
                    hypothesis,
                    count,
                })
                .collect(),
            deletions: into_token_counts(self.deletions),
            insertions: into_token_counts(self.insertions),
        };
        (totals, ranked)
    }
}

impl<T: Clone + Eq + Hash> Default for ErrorAggregator<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn into_token_counts<T: Eq + Hash>(table: FrequencyTable<T>) -> Vec<TokenCount<T>> {
    table
        .into_ranked()
        .into_iter()
        .map(|(token, count)| TokenCount { token, count })
        .collect()
}

/// Count substitution pairs, deleted tokens and inserted tokens over a batch
/// of aligned pairs, returned as (substitutions, deletions, insertions)
pub fn aggregate<'a, T, I>(
    pairs: I,
) -> (
    FrequencyTable<(T, T)>,
    FrequencyTable<T>,
    FrequencyTable<T>,
)
where
    T: Clone + Eq + Hash + 'a,
    I: IntoIterator<Item = &'a AlignedPair<T>>,
{
    let mut aggregator = ErrorAggregator::new();
    for pair in pairs {
        aggregator.record(pair);
    }
    aggregator.into_tables()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::align;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn pair(reference: &str, hypothesis: &str) -> AlignedPair<String> {
        align(&words(reference), &words(hypothesis))
    }

    fn s(v: &str) -> String {
        v.to_string()
    }

    #[test]
    fn test_empty_batch() {
        let (subs, dels, ins) = aggregate(Vec::<&AlignedPair<String>>::new());

        assert!(subs.is_empty());
        assert!(dels.is_empty());
        assert!(ins.is_empty());
        assert!(subs.ranked().is_empty());
    }

    #[test]
    fn test_pure_insertion_counts() {
        let pairs = vec![pair("", "x y")];
        let (subs, dels, ins) = aggregate(&pairs);

        assert_eq!(ins.count(&s("x")), 1);
        assert_eq!(ins.count(&s("y")), 1);
        assert!(subs.is_empty());
        assert!(dels.is_empty());
    }

    #[test]
    fn test_pure_deletion_counts() {
        let pairs = vec![pair("x y", "")];
        let (subs, dels, ins) = aggregate(&pairs);

        assert_eq!(dels.count(&s("x")), 1);
        assert_eq!(dels.count(&s("y")), 1);
        assert!(subs.is_empty());
        assert!(ins.is_empty());
    }

    #[test]
    fn test_disjoint_counts() {
        let pairs = vec![pair("a b", "c d")];
        let (subs, dels, ins) = aggregate(&pairs);

        assert_eq!(subs.count(&(s("a"), s("c"))), 1);
        assert_eq!(subs.count(&(s("b"), s("d"))), 1);
        assert_eq!(subs.total(), 2);
        assert!(dels.is_empty());
        assert!(ins.is_empty());
    }

    #[test]
    fn test_substitution_pairs_are_ordered() {
        let pairs = vec![pair("a", "b"), pair("b", "a"), pair("a", "b")];
        let (subs, _, _) = aggregate(&pairs);

        assert_eq!(subs.count(&(s("a"), s("b"))), 2);
        assert_eq!(subs.count(&(s("b"), s("a"))), 1);
    }

    #[test]
    fn test_counts_across_pairs() {
        let pairs = vec![
            pair("the cat sat", "the bat sat"),
            pair("a cat ran", "a bat ran off"),
            pair("big dog", "dog"),
        ];
        let (subs, dels, ins) = aggregate(&pairs);

        assert_eq!(subs.count(&(s("cat"), s("bat"))), 2);
        assert_eq!(ins.count(&s("off")), 1);
        assert_eq!(dels.count(&s("big")), 1);
    }

    #[test]
    fn test_ranking_by_count_then_first_seen() {
        let mut table = FrequencyTable::new();
        for key in ["b", "a", "c", "a", "c", "d", "c"] {
            table.add(key);
        }

        let ranked = table.ranked();
        assert_eq!(ranked, vec![(&"c", 3), (&"a", 2), (&"b", 1), (&"d", 1)]);
    }

    #[test]
    fn test_ranking_sorted_and_ties_stable() {
        let mut table = FrequencyTable::new();
        let keys = ["q", "w", "e", "r", "w", "t", "y", "e", "q", "u", "r", "w"];
        for key in keys {
            table.add(key);
        }

        let ranked = table.ranked();
        for window in ranked.windows(2) {
            assert!(window[0].1 >= window[1].1);
            if window[0].1 == window[1].1 {
                let first = keys.iter().position(|k| k == window[0].0).unwrap();
                let second = keys.iter().position(|k| k == window[1].0).unwrap();
                assert!(first < second);
            }
        }
        assert_eq!(ranked[0], (&"w", 3));
    }

    #[test]
    fn test_ranked_and_into_ranked_agree() {
        let mut table = FrequencyTable::new();
        for key in ["x", "y", "y", "z", "x", "y"] {
            table.add(key.to_string());
        }

        let borrowed: Vec<(String, u64)> =
            table.ranked().into_iter().map(|(k, c)| (k.clone(), c)).collect();
        assert_eq!(borrowed, table.into_ranked());
    }

    #[test]
    fn test_add_count() {
        let mut table = FrequencyTable::new();
        table.add_count("a", 4);
        table.add("a");
        table.add_count("b", 2);

        assert_eq!(table.count(&"a"), 5);
        assert_eq!(table.count(&"b"), 2);
        assert_eq!(table.count(&"missing"), 0);
        assert_eq!(table.total(), 7);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_counts_invariant_under_reordering() {
        let forward = vec![
            pair("one two three", "one too three"),
            pair("four five", "four five six"),
            pair("seven eight", "eight"),
            pair("two", "too"),
            pair("nine", "nein"),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let (subs_f, dels_f, ins_f) = aggregate(&forward);
        let (subs_b, dels_b, ins_b) = aggregate(&backward);

        let sorted = |ranked: Vec<(String, u64)>| {
            let mut v = ranked;
            v.sort();
            v
        };
        let mut sub_f = subs_f.into_ranked();
        let mut sub_b = subs_b.into_ranked();
        sub_f.sort();
        sub_b.sort();

        assert_eq!(sub_f, sub_b);
        assert_eq!(sorted(dels_f.into_ranked()), sorted(dels_b.into_ranked()));
        assert_eq!(sorted(ins_f.into_ranked()), sorted(ins_b.into_ranked()));
    }

    #[test]
    fn test_aggregator_totals() {
        let mut aggregator = ErrorAggregator::new();
        aggregator.record(&pair("the cat sat", "the bat sat down"));
        aggregator.record(&pair("big dog", "dog"));

        let totals = aggregator.totals();
        assert_eq!(totals.pairs, 2);
        assert_eq!(totals.reference_tokens, 5);
        assert_eq!(totals.hypothesis_tokens, 5);
        assert_eq!(totals.matches, 3);
        assert_eq!(totals.substitutions, 1);
        assert_eq!(totals.insertions, 1);
        assert_eq!(totals.deletions, 1);
        assert!((totals.error_rate() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_error_rate_edge_cases() {
        assert_eq!(Totals::default().error_rate(), 0.0);

        let only_insertions = Totals {
            pairs: 1,
            hypothesis_tokens: 2,
            insertions: 2,
            ..Default::default()
        };
        assert_eq!(only_insertions.error_rate(), 1.0);
    }

    #[test]
    fn test_finish_ranks_all_tables() {
        let mut aggregator = ErrorAggregator::new();
        for (r, h) in [("a b", "a c"), ("b", "c"), ("x", "y"), ("d e", "e"), ("f", "f g")] {
            aggregator.record(&pair(r, h));
        }

        let (totals, ranked) = aggregator.finish();
        assert_eq!(totals.pairs, 5);
        assert_eq!(
            ranked.substitutions[0],
            SubstitutionCount {
                reference: s("b"),
                hypothesis: s("c"),
                count: 2,
            }
        );
        assert_eq!(ranked.substitutions[1].reference, "x");
        assert_eq!(ranked.deletions, vec![TokenCount { token: s("d"), count: 1 }]);
        assert_eq!(ranked.insertions, vec![TokenCount { token: s("g"), count: 1 }]);
    }

    #[test]
    fn test_totals_stay_consistent_with_tables() {
        let mut aggregator = ErrorAggregator::new();
        aggregator.record(&pair("a", ""));
        aggregator.record(&pair("a", "b"));
        aggregator.record(&pair("a", ""));

        assert_eq!(aggregator.deletions().count(&s("a")), 2);
        assert_eq!(aggregator.substitutions().count(&(s("a"), s("b"))), 1);
        assert!(aggregator.insertions().is_empty());

        let totals = aggregator.totals();
        assert_eq!(totals.pairs, 3);
        assert_eq!(totals.errors(), 3);
        assert_eq!(totals.reference_tokens, 3);
        assert_eq!(totals.hypothesis_tokens, 1);
        assert!(totals.reference_tokens >= totals.deletions + totals.substitutions);
        assert_eq!(totals.error_rate(), 1.0);
    }

}
