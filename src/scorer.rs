use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// Partial-ratio similarity in `0..=100`.
///
/// The shorter string is compared against every equal-length window of the
/// longer one; the best window wins. 100 means the shorter string occurs
/// verbatim. Either side empty scores 0. Case is compared as given, so
/// callers lowercase first.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if longer.contains(shorter) {
        return 100;
    }

    let short: Vec<char> = shorter.chars().collect();
    let long: Vec<char> = longer.chars().collect();
    let width = short.len();

    let mut best = 0.0_f64;
    for window in long.windows(width) {
        let ratio = indel_ratio(&short, window);
        if ratio > best {
            best = ratio;
        }
    }
    (best * 100.0).round() as u8
}

/// `2 * LCS / (len_a + len_b)`, i.e. one minus the normalised
/// insert/delete distance.
fn indel_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_len(a, b)) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub len: usize,
    pub capacity: usize,
}

struct CacheEntry {
    score: u8,
    last_used: u64,
}

/// Bounded score memo with least-recently-used eviction.
pub struct ScoreCache {
    entries: HashMap<String, CacheEntry>,
    capacity: usize,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl ScoreCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.min(1024)),
            capacity,
            tick: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    fn key(query: &str, candidate: &str) -> String {
        format!("{query}\u{0}{candidate}")
    }

    pub fn get(&mut self, query: &str, candidate: &str) -> Option<u8> {
        self.tick += 1;
        let tick = self.tick;
        match self.entries.get_mut(&Self::key(query, candidate)) {
            Some(entry) => {
                entry.last_used = tick;
                self.hits += 1;
                Some(entry.score)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Eviction scans every entry for the oldest, so a full cache makes each
    /// insert O(capacity) while the caller holds the `Scorer` lock.
    pub fn insert(&mut self, query: &str, candidate: &str, score: u8) {
        if self.capacity == 0 {
            return;
        }
        let key = Self::key(query, candidate);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&oldest);
                self.evictions += 1;
            }
        }
        self.tick += 1;
        self.entries.insert(
            key,
            CacheEntry {
                score,
                last_used: self.tick,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            len: self.entries.len(),
            capacity: self.capacity,
        }
    }
}

/// Memoising front for [`partial_ratio`], safe to share across scoring threads.
pub struct Scorer {
    cache: Mutex<ScoreCache>,
}

impl Scorer {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(ScoreCache::new(capacity)),
        }
    }

    pub fn score(&self, query: &str, candidate: &str) -> u8 {
        if let Some(score) = self.cached(query, candidate) {
            return score;
        }
        let score = partial_ratio(query, candidate);
        // A poisoned lock only costs us the memo, never the score.
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(query, candidate, score);
        }
        score
    }

    fn cached(&self, query: &str, candidate: &str) -> Option<u8> {
        self.cache.lock().ok()?.get(query, candidate)
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.cache
            .lock()
            .map(|cache| cache.stats())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_substring_scores_100() {
        assert_eq!(partial_ratio("disk failure", "vsan disk failure timeout"), 100);
        assert_eq!(partial_ratio("vsan disk failure timeout", "disk failure"), 100);
    }

    #[test]
    fn empty_side_scores_zero() {
        assert_eq!(partial_ratio("disk failure", ""), 0);
        assert_eq!(partial_ratio("", "vsan disk failure"), 0);
    }

    #[test]
    fn unrelated_text_scores_low() {
        assert!(partial_ratio("disk failure", "vcenter login error") <= 70);
    }

    #[test]
    fn single_typo_stays_above_threshold() {
        let score = partial_ratio("disk failrue", "vsan disk failure timeout");
        assert!(score > 70, "score was {score}");
        assert!(score < 100);
    }

    #[test]
    fn is_case_sensitive() {
        assert!(partial_ratio("DISK", "disk") < 100);
    }

    #[test]
    fn handles_multibyte_text() {
        assert_eq!(partial_ratio("fehler", "anmeldung fehler über sso"), 100);
        assert!(partial_ratio("übet", "anmeldung fehler über sso") > 70);
    }

    #[test]
    fn lcs_basics() {
        let a: Vec<char> = "abcde".chars().collect();
        let b: Vec<char> = "ace".chars().collect();
        assert_eq!(lcs_len(&a, &b), 3);
        assert_eq!(lcs_len(&a, &[]), 0);
    }

    #[test]
    fn second_call_is_served_from_cache() {
        let scorer = Scorer::new(16);
        let first = scorer.score("disk failure", "vsan disk failure timeout");
        let second = scorer.score("disk failure", "vsan disk failure timeout");
        assert_eq!(first, second);

        let stats = scorer.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.len, 1);
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let mut cache = ScoreCache::new(2);
        cache.insert("q", "a", 10);
        cache.insert("q", "b", 20);
        assert_eq!(cache.get("q", "a"), Some(10));

        cache.insert("q", "c", 30);
        assert_eq!(cache.get("q", "b"), None);
        assert_eq!(cache.get("q", "a"), Some(10));
        assert_eq!(cache.get("q", "c"), Some(30));
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.stats().len, 2);
    }

    #[test]
    fn zero_capacity_disables_memo() {
        let scorer = Scorer::new(0);
        scorer.score("a", "abc");
        scorer.score("a", "abc");
        let stats = scorer.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.len, 0);
    }

    #[test]
    fn clear_empties_cache() {
        let scorer = Scorer::new(8);
        scorer.score("login", "vcenter login error");
        scorer.clear();
        assert_eq!(scorer.stats().len, 0);
    }
}
