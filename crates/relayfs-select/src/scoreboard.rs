//! Per-call score tally over a candidate set.
//!
//! A board starts with exactly one zero score per distinct candidate. Entries
//! can be adjusted or removed, never re-added. Insertion order is kept so that
//! ties resolve to the first-seen candidate.

use crate::candidate::Candidate;
use crate::error::{SelectError, SelectResult};

/// One candidate and its running score.
#[derive(Debug, Clone)]
pub struct Score<C> {
    candidate: C,
    score: i64,
}

impl<C: Candidate> Score<C> {
    /// The scored candidate.
    pub fn candidate(&self) -> &C {
        &self.candidate
    }

    /// Candidate name.
    pub fn name(&self) -> &str {
        self.candidate.name()
    }

    /// Current score.
    pub fn score(&self) -> i64 {
        self.score
    }

    /// Accumulate `delta`, saturating at the i64 bounds.
    pub fn add(&mut self, delta: i64) {
        self.score = self.score.saturating_add(delta);
    }
}

/// Mutable score tally, built fresh for every selection call.
#[derive(Debug, Clone)]
pub struct ScoreBoard<C> {
    entries: Vec<Score<C>>,
}

impl<C: Candidate> ScoreBoard<C> {
    /// Seed one zero score per candidate. Later duplicates of a name are dropped.
    pub fn new(candidates: impl IntoIterator<Item = C>) -> Self {
        let mut entries: Vec<Score<C>> = Vec::new();
        for candidate in candidates {
            if entries.iter().any(|e| e.name() == candidate.name()) {
                continue;
            }
            entries.push(Score {
                candidate,
                score: 0,
            });
        }
        Self { entries }
    }

    /// Number of candidates still on the board.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True once every candidate has been removed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` is still on the board.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name() == name)
    }

    /// Add `delta` to the score of `name`.
    pub fn add(&mut self, name: &str, delta: i64) -> SelectResult<()> {
        let idx = self.position(name).ok_or_else(|| SelectError::NotFound {
            candidate: name.to_string(),
        })?;
        self.entries[idx].add(delta);
        Ok(())
    }

    /// Add `delta` to every remaining candidate.
    pub fn add_all(&mut self, delta: i64) {
        for entry in &mut self.entries {
            entry.add(delta);
        }
    }

    /// Discard `name` for the rest of this call. Returns false if it was not present.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Score<C>) -> bool) {
        self.entries.retain(|e| keep(e));
    }

    /// Score of `name`; fails with NotFound for removed or unknown candidates.
    pub fn score_for(&self, name: &str) -> SelectResult<i64> {
        self.position(name)
            .map(|idx| self.entries[idx].score)
            .ok_or_else(|| SelectError::NotFound {
                candidate: name.to_string(),
            })
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Score<C>> {
        self.entries.iter()
    }

    /// Mutable entries in first-seen order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Score<C>> {
        self.entries.iter_mut()
    }

    /// Highest score on the board.
    pub fn max_score(&self) -> Option<i64> {
        self.entries.iter().map(|e| e.score).max()
    }

    /// Strictly-highest scorer; ties go to the first-seen candidate.
    pub fn best(&self) -> SelectResult<&C> {
        let mut best: Option<&Score<C>> = None;
        for entry in &self.entries {
            match best {
                Some(b) if entry.score <= b.score => {}
                _ => best = Some(entry),
            }
        }
        best.map(|s| &s.candidate)
            .ok_or(SelectError::NoCandidateAvailable)
    }

    /// Consume the board and return the winning candidate.
    pub fn into_best(self) -> SelectResult<C> {
        let name = self.best()?.name().to_string();
        self.entries
            .into_iter()
            .find(|e| e.name() == name)
            .map(|e| e.candidate)
            .ok_or(SelectError::NoCandidateAvailable)
    }
}
