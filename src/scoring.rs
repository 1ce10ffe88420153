//! Dismissal and abandonment scoring.

use crate::config::RulesConfig;
use crate::ecs::components::{Customer, Latch};
use crate::session::SessionState;

/// Running tally of how service went, alongside the session score.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScoreLedger {
    pub dismissed: u32,
    pub perfect: u32,
    pub abandoned: u32,
    pub gave_up: u32,
}

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    pub base_score: i64,
    pub perfect_bonus: i64,
    pub abandon_penalty: i64,
    pub penalty_points: u32,
    pub ledger: ScoreLedger,
}

impl ScoringEngine {
    pub fn new(rules: &RulesConfig) -> Self {
        Self {
            base_score: rules.base_score,
            perfect_bonus: rules.perfect_bonus,
            abandon_penalty: rules.abandon_penalty,
            penalty_points: rules.penalty_points,
            ledger: ScoreLedger::default(),
        }
    }

    /// Fire a latch and charge its penalty. No-op if it already fired.
    pub fn apply_latch(&self, customer: &mut Customer, latch: Latch) -> bool {
        if customer.latches.fire(latch) {
            customer.penalty += self.penalty_points;
            return true;
        }
        false
    }

    /// Extra charge for running out the dismissal timer.
    pub fn apply_overdue(&self, customer: &mut Customer) {
        customer.penalty += self.penalty_points;
    }

    /// `base - penalty`, plus the bonus when no latch ever fired.
    pub fn dismissal_score(&self, customer: &Customer) -> i64 {
        let bonus = if customer.latches.is_clean() {
            self.perfect_bonus
        } else {
            0
        };
        self.base_score - customer.penalty as i64 + bonus
    }

    /// Credit a served customer.
    pub fn dismiss(&mut self, customer: &Customer, session: &mut SessionState) -> i64 {
        let score = self.dismissal_score(customer);
        session.add_score(score);
        session.record_served(1);
        self.ledger.dismissed += 1;
        if customer.latches.is_clean() {
            self.ledger.perfect += 1;
        }
        score
    }

    /// Customer walked out after being seated.
    pub fn abandon(&mut self, session: &mut SessionState) -> i64 {
        session.add_score(-self.abandon_penalty);
        self.ledger.abandoned += 1;
        -self.abandon_penalty
    }

    /// Customer left the line before being served. Costs nothing.
    pub fn give_up(&mut self) {
        self.ledger.gave_up += 1;
    }

    pub fn reset(&mut self, rules: &RulesConfig) {
        *self = Self::new(rules);
    }
}
