//! Breadcrumb trail left by the agent. Escorted customers each chase a
//! fixed entry of the trail, so the party files along behind in a line.

use glam::Vec2;

use crate::config::EscortConfig;
use crate::util::ring::RingBuffer;

pub struct FollowerTrail {
    memory: RingBuffer<Vec2>,
    last: Vec2,
    min_increment: f32,
    spacing: usize,
}

impl FollowerTrail {
    pub fn new(escort: &EscortConfig, origin: Vec2) -> Self {
        let mut trail = Self {
            memory: RingBuffer::new(escort.memory),
            last: origin,
            min_increment: escort.min_increment,
            spacing: escort.spacing,
        };
        trail.fill(origin);
        trail
    }

    fn fill(&mut self, pos: Vec2) {
        self.memory.clear();
        for _ in 0..self.memory.capacity() {
            self.memory.push(pos);
        }
    }

    /// Record the agent's position once it has moved far enough.
    pub fn record(&mut self, agent: Vec2) {
        if agent.distance(self.last) > self.min_increment {
            self.memory.push(self.last);
            self.last = agent;
        }
    }

    /// Trail index for the `n`th follower (0-based).
    pub fn follower_index(&self, n: usize) -> usize {
        (self.spacing * (n + 1)).min(self.memory.capacity() - 1)
    }

    /// Position stored `index` entries back.
    pub fn sample(&self, index: usize) -> Option<Vec2> {
        self.memory.newest(index)
    }

    /// Rewrite the trail so it runs from the agent through each follower's
    /// current position, in order. Followers then start on their own spot
    /// instead of snapping to the agent.
    pub fn seed(&mut self, agent: Vec2, followers: &[Vec2]) {
        let cap = self.memory.capacity();
        let mut points = Vec::with_capacity(cap);
        let mut anchor = agent;
        for (n, &target) in followers.iter().enumerate() {
            let end = self.follower_index(n);
            let start = points.len();
            let steps = end.saturating_sub(start).max(1);
            while points.len() <= end {
                let t = (points.len() - start) as f32 / steps as f32;
                points.push(anchor.lerp(target, t));
            }
            anchor = target;
        }
        while points.len() < cap {
            points.push(anchor);
        }

        // Newest first in `points`; push oldest first.
        self.memory.clear();
        for &p in points.iter().rev() {
            self.memory.push(p);
        }
        self.last = agent;
    }

    pub fn reset(&mut self, origin: Vec2) {
        self.last = origin;
        self.fill(origin);
    }
}
