//! Party membership and leader election.
//!
//! The roster is the authoritative member list for every live party. The
//! leader is never stored: it is the member with the smallest `CustomerId`
//! at the moment of the lookup, so a member leaving can never leave a
//! dangling leader behind.

use std::collections::BTreeMap;

use crate::ecs::components::{CustomerId, PartyId};

/// Members of one party, ordered by customer id.
#[derive(Debug, Default, Clone)]
pub struct Party {
    members: BTreeMap<CustomerId, hecs::Entity>,
}

impl Party {
    pub fn leader(&self) -> Option<(CustomerId, hecs::Entity)> {
        self.members.iter().next().map(|(&id, &e)| (id, e))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in party order (ascending id).
    pub fn members(&self) -> impl Iterator<Item = (CustomerId, hecs::Entity)> + '_ {
        self.members.iter().map(|(&id, &e)| (id, e))
    }

    pub fn entities(&self) -> Vec<hecs::Entity> {
        self.members.values().copied().collect()
    }
}

/// All live parties.
#[derive(Debug, Default)]
pub struct Roster {
    parties: BTreeMap<PartyId, Party>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.parties.clear();
    }

    pub fn insert(&mut self, party: PartyId, id: CustomerId, entity: hecs::Entity) {
        self.parties
            .entry(party)
            .or_default()
            .members
            .insert(id, entity);
    }

    /// Remove a member. The party disappears with its last member.
    pub fn remove(&mut self, party: PartyId, id: CustomerId) {
        if let Some(p) = self.parties.get_mut(&party) {
            p.members.remove(&id);
            if p.members.is_empty() {
                self.parties.remove(&party);
            }
        }
    }

    pub fn get(&self, party: PartyId) -> Option<&Party> {
        self.parties.get(&party)
    }

    pub fn leader(&self, party: PartyId) -> Option<(CustomerId, hecs::Entity)> {
        self.parties.get(&party).and_then(Party::leader)
    }

    pub fn is_leader(&self, party: PartyId, id: CustomerId) -> bool {
        self.leader(party).is_some_and(|(leader, _)| leader == id)
    }

    pub fn size(&self, party: PartyId) -> usize {
        self.parties.get(&party).map_or(0, Party::len)
    }

    pub fn entities(&self, party: PartyId) -> Vec<hecs::Entity> {
        self.parties.get(&party).map(Party::entities).unwrap_or_default()
    }

    /// Parties in id order, which is also creation order.
    pub fn iter(&self) -> impl Iterator<Item = (PartyId, &Party)> {
        self.parties.iter().map(|(&id, p)| (id, p))
    }

    pub fn len(&self) -> usize {
        self.parties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
    }

    pub fn customer_count(&self) -> usize {
        self.parties.values().map(Party::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(n: usize) -> Vec<hecs::Entity> {
        let mut world = hecs::World::new();
        (0..n).map(|_| world.spawn(())).collect()
    }

    #[test]
    fn leader_is_smallest_live_id() {
        let e = entities(3);
        let mut roster = Roster::new();
        let party = PartyId(1);
        roster.insert(party, CustomerId(12), e[0]);
        roster.insert(party, CustomerId(10), e[1]);
        roster.insert(party, CustomerId(11), e[2]);

        assert_eq!(roster.leader(party), Some((CustomerId(10), e[1])));

        roster.remove(party, CustomerId(10));
        assert_eq!(roster.leader(party), Some((CustomerId(11), e[2])));
        assert!(roster.is_leader(party, CustomerId(11)));
        assert!(!roster.is_leader(party, CustomerId(12)));
    }

    #[test]
    fn party_vanishes_with_last_member() {
        let e = entities(1);
        let mut roster = Roster::new();
        roster.insert(PartyId(4), CustomerId(1), e[0]);
        assert_eq!(roster.size(PartyId(4)), 1);

        roster.remove(PartyId(4), CustomerId(1));
        assert!(roster.get(PartyId(4)).is_none());
        assert!(roster.is_empty());
        assert_eq!(roster.leader(PartyId(4)), None);
    }

    #[test]
    fn single_member_leads_itself() {
        let e = entities(1);
        let mut roster = Roster::new();
        roster.insert(PartyId(2), CustomerId(5), e[0]);
        assert!(roster.is_leader(PartyId(2), CustomerId(5)));
    }
}
