//! Chat-room membership state machine
//!
//! Presence diffs arrive as asynchronous callbacks from the XMPP layer; this
//! component deduplicates them, keeps the role/affiliation pair per member
//! and broadcasts typed events. A member record exists from the joined event
//! until a left/kicked/banned event removes it.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// MUC role of an occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberRole {
    Visitor,
    Participant,
    Moderator,
}

/// MUC affiliation of an occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Affiliation {
    None,
    Member,
    Admin,
    Owner,
    Outcast,
}

/// One occupant record, keyed by full participant address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMember {
    pub nickname: String,
    pub role: MemberRole,
    pub affiliation: Affiliation,
}

/// Typed membership events delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    Joined { address: String, nickname: String },
    Left { address: String },
    Kicked { address: String },
    Banned { address: String },
    RoleChanged { address: String, role: MemberRole },
    AffiliationChanged { address: String, affiliation: Affiliation },
    NicknameChanged { address: String, nickname: String },
}

/// The membership map for one room plus its event fan-out.
pub struct RoomMembership {
    members: DashMap<String, RoomMember>,
    events: broadcast::Sender<RoomEvent>,
}

impl Default for RoomMembership {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomMembership {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self { members: DashMap::new(), events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: RoomEvent) {
        let _ = self.events.send(event);
    }

    /// Records a join. Duplicate joins for an address already present are
    /// suppressed, which also swallows the join echo a nickname change of
    /// our own occupant produces.
    pub fn member_joined(
        &self,
        address: &str,
        nickname: &str,
        role: MemberRole,
        affiliation: Affiliation,
    ) -> bool {
        if self.members.contains_key(address) {
            debug!("Duplicate join for {address} suppressed");
            return false;
        }
        self.members.insert(
            address.to_string(),
            RoomMember { nickname: nickname.to_string(), role, affiliation },
        );
        self.emit(RoomEvent::Joined {
            address: address.to_string(),
            nickname: nickname.to_string(),
        });
        true
    }

    pub fn member_left(&self, address: &str) -> bool {
        self.depart(address, RoomEvent::Left { address: address.to_string() })
    }

    pub fn member_kicked(&self, address: &str) -> bool {
        self.depart(address, RoomEvent::Kicked { address: address.to_string() })
    }

    pub fn member_banned(&self, address: &str) -> bool {
        self.depart(address, RoomEvent::Banned { address: address.to_string() })
    }

    fn depart(&self, address: &str, event: RoomEvent) -> bool {
        if self.members.remove(address).is_none() {
            return false;
        }
        self.emit(event);
        true
    }

    pub fn role_changed(&self, address: &str, role: MemberRole) -> bool {
        let changed = self
            .members
            .get_mut(address)
            .map(|mut member| {
                if member.role == role {
                    return false;
                }
                member.role = role;
                true
            })
            .unwrap_or(false);
        if changed {
            self.emit(RoomEvent::RoleChanged { address: address.to_string(), role });
        }
        changed
    }

    pub fn affiliation_changed(&self, address: &str, affiliation: Affiliation) -> bool {
        let changed = self
            .members
            .get_mut(address)
            .map(|mut member| {
                if member.affiliation == affiliation {
                    return false;
                }
                member.affiliation = affiliation;
                true
            })
            .unwrap_or(false);
        if changed {
            self.emit(RoomEvent::AffiliationChanged {
                address: address.to_string(),
                affiliation,
            });
        }
        changed
    }

    pub fn nickname_changed(&self, address: &str, nickname: &str) -> bool {
        let changed = self
            .members
            .get_mut(address)
            .map(|mut member| {
                if member.nickname == nickname {
                    return false;
                }
                member.nickname = nickname.to_string();
                true
            })
            .unwrap_or(false);
        if changed {
            self.emit(RoomEvent::NicknameChanged {
                address: address.to_string(),
                nickname: nickname.to_string(),
            });
        }
        changed
    }

    pub fn member(&self, address: &str) -> Option<RoomMember> {
        self.members.get(address).map(|m| m.clone())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_join_is_suppressed() {
        let room = RoomMembership::new();
        let mut events = room.subscribe();

        assert!(room.member_joined("room@conf/alice", "alice", MemberRole::Participant, Affiliation::Member));
        assert!(!room.member_joined("room@conf/alice", "alice", MemberRole::Participant, Affiliation::Member));
        assert_eq!(room.len(), 1);

        // Exactly one event despite two callbacks.
        assert!(matches!(events.try_recv().unwrap(), RoomEvent::Joined { .. }));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn member_exists_from_join_until_departure() {
        let room = RoomMembership::new();
        room.member_joined("room@conf/bob", "bob", MemberRole::Visitor, Affiliation::None);
        assert!(room.member("room@conf/bob").is_some());

        assert!(room.member_kicked("room@conf/bob"));
        assert!(room.member("room@conf/bob").is_none());
        // A second departure for the same member is a no-op.
        assert!(!room.member_left("room@conf/bob"));
    }

    #[test]
    fn role_and_affiliation_transitions_fire_events() {
        let room = RoomMembership::new();
        room.member_joined("room@conf/carol", "carol", MemberRole::Visitor, Affiliation::None);
        let mut events = room.subscribe();

        assert!(room.role_changed("room@conf/carol", MemberRole::Moderator));
        assert!(!room.role_changed("room@conf/carol", MemberRole::Moderator));
        assert!(room.affiliation_changed("room@conf/carol", Affiliation::Admin));

        assert_eq!(
            events.try_recv().unwrap(),
            RoomEvent::RoleChanged {
                address: "room@conf/carol".to_string(),
                role: MemberRole::Moderator
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            RoomEvent::AffiliationChanged {
                address: "room@conf/carol".to_string(),
                affiliation: Affiliation::Admin
            }
        );
    }

    #[test]
    fn nickname_change_does_not_rejoin() {
        let room = RoomMembership::new();
        room.member_joined("room@conf/dave", "dave", MemberRole::Participant, Affiliation::Member);
        let mut events = room.subscribe();

        assert!(room.nickname_changed("room@conf/dave", "david"));
        assert_eq!(room.member("room@conf/dave").unwrap().nickname, "david");
        assert!(matches!(events.try_recv().unwrap(), RoomEvent::NicknameChanged { .. }));
        assert_eq!(room.len(), 1);
    }
}
