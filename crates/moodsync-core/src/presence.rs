//! Remote actors and their cursors.
//!
//! Actors appear on their first update and disappear once they have been
//! silent for longer than the liveness window.

use crate::color::Rgba;
use crate::config::SessionConfig;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Actor identity as used by the presence channel.
pub type ActorId = String;

/// Colors handed out to actors that do not bring their own.
pub const ACTOR_COLORS: [Rgba; 7] = [
    Rgba::rgb(0xFF, 0x6B, 0x6B),
    Rgba::rgb(0x4E, 0xCD, 0xC4),
    Rgba::rgb(0x5B, 0x4C, 0xFF),
    Rgba::rgb(0xFF, 0xD9, 0x3D),
    Rgba::rgb(0x51, 0xCF, 0x66),
    Rgba::rgb(0xFF, 0x8E, 0x8E),
    Rgba::rgb(0x74, 0xC0, 0xFC),
];

/// Inbound cursor update from another actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorUpdate {
    pub actor_id: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
    /// Screen position in the sender's own viewport.
    pub position: Point,
}

/// A remote participant.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteActor {
    pub id: ActorId,
    pub name: String,
    /// Fixed when the actor is first seen.
    pub color: Rgba,
    /// Last reported cursor, if any has been reported.
    pub cursor: Option<Point>,
    pub last_active: Instant,
    /// Order in which actors were first seen.
    joined_seq: u64,
}

/// Presence state for the remote actors on a board.
#[derive(Debug, Clone)]
pub struct Presence {
    local_id: ActorId,
    actors: HashMap<ActorId, RemoteActor>,
    next_seq: u64,
    next_color: usize,
    ttl: Duration,
    sweep_interval: Duration,
    last_sweep: Option<Instant>,
}

impl Presence {
    pub fn new(local_id: impl Into<ActorId>, config: &SessionConfig) -> Self {
        Self {
            local_id: local_id.into(),
            actors: HashMap::new(),
            next_seq: 0,
            next_color: 0,
            ttl: config.presence_ttl(),
            sweep_interval: config.presence_sweep_interval(),
            last_sweep: None,
        }
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Record an actor as present, creating it if unseen. Returns whether it is new.
    pub fn touch(&mut self, actor_id: &str, name: Option<&str>, color: Option<Rgba>, at: Instant) -> bool {
        if let Some(actor) = self.actors.get_mut(actor_id) {
            if let Some(name) = name {
                actor.name = name.to_string();
            }
            actor.last_active = actor.last_active.max(at);
            return false;
        }

        let color = color.unwrap_or_else(|| {
            let color = ACTOR_COLORS[self.next_color % ACTOR_COLORS.len()];
            self.next_color += 1;
            color
        });
        let actor = RemoteActor {
            id: actor_id.to_string(),
            name: name.unwrap_or(actor_id).to_string(),
            color,
            cursor: None,
            last_active: at,
            joined_seq: self.next_seq,
        };
        self.next_seq += 1;
        log::debug!("Actor joined: {} ({})", actor.name, actor.id);
        self.actors.insert(actor.id.clone(), actor);
        true
    }

    /// Merge a cursor update. Returns whether the actor was new.
    pub fn upsert_cursor(&mut self, update: &CursorUpdate, at: Instant) -> bool {
        let created = self.touch(&update.actor_id, update.name.as_deref(), update.color, at);
        if let Some(actor) = self.actors.get_mut(&update.actor_id) {
            actor.cursor = Some(update.position);
        }
        created
    }

    /// Remove an actor that announced it left.
    pub fn remove_actor(&mut self, actor_id: &str) -> Option<RemoteActor> {
        self.actors.remove(actor_id)
    }

    /// Remove actors silent for longer than the ttl. Returns their ids.
    pub fn sweep_stale(&mut self, now: Instant) -> Vec<ActorId> {
        let ttl = self.ttl;
        let stale: Vec<ActorId> = self
            .actors
            .values()
            .filter(|actor| now.saturating_duration_since(actor.last_active) > ttl)
            .map(|actor| actor.id.clone())
            .collect();
        for id in &stale {
            self.actors.remove(id);
            log::debug!("Actor timed out: {id}");
        }
        self.last_sweep = Some(now);
        stale
    }

    /// Sweep if the sweep interval has elapsed since the last sweep.
    pub fn maybe_sweep(&mut self, now: Instant) -> Vec<ActorId> {
        let due = self
            .last_sweep
            .is_none_or(|last| now.saturating_duration_since(last) >= self.sweep_interval);
        if due { self.sweep_stale(now) } else { Vec::new() }
    }

    pub fn get(&self, actor_id: &str) -> Option<&RemoteActor> {
        self.actors.get(actor_id)
    }

    /// Every known actor in join order.
    pub fn actors(&self) -> Vec<&RemoteActor> {
        let mut actors: Vec<&RemoteActor> = self.actors.values().collect();
        actors.sort_by_key(|actor| actor.joined_seq);
        actors
    }

    /// Cursors to render: remote actors with a known cursor, in join order.
    pub fn visible_cursors(&self) -> Vec<&RemoteActor> {
        self.actors()
            .into_iter()
            .filter(|actor| actor.id != self.local_id && actor.cursor.is_some())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presence() -> Presence {
        Presence::new("me", &SessionConfig::default())
    }

    fn cursor(actor: &str, x: f64, y: f64) -> CursorUpdate {
        CursorUpdate {
            actor_id: actor.to_string(),
            name: None,
            color: None,
            position: Point::new(x, y),
        }
    }

    #[test]
    fn test_first_update_creates_actor() {
        let mut presence = presence();
        let t0 = Instant::now();
        assert!(presence.upsert_cursor(&cursor("alice", 1.0, 2.0), t0));
        assert!(!presence.upsert_cursor(&cursor("alice", 3.0, 4.0), t0));
        assert_eq!(presence.len(), 1);
        assert_eq!(presence.get("alice").unwrap().cursor, Some(Point::new(3.0, 4.0)));
    }

    #[test]
    fn test_sweep_liveness() {
        let mut presence = presence();
        let t0 = Instant::now();
        presence.upsert_cursor(&cursor("silent", 0.0, 0.0), t0);
        presence.upsert_cursor(&cursor("active", 0.0, 0.0), t0);
        presence.upsert_cursor(&cursor("active", 5.0, 5.0), t0 + Duration::from_secs(29));

        let removed = presence.sweep_stale(t0 + Duration::from_secs(31));
        assert_eq!(removed, vec!["silent".to_string()]);
        assert!(presence.get("active").is_some());
    }

    #[test]
    fn test_exactly_ttl_is_kept() {
        let mut presence = presence();
        let t0 = Instant::now();
        presence.upsert_cursor(&cursor("alice", 0.0, 0.0), t0);
        assert!(presence.sweep_stale(t0 + Duration::from_secs(30)).is_empty());
    }

    #[test]
    fn test_maybe_sweep_interval() {
        let mut presence = presence();
        let t0 = Instant::now();
        presence.upsert_cursor(&cursor("alice", 0.0, 0.0), t0);
        presence.maybe_sweep(t0);
        // Stale, but the next sweep is not due yet.
        assert!(presence.maybe_sweep(t0 + Duration::from_secs(5)).is_empty());
        presence.upsert_cursor(&cursor("bob", 0.0, 0.0), t0 + Duration::from_secs(5));
        let removed = presence.maybe_sweep(t0 + Duration::from_secs(40));
        assert_eq!(removed.len(), 2);
    }

    #[test]
    fn test_color_fixed_at_creation() {
        let mut presence = presence();
        let t0 = Instant::now();
        let red = Rgba::rgb(255, 0, 0);
        let mut update = cursor("alice", 0.0, 0.0);
        update.color = Some(red);
        presence.upsert_cursor(&update, t0);
        update.color = Some(Rgba::rgb(0, 0, 255));
        presence.upsert_cursor(&update, t0);
        assert_eq!(presence.get("alice").unwrap().color, red);

        presence.upsert_cursor(&cursor("bob", 0.0, 0.0), t0);
        presence.upsert_cursor(&cursor("carol", 0.0, 0.0), t0);
        assert_eq!(presence.get("bob").unwrap().color, ACTOR_COLORS[0]);
        assert_eq!(presence.get("carol").unwrap().color, ACTOR_COLORS[1]);
    }

    #[test]
    fn test_visible_cursors_join_order_without_self() {
        let mut presence = presence();
        let t0 = Instant::now();
        presence.upsert_cursor(&cursor("zed", 0.0, 0.0), t0);
        presence.upsert_cursor(&cursor("me", 0.0, 0.0), t0);
        presence.upsert_cursor(&cursor("amy", 0.0, 0.0), t0);
        presence.touch("quiet", None, None, t0);

        let ids: Vec<&str> = presence.visible_cursors().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["zed", "amy"]);
    }

    #[test]
    fn test_remove_actor() {
        let mut presence = presence();
        presence.upsert_cursor(&cursor("alice", 0.0, 0.0), Instant::now());
        assert!(presence.remove_actor("alice").is_some());
        assert!(presence.is_empty());
    }
}
