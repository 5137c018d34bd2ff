//! Gameplay Events
//!
//! Normalized events as they enter the hash chain. The payload is a closed
//! tagged union keyed by event kind, so every kind carries exactly the fields
//! it needs and nothing has to be checked for presence at runtime.

use serde::{Deserialize, Serialize};

/// Player position in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Position {
    /// Origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    /// Create a new position.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// All coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Kind of gameplay event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Player moved.
    Move,
    /// Player fired.
    Shoot,
    /// Player was hit.
    Hit,
    /// Player died.
    Death,
    /// Mouse click that is not a shot.
    MouseClick,
    /// Keyboard input.
    KeyPress,
    /// Weapon reload.
    Reload,
    /// Crouch toggled.
    Crouch,
    /// Health changed.
    HealthChange,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 9] = [
        EventKind::Move,
        EventKind::Shoot,
        EventKind::Hit,
        EventKind::Death,
        EventKind::MouseClick,
        EventKind::KeyPress,
        EventKind::Reload,
        EventKind::Crouch,
        EventKind::HealthChange,
    ];

    /// Wire tag used in the event encoding.
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::Move => "PLAYER_MOVE",
            EventKind::Shoot => "PLAYER_SHOOT",
            EventKind::Hit => "PLAYER_HIT",
            EventKind::Death => "PLAYER_DEATH",
            EventKind::MouseClick => "MOUSE_CLICK",
            EventKind::KeyPress => "KEY_PRESS",
            EventKind::Reload => "PLAYER_RELOAD",
            EventKind::Crouch => "PLAYER_CROUCH",
            EventKind::HealthChange => "HEALTH_CHANGE",
        }
    }
}

/// Event payload, one variant per [`EventKind`].
///
/// Serialized adjacently tagged: `{"type": "PLAYER_MOVE", "data": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all_fields = "camelCase")]
pub enum EventData {
    /// Player moved to a new position.
    #[serde(rename = "PLAYER_MOVE")]
    Move {
        /// New position.
        position: Position,
    },

    /// Player fired at screen coordinates.
    #[serde(rename = "PLAYER_SHOOT")]
    Shoot {
        /// Aim X.
        aim_x: f64,
        /// Aim Y.
        aim_y: f64,
    },

    /// Player was hit.
    #[serde(rename = "PLAYER_HIT")]
    Hit {
        /// Where the hit landed, if known.
        position: Option<Position>,
    },

    /// Player died.
    #[serde(rename = "PLAYER_DEATH")]
    Death {
        /// Where the player died, if known.
        position: Option<Position>,
    },

    /// Non-firing mouse click.
    #[serde(rename = "MOUSE_CLICK")]
    MouseClick {
        /// Action bound to the click.
        action: String,
    },

    /// Key pressed.
    #[serde(rename = "KEY_PRESS")]
    KeyPress {
        /// Key identifier.
        key: String,
    },

    /// Weapon reloaded.
    #[serde(rename = "PLAYER_RELOAD")]
    Reload,

    /// Crouch state changed.
    #[serde(rename = "PLAYER_CROUCH")]
    Crouch {
        /// True when entering crouch.
        crouching: bool,
    },

    /// Health changed.
    #[serde(rename = "HEALTH_CHANGE")]
    HealthChange {
        /// Health before the change.
        old_health: f64,
        /// Health after the change.
        new_health: f64,
        /// Cause of the change.
        reason: String,
    },
}

impl EventData {
    /// Kind of this payload.
    pub fn kind(&self) -> EventKind {
        match self {
            EventData::Move { .. } => EventKind::Move,
            EventData::Shoot { .. } => EventKind::Shoot,
            EventData::Hit { .. } => EventKind::Hit,
            EventData::Death { .. } => EventKind::Death,
            EventData::MouseClick { .. } => EventKind::MouseClick,
            EventData::KeyPress { .. } => EventKind::KeyPress,
            EventData::Reload => EventKind::Reload,
            EventData::Crouch { .. } => EventKind::Crouch,
            EventData::HealthChange { .. } => EventKind::HealthChange,
        }
    }

    /// Every float in the payload is finite.
    ///
    /// JSON has no encoding for NaN or infinity, so a payload failing this
    /// check can be neither hashed distinctly nor exported.
    pub fn is_finite(&self) -> bool {
        match self {
            EventData::Move { position } => position.is_finite(),
            EventData::Shoot { aim_x, aim_y } => aim_x.is_finite() && aim_y.is_finite(),
            EventData::Hit { position } | EventData::Death { position } => {
                position.as_ref().map_or(true, Position::is_finite)
            }
            EventData::HealthChange {
                old_health,
                new_health,
                ..
            } => old_health.is_finite() && new_health.is_finite(),
            EventData::MouseClick { .. }
            | EventData::KeyPress { .. }
            | EventData::Reload
            | EventData::Crouch { .. } => true,
        }
    }
}

/// A single normalized gameplay event.
///
/// Fields are private: an event is immutable once built. Tests that need to
/// tamper with recorded data go through [`GameEvent::with_timestamp`] and
/// friends, which return modified copies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEvent {
    timestamp: u64,
    player_id: String,
    #[serde(flatten)]
    data: EventData,
}

impl GameEvent {
    /// Create an event from its parts.
    pub fn new(timestamp: u64, player_id: impl Into<String>, data: EventData) -> Self {
        Self {
            timestamp,
            player_id: player_id.into(),
            data,
        }
    }

    /// Movement to `position`.
    pub fn movement(timestamp: u64, player_id: impl Into<String>, position: Position) -> Self {
        Self::new(timestamp, player_id, EventData::Move { position })
    }

    /// Shot aimed at `(aim_x, aim_y)`.
    pub fn shoot(timestamp: u64, player_id: impl Into<String>, aim_x: f64, aim_y: f64) -> Self {
        Self::new(timestamp, player_id, EventData::Shoot { aim_x, aim_y })
    }

    /// Key press.
    pub fn key_press(timestamp: u64, player_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(timestamp, player_id, EventData::KeyPress { key: key.into() })
    }

    /// Reload.
    pub fn reload(timestamp: u64, player_id: impl Into<String>) -> Self {
        Self::new(timestamp, player_id, EventData::Reload)
    }

    /// Health change.
    pub fn health_change(
        timestamp: u64,
        player_id: impl Into<String>,
        old_health: f64,
        new_health: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            timestamp,
            player_id,
            EventData::HealthChange {
                old_health,
                new_health,
                reason: reason.into(),
            },
        )
    }

    /// Milliseconds since session start.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Player that produced the event.
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Event payload.
    pub fn data(&self) -> &EventData {
        &self.data
    }

    /// Event kind.
    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }

    /// Every float in the payload is finite.
    pub fn is_finite(&self) -> bool {
        self.data.is_finite()
    }

    /// Position carried by a movement event.
    pub fn move_position(&self) -> Option<Position> {
        match self.data {
            EventData::Move { position } => Some(position),
            _ => None,
        }
    }

    /// Copy of this event with a different timestamp.
    pub fn with_timestamp(&self, timestamp: u64) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }

    /// Copy of this event with a different player.
    pub fn with_player_id(&self, player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            ..self.clone()
        }
    }

    /// Copy of this event with a different payload.
    pub fn with_data(&self, data: EventData) -> Self {
        Self {
            data,
            ..self.clone()
        }
    }
}
