//! Round-robin spawn point rotation.

use lobbyforge_protocol::{Location, WorldId};

use crate::LobbyError;

/// An ordered list of spawn points plus a cursor.
///
/// For N points, N calls to [`next`](Self::next) visit every point once
/// in insertion order, then start over. The cursor always stays in
/// `0..len`.
///
/// ```
/// use lobbyforge_lobby::SpawnRotator;
/// use lobbyforge_protocol::Location;
///
/// let mut spawns = SpawnRotator::new();
/// spawns.add(Location::new("lobby", 0.0, 65.0, 0.0)).unwrap();
/// spawns.add(Location::new("lobby", 8.0, 65.0, 0.0)).unwrap();
///
/// assert_eq!(spawns.next().map(|l| l.x), Some(0.0));
/// assert_eq!(spawns.next().map(|l| l.x), Some(8.0));
/// assert_eq!(spawns.next().map(|l| l.x), Some(0.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpawnRotator {
    points: Vec<Location>,
    cursor: usize,
}

impl SpawnRotator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a rotator from configured points, in order.
    ///
    /// # Errors
    /// [`LobbyError::WrongWorld`] if the points span more than one world.
    pub fn from_points(
        points: impl IntoIterator<Item = Location>,
    ) -> Result<Self, LobbyError> {
        let mut rotator = Self::new();
        for point in points {
            rotator.add(point)?;
        }
        Ok(rotator)
    }

    /// Appends a spawn point. The first point decides the lobby world.
    ///
    /// # Errors
    /// [`LobbyError::WrongWorld`] if `point` is in a different world than
    /// the points already added.
    pub fn add(&mut self, point: Location) -> Result<(), LobbyError> {
        if let Some(world) = self.lobby_world() {
            if *world != point.world {
                return Err(LobbyError::WrongWorld {
                    expected: world.clone(),
                    got: point.world,
                });
            }
        }
        tracing::debug!(world = %point.world, index = self.points.len(), "spawn point added");
        self.points.push(point);
        Ok(())
    }

    /// The next spawn point, or `None` if there are none.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Location> {
        let point = self.points.get(self.cursor)?.clone();
        self.cursor = (self.cursor + 1) % self.points.len();
        Some(point)
    }

    /// The world of the first spawn point.
    pub fn lobby_world(&self) -> Option<&WorldId> {
        self.points.first().map(|p| &p.world)
    }

    /// `true` if `world` is the lobby world.
    pub fn is_lobby(&self, world: &WorldId) -> bool {
        self.lobby_world() == Some(world)
    }

    pub fn points(&self) -> &[Location] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
