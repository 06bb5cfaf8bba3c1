//! Level geometry consumed by systems, strategies, and the save codec.
//!
//! The engine only needs three things from a level: resolve a grid point to
//! a tile, tell whether that tile can be walked on, and find a path between
//! two points. [`TileLevel`] captures exactly that. [`GridLevel`] is a small
//! ASCII-backed implementation with breadth-first pathfinding, used by the
//! CLI and tests.
//!
//! Grid coordinates grow to the right (`x`) and upwards (`y`). In the ASCII
//! form the last text row is `y = 0`.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// An integer grid coordinate.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two grid points.
    pub fn distance(self, other: Point) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    fn neighbours(self) -> [Point; 4] {
        [
            Point::new(self.x + 1, self.y),
            Point::new(self.x - 1, self.y),
            Point::new(self.x, self.y + 1),
            Point::new(self.x, self.y - 1),
        ]
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Tiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelElement {
    Skip,
    Floor,
    Wall,
    Hole,
    Exit,
    Door,
}

impl LevelElement {
    pub fn is_accessible(self) -> bool {
        matches!(self, LevelElement::Floor | LevelElement::Exit | LevelElement::Door)
    }

    fn from_glyph(glyph: char) -> Option<Self> {
        Some(match glyph {
            ' ' => LevelElement::Skip,
            '.' => LevelElement::Floor,
            '#' => LevelElement::Wall,
            'O' => LevelElement::Hole,
            'E' => LevelElement::Exit,
            'D' => LevelElement::Door,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    point: Point,
    element: LevelElement,
}

impl Tile {
    pub fn new(point: Point, element: LevelElement) -> Self {
        Self { point, element }
    }

    pub fn point(&self) -> Point {
        self.point
    }

    pub fn element(&self) -> LevelElement {
        self.element
    }

    pub fn is_accessible(&self) -> bool {
        self.element.is_accessible()
    }
}

/// An ordered sequence of tiles, start first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TilePath {
    tiles: Vec<Tile>,
}

impl TilePath {
    pub fn new(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.tiles.iter().map(Tile::point)
    }
}

// ---------------------------------------------------------------------------
// TileLevel
// ---------------------------------------------------------------------------

/// The level capability the engine depends on.
pub trait TileLevel {
    /// The tile at `point`, if the level covers it.
    fn tile_at(&self, point: Point) -> Option<&Tile>;

    /// Whether an entity may stand on `point`.
    fn is_accessible(&self, point: Point) -> bool {
        self.tile_at(point).is_some_and(Tile::is_accessible)
    }

    /// A walkable path from `from` to `to`, both included.
    fn find_path(&self, from: Point, to: Point) -> Option<TilePath>;

    /// Accessible points within `radius` of `center`, in scan order.
    fn accessible_in_radius(&self, center: Point, radius: f32) -> Vec<Point> {
        let reach = radius.max(0.0).floor() as i32;
        let mut points = Vec::new();
        for y in center.y - reach..=center.y + reach {
            for x in center.x - reach..=center.x + reach {
                let p = Point::new(x, y);
                if p.distance(center) <= radius && self.is_accessible(p) {
                    points.push(p);
                }
            }
        }
        points
    }
}

// ---------------------------------------------------------------------------
// GridLevel
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("level layout is empty")]
    Empty,

    #[error("row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("unknown glyph {glyph:?} at {point}")]
    UnknownGlyph { glyph: char, point: Point },
}

/// A rectangular level parsed from ASCII rows.
///
/// | glyph | element |
/// |-------|---------|
/// | `.`   | floor   |
/// | `#`   | wall    |
/// | `E`   | exit    |
/// | `D`   | door    |
/// | `O`   | hole    |
/// | space | skip    |
#[derive(Debug, Clone)]
pub struct GridLevel {
    width: usize,
    height: usize,
    /// Row-major from `y = 0`.
    tiles: Vec<Tile>,
}

impl GridLevel {
    /// Parse a level. Blank leading and trailing lines are ignored.
    pub fn parse(layout: &str) -> Result<Self, LevelError> {
        let rows: Vec<&str> = layout
            .lines()
            .skip_while(|l| l.trim().is_empty())
            .collect();
        let end = rows
            .iter()
            .rposition(|l| !l.trim().is_empty())
            .map_or(0, |i| i + 1);
        let rows = &rows[..end];
        if rows.is_empty() {
            return Err(LevelError::Empty);
        }

        let width = rows[0].chars().count();
        let height = rows.len();
        let mut tiles = Vec::with_capacity(width * height);

        // Last text row is y = 0.
        for (y, row) in rows.iter().rev().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(LevelError::Ragged {
                    row: height - 1 - y,
                    expected: width,
                    found,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let point = Point::new(x as i32, y as i32);
                let element =
                    LevelElement::from_glyph(glyph).ok_or(LevelError::UnknownGlyph { glyph, point })?;
                tiles.push(Tile::new(point, element));
            }
        }

        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Every accessible point in row-major order.
    pub fn accessible_points(&self) -> Vec<Point> {
        self.tiles
            .iter()
            .filter(|t| t.is_accessible())
            .map(Tile::point)
            .collect()
    }

    fn slot(&self, point: Point) -> Option<usize> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        let (x, y) = (point.x as usize, point.y as usize);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }
}

impl TileLevel for GridLevel {
    fn tile_at(&self, point: Point) -> Option<&Tile> {
        self.slot(point).map(|i| &self.tiles[i])
    }

    fn find_path(&self, from: Point, to: Point) -> Option<TilePath> {
        if !self.is_accessible(from) || !self.is_accessible(to) {
            return None;
        }

        let mut came_from: HashMap<Point, Point> = HashMap::new();
        let mut frontier = VecDeque::from([from]);
        came_from.insert(from, from);

        while let Some(current) = frontier.pop_front() {
            if current == to {
                break;
            }
            for next in current.neighbours() {
                if self.is_accessible(next) && !came_from.contains_key(&next) {
                    came_from.insert(next, current);
                    frontier.push_back(next);
                }
            }
        }

        if !came_from.contains_key(&to) {
            return None;
        }

        let mut points = vec![to];
        let mut cursor = to;
        while cursor != from {
            cursor = came_from[&cursor];
            points.push(cursor);
        }
        points.reverse();

        let tiles = points
            .into_iter()
            .filter_map(|p| self.tile_at(p).cloned())
            .collect();
        Some(TilePath::new(tiles))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ROOM: &str = "
#######
#.....#
#.###.#
#.....E
#######
";

    #[test]
    fn parse_maps_last_row_to_y_zero() {
        let level = GridLevel::parse(ROOM).unwrap();
        assert_eq!((level.width(), level.height()), (7, 5));
        assert_eq!(level.tile_at(Point::new(0, 0)).unwrap().element(), LevelElement::Wall);
        assert_eq!(level.tile_at(Point::new(6, 1)).unwrap().element(), LevelElement::Exit);
        assert!(level.is_accessible(Point::new(1, 3)));
        assert!(!level.is_accessible(Point::new(3, 2)));
        assert!(level.tile_at(Point::new(7, 0)).is_none());
        assert!(level.tile_at(Point::new(-1, 0)).is_none());
    }

    #[test]
    fn parse_rejects_ragged_rows() {
        let err = GridLevel::parse("###\n##\n").unwrap_err();
        assert!(matches!(err, LevelError::Ragged { row: 1, expected: 3, found: 2 }));
    }

    #[test]
    fn parse_rejects_unknown_glyph() {
        let err = GridLevel::parse("#?#").unwrap_err();
        assert!(matches!(err, LevelError::UnknownGlyph { glyph: '?', .. }));
    }

    #[test]
    fn path_goes_around_walls() {
        let level = GridLevel::parse(ROOM).unwrap();
        let path = level.find_path(Point::new(1, 1), Point::new(5, 3)).unwrap();

        let points: Vec<Point> = path.points().collect();
        assert_eq!(points.first(), Some(&Point::new(1, 1)));
        assert_eq!(points.last(), Some(&Point::new(5, 3)));
        // Shortest route around the inner wall: 4 across + 2 up, plus the start.
        assert_eq!(path.len(), 7);
        for pair in points.windows(2) {
            assert_eq!((pair[0].x - pair[1].x).abs() + (pair[0].y - pair[1].y).abs(), 1);
            assert!(level.is_accessible(pair[1]));
        }
    }

    #[test]
    fn no_path_into_walls() {
        let level = GridLevel::parse(ROOM).unwrap();
        assert!(level.find_path(Point::new(1, 1), Point::new(3, 2)).is_none());
    }

    #[test]
    fn radius_query_only_returns_walkable_points() {
        let level = GridLevel::parse(ROOM).unwrap();
        let points = level.accessible_in_radius(Point::new(1, 1), 1.0);
        assert_eq!(points, vec![Point::new(1, 1), Point::new(2, 1), Point::new(1, 2)]);
    }
}
