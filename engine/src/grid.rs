//! Battlefield topology: a fixed 3-row grid with 3 to 5 columns and a few
//! dead cells. Row 0 is the front row, the one facing the enemy.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const ROWS: u8 = 3;

/// A cell on one side's grid.
///
/// Ordering is row-major (front row first, then left to right), which is the
/// order targets and legal actions are enumerated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub col: u8,
    pub row: u8,
}

impl Position {
    pub const fn new(col: u8, row: u8) -> Self {
        Self { col, row }
    }

    /// Shift by a signed offset; `None` when either coordinate would go negative.
    pub fn offset(self, dx: i32, dy: i32) -> Option<Position> {
        let col = i32::from(self.col) + dx;
        let row = i32::from(self.row) + dy;
        if !(0..=i32::from(u8::MAX)).contains(&col) || !(0..=i32::from(u8::MAX)).contains(&row) {
            return None;
        }
        Some(Position::new(col as u8, row as u8))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.row, self.col).cmp(&(other.row, other.col))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.col, self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Available,
    Unavailable,
    Wall,
}

/// The built-in grid shapes. Discriminants match the layout ids used in data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Equal3x3 = 1,
    Equal5x3 = 2,
    Equal4x3 = 3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    columns: u8,
    cells: Vec<CellKind>,
}

impl Grid {
    pub fn new(layout: Layout) -> Self {
        match layout {
            Layout::Equal3x3 => Self::with_dead(3, &[Position::new(0, 2), Position::new(2, 2)]),
            Layout::Equal5x3 => Self::with_dead(5, &[Position::new(0, 2), Position::new(4, 2)]),
            Layout::Equal4x3 => Self::with_dead(4, &[Position::new(3, 2)]),
        }
    }

    pub fn equal_3x3() -> Self {
        Self::new(Layout::Equal3x3)
    }

    pub fn equal_5x3() -> Self {
        Self::new(Layout::Equal5x3)
    }

    pub fn equal_4x3() -> Self {
        Self::new(Layout::Equal4x3)
    }

    /// A grid with `columns` columns where `dead` cells are unavailable.
    pub fn with_dead(columns: u8, dead: &[Position]) -> Self {
        let mut cells = vec![CellKind::Available; usize::from(columns) * usize::from(ROWS)];
        for pos in dead {
            if pos.col < columns && pos.row < ROWS {
                cells[usize::from(pos.row) * usize::from(columns) + usize::from(pos.col)] =
                    CellKind::Unavailable;
            }
        }
        Self { columns, cells }
    }

    pub fn columns(&self) -> u8 {
        self.columns
    }

    pub fn rows(&self) -> u8 {
        ROWS
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.col < self.columns && pos.row < ROWS
    }

    pub fn cell(&self, pos: Position) -> Option<CellKind> {
        self.grid_id(pos).map(|id| self.cells[usize::from(id)])
    }

    /// In bounds and not a dead or wall cell.
    pub fn is_playable(&self, pos: Position) -> bool {
        self.cell(pos) == Some(CellKind::Available)
    }

    pub fn grid_id(&self, pos: Position) -> Option<u8> {
        self.contains(pos).then(|| pos.row * self.columns + pos.col)
    }

    pub fn from_grid_id(&self, id: u8) -> Option<Position> {
        if self.columns == 0 {
            return None;
        }
        let pos = Position::new(id % self.columns, id / self.columns);
        self.contains(pos).then_some(pos)
    }

    /// Playable cells, front row first.
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        (0..ROWS)
            .flat_map(move |row| (0..self.columns).map(move |col| Position::new(col, row)))
            .filter(|p| self.is_playable(*p))
    }

    /// Playable cells of one column, front to back.
    pub fn column(&self, col: u8) -> impl Iterator<Item = Position> + '_ {
        (0..ROWS)
            .map(move |row| Position::new(col, row))
            .filter(|p| self.is_playable(*p))
    }

    /// Playable cells of one row, left to right.
    pub fn row(&self, row: u8) -> impl Iterator<Item = Position> + '_ {
        (0..self.columns)
            .map(move |col| Position::new(col, row))
            .filter(|p| self.is_playable(*p))
    }
}

impl fmt::Display for Grid {
    /// One line per row, front row on top: `.` playable, `#` dead.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..ROWS {
            for col in 0..self.columns {
                let c = if self.is_playable(Position::new(col, row)) { '.' } else { '#' };
                write!(f, "{c}")?;
            }
            if row + 1 < ROWS {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
