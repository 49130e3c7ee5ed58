use tactics_engine::grid::{CellKind, Grid, Layout, Position};

#[test]
fn five_by_three_has_dead_back_corners() {
    let g = Grid::equal_5x3();
    assert_eq!(g.columns(), 5);
    assert_eq!(g.rows(), 3);
    assert!(!g.is_playable(Position::new(0, 2)));
    assert!(!g.is_playable(Position::new(4, 2)));
    assert!(g.is_playable(Position::new(2, 2)));
    assert_eq!(g.cell(Position::new(0, 2)), Some(CellKind::Unavailable));
    assert_eq!(g.cells().count(), 13);
}

#[test]
fn layout_ids_and_cell_counts() {
    assert_eq!(Layout::Equal3x3 as u8, 1);
    assert_eq!(Layout::Equal5x3 as u8, 2);
    assert_eq!(Layout::Equal4x3 as u8, 3);
    assert_eq!(Grid::equal_3x3().cells().count(), 7);
    assert_eq!(Grid::equal_4x3().cells().count(), 11);
    assert!(!Grid::equal_4x3().is_playable(Position::new(3, 2)));
}

#[test]
fn out_of_bounds_is_not_playable() {
    let g = Grid::equal_3x3();
    assert!(!g.contains(Position::new(3, 0)));
    assert!(!g.is_playable(Position::new(0, 3)));
    assert_eq!(g.cell(Position::new(5, 5)), None);
}

#[test]
fn column_and_row_queries_skip_dead_cells() {
    let g = Grid::equal_5x3();
    let col: Vec<_> = g.column(0).collect();
    assert_eq!(col, vec![Position::new(0, 0), Position::new(0, 1)]);
    let back: Vec<_> = g.row(2).collect();
    assert_eq!(back, vec![Position::new(1, 2), Position::new(2, 2), Position::new(3, 2)]);
}

#[test]
fn grid_ids_are_row_major() {
    let g = Grid::equal_5x3();
    assert_eq!(g.grid_id(Position::new(3, 1)), Some(8));
    assert_eq!(g.from_grid_id(8), Some(Position::new(3, 1)));
    assert_eq!(g.from_grid_id(15), None);
}

#[test]
fn offsets_below_zero_are_none() {
    let p = Position::new(0, 1);
    assert_eq!(p.offset(-1, 0), None);
    assert_eq!(p.offset(2, 1), Some(Position::new(2, 2)));
}

#[test]
fn positions_order_front_row_first() {
    assert!(Position::new(4, 0) < Position::new(0, 1));
    assert!(Position::new(1, 1) < Position::new(2, 1));
}

#[test]
fn display_marks_dead_cells() {
    assert_eq!(Grid::equal_5x3().to_string(), ".....\n.....\n#...#");
    assert_eq!(Grid::equal_3x3().to_string(), "...\n...\n#.#");
}
