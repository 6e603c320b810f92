//! Board cells
//!
//! Every cell runs its own generation timer. When it fires, the cell counts
//! its live neighbours and stages its next state; the write is applied once
//! every cell has read the board, so a generation never sees half of the
//! next one.

use crate::canvas::Canvas;
use scene_loop::prelude::*;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Event dispatched when a dead cell comes alive
pub const BORN: &str = "born";

/// Event dispatched when a live cell dies
pub const DIED: &str = "died";

/// Conway's rule: births on 3, survival on 2 or 3
const BORN_WITH: [usize; 1] = [3];
const SURVIVES_WITH: [usize; 2] = [2, 3];

/// One square of the board
pub struct Cell {
    /// Row on the board
    pub row: usize,
    /// Column on the board
    pub col: usize,
    /// Current state
    pub alive: bool,
    /// Simulated time (ms) between generations
    pub generation_ms: f64,
    /// Surrounding cells, wrapping around the board edges
    pub neighbours: Vec<Weak<Node<Cell>>>,
    canvas: Rc<RefCell<Canvas>>,
}

impl Cell {
    /// Create a cell drawing onto `canvas`
    pub fn new(
        row: usize,
        col: usize,
        alive: bool,
        generation_ms: f64,
        canvas: Rc<RefCell<Canvas>>,
    ) -> Self {
        Self {
            row,
            col,
            alive,
            generation_ms,
            neighbours: Vec::new(),
            canvas,
        }
    }

    /// Number of live neighbours
    pub fn alive_neighbours(&self) -> usize {
        self.neighbours
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|neighbour| neighbour.model().alive)
            .count()
    }

    /// State this cell takes in the next generation
    pub fn next_state(&self) -> bool {
        let count = self.alive_neighbours();
        if self.alive {
            SURVIVES_WITH.contains(&count)
        } else {
            BORN_WITH.contains(&count)
        }
    }
}

/// Per-cell generation timer
struct CellSimulator {
    wait_for_tick: f64,
    tick: f64,
}

impl CellSimulator {
    fn next_generation(node: &Node<Cell>, step: &SimulationStep<'_>) {
        let (alive, next) = {
            let cell = node.model();
            (cell.alive, cell.next_state())
        };
        if alive == next {
            return;
        }

        let Some(handle) = node.handle() else {
            return;
        };
        step.update(move || {
            let (row, col) = {
                let mut cell = handle.model_mut();
                cell.alive = next;
                (cell.row, cell.col)
            };
            let event = Event::new()
                .with_arg("row", EventArg::Int(i64::try_from(row).unwrap_or(i64::MAX)))
                .with_arg("col", EventArg::Int(i64::try_from(col).unwrap_or(i64::MAX)));
            handle.events().dispatch(if next { BORN } else { DIED }, event);
        });
    }
}

impl Simulator<Cell> for CellSimulator {
    fn simulate(&mut self, node: &Node<Cell>, step: &SimulationStep<'_>) -> FacetResult {
        self.wait_for_tick -= step.dt;
        if self.wait_for_tick > 0.0 {
            return Ok(());
        }
        self.wait_for_tick += self.tick;
        Self::next_generation(node, step);
        Ok(())
    }
}

fn draw(node: &Node<Cell>, _frame: &RenderFrame) -> FacetResult {
    let cell = node.model();
    let glyph = if cell.alive { '#' } else { '.' };
    cell.canvas.borrow_mut().plot(cell.row, cell.col, glyph);
    Ok(())
}

impl Model for Cell {
    fn simulator() -> Behavior<Self, Simulation> {
        SimulateBehavior::factory(|_id, cell: &Cell| CellSimulator {
            wait_for_tick: cell.generation_ms,
            tick: cell.generation_ms,
        })
    }

    fn renderer() -> Behavior<Self, Rendering> {
        RenderBehavior::function(draw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(alive: bool, canvas: &Rc<RefCell<Canvas>>) -> Rc<Node<Cell>> {
        Node::new(Cell::new(0, 0, alive, 100.0, Rc::clone(canvas)))
    }

    fn surround(center: &Rc<Node<Cell>>, neighbours: &[Rc<Node<Cell>>]) {
        center.model_mut().neighbours = neighbours.iter().map(Rc::downgrade).collect();
    }

    #[test]
    fn test_rules() {
        let canvas = Rc::new(RefCell::new(Canvas::new(1, 1)));
        let live: Vec<_> = (0..3).map(|_| cell(true, &canvas)).collect();
        let dead: Vec<_> = (0..5).map(|_| cell(false, &canvas)).collect();

        let center = cell(false, &canvas);
        surround(&center, &[&live[..3], &dead[..]].concat());
        assert!(center.model().next_state());

        center.model_mut().alive = true;
        surround(&center, &[&live[..1], &dead[..]].concat());
        assert!(!center.model().next_state());

        surround(&center, &[&live[..2], &dead[..]].concat());
        assert!(center.model().next_state());
    }

    #[test]
    fn test_waits_for_generation_timer() {
        let canvas = Rc::new(RefCell::new(Canvas::new(1, 1)));
        let neighbours: Vec<_> = (0..3).map(|_| cell(true, &canvas)).collect();
        let center = cell(false, &canvas);
        surround(&center, &neighbours);

        let updates = DeferredUpdates::new();
        let step = SimulationStep { t: 0.0, dt: 60.0, updates: &updates };
        center.simulate(Phase::Pre, &step).unwrap();
        assert!(updates.is_empty());

        center.simulate(Phase::Pre, &step).unwrap();
        assert_eq!(updates.len(), 1);
        assert!(!center.model().alive);

        updates.flush();
        assert!(center.model().alive);
    }

    #[test]
    fn test_birth_dispatches_event() {
        let canvas = Rc::new(RefCell::new(Canvas::new(1, 1)));
        let neighbours: Vec<_> = (0..3).map(|_| cell(true, &canvas)).collect();
        let center = cell(false, &canvas);
        surround(&center, &neighbours);

        let births = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&births);
        center.events().add_listener(
            BORN,
            move |event: &Event| sink.borrow_mut().push(event.get_int("row")),
            false,
        );

        let updates = DeferredUpdates::new();
        let step = SimulationStep { t: 0.0, dt: 100.0, updates: &updates };
        center.simulate(Phase::Pre, &step).unwrap();
        updates.flush();

        assert_eq!(*births.borrow(), [Some(0)]);
    }

    #[test]
    fn test_draws_its_state() {
        let canvas = Rc::new(RefCell::new(Canvas::new(1, 2)));
        let node = Node::new(Cell::new(0, 1, true, 100.0, Rc::clone(&canvas)));

        node.render(Phase::Pre, &RenderFrame { interpolation: 0.0 }).unwrap();
        assert_eq!(canvas.borrow().row_text(0), " #");
    }
}
