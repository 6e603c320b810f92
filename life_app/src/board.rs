//! The board: root of the scene
//!
//! Owns every cell as a child, counts generations with its own timer and
//! prints the canvas whenever a new generation was drawn. Cell events are
//! proxied through the board's emitter, where a census listener counts them.

use crate::canvas::Canvas;
use crate::cell::{Cell, BORN, DIED};
use crate::config::BoardSettings;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_loop::prelude::*;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Births and deaths seen since the board was built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Census {
    /// Cells that came alive
    pub births: u64,
    /// Cells that died
    pub deaths: u64,
}

/// Terminal output of the board
pub type Screen = Rc<RefCell<dyn Write>>;

/// Root model holding all cells
pub struct Board {
    rows: usize,
    cols: usize,
    generation: u64,
    generation_ms: f64,
    cells: Vec<Rc<Node<Cell>>>,
    canvas: Rc<RefCell<Canvas>>,
    census: Rc<RefCell<Census>>,
    screen: Screen,
}

impl Board {
    /// Build a seeded board and wire its cells together
    pub fn build(settings: &BoardSettings, screen: Screen) -> Rc<Node<Self>> {
        let (rows, cols) = (settings.rows, settings.cols);
        let canvas = Rc::new(RefCell::new(Canvas::new(rows, cols)));
        let mut rng = StdRng::seed_from_u64(settings.seed);

        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let on_edge = row == 0 || col == 0 || row == rows - 1 || col == cols - 1;
                let fossil = settings.fossil_border && on_edge;
                let alive = !fossil && rng.gen_bool(settings.density);
                let cell = Cell::new(row, col, alive, settings.generation_ms, Rc::clone(&canvas));

                let node = if fossil {
                    // Inert: never simulated, never drawn
                    Node::builder(cell)
                        .simulator(Behavior::Noop)
                        .renderer(Behavior::Noop)
                        .build()
                } else {
                    Node::new(cell)
                };
                cells.push(node);
            }
        }
        link_neighbours(&cells, rows, cols);

        let census = Rc::new(RefCell::new(Census::default()));
        let board = Node::new(Self {
            rows,
            cols,
            generation: 0,
            generation_ms: settings.generation_ms,
            cells,
            canvas,
            census: Rc::clone(&census),
            screen,
        });

        for cell in &board.model().cells {
            board.events().proxy_events_from(cell.events());
        }
        let counter = Rc::clone(&census);
        board.events().add_listener(
            BORN,
            move |_event: &Event| counter.borrow_mut().births += 1,
            false,
        );
        board.events().add_listener(
            DIED,
            move |_event: &Event| census.borrow_mut().deaths += 1,
            false,
        );

        log::info!(
            "Board {}x{} seeded with {} live cells",
            rows,
            cols,
            board.model().population()
        );
        board
    }

    /// Generations completed
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of live cells
    pub fn population(&self) -> usize {
        self.cells.iter().filter(|cell| cell.model().alive).count()
    }

    /// Births and deaths so far
    pub fn census(&self) -> Census {
        *self.census.borrow()
    }

    /// Cell at a board position
    pub fn cell(&self, row: usize, col: usize) -> Option<&Rc<Node<Cell>>> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }
}

fn link_neighbours(cells: &[Rc<Node<Cell>>], rows: usize, cols: usize) {
    for (index, cell) in cells.iter().enumerate() {
        let (row, col) = (index / cols, index % cols);
        let mut neighbours = Vec::with_capacity(8);
        for row_offset in [rows - 1, 0, 1] {
            for col_offset in [cols - 1, 0, 1] {
                if row_offset == 0 && col_offset == 0 {
                    continue;
                }
                let r = (row + row_offset) % rows;
                let c = (col + col_offset) % cols;
                neighbours.push(Rc::downgrade(&cells[r * cols + c]));
            }
        }
        cell.model_mut().neighbours = neighbours;
    }
}

impl Model for Board {
    fn children(&self) -> Vec<NodeRef> {
        self.cells.iter().map(|cell| Rc::clone(cell) as NodeRef).collect()
    }

    fn simulator() -> Behavior<Self, Simulation> {
        SimulateBehavior::factory(|_id, board: &Board| GenerationTimer {
            wait_for_tick: board.generation_ms,
            tick: board.generation_ms,
        })
    }

    fn renderer() -> Behavior<Self, Rendering> {
        RenderBehavior::factory(|_id, _board: &Board| BoardRender { printed: None })
    }
}

/// Counts generations on the same schedule as the cells
struct GenerationTimer {
    wait_for_tick: f64,
    tick: f64,
}

impl Simulator<Board> for GenerationTimer {
    fn simulate(&mut self, node: &Node<Board>, step: &SimulationStep<'_>) -> FacetResult {
        self.wait_for_tick -= step.dt;
        if self.wait_for_tick <= 0.0 {
            self.wait_for_tick += self.tick;
            node.update(step.updates, |board| board.generation += 1);
        }
        Ok(())
    }
}

/// Clears the canvas before the cells draw and prints it after
struct BoardRender {
    printed: Option<u64>,
}

impl Render<Board> for BoardRender {
    fn render(&mut self, node: &Node<Board>, _frame: &RenderFrame) -> FacetResult {
        node.model().canvas.borrow_mut().clear();
        Ok(())
    }

    fn post_render(&mut self, node: &Node<Board>, _frame: &RenderFrame) -> FacetResult {
        let board = node.model();
        if self.printed == Some(board.generation) {
            return Ok(());
        }
        self.printed = Some(board.generation);

        let census = board.census();
        let framed = board.canvas.borrow().framed();
        let mut screen = board.screen.borrow_mut();
        let printed = writeln!(
            screen,
            "\x1b[H\x1b[2J{}\ngeneration {:>5}  population {:>5}  births {:>6}  deaths {:>6}",
            framed,
            board.generation,
            board.population(),
            census.births,
            census.deaths
        )
        .and_then(|()| screen.flush());
        printed.map_err(|e| FacetError::Custom(format!("Failed to print board: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Rc<RefCell<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    fn empty_board(rows: usize, cols: usize) -> (Rc<Node<Board>>, Capture) {
        let settings = BoardSettings {
            rows,
            cols,
            generation_ms: 100.0,
            density: 0.0,
            ..BoardSettings::default()
        };
        let capture = Capture::default();
        let board = Board::build(&settings, Rc::new(RefCell::new(capture.clone())));
        (board, capture)
    }

    fn set_alive(board: &Node<Board>, positions: &[(usize, usize)]) {
        for &(row, col) in positions {
            if let Some(cell) = board.model().cell(row, col) {
                cell.model_mut().alive = true;
            }
        }
    }

    fn alive_at(board: &Node<Board>, row: usize, col: usize) -> bool {
        board.model().cell(row, col).is_some_and(|cell| cell.model().alive)
    }

    #[test]
    fn test_neighbours_wrap_around() {
        let (board, _) = empty_board(4, 5);
        set_alive(&board, &[(3, 4), (0, 1)]);

        let model = board.model();
        let corner = model.cell(0, 0).unwrap();
        assert_eq!(corner.model().neighbours.len(), 8);
        assert_eq!(corner.model().alive_neighbours(), 2);
    }

    #[test]
    fn test_blinker_oscillates() {
        let (board, _) = empty_board(5, 5);
        set_alive(&board, &[(2, 1), (2, 2), (2, 3)]);
        let mut main_loop = LoopBuilder::new()
            .root(board.clone())
            .clock(ManualClock::new())
            .build()
            .unwrap();

        main_loop.step(Some(100.0)).unwrap();
        assert_eq!(board.model().generation(), 1);
        assert!(alive_at(&board, 1, 2) && alive_at(&board, 2, 2) && alive_at(&board, 3, 2));
        assert!(!alive_at(&board, 2, 1) && !alive_at(&board, 2, 3));

        main_loop.step(Some(100.0)).unwrap();
        assert_eq!(board.model().generation(), 2);
        assert!(alive_at(&board, 2, 1) && alive_at(&board, 2, 3));
        assert_eq!(board.model().population(), 3);
        assert_eq!(board.model().census(), Census { births: 4, deaths: 4 });
    }

    #[test]
    fn test_prints_once_per_generation() {
        let (board, capture) = empty_board(3, 3);
        set_alive(&board, &[(1, 1)]);
        let mut main_loop = LoopBuilder::new()
            .root(board.clone())
            .clock(ManualClock::new())
            .build()
            .unwrap();

        main_loop.step(Some(10.0)).unwrap();
        main_loop.step(Some(10.0)).unwrap();
        let output = capture.text();
        assert_eq!(output.matches("generation").count(), 1);
        assert!(output.contains("|.#.|"));

        main_loop.step(Some(100.0)).unwrap();
        let output = capture.text();
        assert_eq!(output.matches("generation").count(), 2);
        assert!(output.contains("generation     1"));
        assert!(output.contains("|...|"));
    }

    #[test]
    fn test_fossil_border_stays_dead() {
        let settings = BoardSettings {
            rows: 6,
            cols: 6,
            density: 1.0,
            fossil_border: true,
            ..BoardSettings::default()
        };
        let board = Board::build(&settings, Rc::new(RefCell::new(Capture::default())));

        assert_eq!(board.model().population(), 16);
        assert!(!alive_at(&board, 0, 0));
        assert!(alive_at(&board, 1, 1));
    }
}
