/// Fixed-size 2D cell storage.
///
/// Cells are stored row-major (`cells[y * width + x]`). Coordinates wrap
/// around in both axes, so any `isize` pair addresses a valid cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<u32>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(
            width > 0 && height > 0,
            "Grid dimensions must be positive, got {}x{}",
            width,
            height
        );
        Grid {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    pub fn from_cells(width: usize, height: usize, cells: Vec<u32>) -> Self {
        assert!(
            width > 0 && height > 0,
            "Grid dimensions must be positive, got {}x{}",
            width,
            height
        );
        assert_eq!(
            cells.len(),
            width * height,
            "Cell count does not match a {}x{} grid",
            width,
            height
        );
        Grid {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn index(&self, x: isize, y: isize) -> usize {
        let x = x.rem_euclid(self.width as isize) as usize;
        let y = y.rem_euclid(self.height as isize) as usize;
        y * self.width + x
    }

    pub fn get(&self, x: isize, y: isize) -> u32 {
        self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: isize, y: isize, value: u32) {
        let index = self.index(x, y);
        self.cells[index] = value;
    }

    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [u32] {
        &mut self.cells
    }

    /// Absolute indices of every empty cell, in storage order.
    pub fn empty_cells(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value == 0)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&value| value != 0).count()
    }
}
