use glam::{ivec2, IVec2};

/// Dense rectangular 2D array addressed by `IVec2`.
///
/// Backed by a flat row-major slice, dimensions fixed at construction.
/// In-bounds access is a caller contract, checked in debug builds. Use
/// `get_or` for total reads that clamp to a default past the edges.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Grid<T> {
    dim: IVec2,
    data: Box<[T]>,
}

impl<T: Clone> Grid<T> {
    pub fn new(dim: impl Into<IVec2>, fill: T) -> Self {
        let dim = dim.into();
        assert!(dim.x > 0 && dim.y > 0, "zero-area grid");
        Grid {
            dim,
            data: vec![fill; (dim.x * dim.y) as usize].into_boxed_slice(),
        }
    }

    /// Reset every cell to the given value without reallocating.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T> Grid<T> {
    pub fn from_fn(
        dim: impl Into<IVec2>,
        mut f: impl FnMut(IVec2) -> T,
    ) -> Self {
        let dim = dim.into();
        assert!(dim.x > 0 && dim.y > 0, "zero-area grid");
        let mut data = Vec::with_capacity((dim.x * dim.y) as usize);
        for y in 0..dim.y {
            for x in 0..dim.x {
                data.push(f(ivec2(x, y)));
            }
        }
        Grid {
            dim,
            data: data.into_boxed_slice(),
        }
    }

    /// Build a grid from fixed-width ASCII art, one cell per character.
    ///
    /// Leading and trailing blank lines are skipped and common leading
    /// whitespace is removed so the map literal can be indented along with
    /// the code. All remaining rows must have equal width.
    pub fn from_ascii(text: &str, mut f: impl FnMut(char) -> T) -> Self {
        let lines: Vec<&str> = text
            .lines()
            .map(|a| a.trim_end())
            .skip_while(|a| a.is_empty())
            .collect();
        let lines = &lines[..lines.iter().rposition(|a| !a.is_empty()).map_or(0, |i| i + 1)];
        let indent = lines
            .iter()
            .map(|a| a.chars().take_while(|c| c.is_whitespace()).count())
            .min()
            .unwrap_or(0);
        let rows: Vec<Vec<char>> = lines
            .iter()
            .map(|a| a.chars().skip(indent).collect())
            .collect();
        let w = rows.first().map_or(0, |r| r.len());
        assert!(
            w > 0 && rows.iter().all(|r| r.len() == w),
            "ragged ascii map"
        );

        Grid::from_fn(ivec2(w as i32, rows.len() as i32), |p| {
            f(rows[p.y as usize][p.x as usize])
        })
    }

    pub fn dim(&self) -> IVec2 {
        self.dim
    }

    pub fn contains(&self, p: impl Into<IVec2>) -> bool {
        let p = p.into();
        p.x >= 0 && p.y >= 0 && p.x < self.dim.x && p.y < self.dim.y
    }

    #[inline]
    fn idx(&self, p: IVec2) -> usize {
        debug_assert!(
            self.contains(p),
            "Grid: {p} outside {}x{}",
            self.dim.x,
            self.dim.y
        );
        (p.y * self.dim.x + p.x) as usize
    }

    #[inline]
    pub fn get(&self, p: impl Into<IVec2>) -> &T {
        &self.data[self.idx(p.into())]
    }

    #[inline]
    pub fn get_mut(&mut self, p: impl Into<IVec2>) -> &mut T {
        let i = self.idx(p.into());
        &mut self.data[i]
    }

    /// Iterate every in-bounds coordinate in row-major order.
    pub fn points(&self) -> impl Iterator<Item = IVec2> {
        let dim = self.dim;
        (0..dim.y).flat_map(move |y| (0..dim.x).map(move |x| ivec2(x, y)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (IVec2, &T)> {
        self.points().zip(self.data.iter()).map(|(p, v)| (p, v))
    }
}

impl<T: Copy> Grid<T> {
    /// Total read, falls back to the given value outside the grid.
    #[inline]
    pub fn get_or(&self, p: impl Into<IVec2>, default: T) -> T {
        let p = p.into();
        if self.contains(p) {
            self.data[(p.y * self.dim.x + p.x) as usize]
        } else {
            default
        }
    }
}

impl<T> std::ops::Index<IVec2> for Grid<T> {
    type Output = T;

    fn index(&self, p: IVec2) -> &T {
        self.get(p)
    }
}

impl<T> std::ops::IndexMut<IVec2> for Grid<T> {
    fn index_mut(&mut self, p: IVec2) -> &mut T {
        self.get_mut(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_and_indexing() {
        let mut g = Grid::new([4, 3], 0i32);
        assert_eq!(g.dim(), ivec2(4, 3));
        assert!(g.contains([3, 2]));
        assert!(!g.contains([4, 0]));
        assert!(!g.contains([-1, 0]));

        g[ivec2(3, 2)] = 7;
        assert_eq!(g[ivec2(3, 2)], 7);
        assert_eq!(g.get_or([3, 2], -1), 7);
        assert_eq!(g.get_or([4, 2], -1), -1);
        assert_eq!(g.get_or([0, -1], -1), -1);

        assert_eq!(g.points().count(), 12);
        assert_eq!(g.iter().map(|(_, v)| *v).sum::<i32>(), 7);
    }

    #[test]
    fn from_ascii_trims_indentation() {
        let g = Grid::from_ascii(
            "
            ###
            #..
            ###",
            |c| c == '#',
        );
        assert_eq!(g.dim(), ivec2(3, 3));
        assert!(g[ivec2(0, 0)]);
        assert!(!g[ivec2(1, 1)]);
        assert!(!g[ivec2(2, 1)]);
    }

    #[test]
    fn fill_resets_cells() {
        let mut g = Grid::from_fn([2, 2], |p| p.x + p.y);
        g.fill(9);
        assert!(g.iter().all(|(_, v)| *v == 9));
    }
}
