//! Proposition variables for "(cell, category) holds" and cardinality
//! constraints over them.
//!
//! The cardinality encodings are the plain binomial ones: `at_most_n(k, vs)`
//! forbids every `(k + 1)`-subset of `vs` from being all true, `at_least_n`
//! requires every `(|vs| - k + 1)`-subset to contain a true variable. Call
//! sites keep `vs` small (a cell's categories, one sensing window).

use crate::{
    grid::{Category, Cell, Dims},
    types::{Clause, Lit, Var},
};

/// Bijection between `(Cell, Category)` pairs and variables `1..=var_count`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Encoder {
    dims: Dims,
}

impl Encoder {
    pub fn new(dims: Dims) -> Self {
        Self { dims }
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn var_count(&self) -> usize {
        self.dims.len() * Category::COUNT
    }

    /// Panics if `cell` is outside the grid.
    pub fn var(&self, cell: Cell, category: Category) -> Var {
        assert!(self.dims.contains(cell), "cell {cell} outside the grid");
        let (x, y) = (cell.x as usize, cell.y as usize);
        x * Category::COUNT * self.dims.height + y * Category::COUNT + category.index() + 1
    }

    pub fn lit(&self, cell: Cell, category: Category) -> Lit {
        self.var(cell, category) as Lit
    }

    /// Panics if `var` is not in `1..=var_count`.
    pub fn decode(&self, var: Var) -> (Cell, Category) {
        assert!(
            (1..=self.var_count()).contains(&var),
            "variable {var} out of range"
        );
        let v = var - 1;
        let column = Category::COUNT * self.dims.height;
        let x = v / column;
        let y = (v % column) / Category::COUNT;
        let category = Category::ALL[v % Category::COUNT];
        (Cell::new(x as i32, y as i32), category)
    }

    /// The variables of all categories of one cell.
    pub fn cell_vars(&self, cell: Cell) -> Vec<Lit> {
        Category::ALL
            .iter()
            .map(|&category| self.lit(cell, category))
            .collect()
    }

    /// One category's variable in every cell of the grid.
    pub fn category_vars(&self, category: Category) -> Vec<Lit> {
        self.dims
            .cells()
            .map(|cell| self.lit(cell, category))
            .collect()
    }
}

/// All `k`-element subsets of `items`, in lexicographic order.
fn combinations(items: &[Lit], k: usize) -> Vec<Clause> {
    fn extend(items: &[Lit], k: usize, prefix: &mut Clause, out: &mut Vec<Clause>) {
        if prefix.len() == k {
            out.push(prefix.clone());
            return;
        }
        let missing = k - prefix.len();
        for i in 0..items.len() {
            if items.len() - i < missing {
                break;
            }
            prefix.push(items[i]);
            extend(&items[i + 1..], k, prefix, out);
            prefix.pop();
        }
    }

    let mut out = vec![];
    if k <= items.len() {
        extend(items, k, &mut Vec::with_capacity(k), &mut out);
    }
    out
}

/// At least `k` of `vars` are true.
pub fn at_least_n(k: usize, vars: &[Lit]) -> Vec<Clause> {
    match k {
        0 => vec![],
        // no assignment can satisfy it
        k if k > vars.len() => vec![vec![]],
        k => combinations(vars, vars.len() - k + 1),
    }
}

/// At most `k` of `vars` are true.
pub fn at_most_n(k: usize, vars: &[Lit]) -> Vec<Clause> {
    let negated: Vec<Lit> = vars.iter().map(|&v| -v).collect();
    combinations(&negated, k + 1)
}

/// Exactly `k` of `vars` are true.
pub fn exactly_n(k: usize, vars: &[Lit]) -> Vec<Clause> {
    if vars.is_empty() {
        return if k == 0 { vec![] } else { vec![vec![]] };
    }
    let mut clauses = at_most_n(k, vars);
    clauses.extend(at_least_n(k, vars));
    clauses
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{at_least_n, at_most_n, combinations, exactly_n, Encoder};
    use crate::grid::{Category, Cell, Dims};
    use crate::types::{Clause, Lit};

    fn satisfied(clauses: &[Clause], model: u32) -> bool {
        let value = |lit: Lit| {
            let bit = (model >> (lit.unsigned_abs() - 1)) & 1 == 1;
            if lit > 0 {
                bit
            } else {
                !bit
            }
        };
        clauses.iter().all(|clause| clause.iter().any(|&lit| value(lit)))
    }

    #[test]
    fn combination_counts() {
        let items: Vec<Lit> = (1..=6).collect();
        assert_eq!(combinations(&items, 0), vec![Vec::<Lit>::new()]);
        assert_eq!(combinations(&items, 2).len(), 15);
        assert_eq!(combinations(&items, 6).len(), 1);
        assert!(combinations(&items, 7).is_empty());
    }

    #[test]
    fn cardinality_brute_force() {
        for s in 0..=6u32 {
            let vars: Vec<Lit> = (1..=s as Lit).collect();
            for k in 0..=s as usize {
                let exactly = exactly_n(k, &vars);
                let at_least = at_least_n(k, &vars);
                let at_most = at_most_n(k, &vars);
                for model in 0..(1u32 << s) {
                    let ones = model.count_ones() as usize;
                    assert_eq!(satisfied(&exactly, model), ones == k, "exactly {k} of {s}");
                    assert_eq!(satisfied(&at_least, model), ones >= k, "at least {k} of {s}");
                    assert_eq!(satisfied(&at_most, model), ones <= k, "at most {k} of {s}");
                }
            }
        }
    }

    #[test]
    fn impossible_cardinality_is_unsatisfiable() {
        let vars: Vec<Lit> = vec![1, 2];
        assert_eq!(at_least_n(3, &vars), vec![Vec::<Lit>::new()]);
        assert_eq!(exactly_n(1, &[]), vec![Vec::<Lit>::new()]);
        assert!(exactly_n(0, &[]).is_empty());
    }

    #[test]
    fn numbering_is_dense() {
        let enc = Encoder::new(Dims::new(3, 2));
        assert_eq!(enc.var(Cell::new(0, 0), Category::Empty), 1);
        assert_eq!(enc.var(Cell::new(0, 1), Category::Empty), 14);
        assert_eq!(enc.var(Cell::new(2, 1), Category::Weapon), enc.var_count());
    }

    #[test]
    #[should_panic]
    fn encoding_off_grid_panics() {
        Encoder::new(Dims::new(2, 2)).var(Cell::new(2, 0), Category::Wall);
    }

    fn cell_in_grid() -> impl Strategy<Value = (usize, usize, usize, usize, usize)> {
        (1usize..12, 1usize..12).prop_flat_map(|(width, height)| {
            (Just(width), Just(height), 0..width, 0..height, 0..Category::COUNT)
        })
    }

    proptest! {
        #[test]
        fn encode_decode_bijection((width, height, x, y, k) in cell_in_grid()) {
            let enc = Encoder::new(Dims::new(width, height));
            let cell = Cell::new(x as i32, y as i32);
            let category = Category::ALL[k];
            let var = enc.var(cell, category);
            prop_assert!(var >= 1 && var <= enc.var_count());
            prop_assert_eq!(enc.decode(var), (cell, category));
        }
    }
}
