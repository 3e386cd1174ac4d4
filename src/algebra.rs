//! Minimal derived-matrix engine.
//!
//! Production `X` is the row sum of `Z` and `Y`. Coefficients divide each
//! column by the producing sector's output; flows multiply back. Nothing
//! here checks that the table balances.

use crate::data::model::{Label, Matrix, MatrixName, MatrixSet};
use crate::error::{Error, Result};

const PIVOT_EPSILON: f64 = 1e-12;

/// Store production `X` and fill in whichever of `Z, V, E` / `z, v, e` is
/// missing.
pub fn calc_all(set: &mut MatrixSet) -> Result<()> {
    let y = set
        .get(MatrixName::Y)
        .ok_or_else(|| Error::Algebra("final demand Y is required".into()))?;

    let (x, rows) = if let Some(z) = set.get(MatrixName::Z) {
        (production_from_flows(z, y)?, z.rows.clone())
    } else if let Some(z) = set.get(MatrixName::LowerZ) {
        (production_from_coefficients(z, y)?, z.rows.clone())
    } else {
        return Err(Error::Algebra("neither Z nor z is available".into()));
    };
    set.insert(MatrixName::X, Matrix::new(rows, vec![Label::production()], x.clone())?);

    let pairs = [
        (MatrixName::Z, MatrixName::LowerZ),
        (MatrixName::V, MatrixName::LowerV),
        (MatrixName::E, MatrixName::LowerE),
    ];
    for (flows, coefficients) in pairs {
        match (set.get(flows), set.get(coefficients)) {
            (Some(f), None) => {
                let derived = scale_columns(f, &x, |v, x| if x == 0.0 { 0.0 } else { v / x })?;
                set.insert(coefficients, derived);
            }
            (None, Some(c)) => {
                let derived = scale_columns(c, &x, |v, x| v * x)?;
                set.insert(flows, derived);
            }
            _ => {}
        }
    }
    Ok(())
}

/// `X = rowsum(Z) + rowsum(Y)`.
pub fn production_from_flows(z: &Matrix, y: &Matrix) -> Result<Vec<f64>> {
    check_rows(z, y)?;
    Ok(z.row_sums()
        .into_iter()
        .zip(y.row_sums())
        .map(|(a, b)| a + b)
        .collect())
}

/// Solve `(I - z) X = rowsum(Y)`.
pub fn production_from_coefficients(z: &Matrix, y: &Matrix) -> Result<Vec<f64>> {
    check_rows(z, y)?;
    let n = z.rows.len();
    if z.cols.len() != n {
        return Err(Error::Algebra(format!("z is {}x{} but must be square", n, z.cols.len())));
    }
    let mut a: Vec<f64> = (0..n * n)
        .map(|k| {
            let (i, j) = (k / n, k % n);
            let identity = if i == j { 1.0 } else { 0.0 };
            identity - z.get(i, j)
        })
        .collect();
    let mut b = y.row_sums();
    solve(&mut a, &mut b, n)?;
    Ok(b)
}

fn check_rows(z: &Matrix, y: &Matrix) -> Result<()> {
    if z.rows != y.rows {
        return Err(Error::Algebra(
            "the intermediate block and Y have different rows".into(),
        ));
    }
    Ok(())
}

/// Apply `f(value, x[col])` to every element; columns must match `x`.
fn scale_columns(m: &Matrix, x: &[f64], f: impl Fn(f64, f64) -> f64) -> Result<Matrix> {
    if m.cols.len() != x.len() {
        return Err(Error::Algebra(format!(
            "{} columns cannot be scaled by {} production values",
            m.cols.len(),
            x.len()
        )));
    }
    let mut out = m.clone();
    let n = x.len();
    for (k, value) in out.data.iter_mut().enumerate() {
        *value = f(*value, x[k % n]);
    }
    Ok(out)
}

/// Gaussian elimination with partial pivoting. Solution is left in `b`.
fn solve(a: &mut [f64], b: &mut [f64], n: usize) -> Result<()> {
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&p, &q| a[p * n + col].abs().total_cmp(&a[q * n + col].abs()))
            .unwrap_or(col);
        if a[pivot * n + col].abs() < PIVOT_EPSILON {
            return Err(Error::Algebra("(I - z) is singular".into()));
        }
        if pivot != col {
            for k in 0..n {
                a.swap(col * n + k, pivot * n + k);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[row * n + col] / a[col * n + col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row * n + k] -= factor * a[col * n + k];
            }
            b[row] -= factor * b[col];
        }
    }
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row * n + k] * b[k]).sum();
        b[row] = (b[row] - tail) / a[row * n + row];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Level;

    fn sectors() -> Vec<Label> {
        vec![
            Label::regional("IT", Level::Sector, "A"),
            Label::regional("IT", Level::Sector, "B"),
        ]
    }

    fn flows() -> MatrixSet {
        let s = sectors();
        let fd = vec![Label::regional("IT", Level::ConsumptionCategory, "HH")];
        let wages = vec![Label::global(Level::FactorOfProduction, "Wages")];
        let mut set = MatrixSet::new();
        let z = Matrix::new(s.clone(), s.clone(), vec![10.0, 20.0, 30.0, 40.0]).unwrap();
        set.insert(MatrixName::Z, z);
        set.insert(MatrixName::Y, Matrix::new(s.clone(), fd, vec![70.0, 30.0]).unwrap());
        set.insert(MatrixName::V, Matrix::new(wages, s, vec![60.0, 40.0]).unwrap());
        set
    }

    #[test]
    fn coefficients_from_flows() {
        let mut set = flows();
        calc_all(&mut set).unwrap();
        let x = set.get(MatrixName::X).unwrap();
        assert_eq!(x.data, vec![100.0, 100.0]);
        assert_eq!(x.rows, sectors());
        assert_eq!(x.cols, vec![Label::production()]);
        let z = set.get(MatrixName::LowerZ).unwrap();
        assert_eq!(z.data, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(set.get(MatrixName::LowerV).unwrap().data, vec![0.6, 0.4]);
        assert!(!set.contains(MatrixName::LowerE));
    }

    #[test]
    fn flows_from_coefficients_round_trip() {
        let mut set = flows();
        calc_all(&mut set).unwrap();
        let expected_z = set.get(MatrixName::Z).unwrap().clone();

        set.remove(MatrixName::Z);
        set.remove(MatrixName::V);
        calc_all(&mut set).unwrap();

        let z = set.get(MatrixName::Z).unwrap();
        for (got, want) in z.data.iter().zip(&expected_z.data) {
            assert!((got - want).abs() < 1e-9, "{got} != {want}");
        }
        let v = set.get(MatrixName::V).unwrap();
        assert!((v.data[0] - 60.0).abs() < 1e-9);
        for got in &set.get(MatrixName::X).unwrap().data {
            assert!((got - 100.0).abs() < 1e-9, "{got}");
        }
    }

    #[test]
    fn singular_system_is_an_error() {
        let s = sectors();
        let fd = vec![Label::regional("IT", Level::ConsumptionCategory, "HH")];
        let mut set = MatrixSet::new();
        let z = Matrix::new(s.clone(), s.clone(), vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        set.insert(MatrixName::LowerZ, z);
        set.insert(MatrixName::Y, Matrix::new(s, fd, vec![1.0, 1.0]).unwrap());
        assert!(matches!(calc_all(&mut set), Err(Error::Algebra(_))));
        assert!(!set.contains(MatrixName::X));
    }
}
