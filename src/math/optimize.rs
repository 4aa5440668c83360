//! Bounded-iteration minimizers.
//!
//! Both solvers run a fixed maximum number of iterations and never block; they
//! report the best point found whether or not the tolerance was reached.

/// Result of a minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Nelder–Mead simplex settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexOptions {
    pub max_iterations: usize,
    /// Stop when the spread of simplex values falls below this.
    pub f_tolerance: f64,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            f_tolerance: 1e-10,
        }
    }
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Derivative-free Nelder–Mead minimization of `f` starting at `x0`.
///
/// `steps[i]` is the initial simplex edge along coordinate `i`. Constraints are
/// the caller's business: return a large value for infeasible points and the
/// best vertex stays feasible as long as `x0` is.
pub fn nelder_mead<F>(mut f: F, x0: &[f64], steps: &[f64], opts: SimplexOptions) -> Minimum
where
    F: FnMut(&[f64]) -> f64,
{
    let n = x0.len();
    if n == 0 {
        let value = f(x0);
        return Minimum {
            x: Vec::new(),
            value,
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for i in 0..n {
        let mut v = x0.to_vec();
        v[i] += steps.get(i).copied().unwrap_or(1.0);
        simplex.push(v);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| sanitize(f(v))).collect();

    let mut iterations = 0;
    let mut converged = false;
    while iterations < opts.max_iterations {
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        if (values[n] - values[0]).abs() <= opts.f_tolerance {
            converged = true;
            break;
        }

        let mut centroid = vec![0.0; n];
        for v in &simplex[..n] {
            for (c, x) in centroid.iter_mut().zip(v) {
                *c += x / n as f64;
            }
        }
        let along = |t: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&simplex[n])
                .map(|(c, w)| c + t * (c - w))
                .collect()
        };

        let reflected = along(REFLECT);
        let f_reflected = sanitize(f(&reflected));

        if f_reflected < values[0] {
            let expanded = along(EXPAND);
            let f_expanded = sanitize(f(&expanded));
            if f_expanded < f_reflected {
                simplex[n] = expanded;
                values[n] = f_expanded;
            } else {
                simplex[n] = reflected;
                values[n] = f_reflected;
            }
            continue;
        }
        if f_reflected < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_reflected;
            continue;
        }

        let contracted = if f_reflected < values[n] {
            along(CONTRACT)
        } else {
            along(-CONTRACT)
        };
        let f_contracted = sanitize(f(&contracted));
        if f_contracted < values[n].min(f_reflected) {
            simplex[n] = contracted;
            values[n] = f_contracted;
            continue;
        }

        let best = simplex[0].clone();
        for i in 1..=n {
            let shrunk: Vec<f64> = best
                .iter()
                .zip(&simplex[i])
                .map(|(b, x)| b + SHRINK * (x - b))
                .collect();
            values[i] = sanitize(f(&shrunk));
            simplex[i] = shrunk;
        }
    }

    let best = (0..=n)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);
    Minimum {
        x: simplex[best].clone(),
        value: values[best],
        iterations,
        converged,
    }
}

fn sanitize(v: f64) -> f64 {
    if v.is_nan() { f64::INFINITY } else { v }
}

const INV_PHI: f64 = 0.618_033_988_749_894_8;

/// Golden-section search for a minimum of a unimodal `f` on `[a, b]`.
pub fn golden_section<F>(mut f: F, mut a: f64, mut b: f64, tol: f64, max_iterations: usize) -> (f64, f64)
where
    F: FnMut(f64) -> f64,
{
    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = sanitize(f(c));
    let mut fd = sanitize(f(d));
    for _ in 0..max_iterations {
        if (b - a).abs() <= tol {
            break;
        }
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = sanitize(f(c));
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = sanitize(f(d));
        }
    }
    if fc < fd { (c, fc) } else { (d, fd) }
}
