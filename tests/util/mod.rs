#![allow(dead_code)]
use cht_coupling::backend::{MemorySolver, MemoryVertex};

/// Install a test logger once; later calls are no-ops.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `n` owned 2-D vertices along the x axis at uniform temperature `t`.
pub fn wall(n: usize, t: f64) -> Vec<MemoryVertex> {
    (0..n)
        .map(|i| MemoryVertex::new(vec![i as f64 * 0.1, 0.0]).temperature(t))
        .collect()
}

/// Solver owning the default `interface` CHT marker.
pub fn solver_on(vertices: Vec<MemoryVertex>, max_iterations: usize) -> MemorySolver {
    MemorySolver::builder()
        .marker("interface", vertices)
        .cht_tag("interface")
        .max_iterations(max_iterations)
        .build()
}

/// Solver partition that carries no coupling marker.
pub fn solver_without_marker(max_iterations: usize) -> MemorySolver {
    MemorySolver::builder()
        .marker("farfield", vec![MemoryVertex::new(vec![5.0, 5.0])])
        .cht_tag("interface")
        .max_iterations(max_iterations)
        .build()
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
}
