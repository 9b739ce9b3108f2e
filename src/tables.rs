//! Precomputed gain-surface and learned-threshold lookup tables.
//!
//! Table files are an external collaborator: the host is responsible for
//! locating and reading them. This module only parses bytes it is handed
//! (through the `TableLoader` trait) and falls back to compiled-in defaults
//! on any read failure, matching the no-user-visible-error contract of the
//! rest of the engine.

use std::convert::TryInto;

pub const GAIN_GRID_DIM: usize = 241;
pub const ZETA_GRID_DIM: usize = 60;

const GAIN_GRID_LEN: usize = GAIN_GRID_DIM * GAIN_GRID_DIM;
const ZETA_GRID_LEN: usize = ZETA_GRID_DIM * ZETA_GRID_DIM;

/// Host-provided byte sources for the two optional table sidecars. Reading
/// the underlying files is out of scope here; a host implementation backs
/// this with whatever storage it has (filesystem, embedded resource, ...).
pub trait TableLoader {
    /// Raw bytes of the "calculus" sidecar: `GG` then `GGS`, each
    /// `241*241` little-endian doubles. `None` if absent or unreadable.
    fn load_gain_tables(&self) -> Option<Vec<u8>> {
        None
    }

    /// Raw bytes of the "zetaHat.bin" sidecar. `None` if absent or
    /// unreadable.
    fn load_zeta_table(&self) -> Option<Vec<u8>> {
        None
    }
}

/// A loader that never supplies sidecar bytes; `TableStore::from_loader`
/// with this always yields the compiled-in defaults.
pub struct NoTables;

impl TableLoader for NoTables {}

#[derive(Debug, Clone)]
pub struct ZetaGrid {
    pub rows: usize,
    pub cols: usize,
    pub gamma_min: f64,
    pub gamma_max: f64,
    pub xihat_min: f64,
    pub xihat_max: f64,
    pub zeta_hat: Vec<f64>,
    pub zeta_valid: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct TableStore {
    pub gg: Vec<f64>,
    pub ggs: Vec<f64>,
    pub zeta: ZetaGrid,
}

impl TableStore {
    /// Builds the table store by asking `loader` for sidecar bytes, falling
    /// back to compiled-in defaults wherever the loader has nothing or the
    /// bytes are malformed.
    pub fn from_loader(loader: &dyn TableLoader) -> TableStore {
        let (gg, ggs) = match loader.load_gain_tables().and_then(|b| parse_gain_tables(&b)) {
            Some(pair) => pair,
            None => {
                log::warn!("gain table sidecar missing or malformed, using compiled defaults");
                compiled_gain_defaults()
            }
        };
        let zeta = match loader.load_zeta_table().and_then(|b| parse_zeta_table(&b)) {
            Some(z) => z,
            None => {
                log::warn!("zeta table sidecar missing or malformed, using compiled defaults");
                compiled_zeta_defaults()
            }
        };
        TableStore { gg, ggs, zeta }
    }

    pub fn compiled_defaults() -> TableStore {
        let (gg, ggs) = compiled_gain_defaults();
        TableStore {
            gg,
            ggs,
            zeta: compiled_zeta_defaults(),
        }
    }
}

fn read_f64_le(bytes: &[u8], offset: usize) -> Option<f64> {
    bytes
        .get(offset..offset + 8)?
        .try_into()
        .ok()
        .map(f64::from_le_bytes)
}

fn read_i32_le(bytes: &[u8], offset: usize) -> Option<i32> {
    bytes
        .get(offset..offset + 4)?
        .try_into()
        .ok()
        .map(i32::from_le_bytes)
}

fn parse_gain_tables(bytes: &[u8]) -> Option<(Vec<f64>, Vec<f64>)> {
    let needed = 2 * GAIN_GRID_LEN * 8;
    if bytes.len() < needed {
        return None;
    }
    let gg = (0..GAIN_GRID_LEN)
        .map(|i| read_f64_le(bytes, i * 8))
        .collect::<Option<Vec<_>>>()?;
    let base = GAIN_GRID_LEN * 8;
    let ggs = (0..GAIN_GRID_LEN)
        .map(|i| read_f64_le(bytes, base + i * 8))
        .collect::<Option<Vec<_>>>()?;
    Some((gg, ggs))
}

fn parse_zeta_table(bytes: &[u8]) -> Option<ZetaGrid> {
    let rows = read_i32_le(bytes, 0)? as usize;
    let cols = read_i32_le(bytes, 4)? as usize;
    let gamma_min = read_f64_le(bytes, 8)?;
    let gamma_max = read_f64_le(bytes, 16)?;
    let xihat_min = read_f64_le(bytes, 24)?;
    let xihat_max = read_f64_le(bytes, 32)?;
    let nvals = rows.checked_mul(cols)?;
    let mut offset = 40;
    let zeta_hat = (0..nvals)
        .map(|i| read_f64_le(bytes, offset + i * 8))
        .collect::<Option<Vec<_>>>()?;
    offset += nvals * 8;
    let zeta_valid = (0..nvals)
        .map(|i| read_i32_le(bytes, offset + i * 4))
        .collect::<Option<Vec<_>>>()?;
    Some(ZetaGrid {
        rows,
        cols,
        gamma_min,
        gamma_max,
        xihat_min,
        xihat_max,
        zeta_hat,
        zeta_valid,
    })
}

/// `dim_gamma * dim_xi` default surface, evaluated analytically from the
/// Ephraim-Malah amplitude gain rule across the same quantised grid the
/// lookup indexer uses. A compiled-in default does not need to match any
/// particular pretrained surface; it only needs to be a finite, monotone,
/// plausible gain function so the tabulated method behaves sensibly before
/// a host supplies the real sidecar.
fn compiled_gain_defaults() -> (Vec<f64>, Vec<f64>) {
    use crate::special::{bess_i0, bess_i1};
    let gf1p5 = std::f64::consts::PI.sqrt() / 2.0;
    let mut gg = vec![0.0; GAIN_GRID_LEN];
    let mut ggs = vec![0.0; GAIN_GRID_LEN];
    for n_xi in 0..GAIN_GRID_DIM {
        let xi = grid_value(n_xi);
        for n_gamma in 0..GAIN_GRID_DIM {
            let gamma = grid_value(n_gamma);
            let v = (xi / (1.0 + xi)) * gamma;
            let g = gf1p5 * v.sqrt() / gamma * (-0.5 * v).exp()
                * ((1.0 + v) * bess_i0(0.5 * v) + v * bess_i1(0.5 * v));
            let g = if g.is_finite() { g.min(10_000.0) } else { 0.01 };
            let idx = GAIN_GRID_DIM * n_xi + n_gamma;
            gg[idx] = g;
            ggs[idx] = g;
        }
    }
    (gg, ggs)
}

/// Inverts the `10*log10(x/1e-3)` quantisation used by `getKey` to recover
/// the grid's underlying (gamma, xi) value at index `n`.
fn grid_value(n: usize) -> f64 {
    let t = n as f64 * 0.25;
    1.0e-3 * 10f64.powf(t / 10.0)
}

/// Every cell "unknown" (validity <= 0): the learned-threshold path never
/// overrides until a host supplies a real trained grid.
fn compiled_zeta_defaults() -> ZetaGrid {
    ZetaGrid {
        rows: ZETA_GRID_DIM,
        cols: ZETA_GRID_DIM,
        gamma_min: -10.0,
        gamma_max: 30.0,
        xihat_min: -10.0,
        xihat_max: 30.0,
        zeta_hat: vec![0.0; ZETA_GRID_LEN],
        zeta_valid: vec![0; ZETA_GRID_LEN],
    }
}

/// Bilinear lookup in the log-quantised `(gamma, xi)` grid, replicating
/// `getKey`: index step 0.25 in `10*log10(x/1e-3)` units, clamped at the
/// grid edges rather than extrapolated.
pub fn lookup_gain(table: &[f64], gamma: f64, xi: f64) -> f64 {
    const DMIN: f64 = 0.001;
    const DMAX: f64 = 1000.0;

    let (ngamma1, ngamma2, tg) = quantise(gamma, DMIN, DMAX);
    let (nxi1, nxi2, tx) = quantise(xi, DMIN, DMAX);

    let dg = (tg - 0.25 * ngamma1 as f64) / 0.25;
    let dx = (tx - 0.25 * nxi1 as f64) / 0.25;

    (1.0 - dg) * (1.0 - dx) * table[GAIN_GRID_DIM * nxi1 + ngamma1]
        + (1.0 - dg) * dx * table[GAIN_GRID_DIM * nxi2 + ngamma1]
        + dg * (1.0 - dx) * table[GAIN_GRID_DIM * nxi1 + ngamma2]
        + dg * dx * table[GAIN_GRID_DIM * nxi2 + ngamma2]
}

fn quantise(x: f64, dmin: f64, dmax: f64) -> (usize, usize, f64) {
    if x <= dmin {
        (0, 0, 0.0)
    } else if x >= dmax {
        (GAIN_GRID_DIM - 1, GAIN_GRID_DIM - 1, 60.0)
    } else {
        let t = 10.0 * (x / dmin).log10();
        let n1 = (4.0 * t) as usize;
        (n1, n1 + 1, t)
    }
}

/// Looks up the learned hard-threshold map, replicating `getZeta` including
/// its asymmetric bound check on the xi axis: the original compares the
/// unquantised `xi_dB` against `dim_zeta` instead of the quantised index
/// `i_xi`, which only matters when `dim_zeta` sits inside the dB range of a
/// particular grid. A clean re-check (`i_xi >= dim_zeta`) is preserved here
/// as `symmetric_bounds = true`, the asymmetric original as `false`, so a
/// host that depends on bit-for-bit behaviour against a pretrained grid can
/// opt out of the fix.
pub fn lookup_zeta(grid: &ZetaGrid, gamma: f64, xi: f64, symmetric_bounds: bool) -> Option<f64> {
    let gamma_db = 10.0 * gamma.log10();
    let xi_db = 10.0 * xi.log10();
    let gamma_per_cell = (grid.gamma_max - grid.gamma_min) / ZETA_GRID_DIM as f64;
    let xi_per_cell = (grid.xihat_max - grid.xihat_min) / ZETA_GRID_DIM as f64;
    let i_gamma = ((gamma_db - grid.gamma_min) / gamma_per_cell).floor();
    let i_xi = ((xi_db - grid.xihat_min) / xi_per_cell).floor();

    if i_gamma < 0.0 || i_gamma >= ZETA_GRID_DIM as f64 || i_xi < 0.0 {
        return None;
    }
    let xi_out_of_range = if symmetric_bounds {
        i_xi >= ZETA_GRID_DIM as f64
    } else {
        xi_db >= ZETA_GRID_DIM as f64
    };
    if xi_out_of_range {
        return None;
    }

    let index = i_gamma as usize * ZETA_GRID_DIM + i_xi as usize;
    if grid.zeta_valid.get(index).copied().unwrap_or(0) <= 0 {
        return None;
    }
    grid.zeta_hat.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiled_defaults_are_finite_and_bounded() {
        let store = TableStore::compiled_defaults();
        assert_eq!(store.gg.len(), GAIN_GRID_LEN);
        assert!(store.gg.iter().all(|v| v.is_finite() && *v >= 0.0));
        assert!(store.ggs.iter().all(|v| v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn compiled_zeta_defaults_are_all_invalid() {
        let grid = compiled_zeta_defaults();
        assert!(grid.zeta_valid.iter().all(|&v| v <= 0));
    }

    #[test]
    fn lookup_gain_clamps_below_dmin() {
        let table = compiled_gain_defaults().0;
        let at_floor = lookup_gain(&table, 0.0001, 0.0001);
        let at_zero_index = lookup_gain(&table, 0.001, 0.001);
        assert!((at_floor - at_zero_index).abs() < 1e-9);
    }

    #[test]
    fn lookup_zeta_none_when_no_loader_data() {
        let grid = compiled_zeta_defaults();
        assert_eq!(lookup_zeta(&grid, 1.0, 1.0, true), None);
    }

    #[test]
    fn lookup_zeta_returns_value_for_valid_cell() {
        let mut grid = compiled_zeta_defaults();
        // Put gamma=0dB, xi=0dB comfortably inside the default grid.
        let gamma = 1.0;
        let xi = 1.0;
        let gamma_per_cell = (grid.gamma_max - grid.gamma_min) / ZETA_GRID_DIM as f64;
        let xi_per_cell = (grid.xihat_max - grid.xihat_min) / ZETA_GRID_DIM as f64;
        let i_gamma = ((0.0 - grid.gamma_min) / gamma_per_cell).floor() as usize;
        let i_xi = ((0.0 - grid.xihat_min) / xi_per_cell).floor() as usize;
        let index = i_gamma * ZETA_GRID_DIM + i_xi;
        grid.zeta_valid[index] = 1;
        grid.zeta_hat[index] = 0.9;
        assert_eq!(lookup_zeta(&grid, gamma, xi, true), Some(0.9));
    }

    #[test]
    fn table_loader_default_forces_compiled_defaults() {
        let store = TableStore::from_loader(&NoTables);
        assert_eq!(store.gg.len(), GAIN_GRID_LEN);
        assert!(store.zeta.zeta_valid.iter().all(|&v| v <= 0));
    }
}
