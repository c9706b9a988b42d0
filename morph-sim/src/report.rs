//! CSV exports of computed descriptors.
//!
//! Every writer emits a header row followed by one row per sample. Missing
//! values are written as empty fields.

use std::io::Write;

use crate::error::Result;
use crate::morphology::Morphology;
use crate::phases::Label;

fn optional(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn label_columns(labels: &[Label], prefix: &str) -> String {
    labels.iter().map(|l| format!(",{prefix}{l}")).collect()
}

/// One row per half-unit distance with each phase's correlation value.
pub fn write_correlation_csv<W: Write>(morph: &Morphology, mut writer: W) -> Result<()> {
    let labels = morph.labels();
    writeln!(writer, "distance{}", label_columns(&labels, "phase_"))?;
    let curves: Vec<&[f64]> = morph.phases().iter().map(|p| p.correlation.as_slice()).collect();
    let n_rows = curves.iter().map(|c| c.len()).max().unwrap_or(0);
    for n in 0..n_rows {
        let mut row = format!("{}", n as f64 * 0.5);
        for curve in &curves {
            row.push(',');
            row.push_str(&optional(curve.get(n).copied()));
        }
        writeln!(writer, "{row}")?;
    }
    Ok(())
}

/// One row per `z` plane: composition and domain size of each phase, then
/// the interfacial volume fraction.
pub fn write_depth_csv<W: Write>(morph: &Morphology, mut writer: W) -> Result<()> {
    let labels = morph.labels();
    writeln!(
        writer,
        "z{}{},iv_fraction",
        label_columns(&labels, "composition_"),
        label_columns(&labels, "domain_size_")
    )?;
    let iv = morph.depth_iv_fraction();
    for z in 0..iv.len() {
        let mut row = z.to_string();
        for phase in morph.phases().iter() {
            row.push(',');
            row.push_str(&optional(phase.depth_composition.get(z).copied()));
        }
        for phase in morph.phases().iter() {
            row.push(',');
            row.push_str(&optional(phase.depth_domain_size.get(z).copied().flatten()));
        }
        writeln!(writer, "{row},{}", iv[z])?;
    }
    Ok(())
}

/// Per-column tortuosity of `label` as `x,y,tortuosity` rows.
pub fn write_tortuosity_map_csv<W: Write>(morph: &Morphology, label: Label, mut writer: W) -> Result<()> {
    let map = morph.tortuosity_map(label)?;
    let width = morph.width();
    writeln!(writer, "x,y,tortuosity")?;
    for (column, &t) in map.iter().enumerate() {
        writeln!(writer, "{},{},{}", column / width, column % width, optional(t))?;
    }
    Ok(())
}

/// Per-column fraction of each phase, averaged along `z`.
pub fn write_composition_map_csv<W: Write>(morph: &Morphology, mut writer: W) -> Result<()> {
    let lattice = morph.lattice();
    let labels = morph.labels();
    writeln!(writer, "x,y{}", label_columns(&labels, "phase_"))?;
    let height = lattice.height() as f64;
    for x in 0..lattice.length() {
        for y in 0..lattice.width() {
            let mut counts = vec![0usize; labels.len()];
            for z in 0..lattice.height() {
                let label = lattice.label(lattice.index_xyz(x, y, z));
                if let Some(idx) = morph.phases().position(label) {
                    counts[idx] += 1;
                }
            }
            let fractions: String = counts.iter().map(|&c| format!(",{}", c as f64 / height)).collect();
            writeln!(writer, "{x},{y}{fractions}")?;
        }
    }
    Ok(())
}

/// `x,y,z,label` rows of the `x = length / 2` plane.
pub fn write_cross_section_csv<W: Write>(morph: &Morphology, mut writer: W) -> Result<()> {
    let lattice = morph.lattice();
    let x = lattice.length() / 2;
    writeln!(writer, "x,y,z,label")?;
    for y in 0..lattice.width() {
        for z in 0..lattice.height() {
            writeln!(writer, "{x},{y},{z},{}", lattice.label(lattice.index_xyz(x, y, z)))?;
        }
    }
    Ok(())
}

/// `distance,count` rows of the interfacial distance histogram of `label`.
pub fn write_interfacial_histogram_csv<W: Write>(morph: &Morphology, label: Label, mut writer: W) -> Result<()> {
    writeln!(writer, "distance,count")?;
    for &(d, count) in morph.interfacial_histogram(label)? {
        writeln!(writer, "{d},{count}")?;
    }
    Ok(())
}
