//! Plain-text morphology files.
//!
//! ```text
//! opv-morph v0.1.0 - compressed format
//! <length>
//! <width>
//! <height>
//! <periodic x, y, z as 0/1, one per line>
//! <label count>
//! <domain size per label, -1 when unknown>
//! <mix fraction per label>
//! <body>
//! ```
//!
//! Per-label lines are ordered by ascending label id. The uncompressed body
//! holds one `x,y,z,label` line per site; the compressed body holds
//! `label,count` runs in site index order.

use std::io::{BufRead, Write};

use log::info;

use crate::config::Parameters;
use crate::error::{MorphologyError, Result};
use crate::geometry::{Coords, Lattice};
use crate::morphology::{clock_seed, Morphology};
use crate::phases::Label;

pub const PROGRAM_NAME: &str = "opv-morph";

/// Everything a morphology file states before its site data.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphologyHeader {
    pub version: String,
    pub compressed: bool,
    pub length: usize,
    pub width: usize,
    pub height: usize,
    pub periodic: [bool; 3],
    /// Ascending label id order, like `mix_fractions`.
    pub domain_sizes: Vec<Option<f64>>,
    pub mix_fractions: Vec<f64>,
}

impl MorphologyHeader {
    pub fn n_sites(&self) -> usize {
        self.length * self.width * self.height
    }
}

fn format_err(msg: impl Into<String>) -> MorphologyError {
    MorphologyError::Format(msg.into())
}

/// Line-oriented reader that tracks line numbers for error messages.
struct Lines<R> {
    inner: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> Lines<R> {
    fn next_line(&mut self, what: &str) -> Result<String> {
        self.line_no += 1;
        match self.inner.next() {
            Some(line) => Ok(line?.trim().to_string()),
            None => Err(format_err(format!(
                "unexpected end of file at line {} (expected {what})",
                self.line_no
            ))),
        }
    }

    fn parse<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        let line = self.next_line(what)?;
        line.parse()
            .map_err(|_| format_err(format!("line {}: invalid {what} '{line}'", self.line_no)))
    }

    fn flag(&mut self, what: &str) -> Result<bool> {
        match self.parse::<u8>(what)? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(format_err(format!("line {}: {what} must be 0 or 1, got {v}", self.line_no))),
        }
    }
}

fn parse_title(line: &str) -> Result<(String, bool)> {
    let invalid = || format_err(format!("not an {PROGRAM_NAME} morphology file: '{line}'"));
    let (program, rest) = line.split_once(' ').ok_or_else(invalid)?;
    if program != PROGRAM_NAME {
        return Err(invalid());
    }
    let (version, format) = rest.split_once(" - ").ok_or_else(invalid)?;
    let version = version.strip_prefix('v').ok_or_else(invalid)?;
    let compressed = match format {
        "compressed format" => true,
        "uncompressed format" => false,
        _ => return Err(invalid()),
    };
    Ok((version.to_string(), compressed))
}

fn parse_label(field: &str, line_no: usize) -> Result<Label> {
    let label = Label::try_from(field).map_err(|e| format_err(format!("line {line_no}: {e}")))?;
    if label == Label::UNASSIGNED {
        return Err(format_err(format!("line {line_no}: site left unassigned")));
    }
    Ok(label)
}

/// Read a morphology file into its header and its labels in site index
/// order.
pub fn parse_morphology<R: BufRead>(reader: R) -> Result<(MorphologyHeader, Vec<Label>)> {
    let mut lines = Lines {
        inner: reader.lines(),
        line_no: 0,
    };
    let (version, compressed) = parse_title(&lines.next_line("file header")?)?;
    let length = lines.parse("length")?;
    let width = lines.parse("width")?;
    let height = lines.parse("height")?;
    let periodic = [
        lines.flag("periodic x")?,
        lines.flag("periodic y")?,
        lines.flag("periodic z")?,
    ];
    let n_labels: usize = lines.parse("label count")?;
    let mut domain_sizes = Vec::with_capacity(n_labels);
    for _ in 0..n_labels {
        let d: f64 = lines.parse("domain size")?;
        domain_sizes.push((d > 0.0).then_some(d));
    }
    let mut mix_fractions = Vec::with_capacity(n_labels);
    for _ in 0..n_labels {
        mix_fractions.push(lines.parse("mix fraction")?);
    }
    let header = MorphologyHeader {
        version,
        compressed,
        length,
        width,
        height,
        periodic,
        domain_sizes,
        mix_fractions,
    };

    let n_sites = header.n_sites();
    let labels = if compressed {
        let mut labels = Vec::with_capacity(n_sites);
        while labels.len() < n_sites {
            let line = lines.next_line("a label,count run")?;
            let (label, count) = line
                .split_once(',')
                .ok_or_else(|| format_err(format!("line {}: expected label,count", lines.line_no)))?;
            let label = parse_label(label, lines.line_no)?;
            let count: usize = count
                .trim()
                .parse()
                .map_err(|_| format_err(format!("line {}: invalid run length '{count}'", lines.line_no)))?;
            if count == 0 || labels.len() + count > n_sites {
                return Err(format_err(format!(
                    "line {}: run of {count} sites does not fit the lattice",
                    lines.line_no
                )));
            }
            labels.extend(std::iter::repeat(label).take(count));
        }
        labels
    } else {
        let lattice = Lattice::new(length, width, height, periodic);
        let mut labels = vec![Label::UNASSIGNED; n_sites];
        for _ in 0..n_sites {
            let line = lines.next_line("an x,y,z,label line")?;
            let fields: Vec<&str> = line.split(',').collect();
            let [x, y, z, label] = fields[..] else {
                return Err(format_err(format!("line {}: expected x,y,z,label", lines.line_no)));
            };
            let mut xyz = [0usize; 3];
            for (slot, (field, extent)) in xyz.iter_mut().zip([(x, length), (y, width), (z, height)]) {
                *slot = field
                    .trim()
                    .parse()
                    .ok()
                    .filter(|&v| v < extent)
                    .ok_or_else(|| format_err(format!("line {}: coordinate '{field}' out of range", lines.line_no)))?;
            }
            labels[lattice.index_xyz(xyz[0], xyz[1], xyz[2])] = parse_label(label, lines.line_no)?;
        }
        if labels.contains(&Label::UNASSIGNED) {
            return Err(format_err("some sites are missing from the file"));
        }
        labels
    };
    Ok((header, labels))
}

impl Morphology {
    /// Write the morphology in the compressed or uncompressed layout.
    pub fn write_morphology<W: Write>(&self, mut writer: W, compressed: bool) -> Result<()> {
        if self.lattice.labels().contains(&Label::UNASSIGNED) {
            return Err(format_err("cannot write a morphology with unassigned sites"));
        }
        let format = if compressed { "compressed" } else { "uncompressed" };
        writeln!(writer, "{PROGRAM_NAME} v{} - {format} format", env!("CARGO_PKG_VERSION"))?;
        writeln!(writer, "{}", self.length())?;
        writeln!(writer, "{}", self.width())?;
        writeln!(writer, "{}", self.height())?;
        for periodic in self.lattice.periodic {
            writeln!(writer, "{}", u8::from(periodic))?;
        }

        let mut phases: Vec<_> = self.phases.iter().filter(|p| p.count > 0).collect();
        phases.sort_by_key(|p| p.label.id());
        writeln!(writer, "{}", phases.len())?;
        for phase in &phases {
            writeln!(writer, "{}", phase.domain_size.unwrap_or(-1.0))?;
        }
        for phase in &phases {
            writeln!(writer, "{}", phase.mix_fraction)?;
        }

        let labels = self.lattice.labels();
        if compressed {
            let mut start = 0;
            while start < labels.len() {
                let label = labels[start];
                let run = labels[start..].iter().take_while(|&&l| l == label).count();
                writeln!(writer, "{label},{run}")?;
                start += run;
            }
        } else {
            for (i, label) in labels.iter().enumerate() {
                let Coords { x, y, z } = self.lattice.coords(i);
                writeln!(writer, "{x},{y},{z},{label}")?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Rebuild a morphology from [`parse_morphology`] output.
    ///
    /// The file's dimensions and periodicity must match `params`. Domain
    /// sizes are restored from the header; counts and mix fractions are
    /// recomputed from the sites.
    pub fn from_parsed(
        header: &MorphologyHeader,
        labels: Vec<Label>,
        params: Parameters,
        id: usize,
    ) -> Result<Self> {
        if [header.length, header.width, header.height] != [params.length, params.width, params.height]
            || header.periodic != params.periodic()
        {
            return Err(MorphologyError::Configuration(format!(
                "morphology file is {}x{}x{} (periodic {:?}), parameters ask for {}x{}x{} (periodic {:?})",
                header.length,
                header.width,
                header.height,
                header.periodic,
                params.length,
                params.width,
                params.height,
                params.periodic()
            )));
        }
        if labels.len() != header.n_sites() {
            return Err(format_err(format!(
                "expected {} sites, got {}",
                header.n_sites(),
                labels.len()
            )));
        }
        let mut lattice = Lattice::new(header.length, header.width, header.height, header.periodic);
        for (i, label) in labels.into_iter().enumerate() {
            lattice.set_label(i, label);
        }
        let mut morph = Self::from_lattice(lattice, params, id, clock_seed(id))?;

        let mut ids: Vec<Label> = morph.phases.labels();
        ids.sort_by_key(|l| l.id());
        if ids.len() != header.domain_sizes.len() {
            return Err(format_err(format!(
                "header lists {} labels, the sites use {}",
                header.domain_sizes.len(),
                ids.len()
            )));
        }
        for (label, &size) in ids.into_iter().zip(&header.domain_sizes) {
            morph.phases.get_mut(label)?.domain_size = size;
        }
        info!(
            "{}: imported a {}x{}x{} morphology written by {PROGRAM_NAME} v{}",
            morph.id, header.length, header.width, header.height, header.version
        );
        Ok(morph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Morphology {
        let mut params = Parameters::new(4, 3, 5);
        params.periodic_z = false;
        let mut morph = Morphology::with_seed(params, 0, 21).unwrap();
        morph.create_random_morphology(&[0.4, 0.6]).unwrap();
        morph.phases.get_mut(Label::SECONDARY).unwrap().domain_size = Some(2.5);
        morph
    }

    fn written(morph: &Morphology, compressed: bool) -> String {
        let mut buf = Vec::new();
        morph.write_morphology(&mut buf, compressed).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let text = written(&sample(), true);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("opv-morph v{} - compressed format", env!("CARGO_PKG_VERSION")));
        assert_eq!(&lines[1..8], &["4", "3", "5", "1", "1", "0", "2"]);
        assert_eq!(&lines[8..10], &["-1", "2.5"]);
        assert_eq!(&lines[10..12], &["0.4", "0.6"]);
        let run_total: usize = lines[12..]
            .iter()
            .map(|l| l.split_once(',').unwrap().1.parse::<usize>().unwrap())
            .sum();
        assert_eq!(run_total, 60);
    }

    #[test]
    fn test_round_trip_both_layouts() {
        let morph = sample();
        for compressed in [true, false] {
            let text = written(&morph, compressed);
            let (header, labels) = parse_morphology(Cursor::new(text)).unwrap();
            assert_eq!(header.compressed, compressed);
            assert_eq!(header.periodic, [true, true, false]);
            assert_eq!(header.domain_sizes, vec![None, Some(2.5)]);
            assert_eq!(labels, morph.lattice().labels());

            let back = Morphology::from_parsed(&header, labels, morph.params().clone(), 1).unwrap();
            assert_eq!(back.lattice().labels(), morph.lattice().labels());
            assert_eq!(back.domain_size(Label::SECONDARY).unwrap(), Some(2.5));
            assert_eq!(back.mix_fraction(Label::PRIMARY).unwrap(), 0.4);
        }
    }

    #[test]
    fn test_rejects_foreign_and_truncated_files() {
        let text = written(&sample(), false).replacen("opv-morph", "other-tool", 1);
        assert!(matches!(parse_morphology(Cursor::new(text)), Err(MorphologyError::Format(_))));

        let text = written(&sample(), false);
        let truncated: String = text.lines().take(40).map(|l| format!("{l}\n")).collect();
        assert!(matches!(
            parse_morphology(Cursor::new(truncated)),
            Err(MorphologyError::Format(_))
        ));

        let text = written(&sample(), true).replacen("\n4\n", "\nfour\n", 1);
        assert!(matches!(parse_morphology(Cursor::new(text)), Err(MorphologyError::Format(_))));
    }

    #[test]
    fn test_rejects_unassigned_and_overlong_runs() {
        let header = "opv-morph v0.1.0 - compressed format\n2\n2\n2\n1\n1\n1\n1\n-1\n1\n";
        let text = format!("{header}1,4\n0,4\n");
        assert!(matches!(parse_morphology(Cursor::new(text)), Err(MorphologyError::Format(_))));
        let text = format!("{header}1,9\n");
        assert!(matches!(parse_morphology(Cursor::new(text)), Err(MorphologyError::Format(_))));
        let text = format!("{header}1,8\n");
        let (_, labels) = parse_morphology(Cursor::new(text)).unwrap();
        assert_eq!(labels, vec![Label::PRIMARY; 8]);

        let empty = Morphology::with_seed(Parameters::new(2, 2, 2), 0, 1).unwrap();
        assert!(empty.write_morphology(Vec::<u8>::new(), true).is_err());
    }

    #[test]
    fn test_parameter_mismatch() {
        let morph = sample();
        let (header, labels) = parse_morphology(Cursor::new(written(&morph, true))).unwrap();
        assert!(matches!(
            Morphology::from_parsed(&header, labels.clone(), Parameters::new(4, 3, 5), 0),
            Err(MorphologyError::Configuration(_))
        ));
        let mut params = Parameters::new(4, 4, 5);
        params.periodic_z = false;
        assert!(matches!(
            Morphology::from_parsed(&header, labels, params, 0),
            Err(MorphologyError::Configuration(_))
        ));
    }
}
