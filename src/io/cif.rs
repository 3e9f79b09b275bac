use crate::error::{CifMovieError, Result};
use crate::model::{elements, get_atomic_number, AtomicStructure};
use crate::utils::linalg::{cart_to_frac, frac_to_cart, lattice_from_parameters, lattice_parameters};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const SYMOP_TAGS: [&str; 2] = ["_symmetry_equiv_pos_as_xyz", "_space_group_symop_operation_xyz"];

pub fn parse(path: &Path) -> Result<AtomicStructure> {
    let text = fs::read_to_string(path).map_err(|e| CifMovieError::io(path, e))?;
    parse_str(&text)
}

#[derive(Default)]
struct CifLoop {
    headers: Vec<String>,
    values: Vec<String>,
}

impl CifLoop {
    fn column(&self, tag: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == tag)
    }

    fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.values.chunks_exact(self.headers.len().max(1))
    }
}

/// Reads the first data block of a CIF document.
pub fn parse_str(text: &str) -> Result<AtomicStructure> {
    let mut lengths: [Option<f64>; 3] = [None; 3];
    let mut angles = [90.0; 3];

    let mut loops: Vec<CifLoop> = Vec::new();
    let mut in_loop = false;
    let mut pending_tag: Option<String> = None;
    let mut in_text_field = false;
    let mut seen_block = false;

    for raw in text.lines() {
        // 1. Semicolon text fields are skipped wholesale
        if raw.starts_with(';') {
            in_text_field = !in_text_field;
            continue;
        }
        if in_text_field {
            continue;
        }

        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        // 2. Block boundaries
        if trimmed.to_ascii_lowercase().starts_with("data_") {
            if seen_block {
                break;
            }
            seen_block = true;
            in_loop = false;
            continue;
        }

        // 3. Loop Detection
        if trimmed.eq_ignore_ascii_case("loop_") {
            in_loop = true;
            loops.push(CifLoop::default());
            continue;
        }

        let tokens = tokenize(trimmed);

        // 4. Tags: loop headers while the loop has no values yet, else tag/value pairs
        if trimmed.starts_with('_') {
            let tag = tokens[0].to_ascii_lowercase();
            if in_loop {
                if let Some(current) = loops.last_mut().filter(|l| l.values.is_empty()) {
                    current.headers.push(tag);
                    continue;
                }
                in_loop = false;
            }
            match tokens.get(1) {
                Some(value) => record_tag(&tag, value, &mut lengths, &mut angles)?,
                None => pending_tag = Some(tag),
            }
            continue;
        }

        // 5. Data Parsing
        if let Some(tag) = pending_tag.take() {
            if let Some(value) = tokens.first() {
                record_tag(&tag, value, &mut lengths, &mut angles)?;
            }
        } else if in_loop {
            if let Some(current) = loops.last_mut() {
                current.values.extend(tokens);
            }
        }
    }

    let atom_loop = loops
        .iter()
        .find(|l| {
            l.column("_atom_site_fract_x").is_some() || l.column("_atom_site_cartn_x").is_some()
        })
        .ok_or_else(|| CifMovieError::malformed("no _atom_site coordinate loop"))?;

    let cell = match lengths {
        [Some(a), Some(b), Some(c)] => lattice_from_parameters([a, b, c], angles),
        _ if atom_loop.column("_atom_site_fract_x").is_some() => {
            return Err(CifMovieError::malformed(
                "fractional coordinates without _cell_length_a/b/c",
            ));
        }
        _ => [[0.0; 3]; 3],
    };

    let mut symmetry_ops = Vec::new();
    for l in &loops {
        if let Some(col) = SYMOP_TAGS.iter().find_map(|t| l.column(t)) {
            for row in l.rows() {
                symmetry_ops.push(SymOp::parse(&row[col])?);
            }
        }
    }
    if symmetry_ops.is_empty() {
        symmetry_ops.push(SymOp::identity());
    }

    let base_atoms = read_atom_sites(atom_loop, &cell)?;
    if base_atoms.is_empty() {
        return Err(CifMovieError::malformed("atom site loop has no rows"));
    }

    let (positions, numbers) = expand_symmetry(&base_atoms, &symmetry_ops, &cell);
    AtomicStructure::new(positions, numbers, cell)
}

fn record_tag(tag: &str, value: &str, lengths: &mut [Option<f64>; 3], angles: &mut [f64; 3]) -> Result<()> {
    let slot = match tag {
        "_cell_length_a" => Some(&mut lengths[0]),
        "_cell_length_b" => Some(&mut lengths[1]),
        "_cell_length_c" => Some(&mut lengths[2]),
        _ => None,
    };
    if let Some(slot) = slot {
        *slot = Some(parse_cif_float(value)?);
        return Ok(());
    }
    match tag {
        "_cell_angle_alpha" => angles[0] = parse_cif_float(value)?,
        "_cell_angle_beta" => angles[1] = parse_cif_float(value)?,
        "_cell_angle_gamma" => angles[2] = parse_cif_float(value)?,
        _ => {}
    }
    Ok(())
}

/// (atomic number, fractional position), or Cartesian when the cell is degenerate.
type Site = (u8, [f64; 3]);

fn read_atom_sites(l: &CifLoop, cell: &[[f64; 3]; 3]) -> Result<Vec<Site>> {
    let element_col = l
        .column("_atom_site_type_symbol")
        .or_else(|| l.column("_atom_site_label"))
        .ok_or_else(|| CifMovieError::malformed("atom site loop has neither type symbol nor label"))?;

    let (cols, fractional) = match l.column("_atom_site_fract_x") {
        Some(_) => (["_atom_site_fract_x", "_atom_site_fract_y", "_atom_site_fract_z"], true),
        None => (["_atom_site_cartn_x", "_atom_site_cartn_y", "_atom_site_cartn_z"], false),
    };
    let mut xyz = [0usize; 3];
    for (slot, tag) in xyz.iter_mut().zip(cols) {
        *slot = l
            .column(tag)
            .ok_or_else(|| CifMovieError::malformed(format!("missing {}", tag)))?;
    }

    let mut sites = Vec::new();
    for row in l.rows() {
        let label = &row[element_col];
        let number = get_atomic_number(label)
            .ok_or_else(|| CifMovieError::malformed(format!("unknown element '{}'", label)))?;
        let p = [
            parse_cif_float(&row[xyz[0]])?,
            parse_cif_float(&row[xyz[1]])?,
            parse_cif_float(&row[xyz[2]])?,
        ];
        let p = if fractional {
            p
        } else {
            cart_to_frac(p, cell).unwrap_or(p)
        };
        sites.push((number, p));
    }
    Ok(sites)
}

fn expand_symmetry(base: &[Site], ops: &[SymOp], cell: &[[f64; 3]; 3]) -> (Vec<[f64; 3]>, Vec<u8>) {
    if crate::utils::linalg::is_degenerate(cell) {
        // No lattice to wrap into: Cartesian sites are taken as-is.
        return base.iter().map(|&(n, p)| (p, n)).unzip();
    }

    let epsilon = 0.001;
    let mut unique: Vec<Site> = Vec::new();

    for &(number, position) in base {
        for op in ops {
            let new_pos = op.apply(position).map(|v| v.rem_euclid(1.0));

            // Check direct distance OR wrapped distance
            let is_duplicate = unique.iter().any(|&(n, existing)| {
                n == number
                    && (0..3).all(|k| {
                        let d = (existing[k] - new_pos[k]).abs();
                        d < epsilon || (1.0 - d) < epsilon
                    })
            });

            if !is_duplicate {
                unique.push((number, new_pos));
            }
        }
    }

    unique
        .into_iter()
        .map(|(n, f)| (frac_to_cart(f, cell), n))
        .unzip()
}

/// One symmetry operation such as `-x+1/2, y, z+1/2`, held as an affine map.
#[derive(Clone, Debug, PartialEq)]
struct SymOp {
    rotation: [[f64; 3]; 3],
    translation: [f64; 3],
}

impl SymOp {
    fn identity() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0; 3],
        }
    }

    fn parse(op: &str) -> Result<Self> {
        let parts: Vec<&str> = op.split(',').collect();
        if parts.len() != 3 {
            return Err(CifMovieError::malformed(format!("bad symmetry operation '{}'", op)));
        }
        let mut out = Self {
            rotation: [[0.0; 3]; 3],
            translation: [0.0; 3],
        };
        for (row, expr) in parts.iter().enumerate() {
            let (coeffs, shift) = parse_expr(expr)
                .ok_or_else(|| CifMovieError::malformed(format!("bad symmetry operation '{}'", op)))?;
            out.rotation[row] = coeffs;
            out.translation[row] = shift;
        }
        Ok(out)
    }

    fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        let r = &self.rotation;
        let t = &self.translation;
        [
            r[0][0] * p[0] + r[0][1] * p[1] + r[0][2] * p[2] + t[0],
            r[1][0] * p[0] + r[1][1] * p[1] + r[1][2] * p[2] + t[1],
            r[2][0] * p[0] + r[2][1] * p[1] + r[2][2] * p[2] + t[2],
        ]
    }
}

// Splits on + or - but keeps the sign with each term: "-x+1/2" -> ["-x", "+1/2"]
fn parse_expr(expr: &str) -> Option<([f64; 3], f64)> {
    let s: String = expr.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase();
    if s.is_empty() {
        return None;
    }

    let mut coeffs = [0.0; 3];
    let mut shift = 0.0;
    let mut term = String::new();

    let mut flush = |term: &str| -> Option<()> {
        let (sign, body) = match term.as_bytes().first() {
            Some(b'-') => (-1.0, &term[1..]),
            Some(b'+') => (1.0, &term[1..]),
            _ => (1.0, term),
        };
        if let Some(axis) = body.find(['x', 'y', 'z']) {
            let k = match &body[axis..axis + 1] {
                "x" => 0,
                "y" => 1,
                _ => 2,
            };
            let factor = match body[..axis].trim_end_matches('*') {
                "" => 1.0,
                f => parse_number(f)?,
            };
            coeffs[k] += sign * factor;
        } else {
            shift += sign * parse_number(body)?;
        }
        Some(())
    };

    for c in s.chars() {
        if (c == '+' || c == '-') && !term.is_empty() {
            flush(&term)?;
            term.clear();
        }
        term.push(c);
    }
    flush(&term)?;

    Some((coeffs, shift))
}

fn parse_number(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then_some(num.parse::<f64>().ok()? / den)
        }
        None => s.parse().ok(),
    }
}

/// Strips a trailing standard uncertainty: `3.905(2)` -> 3.905.
fn parse_cif_float(s: &str) -> Result<f64> {
    let clean: String = s.chars().take_while(|c| *c != '(').collect();
    clean
        .parse()
        .map_err(|_| CifMovieError::malformed(format!("invalid number '{}'", s)))
}

/// Whitespace-separated tokens, honouring single and double quotes.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '#' {
            break;
        }
        let mut token = String::new();
        if c == '\'' || c == '"' {
            chars.next();
            // A quote only closes when followed by whitespace or end of line
            while let Some(ch) = chars.next() {
                if ch == c && chars.peek().map_or(true, |n| n.is_whitespace()) {
                    break;
                }
                token.push(ch);
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                token.push(ch);
                chars.next();
            }
        }
        tokens.push(token);
    }
    tokens
}

/// Writes a P1 CIF with fractional coordinates.
pub fn write(path: &Path, structure: &AtomicStructure) -> Result<()> {
    let text = to_string(structure)?;
    fs::write(path, text).map_err(|e| CifMovieError::io(path, e))
}

pub fn to_string(structure: &AtomicStructure) -> Result<String> {
    let cell = structure.cell();
    let ([a, b, c], [alpha, beta, gamma]) = lattice_parameters(cell);
    if crate::utils::linalg::is_degenerate(cell) {
        return Err(CifMovieError::malformed("cannot write a CIF without a unit cell"));
    }

    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "data_cifmovie");
    let _ = writeln!(out, "_symmetry_space_group_name_H-M 'P 1'");
    let _ = writeln!(out, "_symmetry_Int_Tables_number 1");
    let _ = writeln!(out, "_cell_length_a    {:.6}", a);
    let _ = writeln!(out, "_cell_length_b    {:.6}", b);
    let _ = writeln!(out, "_cell_length_c    {:.6}", c);
    let _ = writeln!(out, "_cell_angle_alpha {:.6}", alpha);
    let _ = writeln!(out, "_cell_angle_beta  {:.6}", beta);
    let _ = writeln!(out, "_cell_angle_gamma {:.6}", gamma);
    let _ = writeln!(out, "loop_");
    let _ = writeln!(out, " _atom_site_label");
    let _ = writeln!(out, " _atom_site_type_symbol");
    let _ = writeln!(out, " _atom_site_fract_x");
    let _ = writeln!(out, " _atom_site_fract_y");
    let _ = writeln!(out, " _atom_site_fract_z");

    // The written cell is the standard orientation, not necessarily the input one,
    // so coordinates go through fractional space of the original cell.
    for (i, (p, &n)) in structure.positions().iter().zip(structure.numbers()).enumerate() {
        let f = cart_to_frac(*p, cell)
            .ok_or_else(|| CifMovieError::malformed("cannot write a CIF without a unit cell"))?;
        let symbol = elements::symbol(n)
            .ok_or_else(|| CifMovieError::malformed(format!("unknown atomic number {}", n)))?;
        // Ensure unique label e.g., Fe1, Fe2
        let _ = writeln!(
            out,
            " {}{} {} {:.6} {:.6} {:.6}",
            symbol,
            i + 1,
            symbol,
            f[0],
            f[1],
            f[2]
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STO: &str = "\
data_SrTiO3
_cell_length_a 3.905(2)
_cell_length_b 3.905
_cell_length_c 3.905
_cell_angle_alpha 90
_cell_angle_beta 90
_cell_angle_gamma 90
loop_
_symmetry_equiv_pos_as_xyz
'x, y, z'
loop_
_atom_site_label
_atom_site_type_symbol
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
Sr1 Sr 0.0 0.0 0.0
Ti1 Ti 0.5 0.5 0.5
O1 O 0.5 0.5 0.0
O2 O 0.5 0.0 0.5
O3 O 0.0 0.5 0.5
";

    #[test]
    fn parses_perovskite_cell() {
        let s = parse_str(STO).unwrap();
        assert_eq!(s.len(), 5);
        assert_eq!(s.numbers(), &[38, 22, 8, 8, 8]);
        assert!((s.cell()[0][0] - 3.905).abs() < 1e-9);
        let ti = s.positions()[1];
        assert!((ti[0] - 1.9525).abs() < 1e-9);
        assert!((ti[2] - 1.9525).abs() < 1e-9);
    }

    #[test]
    fn expands_symmetry_and_drops_duplicates() {
        // bcc iron: body centring op produces a second atom; identity listed twice
        let text = "\
data_Fe
_cell_length_a 2.87
_cell_length_b 2.87
_cell_length_c 2.87
loop_
_space_group_symop_operation_xyz
x,y,z
x+1/2,y+1/2,z+1/2
x,y,z
loop_
_atom_site_label
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
Fe1 0 0 0
";
        let s = parse_str(text).unwrap();
        assert_eq!(s.len(), 2);
        let centre = s.positions()[1];
        assert!((centre[1] - 1.435).abs() < 1e-9);
    }

    #[test]
    fn symop_expressions() {
        let op = SymOp::parse("-x+1/2, y-z, 0.25+z").unwrap();
        let p = op.apply([0.1, 0.2, 0.3]);
        for (got, want) in p.iter().zip([0.4, -0.1, 0.55]) {
            assert!((got - want).abs() < 1e-12);
        }
        assert!(SymOp::parse("x, y").is_err());
        assert!(SymOp::parse("x, y, q").is_err());
    }

    #[test]
    fn cartesian_sites_without_cell() {
        let text = "\
data_mol
loop_
_atom_site_type_symbol
_atom_site_Cartn_x
_atom_site_Cartn_y
_atom_site_Cartn_z
O 0.0 0.0 0.0
H 0.76 0.59 0.0
H -0.76 0.59 0.0
";
        let s = parse_str(text).unwrap();
        assert_eq!(s.numbers(), &[8, 1, 1]);
        assert_eq!(s.positions()[2], [-0.76, 0.59, 0.0]);
    }

    #[test]
    fn rejects_missing_atoms_and_unknown_elements() {
        let err = parse_str("data_x\n_cell_length_a 1\n").unwrap_err();
        assert!(matches!(err, CifMovieError::MalformedInput(_)));

        let bad = STO.replace("Ti1 Ti", "Zz1 Zz");
        assert!(parse_str(&bad).unwrap_err().to_string().contains("Zz"));

        let no_cell = STO.replace("_cell_length_b 3.905\n", "");
        assert!(parse_str(&no_cell).is_err());
    }

    #[test]
    fn written_cif_reads_back() {
        let s = parse_str(STO).unwrap().repeat(2, 1, 1).unwrap();
        let back = parse_str(&to_string(&s).unwrap()).unwrap();
        assert_eq!(back.numbers(), s.numbers());
        for (a, b) in back.positions().iter().zip(s.positions()) {
            for k in 0..3 {
                assert!((a[k] - b[k]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn tokenizer_handles_quotes() {
        assert_eq!(tokenize("1 'x, y, z'"), vec!["1", "x, y, z"]);
        assert_eq!(tokenize("_name \"it's\" # c"), vec!["_name", "it's"]);
    }
}
