/// Template Renderer (spec §4.1)
///
/// Substitutes `@variable<k>@` and `@value<k>@` placeholders in a
/// memory-mapped template to produce a concrete simulator input file.
/// Grounded on `calibrate_template` in the original C source
/// (`examples/original_source/calibrator.c`), which does the same literal
/// substitution with `GRegex`; this crate performs the substitution with
/// plain string replacement since the placeholders are fixed literals, not
/// patterns, and memory-maps templates with `memmap2` (grounded on
/// `examples/other_examples/manifests/MaelLefeuvre-grups-rs/Cargo.toml`,
/// which depends on the same crate) in place of `GMappedFile`.
use crate::config::calibration_config::Variable;
use crate::error::CalibError;
use memmap2::Mmap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A template file opened once and reused across every candidate.
pub struct TemplateHandle {
    mmap: Mmap,
}

impl TemplateHandle {
    pub fn open(path: &str) -> Result<Self, CalibError> {
        let file = File::open(path)
            .map_err(|e| CalibError::Config(format!("cannot open template '{}': {}", path, e)))?;
        // SAFETY: templates are read-only inputs for the lifetime of the
        // calibration run; nothing else in this process writes to them.
        let mmap = unsafe {
            Mmap::map(&file)
                .map_err(|e| CalibError::Config(format!("cannot map template '{}': {}", path, e)))?
        };
        Ok(Self { mmap })
    }

    fn contents(&self) -> &str {
        std::str::from_utf8(&self.mmap).unwrap_or("")
    }
}

/// Renders `handle`'s contents into `output_path`, substituting every
/// `@variable<k>@`/`@value<k>@` placeholder for k in 1..=variables.len() in
/// ascending order. A template with none of a variable's placeholders is
/// valid; unknown placeholders are left untouched.
pub fn render(
    variables: &[Variable],
    values: &[f64],
    handle: &TemplateHandle,
    output_path: &Path,
    candidate: usize,
    slot: usize,
) -> Result<(), CalibError> {
    let mut content = handle.contents().to_string();

    for (k, (variable, &value)) in variables.iter().zip(values.iter()).enumerate() {
        let idx = k + 1;
        content = content.replace(&format!("@variable{}@", idx), &variable.name);
        let formatted = variable.format.format(value);
        content = content.replace(&format!("@value{}@", idx), &formatted);
    }

    let mut file = File::create(output_path).map_err(|e| CalibError::Render {
        candidate,
        slot,
        source: e,
    })?;
    file.write_all(content.as_bytes())
        .map_err(|e| CalibError::Render {
            candidate,
            slot,
            source: e,
        })?;
    Ok(())
}

/// Renders a single `f64` through a `printf`-style format string, supporting
/// the `%[flags][width][.precision]conv` subset needed for one floating
/// point value (`f`, `e`, `E`, `g`, `G`). Anything outside the single `%...`
/// conversion is copied through literally, matching the original C source's
/// use of the document-supplied format string with `snprintf`.
pub fn render_printf(fmt: &str, value: f64) -> String {
    let bytes: Vec<char> = fmt.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != '%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        // Found '%'; parse flags, width, precision, conversion.
        let start = i;
        i += 1;
        if i < bytes.len() && bytes[i] == '%' {
            out.push('%');
            i += 1;
            continue;
        }
        while i < bytes.len() && "+-0 #".contains(bytes[i]) {
            i += 1;
        }
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let mut precision: Option<usize> = None;
        if i < bytes.len() && bytes[i] == '.' {
            i += 1;
            let prec_start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            precision = bytes[prec_start..i]
                .iter()
                .collect::<String>()
                .parse::<usize>()
                .ok()
                .or(Some(0));
        }
        if i >= bytes.len() {
            // Unterminated conversion; copy through literally.
            out.extend(&bytes[start..i]);
            break;
        }
        let conv = bytes[i];
        i += 1;
        let prec = precision.unwrap_or(6);
        match conv {
            'f' | 'F' => out.push_str(&format!("{:.*}", prec, value)),
            'e' => out.push_str(&format!("{:.*e}", prec, value)),
            'E' => out.push_str(&format!("{:.*E}", prec, value)),
            'g' | 'G' => out.push_str(&format!("{}", value)),
            'd' => out.push_str(&format!("{}", value as i64)),
            other => {
                // Unknown conversion: copy the directive through unchanged.
                out.push('%');
                out.push(other);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::calibration_config::PrintFormat;
    use std::io::Write as _;

    fn var(name: &str) -> Variable {
        Variable {
            name: name.to_string(),
            format: PrintFormat::Default,
            min: 0.0,
            max: 1.0,
            sweeps: None,
        }
    }

    #[test]
    fn substitutes_variable_and_value_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("in.tpl");
        std::fs::write(&template_path, "name=@variable1@ x=@value1@ unused=@variable2@").unwrap();
        let handle = TemplateHandle::open(template_path.to_str().unwrap()).unwrap();

        let out_path = dir.path().join("out.txt");
        render(&[var("alpha")], &[3.5], &handle, &out_path, 0, 0).unwrap();

        let content = std::fs::read_to_string(&out_path).unwrap();
        assert!(content.contains("name=alpha"));
        assert!(content.contains("unused=@variable2@"));
    }

    #[test]
    fn render_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("in.tpl");
        std::fs::write(&template_path, "@variable1@=@value1@").unwrap();
        let handle = TemplateHandle::open(template_path.to_str().unwrap()).unwrap();

        let out1 = dir.path().join("out1.txt");
        let out2 = dir.path().join("out2.txt");
        render(&[var("x")], &[1.25], &handle, &out1, 0, 0).unwrap();
        render(&[var("x")], &[1.25], &handle, &out2, 0, 0).unwrap();

        assert_eq!(
            std::fs::read(&out1).unwrap(),
            std::fs::read(&out2).unwrap()
        );
    }

    #[test]
    fn printf_precision_and_scientific() {
        assert_eq!(render_printf("%.2f", 3.14159), "3.14");
        assert_eq!(render_printf("x=%d", 7.0), "x=7");
    }

    #[test]
    fn unknown_placeholder_left_untouched() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "@value1@ and @notaplaceholder@").unwrap();
        let handle = TemplateHandle::open(f.path().to_str().unwrap()).unwrap();
        let out = tempfile::NamedTempFile::new().unwrap();
        render(&[var("x")], &[9.0], &handle, out.path(), 0, 0).unwrap();
        let content = std::fs::read_to_string(out.path()).unwrap();
        assert!(content.contains("@notaplaceholder@"));
    }
}
