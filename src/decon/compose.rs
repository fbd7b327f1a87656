//! Rendering of the tcsh deconvolution script

use super::config::{kernel_samples, DeconConfig, Kernel, RenderStyle};
use super::input::{parse_dataset_name, InputDescriptor, InputFormat, SeriesLayout};
use super::labels::file_labels;
use crate::error::{ToolError, ToolResult};
use std::fmt::Write as _;
use tracing::{debug, warn};

const SHEBANG: &str = "#!/bin/tcsh -xef\n\n";
const HEADER: &str = "# ------------------------------------------------------\n\
                      # perform neuro deconvolution via 3dTfitter\n\n";

/// Lines longer than this are wrapped with `\` continuations
const MAX_LINE: usize = 78;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Pre-2015 single pass over the primary input
    Legacy,
    /// Single pass over a 3d+time dataset
    Volumetric,
    /// Per-file detrend/upsample/fit/reconvolve loop over text series
    MultiFile,
}

pub struct ScriptComposer<'a> {
    config: &'a DeconConfig,
    input: &'a InputDescriptor,
}

impl<'a> ScriptComposer<'a> {
    pub fn new(config: &'a DeconConfig, input: &'a InputDescriptor) -> Self {
        Self { config, input }
    }

    pub fn mode(&self) -> RenderMode {
        match (self.config.style, self.input.format) {
            (RenderStyle::Legacy, _) => RenderMode::Legacy,
            (RenderStyle::Current, InputFormat::Volumetric) => RenderMode::Volumetric,
            (RenderStyle::Current, InputFormat::TextSeries) => RenderMode::MultiFile,
        }
    }

    pub fn compose(&self) -> ToolResult<String> {
        let mode = self.mode();
        debug!(?mode, kernel = %self.config.kernel, "composing script");

        let body = match mode {
            RenderMode::Legacy | RenderMode::Volumetric => self.render_single_pass(),
            RenderMode::MultiFile => self.render_multi_file()?,
        };

        let mut script = String::from(SHEBANG);
        script.push_str(HEADER);
        script.push_str(&body);
        Ok(wrap_long_lines(&script))
    }

    fn render_single_pass(&self) -> String {
        let config = self.config;
        let tr = self.input.tr;
        let is_text = self.input.format == InputFormat::TextSeries;

        if config.tr_nup != 1 {
            warn!(tr_nup = config.tr_nup, "--tr-nup only applies to the multi-file method, ignoring");
        }

        let mut cmd = String::new();
        let kfile = match &config.kernel_file_in {
            Some(kfile_in) => {
                let _ = writeln!(cmd, "# using pre-built response kernel\n");
                kfile_in.as_str()
            }
            None => {
                cmd.push_str(&single_pass_kernel(config.kernel, tr, &config.kernel_file));
                config.kernel_file.as_str()
            }
        };

        let detrended = if is_text {
            "detrend.1D".to_string()
        } else {
            format!("detrend{}", self.input.view.as_deref().unwrap_or(""))
        };
        let _ = write!(
            cmd,
            "# detrend the input\n\
             3dDetrend -polort {} -prefix {} {}\n\n",
            self.input.polort(),
            detrended,
            config.primary_input()
        );

        let rhs = if is_text {
            cmd.push_str(
                "# transpose the detrended dataset\n\
                 1dtranspose detrend.1D > detrend_tr.1D\n\n",
            );
            "detrend_tr.1D".to_string()
        } else {
            detrended
        };

        let mask = match &config.mask_dset {
            Some(mask) => format!("          -mask {} \\\n", mask),
            None => String::new(),
        };
        let _ = write!(
            cmd,
            "3dTfitter -lsqfit -RHS {} \\\n\
             {}          -FALTUNG {} {} \\\n          01 0.0\n\n",
            rhs, mask, kfile, config.prefix
        );

        cmd
    }

    fn render_multi_file(&self) -> ToolResult<String> {
        let config = self.config;
        for name in &config.infiles {
            if parse_dataset_name(name)?.format != InputFormat::TextSeries {
                return Err(ToolError::Config(format!(
                    "all --infiles must be 1D files for the multi-file method, have '{}'",
                    name
                )));
            }
        }
        if config.mask_dset.is_some() {
            warn!("--mask-dset only applies to volumetric input, ignoring");
        }

        let nup = config.tr_nup;
        let nups = format!("{:02}", nup);
        let trup = self.input.tr / f64::from(nup);
        let labels = file_labels(&config.infiles);

        let (read_note, read_suffix) = match self.input.layout() {
            Some(SeriesLayout::Transposed) => ("(no transpose on read)", ""),
            _ => ("(transpose on read)", "\\'"),
        };

        let mut cmd = String::new();
        let _ = write!(
            cmd,
            "# make and copy files into output directory\n\
             set outdir = {}\n\
             if ( ! -d $outdir ) mkdir $outdir\n\n",
            config.outdir
        );

        let _ = write!(
            cmd,
            "set files = ( {} )\n\
             set labels = ( {} )\n\n\
             cp -pv $files $outdir\n",
            config.infiles.join(" "),
            labels.join(" ")
        );

        let kfile = match &config.kernel_file_in {
            Some(kfile_in) => {
                let _ = writeln!(cmd, "cp -pv {} $outdir", kfile_in);
                path_tail(kfile_in).to_string()
            }
            None => config.kernel_file.clone(),
        };
        cmd.push_str("cd $outdir\n\n");

        if config.kernel_file_in.is_none() {
            let ntk = kernel_samples(config.kernel.duration(), self.input.tr, nup);
            cmd.push_str(&deconvolve_kernel(ntk, trup, config.kernel, &kfile));
        }

        cmd.push_str(
            "# process each input file\n\
             foreach findex ( `count -digits 2 1 $#files` )\n\
             \x20  # no zero-padding in shell index\n\
             \x20  set ival   = `ccalc -i $findex`\n\
             \x20  set infile = $files[$ival]:t\n\
             \x20  set label  = $labels[$ival]\n\n",
        );

        let detrended = "p00.det.$label.1D".to_string();
        let _ = write!(
            cmd,
            "   # detrend the input {}\n\
             \x20  3dDetrend -polort {} -prefix {} $infile{}\n\n",
            read_note,
            self.input.polort(),
            detrended,
            read_suffix
        );

        let transposed = "p01.det.tr.$label.1D".to_string();
        let _ = write!(
            cmd,
            "   # transpose the detrended dataset\n\
             \x20  1dtranspose {} > {}\n\n",
            detrended, transposed
        );

        let upsampled = format!("p02.up{}.$label.1D", nups);
        let _ = write!(
            cmd,
            "   # upsample by factor of {}\n\
             \x20  1dUpsample {} {} > {}\n\n",
            nup, nup, transposed, upsampled
        );

        let neuro = format!("p03.neuro.up{}.$label.1D", nups);
        let _ = write!(
            cmd,
            "   # deconvolve the upsampled series\n\
             \x20  3dTfitter -RHS {} \\\n\
             \x20            -FALTUNG {} {} \\\n\
             \x20            012 -2 -l2lasso -6\n\n",
            upsampled, kfile, neuro
        );

        let neuro_tr = format!("p04.neuro.up{}.tr.$label.1D", nups);
        let _ = write!(
            cmd,
            "   # transpose the neuro signal\n\
             \x20  1dtranspose {} > {}\n\n",
            neuro, neuro_tr
        );

        let reconv = format!("p05.reconv.up{}.tr.$label.1D", nups);
        let _ = write!(
            cmd,
            "   # reconvolve the neuro signal to compare with orig\n\
             \x20  set nt = `cat {} | wc -l`\n\
             \x20  waver -FILE {} {} -input {} \\\n\
             \x20        -numout $nt > {}\n\n",
            neuro_tr,
            format_number(trup),
            kfile,
            neuro_tr,
            reconv
        );

        cmd.push_str("end\n\n\n");

        let _ = write!(
            cmd,
            "echo \"compare upsample input to reconvolved result via:\"\n\
             echo \"set label = {}\"\n\
             echo \"1dplot -one {} {}\"\n\n",
            labels[0], upsampled, reconv
        );

        Ok(cmd)
    }
}

/// Kernel at the native TR for the single pass scripts
fn single_pass_kernel(kernel: Kernel, tr: f64, kfile: &str) -> String {
    let ntk = kernel_samples(kernel.duration(), tr, 1);
    match kernel {
        Kernel::Gam => format!(
            "# create response kernel\n\
             waver -GAM -peak 1 -dt {} -numout {} -inline 1@1 > {}\n\n",
            format_number(tr),
            ntk,
            kfile
        ),
        // waver has no block shape
        Kernel::Block => deconvolve_kernel(ntk, tr, kernel, kfile),
    }
}

fn deconvolve_kernel(ntk: usize, dt: f64, kernel: Kernel, kfile: &str) -> String {
    format!(
        "# create response kernel\n\
         3dDeconvolve -nodata {} {} -polort -1 \\\n\
         \x20  -num_stimts 1 -stim_times 1 \"1D:0\" \"{}\" \\\n\
         \x20  -x1D {} -x1D_stop\n\n",
        ntk,
        format_number(dt),
        kernel.basis(),
        kfile
    )
}

fn path_tail(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Format like C's `%g`: six significant digits, no trailing zeros
pub fn format_number(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let scale = 10f64.powi(5 - magnitude);
    ((value * scale).round() / scale).to_string()
}

/// Wrap over-long command lines at whitespace using `\` continuations
///
/// Lines holding quotes or backticks are left alone, since a continuation
/// inside a quoted word changes its meaning.
pub fn wrap_long_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        out.push_str(&wrap_line(body));
        out.push_str(newline);
    }
    out
}

fn wrap_line(line: &str) -> String {
    if line.len() <= MAX_LINE || line.contains(['"', '`']) {
        return line.to_string();
    }

    let indent = &line[..line.len() - line.trim_start().len()];
    let continuation = format!("{}    ", indent);

    let mut pieces: Vec<String> = Vec::new();
    let mut current = indent.to_string();
    for word in line.split_whitespace() {
        let fresh = current.trim().is_empty();
        if !fresh && current.len() + 1 + word.len() + 2 > MAX_LINE {
            pieces.push(std::mem::replace(&mut current, continuation.clone()));
            current.push_str(word);
        } else {
            if !fresh {
                current.push(' ');
            }
            current.push_str(word);
        }
    }
    pieces.push(current);
    pieces.join(" \\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decon::input::MatrixShape;

    fn text_input(rows: usize, cols: usize, tr: f64) -> InputDescriptor {
        let shape = MatrixShape { rows, cols };
        InputDescriptor {
            format: InputFormat::TextSeries,
            reps: shape.max_dim(),
            tr,
            shape: Some(shape),
            view: None,
        }
    }

    fn volume_input(view: &str) -> InputDescriptor {
        InputDescriptor {
            format: InputFormat::Volumetric,
            reps: 150,
            tr: 2.0,
            shape: None,
            view: Some(view.to_string()),
        }
    }

    fn seed_config() -> DeconConfig {
        let mut config = DeconConfig::new(
            vec![
                "seed.all_runs.1D".into(),
                "seed.errts.1D".into(),
                "seed.fitts.1D".into(),
            ],
            "script.neuro.txt",
        );
        config.tr = Some(2.0);
        config.tr_nup = 20;
        config
    }

    #[test]
    fn test_mode_selection() {
        let mut config = seed_config();
        let text = text_input(300, 1, 2.0);
        let vol = volume_input("+orig");

        assert_eq!(ScriptComposer::new(&config, &text).mode(), RenderMode::MultiFile);
        assert_eq!(ScriptComposer::new(&config, &vol).mode(), RenderMode::Volumetric);

        config.style = RenderStyle::Legacy;
        assert_eq!(ScriptComposer::new(&config, &text).mode(), RenderMode::Legacy);
        assert_eq!(ScriptComposer::new(&config, &vol).mode(), RenderMode::Legacy);
    }

    #[test]
    fn test_multi_file_script() {
        let config = seed_config();
        let input = text_input(300, 1, 2.0);
        let script = ScriptComposer::new(&config, &input).compose().unwrap();

        assert!(script.starts_with("#!/bin/tcsh -xef\n"));
        assert!(script.contains("set outdir = decon.results\n"));
        assert!(script.contains(
            "set files = ( seed.all_runs.1D seed.errts.1D seed.fitts.1D )\n"
        ));
        assert!(script.contains("set labels = ( 01.all_runs 02.errts 03.fitts )\n"));
        assert!(script.contains("3dDeconvolve -nodata 120 0.1 -polort -1 \\\n"));
        assert!(script.contains("-stim_times 1 \"1D:0\" \"GAM\" \\\n"));
        assert!(script.contains("-x1D resp_kernel.1D -x1D_stop\n"));
        // 600 seconds of data
        assert!(script.contains(
            "3dDetrend -polort 5 -prefix p00.det.$label.1D $infile\\'\n"
        ));
        assert!(script.contains("# detrend the input (transpose on read)\n"));
        assert!(script.contains("1dUpsample 20 p01.det.tr.$label.1D > p02.up20.$label.1D\n"));
        assert!(script.contains("-FALTUNG resp_kernel.1D p03.neuro.up20.$label.1D \\\n"));
        assert!(script.contains("012 -2 -l2lasso -6\n"));
        assert!(script.contains("waver -FILE 0.1 resp_kernel.1D -input p04.neuro.up20.tr.$label.1D"));
        assert!(script.contains("> p05.reconv.up20.tr.$label.1D\n"));
        assert!(script.contains("echo \"set label = 01.all_runs\"\n"));
        assert!(script.contains(
            "echo \"1dplot -one p02.up20.$label.1D p05.reconv.up20.tr.$label.1D\"\n"
        ));
    }

    #[test]
    fn test_multi_file_single_row_reads_as_is() {
        let config = seed_config();
        let input = text_input(1, 300, 2.0);
        let script = ScriptComposer::new(&config, &input).compose().unwrap();

        assert!(script.contains("# detrend the input (no transpose on read)\n"));
        assert!(script.contains("-prefix p00.det.$label.1D $infile\n"));
    }

    #[test]
    fn test_multi_file_block_kernel() {
        let mut config = seed_config();
        config.kernel = Kernel::Block;
        let input = text_input(300, 1, 2.0);
        let script = ScriptComposer::new(&config, &input).compose().unwrap();

        assert!(script.contains("3dDeconvolve -nodata 150 0.1 -polort -1"));
        assert!(script.contains("\"BLOCK(0.1,1)\""));
    }

    #[test]
    fn test_upsample_labels_are_padded() {
        let mut config = seed_config();
        config.tr_nup = 5;
        let input = text_input(300, 1, 2.0);
        let script = ScriptComposer::new(&config, &input).compose().unwrap();

        assert!(script.contains("p02.up05.$label.1D"));
        assert!(script.contains("3dDeconvolve -nodata 30 0.4 "));
    }

    #[test]
    fn test_prebuilt_kernel_skips_generation() {
        let mut config = seed_config();
        config.kernel_file_in = Some("kernels/gam_0.1.1D".into());
        let input = text_input(300, 1, 2.0);
        let script = ScriptComposer::new(&config, &input).compose().unwrap();

        assert!(!script.contains("3dDeconvolve"));
        assert!(script.contains("cp -pv kernels/gam_0.1.1D $outdir\n"));
        assert!(script.contains("-FALTUNG gam_0.1.1D p03"));
    }

    #[test]
    fn test_multi_file_rejects_volumes() {
        let mut config = seed_config();
        config.infiles.push("epi+orig".into());
        let input = text_input(300, 1, 2.0);

        let err = ScriptComposer::new(&config, &input).compose().unwrap_err();
        assert!(matches!(err, ToolError::Config(_)));
    }

    #[test]
    fn test_volumetric_script() {
        let mut config = DeconConfig::new(vec!["run1+orig".into()], "script.neuro");
        config.mask_dset = Some("automask+orig".into());
        config.prefix = "neuro_resp".into();
        let input = volume_input("+orig");
        let script = ScriptComposer::new(&config, &input).compose().unwrap();

        assert!(script.contains(
            "waver -GAM -peak 1 -dt 2 -numout 6 -inline 1@1 > resp_kernel.1D\n"
        ));
        assert!(script.contains("3dDetrend -polort 3 -prefix detrend+orig run1+orig\n"));
        assert!(!script.contains("1dtranspose"));
        assert!(script.contains(
            "3dTfitter -lsqfit -RHS detrend+orig \\\n\
             \x20         -mask automask+orig \\\n\
             \x20         -FALTUNG resp_kernel.1D neuro_resp \\\n\
             \x20         01 0.0\n"
        ));
    }

    #[test]
    fn test_volumetric_without_mask() {
        let config = DeconConfig::new(vec!["epi.nii.gz".into()], "s");
        let input = volume_input(".nii");
        let script = ScriptComposer::new(&config, &input).compose().unwrap();

        assert!(script.contains("-prefix detrend.nii epi.nii.gz\n"));
        assert!(script.contains("3dTfitter -lsqfit -RHS detrend.nii \\\n          -FALTUNG"));
    }

    #[test]
    fn test_legacy_text_script() {
        let mut config = DeconConfig::new(vec!["epi_data.1D".into()], "script.1d");
        config.style = RenderStyle::Legacy;
        config.prefix = "neuro.1D".into();
        config.tr = Some(2.0);
        let input = text_input(200, 1, 2.0);
        let script = ScriptComposer::new(&config, &input).compose().unwrap();

        assert!(script.contains("3dDetrend -polort 3 -prefix detrend.1D epi_data.1D\n"));
        assert!(script.contains("1dtranspose detrend.1D > detrend_tr.1D\n"));
        assert!(script.contains("3dTfitter -lsqfit -RHS detrend_tr.1D \\\n"));
        assert!(script.contains("-FALTUNG resp_kernel.1D neuro.1D \\\n          01 0.0\n"));
        assert!(!script.contains("foreach"));
    }

    #[test]
    fn test_legacy_block_kernel_uses_deconvolve() {
        let mut config = DeconConfig::new(vec!["epi_data.1D".into()], "s");
        config.style = RenderStyle::Legacy;
        config.kernel = Kernel::Block;
        config.tr = Some(2.0);
        let input = text_input(200, 1, 2.0);
        let script = ScriptComposer::new(&config, &input).compose().unwrap();

        assert!(script.contains("3dDeconvolve -nodata 7 2 -polort -1"));
        assert!(!script.contains("waver"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(2.0 / 25.0), "0.08");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
        assert_eq!(format_number(0.0), "0");
    }

    #[test]
    fn test_wrap_long_lines() {
        let files: Vec<String> = (1..=12).map(|i| format!("subject_{:02}/seed.1D", i)).collect();
        let line = format!("set files = ( {} )\n", files.join(" "));
        let wrapped = wrap_long_lines(&line);

        assert!(wrapped.lines().count() > 1);
        for piece in wrapped.lines() {
            assert!(piece.len() <= MAX_LINE, "too long: {}", piece);
        }
        let rejoined: Vec<&str> = wrapped
            .split_whitespace()
            .filter(|w| *w != "\\")
            .collect();
        let original: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn test_wrap_leaves_short_and_quoted_lines() {
        let short = "cd $outdir\n";
        assert_eq!(wrap_long_lines(short), short);

        let quoted = format!("echo \"{}\"\n", "x ".repeat(60));
        assert_eq!(wrap_long_lines(&quoted), quoted);
    }
}
