//! Tesseract recognition backend.
//!
//! Drives the `tesseract` command line. Token confidences come from its TSV
//! output; when that fails the plain-text output is used instead.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use image::GrayImage;
use tracing::{debug, info, warn};

use crate::error::RecognitionError;
use crate::models::config::RecognitionConfig;

use super::{BackendVariant, RecognitionBackend, RecognizedText};

/// TSV column holding the token confidence (0 - 100, -1 for non-word rows).
const TSV_CONF_COLUMN: usize = 10;
/// TSV column holding the token text.
const TSV_TEXT_COLUMN: usize = 11;

/// Tesseract OCR backend.
pub struct TesseractBackend {
    binary: PathBuf,
    /// Languages joined for `-l`, e.g. `eng+tur`.
    languages: String,
}

impl TesseractBackend {
    /// Create a backend, verifying that the binary actually runs.
    pub fn new(config: &RecognitionConfig) -> Result<Self, RecognitionError> {
        let backend = Self {
            binary: config.tesseract_binary.clone(),
            languages: config.languages.join("+"),
        };

        let version = backend.self_check()?;
        info!(
            "Tesseract {} ready with languages: {}",
            version, backend.languages
        );

        backend.warn_missing_languages(&config.languages);

        Ok(backend)
    }

    /// Languages passed to Tesseract.
    pub fn languages(&self) -> &str {
        &self.languages
    }

    fn self_check(&self) -> Result<String, RecognitionError> {
        let stdout = self.run([OsStr::new("--version")]).map_err(|e| match e {
            RecognitionError::Failed(msg) => RecognitionError::Unavailable(msg),
            other => other,
        })?;

        Ok(stdout
            .lines()
            .next()
            .map(|l| l.trim().to_string())
            .unwrap_or_default())
    }

    fn warn_missing_languages(&self, languages: &[String]) {
        let Ok(listing) = self.run([OsStr::new("--list-langs")]) else {
            return;
        };
        let installed: Vec<&str> = listing.lines().map(str::trim).collect();

        for lang in languages {
            if !installed.contains(&lang.as_str()) {
                warn!("Tesseract language '{}' is not installed", lang);
            }
        }
    }

    fn run<I, S>(&self, args: I) -> Result<String, RecognitionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.binary).args(args).output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(RecognitionError::Failed(format!(
                        "tesseract failed: {}",
                        stderr.trim()
                    )))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RecognitionError::Unavailable(format!(
                    "{} not found (install tesseract-ocr)",
                    self.binary.display()
                )))
            }
            Err(e) => Err(RecognitionError::Io(e)),
        }
    }

    fn recognize(&self, image_path: &Path, tsv: bool) -> Result<String, RecognitionError> {
        let mut args = vec![
            image_path.as_os_str(),
            OsStr::new("stdout"),
            OsStr::new("-l"),
            OsStr::new(self.languages()),
        ];
        if tsv {
            args.push(OsStr::new("tsv"));
        }
        self.run(args)
    }

    fn extract_detailed(&self, image_path: &Path) -> Result<RecognizedText, RecognitionError> {
        let tsv = self.recognize(image_path, true)?;
        parse_tsv(&tsv)
    }

    fn extract_plain(&self, image_path: &Path) -> Result<RecognizedText, RecognitionError> {
        let text = self.recognize(image_path, false)?;
        Ok(RecognizedText::unscored(text))
    }
}

impl RecognitionBackend for TesseractBackend {
    fn variant(&self) -> BackendVariant {
        BackendVariant::Tesseract
    }

    fn is_thread_safe(&self) -> bool {
        // Every call runs in its own process.
        true
    }

    fn extract_text(&self, image: &GrayImage) -> Result<RecognizedText, RecognitionError> {
        let start = Instant::now();

        let file = tempfile::Builder::new()
            .prefix("fatura-")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(file.path(), image::ImageFormat::Png)
            .map_err(|e| RecognitionError::Failed(format!("failed to stage image: {}", e)))?;

        let result = match self.extract_detailed(file.path()) {
            Ok(text) => text,
            Err(e) => {
                warn!("Detailed Tesseract extraction failed, using plain text: {}", e);
                self.extract_plain(file.path())?
            }
        };

        debug!(
            "Tesseract: {} tokens, confidence {:.2} in {}ms",
            result.lines.len(),
            result.confidence,
            start.elapsed().as_millis()
        );

        Ok(result)
    }
}

/// Parse `tesseract ... tsv` output into scored tokens.
fn parse_tsv(tsv: &str) -> Result<RecognizedText, RecognitionError> {
    let mut rows = tsv.lines();

    let header = rows
        .next()
        .ok_or_else(|| RecognitionError::Failed("empty TSV output".to_string()))?;
    if !header.starts_with("level") {
        return Err(RecognitionError::Failed(format!(
            "unexpected TSV header: {}",
            header
        )));
    }

    let mut tokens = Vec::new();
    for row in rows {
        let columns: Vec<&str> = row.split('\t').collect();
        if columns.len() <= TSV_TEXT_COLUMN {
            continue;
        }

        let confidence: f32 = columns[TSV_CONF_COLUMN].trim().parse().map_err(|_| {
            RecognitionError::Failed(format!(
                "invalid confidence '{}'",
                columns[TSV_CONF_COLUMN]
            ))
        })?;

        tokens.push((columns[TSV_TEXT_COLUMN].to_string(), confidence / 100.0));
    }

    Ok(RecognizedText::from_scored(tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{select_backend, FALLBACK_CONFIDENCE};
    use pretty_assertions::assert_eq;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_parse_tsv() {
        let tsv = format!(
            "{}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t10\t80\t20\t96.5\tFATURA\n\
             5\t1\t1\t1\t1\t2\t95\t10\t30\t20\t21\t~\n\
             5\t1\t1\t1\t1\t3\t130\t10\t50\t20\t88\tNo:\n",
            HEADER
        );

        let text = parse_tsv(&tsv).unwrap();
        assert_eq!(text.lines, vec!["FATURA", "No:"]);
        assert_eq!(text.text, "FATURA No:");
        assert!((text.confidence - 0.9225).abs() < 1e-4);
    }

    #[test]
    fn test_parse_tsv_rejects_garbage() {
        assert!(parse_tsv("").is_err());
        assert!(parse_tsv("not a tsv").is_err());

        let bad = format!("{}\n5\t1\t1\t1\t1\t1\t0\t0\t1\t1\tabc\tword\n", HEADER);
        assert!(parse_tsv(&bad).is_err());
    }

    /// Write an executable stand-in for the tesseract binary. `tsv` is the
    /// shell snippet run when TSV output is requested.
    #[cfg(unix)]
    fn fake_tesseract(dir: &Path, tsv: &str) -> RecognitionConfig {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("tesseract");
        let script = format!(
            "#!/bin/sh\n\
             case \"$1\" in\n\
               --version) echo 'tesseract 5.3.0'; exit 0 ;;\n\
               --list-langs) printf 'List of available languages (2):\\neng\\ntur\\n'; exit 0 ;;\n\
             esac\n\
             for arg in \"$@\"; do\n\
               if [ \"$arg\" = tsv ]; then {}; fi\n\
             done\n\
             printf 'FATURA\\nToplam 100,00 TL\\n'\n",
            tsv
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        RecognitionConfig {
            backends: vec![BackendVariant::Tesseract, BackendVariant::Onnx],
            tesseract_binary: path,
            ..Default::default()
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_plain_text_when_tsv_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = fake_tesseract(dir.path(), "echo 'tsv unsupported' >&2; exit 1");

        let backend = TesseractBackend::new(&config).unwrap();
        assert_eq!(backend.languages(), "eng+tur");

        let text = backend.extract_text(&GrayImage::new(16, 16)).unwrap();
        assert_eq!(text.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(text.lines.len(), 2);
        assert_eq!(text.lines, vec!["FATURA", "Toplam 100,00 TL"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_scored_text_from_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let rows = format!(
            "printf '{}\\n5\\t1\\t1\\t1\\t1\\t1\\t0\\t0\\t1\\t1\\t90\\tFATURA\\n'; exit 0",
            HEADER.replace('\t', "\\t")
        );
        let config = fake_tesseract(dir.path(), &rows);

        let backend = TesseractBackend::new(&config).unwrap();
        let text = backend.extract_text(&GrayImage::new(16, 16)).unwrap();
        assert_eq!(text.lines, vec!["FATURA"]);
        assert!((text.confidence - 0.90).abs() < 1e-4);
    }

    #[cfg(unix)]
    #[test]
    fn test_selected_first_in_preference_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = fake_tesseract(dir.path(), "exit 1");

        let backend = select_backend(&config).unwrap();
        assert_eq!(backend.variant(), BackendVariant::Tesseract);
        assert!(backend.is_thread_safe());
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let config = RecognitionConfig {
            tesseract_binary: PathBuf::from("/nonexistent/bin/tesseract"),
            ..Default::default()
        };

        let err = TesseractBackend::new(&config).err().unwrap();
        assert!(matches!(err, RecognitionError::Unavailable(_)));
    }
}
