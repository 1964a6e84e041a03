//! Resolution chain – decides which data source and which template source a
//! run uses.
//!
//! Each chain is an ordered list of candidates. A candidate either resolves,
//! is not applicable (the next candidate is tried), or fails outright when
//! its input was given explicitly and is invalid. The first resolved
//! candidate wins. Filesystem existence is asked through [`Probe`] so the
//! precedence rules can be exercised without touching disk.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ConfigIssue, ForgeError, Stage};

/// Conventional location of an editable template, relative to the working
/// directory.
pub const EXTERNAL_TEMPLATE_PATH: &str = "templates/invoice.html";

/// Answers "does this path exist?".
pub trait Probe {
    fn exists(&self, path: &Path) -> bool;
}

/// Probe backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl Probe for FsProbe {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

impl<F> Probe for F
where
    F: Fn(&Path) -> bool,
{
    fn exists(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Where the invoice comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// A JSON data file named on the command line.
    File(PathBuf),
    /// The built-in demo invoice.
    Sample,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Sample => f.write_str("demo data"),
        }
    }
}

/// Where the template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// A template file named on the command line.
    Explicit(PathBuf),
    /// The editable template at the conventional location.
    External(PathBuf),
    /// The template compiled into the binary.
    Bundled,
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSource::Explicit(path) => write!(f, "{}", absolute(path).display()),
            TemplateSource::External(path) => write!(
                f,
                "{}  [external \u{2014} editable]",
                absolute(path).display()
            ),
            TemplateSource::Bundled => f.write_str("builtin:/templates/invoice.html  [bundled]"),
        }
    }
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum DataCandidate<'a> {
    Explicit(&'a Path),
    Sample,
}

impl DataCandidate<'_> {
    fn check(&self, probe: &dyn Probe) -> Result<Option<DataSource>, ForgeError> {
        match self {
            DataCandidate::Explicit(path) if probe.exists(path) => {
                Ok(Some(DataSource::File(path.to_path_buf())))
            }
            DataCandidate::Explicit(path) => Err(ForgeError::Configuration {
                stage: Stage::Data,
                path: absolute(path),
                issue: ConfigIssue::DataNotFound,
            }),
            DataCandidate::Sample => Ok(Some(DataSource::Sample)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateCandidate<'a> {
    Explicit(&'a Path),
    External(&'a Path),
    Bundled,
}

impl TemplateCandidate<'_> {
    fn check(&self, probe: &dyn Probe) -> Result<Option<TemplateSource>, ForgeError> {
        match self {
            TemplateCandidate::Explicit(path) if probe.exists(path) => {
                Ok(Some(TemplateSource::Explicit(path.to_path_buf())))
            }
            TemplateCandidate::Explicit(path) => Err(ForgeError::Configuration {
                stage: Stage::Template,
                path: absolute(path),
                issue: ConfigIssue::TemplateNotFound,
            }),
            TemplateCandidate::External(path) if probe.exists(path) => {
                Ok(Some(TemplateSource::External(path.to_path_buf())))
            }
            TemplateCandidate::External(_) => Ok(None),
            TemplateCandidate::Bundled => Ok(Some(TemplateSource::Bundled)),
        }
    }
}

/// Pick the data source: explicit file, else the built-in sample.
pub fn resolve_data(explicit: Option<&Path>, probe: &dyn Probe) -> Result<DataSource, ForgeError> {
    let mut chain = Vec::with_capacity(2);
    if let Some(path) = explicit {
        chain.push(DataCandidate::Explicit(path));
    }
    chain.push(DataCandidate::Sample);

    for candidate in &chain {
        if let Some(source) = candidate.check(probe)? {
            log::debug!("data source resolved: {candidate:?} -> {source}");
            return Ok(source);
        }
    }
    Ok(DataSource::Sample)
}

/// Pick the template source: explicit file, else the external template at
/// `external`, else the bundled one.
pub fn resolve_template(
    explicit: Option<&Path>,
    external: &Path,
    probe: &dyn Probe,
) -> Result<TemplateSource, ForgeError> {
    let mut chain = Vec::with_capacity(3);
    if let Some(path) = explicit {
        chain.push(TemplateCandidate::Explicit(path));
    }
    chain.push(TemplateCandidate::External(external));
    chain.push(TemplateCandidate::Bundled);

    for candidate in &chain {
        if let Some(source) = candidate.check(probe)? {
            log::debug!("template source resolved: {candidate:?} -> {source}");
            return Ok(source);
        }
    }
    Ok(TemplateSource::Bundled)
}

/// Best-effort absolute form of `path` for messages.
pub fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nothing_exists(_: &Path) -> bool {
        false
    }

    fn everything_exists(_: &Path) -> bool {
        true
    }

    fn external() -> &'static Path {
        Path::new(EXTERNAL_TEMPLATE_PATH)
    }

    #[test]
    fn data_defaults_to_sample() {
        let source = resolve_data(None, &nothing_exists).unwrap();
        assert_eq!(source, DataSource::Sample);
    }

    #[test]
    fn explicit_data_file_wins() {
        let source = resolve_data(Some(Path::new("in.json")), &everything_exists).unwrap();
        assert_eq!(source, DataSource::File(PathBuf::from("in.json")));
    }

    #[test]
    fn missing_explicit_data_never_falls_back() {
        let err = resolve_data(Some(Path::new("gone.json")), &nothing_exists).unwrap_err();
        match err {
            ForgeError::Configuration { stage, path, issue } => {
                assert_eq!(stage, Stage::Data);
                assert_eq!(issue, ConfigIssue::DataNotFound);
                assert!(path.is_absolute());
                assert!(path.ends_with("gone.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn template_defaults_to_bundled() {
        let source = resolve_template(None, external(), &nothing_exists).unwrap();
        assert_eq!(source, TemplateSource::Bundled);
    }

    #[test]
    fn external_template_beats_bundled() {
        let probe = |p: &Path| p == Path::new(EXTERNAL_TEMPLATE_PATH);
        let source = resolve_template(None, external(), &probe).unwrap();
        assert_eq!(source, TemplateSource::External(external().to_path_buf()));
    }

    #[test]
    fn explicit_template_beats_external() {
        let source =
            resolve_template(Some(Path::new("mine.html")), external(), &everything_exists)
                .unwrap();
        assert_eq!(source, TemplateSource::Explicit(PathBuf::from("mine.html")));
    }

    #[test]
    fn missing_explicit_template_does_not_fall_through() {
        // The external template is present, yet an invalid explicit choice
        // must still fail.
        let probe = |p: &Path| p == Path::new(EXTERNAL_TEMPLATE_PATH);
        let err = resolve_template(Some(Path::new("nope.html")), external(), &probe).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.stage(), Stage::Template);
        assert!(err.to_string().contains("template not found"));
    }

    #[test]
    fn every_combination_resolves_by_priority() {
        for explicit_given in [false, true] {
            for explicit_exists in [false, true] {
                for external_exists in [false, true] {
                    let probe = |p: &Path| {
                        if p == Path::new("explicit.html") {
                            explicit_exists
                        } else {
                            external_exists
                        }
                    };
                    let explicit = explicit_given.then(|| Path::new("explicit.html"));
                    let result = resolve_template(explicit, external(), &probe);
                    match (explicit_given, explicit_exists, external_exists) {
                        (true, true, _) => assert!(matches!(
                            result,
                            Ok(TemplateSource::Explicit(_))
                        )),
                        (true, false, _) => assert!(result.is_err()),
                        (false, _, true) => {
                            assert!(matches!(result, Ok(TemplateSource::External(_))))
                        }
                        (false, _, false) => {
                            assert!(matches!(result, Ok(TemplateSource::Bundled)))
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn source_labels() {
        assert_eq!(DataSource::Sample.to_string(), "demo data");
        assert!(TemplateSource::Bundled.to_string().ends_with("[bundled]"));
        assert!(TemplateSource::External(external().to_path_buf())
            .to_string()
            .contains("editable"));
    }
}
