use super::identifier::{ParsedFileName, parse_path};
use crate::domain::{FanoError, FanoResult, FileRole, ParserResult};
use globset::{Glob, GlobMatcher};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FILE_PATTERN: &str = "*.txt";
pub const BACKGROUND_DIRECTORY_NAME: &str = "Background";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFile {
    pub path: PathBuf,
    pub role: FileRole,
}

impl IndexedFile {
    pub fn parse(&self) -> ParserResult<ParsedFileName> {
        parse_path(&self.path)
    }
}

/// Input files tagged with their role when the index is built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileIndex {
    files: Vec<IndexedFile>,
}

impl FileIndex {
    pub fn from_directories(
        scan_dir: &Path,
        background_dir: Option<&Path>,
        pattern: &str,
    ) -> FanoResult<Self> {
        let matcher = compile_pattern(pattern)?;
        let mut files = list_matching(scan_dir, &matcher)?
            .into_iter()
            .map(|path| IndexedFile {
                path,
                role: FileRole::Scan,
            })
            .collect::<Vec<_>>();

        if let Some(background_dir) = background_dir {
            if background_dir.is_dir() {
                files.extend(
                    list_matching(background_dir, &matcher)?
                        .into_iter()
                        .map(|path| IndexedFile {
                            path,
                            role: FileRole::Background,
                        }),
                );
            } else {
                tracing::warn!(
                    directory = %background_dir.display(),
                    "background directory does not exist; scans will be normalized without backgrounds"
                );
            }
        }

        Ok(Self::from_files(files))
    }

    /// Tags each path by its parent directory: `Background` marks backgrounds.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files = paths
            .into_iter()
            .map(Into::into)
            .map(|path| {
                let role = role_from_parent(&path);
                IndexedFile { path, role }
            })
            .collect();
        Self::from_files(files)
    }

    pub fn from_files(mut files: Vec<IndexedFile>) -> Self {
        files.sort_by(|lhs, rhs| lhs.path.cmp(&rhs.path));
        Self { files }
    }

    pub fn files(&self) -> &[IndexedFile] {
        &self.files
    }

    pub fn with_role(&self, role: FileRole) -> impl Iterator<Item = &IndexedFile> {
        self.files.iter().filter(move |file| file.role == role)
    }

    pub fn scans(&self) -> impl Iterator<Item = &IndexedFile> {
        self.with_role(FileRole::Scan)
    }

    pub fn backgrounds(&self) -> impl Iterator<Item = &IndexedFile> {
        self.with_role(FileRole::Background)
    }

    /// Scan files grouped into batches by primary identifier.
    ///
    /// Files whose names fail to parse are returned separately so the caller
    /// can report them.
    pub fn scans_by_primary(&self) -> ScanBatches<'_> {
        let mut batches: BTreeMap<String, Vec<&IndexedFile>> = BTreeMap::new();
        let mut unparsed = Vec::new();
        for file in self.scans() {
            match file.parse() {
                Ok(parsed) => batches.entry(parsed.primary).or_default().push(file),
                Err(error) => unparsed.push((file, error)),
            }
        }
        ScanBatches { batches, unparsed }
    }
}

#[derive(Debug)]
pub struct ScanBatches<'a> {
    pub batches: BTreeMap<String, Vec<&'a IndexedFile>>,
    pub unparsed: Vec<(&'a IndexedFile, FanoError)>,
}

fn role_from_parent(path: &Path) -> FileRole {
    let is_background = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case(BACKGROUND_DIRECTORY_NAME));
    if is_background {
        FileRole::Background
    } else {
        FileRole::Scan
    }
}

fn compile_pattern(pattern: &str) -> FanoResult<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|source| {
            FanoError::invalid_config(format!("invalid file pattern '{}': {}", pattern, source))
        })
}

fn list_matching(directory: &Path, matcher: &GlobMatcher) -> FanoResult<Vec<PathBuf>> {
    let entries = fs::read_dir(directory).map_err(|source| {
        FanoError::io(format!(
            "failed to list directory '{}': {}",
            directory.display(),
            source
        ))
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| {
            FanoError::io(format!(
                "failed to read entry in '{}': {}",
                directory.display(),
                source
            ))
        })?;
        let path = entry.path();
        let matches = path
            .file_name()
            .is_some_and(|name| matcher.is_match(Path::new(name)));
        if path.is_file() && matches {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
