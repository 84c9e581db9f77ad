//! Icon lookup for model ids.
//!
//! Icons are plain files in a local directory, named after a provider or
//! model family (`openai.svg`, `llama.png`). A model id is matched against
//! the basenames of those files.

use std::{
    io,
    path::{Path, PathBuf},
};

const ICON_EXTENSIONS: &[&str] = &["svg", "png", "jpg", "jpeg"];

/// Resolves model ids to icon filenames in a directory.
#[derive(Debug, Clone)]
pub struct IconResolver {
    dir: PathBuf,
    default_icon: String,
}

impl IconResolver {
    pub fn new(dir: impl Into<PathBuf>, default_icon: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            default_icon: default_icon.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn default_icon(&self) -> &str {
        &self.default_icon
    }

    /// Read the directory once so many ids can be resolved against it.
    ///
    /// A read failure yields an empty set, which resolves everything to the
    /// default icon.
    pub fn snapshot(&self) -> IconSet {
        match self.read_dir() {
            Ok(files) => IconSet::new(files, self.default_icon.clone()),
            Err(e) => {
                tracing::warn!(
                    dir = %self.dir.display(),
                    error = %e,
                    "Failed to read icon directory, using default icon"
                );
                IconSet::new(Vec::new(), self.default_icon.clone())
            }
        }
    }

    /// Resolve a single id against the current directory contents.
    pub fn resolve(&self, model_id: &str) -> String {
        self.snapshot().resolve(model_id)
    }

    fn read_dir(&self) -> io::Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                files.push(name);
            }
        }
        Ok(files)
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    file: String,
    stem_lower: String,
}

/// A point-in-time listing of the icon directory.
#[derive(Debug, Clone)]
pub struct IconSet {
    /// Every filename in the directory, including the default icon.
    files: Vec<String>,
    /// Image files other than the default icon, sorted by filename.
    candidates: Vec<Candidate>,
    default_icon: String,
}

impl IconSet {
    fn new(mut files: Vec<String>, default_icon: String) -> Self {
        files.sort();
        let candidates = files
            .iter()
            .filter(|file| **file != default_icon)
            .filter_map(|file| {
                let path = Path::new(file);
                let ext = path.extension()?.to_str()?.to_lowercase();
                if !ICON_EXTENSIONS.contains(&ext.as_str()) {
                    return None;
                }
                let stem = path.file_stem()?.to_str()?;
                Some(Candidate {
                    file: file.clone(),
                    stem_lower: stem.to_lowercase(),
                })
            })
            .collect();

        Self {
            files,
            candidates,
            default_icon,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Pick the icon for a model id.
    ///
    /// The basename that occurs earliest in the id wins; ties go to the
    /// longer basename, then to the smaller filename. Without a match the
    /// provider prefix (text before the first `/`) is tried as a basename.
    pub fn resolve(&self, model_id: &str) -> String {
        if model_id.is_empty() {
            return self.default_icon.clone();
        }

        let id_lower = model_id.to_lowercase();

        let best = self
            .candidates
            .iter()
            .filter_map(|c| id_lower.find(&c.stem_lower).map(|pos| (pos, c)))
            .min_by(|(pos_a, a), (pos_b, b)| {
                pos_a
                    .cmp(pos_b)
                    .then_with(|| b.stem_lower.len().cmp(&a.stem_lower.len()))
                    .then_with(|| a.file.cmp(&b.file))
            });
        if let Some((_, candidate)) = best {
            return candidate.file.clone();
        }

        let provider = model_id.split('/').next().unwrap_or(model_id);
        let provider_lower = provider.to_lowercase();

        if let Some(candidate) = self
            .candidates
            .iter()
            .find(|c| c.stem_lower == provider_lower)
        {
            return candidate.file.clone();
        }

        ICON_EXTENSIONS
            .iter()
            .map(|ext| format!("{provider}.{ext}"))
            .find(|name| self.files.contains(name))
            .unwrap_or_else(|| self.default_icon.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn icon_dir(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            fs::write(dir.path().join(file), b"icon").unwrap();
        }
        dir
    }

    #[test]
    fn test_earliest_match_wins() {
        let dir = icon_dir(&["meta.svg", "llama.png", "default.png"]);
        let resolver = IconResolver::new(dir.path(), "default.png");
        assert_eq!(resolver.resolve("meta-llama/Llama-3-8B"), "meta.svg");
        assert_eq!(resolver.resolve("someone/llama-finetune"), "llama.png");
    }

    #[test]
    fn test_tie_prefers_longest_basename() {
        let dir = icon_dir(&["gpt.svg", "gpt4.svg", "openai.svg"]);
        let resolver = IconResolver::new(dir.path(), "default.png");
        // "openai" occurs at 0 and wins outright.
        assert_eq!(resolver.resolve("openai/gpt4-turbo"), "openai.svg");

        let dir = icon_dir(&["gpt.svg", "gpt4.svg"]);
        let resolver = IconResolver::new(dir.path(), "default.png");
        assert_eq!(resolver.resolve("openai/gpt4-turbo"), "gpt4.svg");
    }

    #[test]
    fn test_tie_on_length_prefers_smaller_filename() {
        let dir = icon_dir(&["qwen.svg", "qwen.png"]);
        let resolver = IconResolver::new(dir.path(), "default.png");
        assert_eq!(resolver.resolve("Qwen/Qwen2-7B"), "qwen.png");
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let dir = icon_dir(&["DeepSeek.PNG"]);
        let resolver = IconResolver::new(dir.path(), "default.png");
        assert_eq!(resolver.resolve("deepseek-ai/DeepSeek-R1"), "DeepSeek.PNG");
    }

    #[test]
    fn test_non_image_files_and_default_are_ignored() {
        let dir = icon_dir(&["mistral.txt", "default.png", "README.md"]);
        let resolver = IconResolver::new(dir.path(), "default.png");
        assert_eq!(resolver.resolve("mistralai/mistral-7b"), "default.png");
        // The default icon's basename never matches as a candidate.
        assert_eq!(resolver.resolve("default/model"), "default.png");
    }

    #[test]
    fn test_no_match_returns_default() {
        let dir = icon_dir(&["openai.svg"]);
        let resolver = IconResolver::new(dir.path(), "default.png");
        assert_eq!(resolver.resolve("anthropic/claude-3"), "default.png");
        assert_eq!(resolver.resolve(""), "default.png");
    }

    #[test]
    fn test_missing_directory_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = IconResolver::new(dir.path().join("missing"), "default.png");
        assert!(resolver.snapshot().is_empty());
        assert_eq!(resolver.resolve("openai/gpt-4o"), "default.png");
    }

    #[test]
    fn test_snapshot_resolves_many() {
        let dir = icon_dir(&["google.svg", "gemma.png"]);
        let set = IconResolver::new(dir.path(), "default.png").snapshot();
        assert_eq!(set.resolve("google/gemma-2-9b"), "google.svg");
        assert_eq!(set.resolve("unsloth/gemma-2-9b"), "gemma.png");
        assert_eq!(set.resolve("unknown/model"), "default.png");
    }
}
