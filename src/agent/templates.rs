//! Translation task templates
//!
//! Ready-made tasks for the two ways of translating a Fortran source:
//! driving the translator CLI, or having the agent write the C++ itself.

use std::path::{Path, PathBuf};

/// How the translation is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TranslationMode {
    /// The translator CLI drafts the C++ and updates the Makefile
    #[default]
    #[value(name = "codescribe")]
    CodeScribe,
    /// The agent reads the source and writes the C++ itself
    Direct,
}

/// A translation task for one source file
#[derive(Debug, Clone)]
pub struct TaskTemplate {
    source: PathBuf,
    mode: TranslationMode,
    translate_config: String,
    build_config: String,
    build_command: String,
}

impl TaskTemplate {
    pub fn new(source: impl Into<PathBuf>, mode: TranslationMode) -> Self {
        Self {
            source: source.into(),
            mode,
            translate_config: "prompts/code_translation.toml".to_string(),
            build_config: "prompts/code_build.toml".to_string(),
            build_command: "make".to_string(),
        }
    }

    /// Prompt file passed to `translate -p`
    pub fn with_translate_config(mut self, path: impl Into<String>) -> Self {
        self.translate_config = path.into();
        self
    }

    /// Prompt file passed to `update -p`
    pub fn with_build_config(mut self, path: impl Into<String>) -> Self {
        self.build_config = path.into();
        self
    }

    pub fn with_build_command(mut self, command: impl Into<String>) -> Self {
        self.build_command = command.into();
        self
    }

    /// Sibling of the source with a new suffix, e.g. `src/a.F90` → `src/a.cpp`
    fn sibling(&self, suffix: &str) -> String {
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = self.source.parent().unwrap_or_else(|| Path::new(""));
        parent.join(format!("{}{}", stem, suffix)).display().to_string()
    }

    /// Render the task text
    pub fn render(&self) -> String {
        let source = self.source.display();
        let cpp = self.sibling(".cpp");
        let hpp = self.sibling(".hpp");

        match self.mode {
            TranslationMode::CodeScribe => format!(
                "Translate {source} from Fortran to C++ using code-scribe:\n\n\
                 1. Run 'translate {source} -p {tc}'\n\
                 2. Run 'update Makefile -p {bc} -r {cpp} -r {hpp} -r {fi}'\n\
                 3. Run '{build}' to build\n\
                 4. If the build fails, analyze the errors and fix the files without code-scribe\n\
                 5. Repeat steps 3-4 until the build succeeds\n\n\
                 Be systematic and explain each step.",
                tc = self.translate_config,
                bc = self.build_config,
                fi = self.sibling("_fi.F90"),
                build = self.build_command,
            ),
            TranslationMode::Direct => format!(
                "Translate {source} from Fortran to C++ and integrate it into the existing project:\n\n\
                 1. Read {source}\n\
                 2. Translate Fortran MODULE/PROGRAM/SUBROUTINES to C++ functions and classes\n\
                 3. Write the translated code to {cpp} (and {hpp} if needed)\n\
                 4. Update the Makefile to compile all .cpp files\n\
                 5. Run '{build}' to build a single executable\n\
                 6. If the build fails, analyze and fix the C++ code, headers, or Makefile\n\
                 7. Repeat the build-fix cycle until the build succeeds\n\n\
                 Be systematic and explain each step.",
                build = self.build_command,
            ),
        }
    }
}
