use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Supported source languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Python, Language::JavaScript];

    /// Identifier used as the interpreter table key
    pub fn id(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
        }
    }

    /// File extension without dot
    pub fn extension(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::JavaScript => "js",
        }
    }

    /// Name of the source file the service writes into the working directory
    pub fn source_name(self) -> String {
        format!("main.{}", self.extension())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Language {
    type Err = ConfigError;

    /// Accepts the identifier or the file extension
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| s == lang.id() || s == lang.extension())
            .ok_or_else(|| ConfigError::UnknownLanguage(s.to_owned()))
    }
}

/// Host platforms the interpreter table can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Linux, Platform::MacOs, Platform::Windows];

    /// The platform this binary was compiled for
    pub fn current() -> Result<Self, ConfigError> {
        match std::env::consts::OS {
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::MacOs),
            "windows" => Ok(Platform::Windows),
            other => Err(ConfigError::UnsupportedPlatform(other.to_owned())),
        }
    }

    /// Identifier used as the interpreter table key
    pub fn id(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|platform| s == platform.id())
            .ok_or_else(|| ConfigError::Invalid(format!("unknown platform '{s}'")))
    }
}

/// How to invoke the interpreter for a language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpreter {
    /// Command and leading arguments; the source path is appended
    pub command: Vec<String>,
}

impl Interpreter {
    pub fn new(command: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            command: command.into_iter().map(Into::into).collect(),
        }
    }

    /// Full invocation for a source file
    pub fn invocation(&self, source: &str) -> Vec<String> {
        let mut argv = self.command.clone();
        argv.push(source.to_owned());
        argv
    }
}

/// Interpreter lookup table: platform id → language id → interpreter
///
/// Keys are kept as strings so the table deserializes straight from TOML;
/// [`Config::validate`](crate::Config) checks that every key names a known
/// platform or language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterpreterTable(HashMap<String, HashMap<String, Interpreter>>);

impl InterpreterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the interpreter for a platform/language pair
    pub fn insert(&mut self, platform: Platform, language: Language, interpreter: Interpreter) {
        self.0
            .entry(platform.id().to_owned())
            .or_default()
            .insert(language.id().to_owned(), interpreter);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, platform: Platform, language: Language, interpreter: Interpreter) -> Self {
        self.insert(platform, language, interpreter);
        self
    }

    /// Look up the interpreter for a platform/language pair
    pub fn resolve(&self, platform: Platform, language: Language) -> Result<&Interpreter, ConfigError> {
        self.0
            .get(platform.id())
            .and_then(|languages| languages.get(language.id()))
            .ok_or(ConfigError::InterpreterNotFound { platform, language })
    }

    /// Raw entries, keyed by platform id then language id
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &Interpreter)> {
        self.0.iter().flat_map(|(platform, languages)| {
            languages
                .iter()
                .map(move |(language, interp)| (platform.as_str(), language.as_str(), interp))
        })
    }
}
