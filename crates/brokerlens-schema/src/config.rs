use serde::Deserialize;

/// How schema documents are prepared before compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompileStrategy {
    /// Remove every key that is not a standard JSON Schema keyword, then
    /// compile. Vendor extensions such as `x-category` disappear.
    StripUnknownKeywords,
    /// Compile the document as-is; unknown keywords are ignored by the
    /// compiler.
    #[default]
    Quarantine,
}

/// Controls schema compilation and directory loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Either way, a schema that still fails to compile is skipped.
    pub strategy: CompileStrategy,
    /// Maximum number of schemas loaded from a directory.
    pub max_schemas_from_directory: usize,
    /// Maximum bytes allowed per schema file loaded from a directory.
    pub max_schema_file_size: usize,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            strategy: CompileStrategy::default(),
            max_schemas_from_directory: 256,
            max_schema_file_size: 256 * 1024,
        }
    }
}
