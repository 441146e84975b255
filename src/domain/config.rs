use std::{
    collections::BTreeMap,
    env, fmt,
    path::{Path, PathBuf},
};

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};

/// Name of the configuration file looked up when none is given explicitly.
pub const CONFIG_FILE_NAME: &str = "vp_config.yaml";

/// Environment variable naming the platform checkout that carries the
/// project's `vptool/vp_config.yaml`.
pub const PLATFORM_TOP_DIR: &str = "PLATFORM_TOP_DIR";

/// Project configuration for a verification plan.
///
/// The configuration supplies the project identifier embedded in every tag,
/// the value/label tables of the enumerated item fields, their default codes,
/// and the cue text shown for free-text fields that have not been filled in.
/// The plan only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    project_ident: ProjectIdent,

    /// Per-field settings, keyed by field name (`pfc`, `feature_descr`, ...).
    fields: BTreeMap<String, FieldConfig>,

    /// Bitmask labels for the `cores` field.
    ///
    /// When present, `cores` is rendered as the list of every core whose bit
    /// is set rather than as a single enumerated value.
    cores: Option<Vec<LabelledValue>>,
}

/// Settings of one item field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Code given to new items, and rendered as "not defined yet".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,

    /// The values an enumerated field may take.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<LabelledValue>>,

    /// Placeholder text meaning "not filled in yet".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cue_text: Option<String>,
}

/// The default code of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultValue {
    /// The code.
    pub value: i64,
}

/// A code and its human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelledValue {
    /// The stored code (a bit for bitmask fields).
    pub value: i64,
    /// The label shown in rendered plans.
    pub label: String,
}

impl LabelledValue {
    fn new(value: i64, label: &str) -> Self {
        Self {
            value,
            label: label.to_string(),
        }
    }
}

/// A validated project identifier: non-empty, ASCII, no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectIdent(NonEmptyString);

impl ProjectIdent {
    /// Creates a new project identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidProjectIdent`] if the identifier is empty, contains
    /// non-ASCII characters, or contains whitespace.
    pub fn new(ident: String) -> Result<Self, InvalidProjectIdent> {
        if !ident.is_ascii() || ident.chars().any(char::is_whitespace) {
            return Err(InvalidProjectIdent(ident));
        }
        NonEmptyString::new(ident).map(Self).map_err(InvalidProjectIdent)
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for ProjectIdent {
    type Error = InvalidProjectIdent;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProjectIdent> for String {
    fn from(ident: ProjectIdent) -> Self {
        ident.0.as_str().to_string()
    }
}

impl fmt::Display for ProjectIdent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unusable project identifier.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid project identifier '{0}': must be non-empty ASCII without whitespace")]
pub struct InvalidProjectIdent(String);

/// Project identifier used when no configuration is available.
pub const DEFAULT_PROJECT: &str = "PROJECT";

/// Marker reported by [`Config::describe`] for codes equal to the default.
pub const NOT_DEFINED_YET: &str = "NDY (Not Defined Yet)";
/// Marker reported by [`Config::describe`] for codes without a label.
pub const UNKNOWN_VALUE: &str = "<UNKNOWN>";
/// Marker reported by [`Config::describe`] when no bit of a bitmask is set.
pub const NONE_APPLICABLE: &str = "None applicable";

impl Default for Config {
    fn default() -> Self {
        let enumerated = |labels: &[&str]| FieldConfig {
            default: Some(DefaultValue { value: -1 }),
            values: Some(
                labels
                    .iter()
                    .zip(0..)
                    .map(|(label, value)| LabelledValue::new(value, label))
                    .collect(),
            ),
            cue_text: None,
        };
        let text = |cue: &str| FieldConfig {
            cue_text: Some(cue.to_string()),
            ..FieldConfig::default()
        };

        let fields = BTreeMap::from([
            (
                "pfc".to_string(),
                enumerated(&[
                    "Assertion",
                    "Check RM",
                    "Self-check",
                    "Signature check",
                    "User-defined",
                ]),
            ),
            (
                "test_type".to_string(),
                enumerated(&[
                    "RISC-V Compliance",
                    "Directed SW",
                    "Constrained Random",
                    "Directed Non-SW",
                    "Other",
                ]),
            ),
            (
                "cov_method".to_string(),
                enumerated(&[
                    "Functional Coverage",
                    "Assertion Coverage",
                    "Code Coverage",
                    "Other",
                ]),
            ),
            (
                "cores".to_string(),
                FieldConfig {
                    default: Some(DefaultValue { value: -1 }),
                    ..FieldConfig::default()
                },
            ),
            (
                "feature_descr".to_string(),
                text("Describe the feature to be verified."),
            ),
            (
                "requirement_loc".to_string(),
                text("Where is the requirement specified?"),
            ),
            (
                "verif_goals".to_string(),
                text("What must be demonstrated to consider the feature verified?"),
            ),
            (
                "coverage_loc".to_string(),
                text("Where is the coverage of this item collected?"),
            ),
            ("comments".to_string(), text("Any additional notes.")),
        ]);

        Self {
            project_ident: ProjectIdent::new(DEFAULT_PROJECT.to_string())
                .expect("default project identifier is valid"),
            fields,
            cores: None,
        }
    }
}

impl Config {
    /// Creates the default configuration for the given project.
    #[must_use]
    pub fn for_project(project_ident: ProjectIdent) -> Self {
        Self {
            project_ident,
            ..Self::default()
        }
    }

    /// Loads the configuration from a YAML or TOML file at the given path.
    ///
    /// Files ending in `.toml` are parsed as TOML, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if its content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        if is_toml(path) {
            toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| format!("Failed to parse config file: {e}"))
        }
    }

    /// Saves the configuration to a YAML or TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized or if the
    /// file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = if is_toml(path) {
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?
        } else {
            serde_yaml::to_string(self).map_err(|e| format!("Failed to serialize config: {e}"))?
        };
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Locates and loads the project configuration.
    ///
    /// Lookup order: the explicit path, then
    /// `$PLATFORM_TOP_DIR/vptool/vp_config.yaml`, then `./vp_config.yaml`.
    /// A configuration that cannot be loaded falls back to the default.
    #[must_use]
    pub fn discover(explicit: Option<&Path>) -> Self {
        let path = explicit.map_or_else(default_location, Path::to_path_buf);
        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Failed to load config from {}: {e}", path.display());
            Self::default()
        })
    }

    /// The project identifier embedded in tags.
    #[must_use]
    pub fn project_ident(&self) -> &str {
        self.project_ident.as_str()
    }

    /// Settings of a field, if configured.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.get(name)
    }

    /// Default code of a field, or `0` if the field has none.
    #[must_use]
    pub fn default_code(&self, name: &str) -> i64 {
        self.field(name)
            .and_then(|field| field.default)
            .map_or(0, |default| default.value)
    }

    /// Cue text of a field, if configured.
    #[must_use]
    pub fn cue_text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(|field| field.cue_text.as_deref())
    }

    /// Replaces the bitmask label table of the `cores` field.
    pub fn set_cores(&mut self, cores: Vec<LabelledValue>) {
        self.cores = Some(cores);
    }

    /// Inserts or replaces the settings of a field.
    pub fn set_field(&mut self, name: impl Into<String>, field: FieldConfig) {
        self.fields.insert(name.into(), field);
    }

    /// Renders a stored code of field `name` as a human-readable label.
    ///
    /// - `cores` with a bitmask table: every label whose bit is set, joined
    ///   by `", "`, or [`NONE_APPLICABLE`].
    /// - fields with a value table: [`NOT_DEFINED_YET`] for the default code,
    ///   [`UNKNOWN_VALUE`] when no label matches, else the label.
    /// - anything else: an "unsupported field" marker.
    #[must_use]
    pub fn describe(&self, name: &str, code: i64) -> String {
        if name == "cores" {
            if let Some(cores) = &self.cores {
                let labels: Vec<&str> = cores
                    .iter()
                    .filter(|core| core.value & code != 0)
                    .map(|core| core.label.as_str())
                    .collect();
                if labels.is_empty() {
                    return NONE_APPLICABLE.to_string();
                }
                return labels.join(", ");
            }
        }

        let Some(field) = self.field(name) else {
            return unsupported(name);
        };
        let Some(values) = &field.values else {
            return unsupported(name);
        };
        if field.default.is_some_and(|default| default.value == code) {
            return NOT_DEFINED_YET.to_string();
        }
        values
            .iter()
            .find(|value| value.value == code)
            .map_or_else(|| UNKNOWN_VALUE.to_string(), |value| value.label.clone())
    }
}

/// The marker returned for fields that carry no value table.
#[must_use]
pub fn unsupported(name: &str) -> String {
    format!("N/A (unsupported field '{name}')")
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml")
}

fn default_location() -> PathBuf {
    env::var_os(PLATFORM_TOP_DIR).map_or_else(
        || PathBuf::from(CONFIG_FILE_NAME),
        |top| PathBuf::from(top).join("vptool").join(CONFIG_FILE_NAME),
    )
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        project_ident: ProjectIdent,

        /// Per-field settings, named after the GUI widgets that edit them.
        #[serde(default)]
        gui: BTreeMap<String, FieldConfig>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        cores: Option<CoresTable>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct CoresTable {
    values: Vec<LabelledValue>,
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                project_ident,
                gui,
                cores,
            } => Self {
                project_ident,
                fields: gui,
                cores: cores.map(|table| table.values),
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            project_ident: config.project_ident,
            gui: config.fields,
            cores: config.cores.map(|values| CoresTable { values }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use test_case::test_case;

    use super::*;

    fn config_with_cores() -> Config {
        let mut config = Config::default();
        config.set_cores(vec![
            LabelledValue::new(1, "CV32A6"),
            LabelledValue::new(2, "CV64A6"),
            LabelledValue::new(4, "CV32A6-MMU"),
        ]);
        config
    }

    #[test]
    fn load_reads_valid_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(
            b"_version: \"1\"\nproject_ident: CVA6\ngui:\n  pfc:\n    default:\n      value: -1\n    values:\n      - value: 0\n        label: Assertion\n  comments:\n    cue_text: Type here\ncores:\n  values:\n    - value: 1\n      label: CV32A6\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.project_ident(), "CVA6");
        assert_eq!(config.default_code("pfc"), -1);
        assert_eq!(config.cue_text("comments"), Some("Type here"));
        assert_eq!(config.describe("pfc", 0), "Assertion");
        assert_eq!(config.describe("cores", 1), "CV32A6");
    }

    #[test]
    fn toml_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("vp_config.toml");
        let config = config_with_cores();

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn yaml_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        let config = Config::for_project(ProjectIdent::new("CVA6".to_string()).unwrap());

        config.save(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("_version"));

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.yaml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_invalid_yaml_returns_error() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"_version: \"1\"\nproject_ident: \"\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn discover_falls_back_to_default() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::discover(Some(&tmp.path().join("nope.yaml")));
        assert_eq!(config, Config::default());
    }

    #[test_case("pfc", -1, NOT_DEFINED_YET; "default code")]
    #[test_case("pfc", 1, "Check RM"; "known code")]
    #[test_case("pfc", 42, UNKNOWN_VALUE; "unknown code")]
    #[test_case("test_type", 2, "Constrained Random"; "test type")]
    #[test_case("cov_method", 0, "Functional Coverage"; "coverage method")]
    #[test_case("comments", 0, "N/A (unsupported field 'comments')"; "text field")]
    #[test_case("bogus", 0, "N/A (unsupported field 'bogus')"; "unknown field")]
    fn describe_enumerated(field: &str, code: i64, expected: &str) {
        assert_eq!(Config::default().describe(field, code), expected);
    }

    #[test_case(1, "CV32A6")]
    #[test_case(3, "CV32A6, CV64A6")]
    #[test_case(-1, "CV32A6, CV64A6, CV32A6-MMU"; "all bits")]
    #[test_case(8, NONE_APPLICABLE; "no matching bit")]
    #[test_case(0, NONE_APPLICABLE; "empty mask")]
    fn describe_bitmask(code: i64, expected: &str) {
        assert_eq!(config_with_cores().describe("cores", code), expected);
    }

    #[test]
    fn cores_without_table_is_unsupported() {
        assert_eq!(
            Config::default().describe("cores", 1),
            "N/A (unsupported field 'cores')"
        );
    }

    #[test]
    fn project_ident_validation() {
        assert!(ProjectIdent::new(String::new()).is_err());
        assert!(ProjectIdent::new("CV A6".to_string()).is_err());
        assert!(ProjectIdent::new("CVÄ6".to_string()).is_err());
        assert_eq!(ProjectIdent::new("CVA6".to_string()).unwrap().as_str(), "CVA6");
    }
}
