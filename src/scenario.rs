//! What each virtual user does on every iteration

use std::{fs, time::Duration};

use camino::Utf8Path;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

use crate::{SwarmError, SwarmResult};

/// Pause at the end of every iteration unless the scenario says otherwise
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

/// Fetches every theme. Sent as written, surrounding whitespace included
pub const THEMES_QUERY: &str = r#"
    {
        themes(onlyHighlight: false) {
            title
            icon
            highlight
        }
    }
    "#;

/// Creates a new theme. Sent as written, surrounding whitespace included
pub const ADD_THEME_MUTATION: &str = r#"
    mutation {
        addTheme(title: "New Theme", icon: "icon_url", highlight: true) {
            title
            icon
            highlight
        }
    }
    "#;

/// One named GraphQL document sent per iteration
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
pub struct ScenarioStep {
    name: String,
    query: String,
}

impl ScenarioStep {
    /// Creates a step; `name` is what its status check is reported under
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> ScenarioStep {
        ScenarioStep {
            name: name.into(),
            query: query.into(),
        }
    }
}

/// The ordered steps of one iteration and the pause that ends it
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
pub struct Scenario {
    steps: Vec<ScenarioStep>,
    pause: Duration,
}

impl Default for Scenario {
    /// Queries the themes, adds one, then pauses for a second
    fn default() -> Self {
        Scenario {
            steps: vec![
                ScenarioStep::new("themes", THEMES_QUERY),
                ScenarioStep::new("addTheme", ADD_THEME_MUTATION),
            ],
            pause: DEFAULT_PAUSE,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pause: Option<String>,
    #[serde(rename = "step", default)]
    steps: Vec<StepFile>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct StepFile {
    name: String,
    query: String,
}

impl Scenario {
    /// Creates a scenario, rejecting ones that could not run
    pub fn new(steps: Vec<ScenarioStep>, pause: Duration) -> SwarmResult<Scenario> {
        if steps.is_empty() {
            return Err(SwarmError::InvalidScenario(
                "a scenario needs at least one step".to_string(),
            ));
        }
        if let Some(step) = steps.iter().find(|step| step.name.trim().is_empty()) {
            return Err(SwarmError::InvalidScenario(format!(
                "every step needs a name, but the step sending {:?} has none",
                step.query.trim()
            )));
        }
        Ok(Scenario { steps, pause })
    }

    /// The same steps with a different pause
    pub fn with_pause(self, pause: Duration) -> Scenario {
        Scenario { pause, ..self }
    }

    /// Parses a scenario from TOML.
    ///
    /// ```toml
    /// pause = "500ms"
    ///
    /// [[step]]
    /// name = "themes"
    /// query = "{ themes(onlyHighlight: false) { title } }"
    /// ```
    ///
    /// `pause` is optional and defaults to one second.
    pub fn from_toml_str(contents: &str) -> SwarmResult<Scenario> {
        let file: ScenarioFile = toml::from_str(contents)?;
        let pause = match file.pause {
            Some(pause) => humantime::parse_duration(&pause).map_err(|err| {
                SwarmError::InvalidScenario(format!("invalid pause '{pause}': {err}"))
            })?,
            None => DEFAULT_PAUSE,
        };
        let steps = file
            .steps
            .into_iter()
            .map(|step| ScenarioStep::new(step.name, step.query))
            .collect();
        Scenario::new(steps, pause)
    }

    /// Reads a scenario from a TOML file
    pub fn from_file(path: &Utf8Path) -> SwarmResult<Scenario> {
        tracing::debug!(%path, "reading scenario");
        let contents = fs::read_to_string(path).map_err(|source| SwarmError::ScenarioRead {
            path: path.to_path_buf(),
            source,
        })?;
        Scenario::from_toml_str(&contents)
    }

    /// Renders the scenario in the format [`Scenario::from_toml_str`] reads
    pub fn to_toml(&self) -> SwarmResult<String> {
        let file = ScenarioFile {
            pause: Some(humantime::format_duration(self.pause).to_string()),
            steps: self
                .steps
                .iter()
                .map(|step| StepFile {
                    name: step.name.clone(),
                    query: step.query.clone(),
                })
                .collect(),
        };
        Ok(toml::to_string(&file)?)
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, time::Duration};

    use camino::Utf8Path;
    use indoc::indoc;
    use rstest::rstest;
    use speculoos::prelude::*;

    use super::{Scenario, ScenarioStep, ADD_THEME_MUTATION, DEFAULT_PAUSE, THEMES_QUERY};
    use crate::SwarmError;

    #[test]
    fn default_scenario_queries_then_mutates_then_pauses() {
        let scenario = Scenario::default();
        let names: Vec<_> = scenario.steps().iter().map(|s| s.name().as_str()).collect();
        assert_that!(names).is_equal_to(vec!["themes", "addTheme"]);
        assert_that!(scenario.steps()[0].query().as_str()).is_equal_to(THEMES_QUERY);
        assert_that!(scenario.steps()[1].query().as_str()).is_equal_to(ADD_THEME_MUTATION);
        assert_that!(*scenario.pause()).is_equal_to(Duration::from_secs(1));
    }

    #[test]
    fn literal_documents_keep_their_exact_whitespace() {
        assert_that!(THEMES_QUERY).is_equal_to(concat!(
            "\n",
            "    {\n",
            "        themes(onlyHighlight: false) {\n",
            "            title\n",
            "            icon\n",
            "            highlight\n",
            "        }\n",
            "    }\n",
            "    ",
        ));
        assert_that!(ADD_THEME_MUTATION).is_equal_to(concat!(
            "\n",
            "    mutation {\n",
            "        addTheme(title: \"New Theme\", icon: \"icon_url\", highlight: true) {\n",
            "            title\n",
            "            icon\n",
            "            highlight\n",
            "        }\n",
            "    }\n",
            "    ",
        ));
    }

    #[test]
    fn parses_steps_and_pause() -> anyhow::Result<()> {
        let scenario = Scenario::from_toml_str(indoc! {r#"
            pause = "250ms"

            [[step]]
            name = "themes"
            query = "{ themes(onlyHighlight: true) { title } }"

            [[step]]
            name = "addTheme"
            query = """
            mutation {
              addTheme(title: "x", icon: "y", highlight: false) { title }
            }
            """
        "#})?;

        assert_that!(*scenario.pause()).is_equal_to(Duration::from_millis(250));
        assert_that!(scenario.steps().len()).is_equal_to(2);
        assert_that!(scenario.steps()[0]).is_equal_to(ScenarioStep::new(
            "themes",
            "{ themes(onlyHighlight: true) { title } }",
        ));
        assert_that!(scenario.steps()[1].query().as_str()).contains("addTheme(title: \"x\"");
        Ok(())
    }

    #[test]
    fn pause_defaults_to_one_second() -> anyhow::Result<()> {
        let scenario = Scenario::from_toml_str(indoc! {r#"
            [[step]]
            name = "ping"
            query = "{ __typename }"
        "#})?;
        assert_that!(*scenario.pause()).is_equal_to(DEFAULT_PAUSE);
        Ok(())
    }

    #[rstest]
    #[case::no_steps("pause = \"1s\"")]
    #[case::blank_name("[[step]]\nname = \"  \"\nquery = \"{ a }\"")]
    #[case::bad_pause("pause = \"soon\"\n[[step]]\nname = \"a\"\nquery = \"{ a }\"")]
    fn rejects_scenarios_that_cannot_run(#[case] contents: &str) {
        assert_that!(Scenario::from_toml_str(contents))
            .is_err()
            .matches(|err| matches!(err, SwarmError::InvalidScenario(_)));
    }

    #[rstest]
    #[case::missing_query("[[step]]\nname = \"a\"")]
    #[case::unknown_field("[[step]]\nname = \"a\"\nquery = \"{ a }\"\nvariables = 1")]
    #[case::not_toml("[[step")]
    fn rejects_malformed_files(#[case] contents: &str) {
        assert_that!(Scenario::from_toml_str(contents))
            .is_err()
            .matches(|err| matches!(err, SwarmError::ScenarioParse(_)));
    }

    #[test]
    fn rendered_default_reads_back_the_same() -> anyhow::Result<()> {
        let rendered = Scenario::default().to_toml()?;
        assert_that!(rendered.as_str()).contains("[[step]]");
        assert_that!(Scenario::from_toml_str(&rendered)?).is_equal_to(Scenario::default());
        Ok(())
    }

    #[test]
    fn reads_from_a_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "pause = \"2s\"\n[[step]]\nname = \"ping\"\nquery = \"{{ __typename }}\"")?;
        let path = Utf8Path::from_path(file.path()).unwrap();

        let scenario = Scenario::from_file(path)?;
        assert_that!(*scenario.pause()).is_equal_to(Duration::from_secs(2));
        assert_that!(scenario.steps()[0].query().as_str()).is_equal_to("{ __typename }");
        Ok(())
    }

    #[test]
    fn missing_files_say_where_they_were_looked_for() {
        let result = Scenario::from_file(Utf8Path::new("/definitely/not/here.toml"));
        assert_that!(result).is_err().matches(|err| {
            matches!(err, SwarmError::ScenarioRead { path, .. } if path.as_str() == "/definitely/not/here.toml")
        });
    }

    #[test]
    fn overriding_the_pause_keeps_the_steps() {
        let scenario = Scenario::default().with_pause(Duration::ZERO);
        assert_that!(*scenario.pause()).is_equal_to(Duration::ZERO);
        assert_that!(scenario.steps().len()).is_equal_to(2);
    }
}
